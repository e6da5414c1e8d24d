use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Why a sequence stopped growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The end-of-sequence token was produced.
    Stop,
    /// The sequence reached `max_length`.
    Length,
}

/// When a sequence becomes terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopCondition {
    pub eos_token_id: u32,
    pub max_length: usize,
}

impl StopCondition {
    pub fn new(eos_token_id: u32, max_length: usize) -> Self {
        Self {
            eos_token_id,
            max_length,
        }
    }
}

/// One growing token sequence and its attention mask.
///
/// A sequence is either growing or terminal. Once terminal it is read-only:
/// [`SequenceState::advance`] and [`SequenceState::finish`] fail with
/// [`EngineError::InvalidState`].
#[derive(Debug, Clone)]
pub struct SequenceState {
    tokens: Vec<u32>,
    mask: Vec<u8>,
    prompt_len: usize,
    stop: StopCondition,
    finish: Option<FinishReason>,
}

impl SequenceState {
    /// Start a sequence from prompt tokens. Every mask bit is 1.
    ///
    /// A prompt already at `max_length` starts out terminal.
    pub fn new(prompt: Vec<u32>, stop: StopCondition) -> Result<Self> {
        if prompt.is_empty() {
            return Err(EngineError::EmptyPrompt);
        }

        let prompt_len = prompt.len();
        let finish = (prompt_len >= stop.max_length).then_some(FinishReason::Length);

        Ok(Self {
            mask: vec![1; prompt_len],
            tokens: prompt,
            prompt_len,
            stop,
            finish,
        })
    }

    /// Token ids and mask for the next inference call.
    pub fn current_logits_input(&self) -> (&[u32], &[u8]) {
        (&self.tokens, &self.mask)
    }

    /// Append a token.
    ///
    /// Appending the EOS id or reaching `max_length` makes the sequence terminal.
    pub fn advance(&mut self, token_id: u32) -> Result<()> {
        if let Some(reason) = self.finish {
            return Err(EngineError::InvalidState(format!(
                "cannot append token {token_id}: sequence already finished ({reason:?})"
            )));
        }

        self.tokens.push(token_id);
        self.mask.push(1);

        if token_id == self.stop.eos_token_id {
            self.finish = Some(FinishReason::Stop);
        } else if self.tokens.len() >= self.stop.max_length {
            self.finish = Some(FinishReason::Length);
        }
        Ok(())
    }

    /// Mark the sequence terminal without appending anything.
    pub fn finish(&mut self, reason: FinishReason) -> Result<()> {
        if let Some(existing) = self.finish {
            return Err(EngineError::InvalidState(format!(
                "sequence already finished ({existing:?})"
            )));
        }
        self.finish = Some(reason);
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.finish.is_some()
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish
    }

    pub fn stop_condition(&self) -> StopCondition {
        self.stop
    }

    /// Tokens that can still be appended before `max_length`.
    pub fn remaining(&self) -> usize {
        self.stop.max_length.saturating_sub(self.tokens.len())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn prompt_len(&self) -> usize {
        self.prompt_len
    }

    pub fn generated_len(&self) -> usize {
        self.tokens.len() - self.prompt_len
    }

    pub fn tokens(&self) -> &[u32] {
        &self.tokens
    }

    pub fn generated_tokens(&self) -> &[u32] {
        &self.tokens[self.prompt_len..]
    }

    pub fn into_tokens(self) -> Vec<u32> {
        self.tokens
    }
}
