use dr_sampler::{LogitProcessor, SamplingConfig, TokenSampler};
use rand::Rng;
use tracing::{debug, trace};

use crate::backend::InferenceBackend;
use crate::error::{EngineError, Result};
use crate::sequence::{FinishReason, SequenceState};

/// A finished sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutput {
    /// Prompt followed by generated tokens. Never contains a sampled EOS.
    pub tokens: Vec<u32>,
    pub prompt_len: usize,
    pub finish_reason: FinishReason,
}

impl DecodeOutput {
    pub fn generated(&self) -> &[u32] {
        &self.tokens[self.prompt_len..]
    }

    pub fn generated_len(&self) -> usize {
        self.tokens.len() - self.prompt_len
    }
}

/// Drives one [`SequenceState`] from growing to terminal.
///
/// Every step re-runs inference over the whole sequence, then processes and
/// samples the returned logits. A sampled EOS ends the loop without being
/// appended.
pub struct DecodingLoop<'a, B: ?Sized> {
    backend: &'a B,
    processor: LogitProcessor,
    sampler: TokenSampler,
}

impl<'a, B: InferenceBackend + ?Sized> DecodingLoop<'a, B> {
    pub fn new(backend: &'a B, config: &SamplingConfig) -> Self {
        Self {
            backend,
            processor: LogitProcessor::new(config),
            sampler: TokenSampler::new(),
        }
    }

    pub fn run<R: Rng + ?Sized>(&self, mut state: SequenceState, rng: &mut R) -> Result<DecodeOutput> {
        let eos_token_id = state.stop_condition().eos_token_id;

        while !state.is_terminal() && state.remaining() > 0 {
            let token = self.step(&state, rng)?;
            trace!(position = state.len(), token, "sampled token");

            if token == eos_token_id {
                state.finish(FinishReason::Stop)?;
                break;
            }
            state.advance(token)?;
        }

        let finish_reason = state.finish_reason().unwrap_or(FinishReason::Length);
        let prompt_len = state.prompt_len();
        debug!(
            generated = state.generated_len(),
            ?finish_reason,
            "sequence finished"
        );

        Ok(DecodeOutput {
            tokens: state.into_tokens(),
            prompt_len,
            finish_reason,
        })
    }

    /// One forward pass plus sampling; does not touch the sequence.
    pub fn step<R: Rng + ?Sized>(&self, state: &SequenceState, rng: &mut R) -> Result<u32> {
        let (tokens, mask) = state.current_logits_input();
        let logits = self.backend.next_logits(tokens, mask)?;
        check_logits(&logits, self.backend.vocab_size())?;

        let processed = self.processor.process(&logits)?;
        Ok(self.sampler.select(&processed, rng)?)
    }
}

/// Reject logit vectors of the wrong length or with NaN / +inf entries.
/// `-inf` is a legitimate mask value.
fn check_logits(logits: &[f32], vocab_size: usize) -> Result<()> {
    if logits.len() != vocab_size {
        return Err(EngineError::InferenceFailure(format!(
            "expected {} logits, got {}",
            vocab_size,
            logits.len()
        )));
    }
    if let Some(pos) = logits
        .iter()
        .position(|l| l.is_nan() || *l == f32::INFINITY)
    {
        return Err(EngineError::InferenceFailure(format!(
            "logit for token {} is {}",
            pos, logits[pos]
        )));
    }
    Ok(())
}
