//! Scripted collaborators shared by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use dr_engine::{EngineError, InferenceBackend, Result, Tokenizer};

pub const VOCAB: usize = 16;

/// Logits with a single clear winner.
pub fn one_hot(vocab: usize, winner: u32) -> Vec<f32> {
    let mut logits = vec![-1.0; vocab];
    logits[winner as usize] = 8.0;
    logits
}

/// Returns `script[step]` as the argmax, where `step` counts tokens generated
/// so far. The last entry repeats once the script runs out.
pub struct Scripted {
    pub prompt_len: usize,
    pub script: Vec<u32>,
}

impl InferenceBackend for Scripted {
    fn vocab_size(&self) -> usize {
        VOCAB
    }

    fn next_logits(&self, tokens: &[u32], mask: &[u8]) -> Result<Vec<f32>> {
        assert_eq!(tokens.len(), mask.len(), "mask out of step with tokens");
        let step = tokens.len() - self.prompt_len;
        let winner = self.script[step.min(self.script.len() - 1)];
        Ok(one_hot(VOCAB, winner))
    }
}

/// Wraps a backend and fails exactly one call, counted across all sequences.
pub struct FailOnCall<B> {
    pub inner: B,
    pub fail_at: usize,
    pub calls: AtomicUsize,
}

impl<B> FailOnCall<B> {
    pub fn new(inner: B, fail_at: usize) -> Self {
        Self {
            inner,
            fail_at,
            calls: AtomicUsize::new(0),
        }
    }
}

impl<B: InferenceBackend> InferenceBackend for FailOnCall<B> {
    fn vocab_size(&self) -> usize {
        self.inner.vocab_size()
    }

    fn next_logits(&self, tokens: &[u32], mask: &[u8]) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == self.fail_at {
            return Err(EngineError::InferenceFailure(format!(
                "injected failure on call {call}"
            )));
        }
        self.inner.next_logits(tokens, mask)
    }
}

/// Wraps a backend and panics on exactly one call.
pub struct PanicOnCall<B> {
    pub inner: B,
    pub panic_at: usize,
    pub calls: AtomicUsize,
}

impl<B> PanicOnCall<B> {
    pub fn new(inner: B, panic_at: usize) -> Self {
        Self {
            inner,
            panic_at,
            calls: AtomicUsize::new(0),
        }
    }
}

impl<B: InferenceBackend> InferenceBackend for PanicOnCall<B> {
    fn vocab_size(&self) -> usize {
        self.inner.vocab_size()
    }

    fn next_logits(&self, tokens: &[u32], mask: &[u8]) -> Result<Vec<f32>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.panic_at {
            panic!("backend blew up");
        }
        self.inner.next_logits(tokens, mask)
    }
}

/// Smooth, input-dependent logits so sampling has something to choose from.
pub struct Wavy;

impl InferenceBackend for Wavy {
    fn vocab_size(&self) -> usize {
        VOCAB
    }

    fn next_logits(&self, tokens: &[u32], _mask: &[u8]) -> Result<Vec<f32>> {
        let phase: u32 = tokens.iter().sum();
        Ok((0..VOCAB)
            .map(|i| ((i as f32 + phase as f32) * 0.7).sin() * 2.0)
            .collect())
    }
}

/// Renders ids as space-separated numbers, skipping the EOS id 0.
pub struct Ids;

impl Tokenizer for Ids {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        text.split_whitespace()
            .map(|w| {
                w.parse()
                    .map_err(|_| EngineError::Tokenizer(format!("bad token {w:?}")))
            })
            .collect()
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        Ok(tokens
            .iter()
            .filter(|&&t| t != 0)
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn eos_token_id(&self) -> u32 {
        0
    }
}
