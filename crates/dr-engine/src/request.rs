//! Request and response types at the edge of the engine.
//!
//! [`GenerateParams`] is what a caller hands in: every field optional, any
//! value accepted. It is clamped into a [`SamplingConfig`] before anything
//! reaches the decoding core. [`GenerationResponse`] is what comes back.

use dr_sampler::SamplingConfig;
use serde::{Deserialize, Serialize};

use crate::sequence::FinishReason;

/// Raw generation parameters, clamped rather than rejected.
///
/// Missing fields fall back to `SamplingConfig::default()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateParams {
    pub max_length: Option<i64>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<i64>,
    pub num_return_sequences: Option<i64>,
    /// Overrides the tokenizer's EOS id.
    pub eos_token_id: Option<u32>,
    /// Makes sampling reproducible across requests.
    pub seed: Option<u64>,
}

impl GenerateParams {
    pub fn sampling_config(&self) -> SamplingConfig {
        let defaults = SamplingConfig::default();
        SamplingConfig::clamped(
            self.temperature.unwrap_or(defaults.temperature()),
            self.top_p.unwrap_or(defaults.top_p()),
            to_usize(self.top_k, defaults.top_k()),
            to_usize(self.max_length, defaults.max_length()),
            to_usize(self.num_return_sequences, defaults.num_return_sequences()),
        )
    }
}

fn to_usize(value: Option<i64>, default: usize) -> usize {
    match value {
        Some(v) => usize::try_from(v.max(0)).unwrap_or(usize::MAX),
        None => default,
    }
}

/// Outcome of one requested sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SequenceOutcome {
    Completed {
        text: String,
        /// Tokens generated beyond the prompt.
        token_count: usize,
        finish_reason: FinishReason,
    },
    Failed {
        error: String,
    },
}

impl SequenceOutcome {
    pub fn failed(error: impl ToString) -> Self {
        SequenceOutcome::Failed {
            error: error.to_string(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SequenceOutcome::Completed { .. })
    }

    pub fn token_count(&self) -> usize {
        match self {
            SequenceOutcome::Completed { token_count, .. } => *token_count,
            SequenceOutcome::Failed { .. } => 0,
        }
    }

    /// Generated text, or `"error: ..."` for a failed slot.
    pub fn display_text(&self) -> String {
        match self {
            SequenceOutcome::Completed { text, .. } => text.clone(),
            SequenceOutcome::Failed { error } => format!("error: {error}"),
        }
    }
}

/// Timing and throughput for one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetrics {
    pub elapsed_seconds: f64,
    pub tokens_generated: usize,
    pub tokens_per_second: f64,
}

impl GenerationMetrics {
    /// Throughput is reported as `0.0` when no measurable time elapsed.
    pub fn new(elapsed_seconds: f64, tokens_generated: usize) -> Self {
        let tokens_per_second = if elapsed_seconds > 0.0 {
            tokens_generated as f64 / elapsed_seconds
        } else {
            0.0
        };
        Self {
            elapsed_seconds,
            tokens_generated,
            tokens_per_second,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// One entry per requested sequence, in request order.
    pub sequences: Vec<SequenceOutcome>,
    pub metrics: GenerationMetrics,
    /// The effective parameters after clamping.
    pub parameters: SamplingConfig,
    pub prompt_tokens: usize,
}

impl GenerationResponse {
    pub fn texts(&self) -> Vec<String> {
        self.sequences.iter().map(SequenceOutcome::display_text).collect()
    }

    pub fn failures(&self) -> usize {
        self.sequences.iter().filter(|s| !s.is_completed()).count()
    }
}
