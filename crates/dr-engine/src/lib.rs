//! `dr-engine` - Autoregressive decoding for decode-runtime.
//!
//! This crate provides:
//! - `InferenceBackend` and `Tokenizer`, the collaborator traits
//! - `SequenceState`, one growing token sequence with its stop condition
//! - `DecodingLoop`, which drives one sequence to completion
//! - `GenerationOrchestrator`, which runs several independent sequences per
//!   request and reports timing metrics
//! - `GenerateParams` / `GenerationResponse`, the clamped request and the
//!   serializable result

pub mod backend;
pub mod decode;
pub mod error;
pub mod orchestrator;
pub mod request;
pub mod sequence;

pub use backend::{InferenceBackend, Tokenizer};
pub use decode::{DecodeOutput, DecodingLoop};
pub use error::{EngineError, Result};
pub use orchestrator::{ExecutionMode, GenerationOrchestrator, GenerationRequest};
pub use request::{GenerateParams, GenerationMetrics, GenerationResponse, SequenceOutcome};
pub use sequence::{FinishReason, SequenceState, StopCondition};

pub use dr_sampler::SamplingConfig;
