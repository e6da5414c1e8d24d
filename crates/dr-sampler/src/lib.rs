//! `dr-sampler` - Logit processing and token sampling for decode-runtime.
//!
//! This crate provides:
//! - `SamplingConfig`, the validated per-request sampling parameters
//! - `LogitFilter` stages (temperature, top-k, top-p) and a `FilterChain`
//! - `LogitProcessor`, which turns one step's logits into an argmax choice or
//!   a normalized `Distribution`
//! - `TokenSampler`, a categorical draw over a `Distribution`

pub mod config;
pub mod error;
pub mod filter;
pub mod processor;
pub mod sampler;
pub mod temperature;
pub mod top_k;
pub mod top_p;

pub use config::SamplingConfig;
pub use error::{Result, SamplerError};
pub use filter::{FilterChain, LogitFilter};
pub use processor::{argmax, softmax, Distribution, LogitProcessor, Processed};
pub use sampler::TokenSampler;
pub use temperature::TemperatureFilter;
pub use top_k::TopKFilter;
pub use top_p::TopPFilter;
