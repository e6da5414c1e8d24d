use dr_sampler::SamplerError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid sequence state: {0}")]
    InvalidState(String),
    #[error("inference failed: {0}")]
    InferenceFailure(String),
    #[error("no viable candidate left after filtering")]
    EmptyDistribution,
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("prompt has no tokens")]
    EmptyPrompt,
    #[error("sampler error: {0}")]
    Sampler(SamplerError),
}

impl From<SamplerError> for EngineError {
    fn from(err: SamplerError) -> Self {
        match err {
            SamplerError::EmptyDistribution => EngineError::EmptyDistribution,
            other => EngineError::Sampler(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
