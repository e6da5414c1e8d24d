use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplerError {
    #[error("invalid sampling config: {field} = {value} is out of range")]
    InvalidConfig { field: &'static str, value: String },
    #[error("no viable candidate left after filtering")]
    EmptyDistribution,
}

pub type Result<T> = std::result::Result<T, SamplerError>;
