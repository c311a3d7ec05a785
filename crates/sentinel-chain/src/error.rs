use sentinel_core::error::ConfigIssue;
use sentinel_core::SentinelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    /// A `uint256` field that must fit in 64 bits did not.
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
}

impl From<ChainError> for SentinelError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::InvalidKey(message) => SentinelError::InvalidConfig(vec![ConfigIssue {
                key: "PRIVATE_KEY",
                message,
            }]),
            other @ ChainError::OutOfRange { .. } => SentinelError::read("uint256", other),
        }
    }
}
