use thiserror::Error;

/// Errors raised while validating core inputs.
#[derive(Debug, Error)]
pub enum PrecedenceError {
    /// Invalid topic name pattern.
    #[error("invalid topic pattern: {0}")]
    InvalidPattern(String),
}
