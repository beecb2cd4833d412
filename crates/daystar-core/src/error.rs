// Error taxonomy shared by the scoring functions and the star validator.

use thiserror::Error;

/// Every failure the core can report. All of them are raised before any
/// arithmetic happens; nothing is recovered or defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    /// A numeric precondition was violated (negative count, non-positive
    /// target where one is required, upper limit below target).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A string meant to hold an integer contained something else.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The value was of a type that can never be an integer star count.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

impl ScoreError {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        ScoreError::InvalidInput(message.into())
    }
}
