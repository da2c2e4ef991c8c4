//! Recoverable errors surfaced to awaiting callers.
//!
//! Only producer-reported application errors are representable here.
//! Protocol violations (taking a result from an unresolved receiver, a
//! stream observing its own channel as closed mid-yield) are panics at
//! the violating call site, never `Error` values.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error surfaced when a bridged call resolves with a failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The producing side reported an application error. Carries the
    /// message string exactly as it crossed the boundary.
    #[error("bridged call failed: {0}")]
    Failed(String),
}

impl Error {
    /// Build an [`Error::Failed`] from any message.
    pub fn failed<S: Into<String>>(message: S) -> Self {
        Error::Failed(message.into())
    }

    /// The message as reported by the producing side.
    pub fn message(&self) -> &str {
        match self {
            Error::Failed(message) => message,
        }
    }

    /// Consume the error, yielding the reported message.
    pub fn into_message(self) -> String {
        match self {
            Error::Failed(message) => message,
        }
    }
}
