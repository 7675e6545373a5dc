//! Error types shared by every gasless voting crate.

use thiserror::Error;

/// Errors raised while validating or converting core values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The value is not a 20-byte hex address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The value is not a `<address>_<number>` proposal identifier
    #[error("Invalid proposal id: {0}")]
    InvalidProposalId(String),

    /// A ratio outside `[0, 1]` or an unsupported precision
    #[error("Invalid ratio: {0}")]
    InvalidRatio(String),

    /// A timestamp that cannot be represented
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// An integer that does not fit the target width
    #[error("Integer overflow: {0}")]
    Overflow(String),
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
