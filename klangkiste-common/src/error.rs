//! Common error types for the Klangkiste console

use thiserror::Error;

/// Common result type for console operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared across the console crates.
///
/// Mirrors how failures are reported to the operator: format rejections
/// block wizard advancement, conflicts require changed identifiers, missing
/// records trigger a view refresh, and transport failures are never retried
/// automatically.
#[derive(Error, Debug)]
pub enum Error {
    /// Tag identifier rejected by the format rules or by the registry
    #[error("Invalid tag UID: {0}")]
    InvalidUid(String),

    /// Duplicate identifier or conflicting registry state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Requested tag/box/assignment record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network/transport failure on a registry round-trip
    #[error("Transport error: {0}")]
    Transport(String),

    /// Registry reported a failure that fits no narrower category
    #[error("Registry error {code}: {message}")]
    Registry { code: u16, message: String },

    /// Session store operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Session payload (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures the operator can resolve by changing the working
    /// UID (used by the wizard to route the error back to the identifier
    /// step).
    pub fn is_uid_rejection(&self) -> bool {
        matches!(self, Error::InvalidUid(_) | Error::Conflict(_))
    }
}
