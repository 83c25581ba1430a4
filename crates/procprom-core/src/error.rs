//! Shared error type across procprom crates.

use thiserror::Error;

/// Stable error codes, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad configuration or argument.
    InvalidArgument,
    /// Gauge name already taken in a registry.
    RegistryConflict,
    /// Emitter used after teardown.
    InvalidState,
    /// Snapshot source failed to sample.
    Source,
    /// Internal failure (I/O, poisoned lock).
    Internal,
}

impl ErrorKind {
    /// String representation used in logs and HTTP responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::RegistryConflict => "REGISTRY_CONFLICT",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::Source => "SOURCE",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PromError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum PromError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("registry conflict: {0}")]
    RegistryConflict(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("snapshot source: {0}")]
    Source(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl PromError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PromError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            PromError::RegistryConflict(_) => ErrorKind::RegistryConflict,
            PromError::InvalidState(_) => ErrorKind::InvalidState,
            PromError::Source(_) => ErrorKind::Source,
            PromError::Internal(_) => ErrorKind::Internal,
        }
    }
}
