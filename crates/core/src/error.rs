//! Error types for the outfit domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; crates wrap the ones they
//! surface in their own error enums.

use thiserror::Error;

/// Failures of the text-generation collaborator.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned an empty response")]
    EmptyResponse,
}

/// Failures of a persistence backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(String),

    #[error("Stored document is corrupt: {0}")]
    Corrupt(String),

    #[error("Failed to serialize state document: {0}")]
    Serialization(String),
}

/// Failures reported by the host application surface.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Failed to write extension field '{field}' for {character}: {reason}")]
    ExtensionWrite {
        character: String,
        field: String,
        reason: String,
    },
}
