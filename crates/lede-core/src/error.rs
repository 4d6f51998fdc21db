use thiserror::Error;

/// Application-wide error types for lede.
///
/// These never reach callers of [`crate::Coordinator::resolve`]; the fetcher
/// and cache absorb them into a [`crate::FetchOutcome`]. They surface from
/// transports, stores, configuration and id validation.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Document identifier rejected before use.
    #[error("Invalid document id: {0}")]
    InvalidDocumentId(String),

    /// Key-value store read or write failed.
    #[error("Store error: {0}")]
    StoreError(String),

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
