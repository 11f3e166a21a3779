//! Error types for medialog-core

use thiserror::Error;

/// Main error type for the medialog-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid analytics window
    #[error("invalid analytics window: {days} days")]
    InvalidWindow { days: i64 },
}

/// Result type alias for medialog-core
pub type Result<T> = std::result::Result<T, Error>;
