//! Error types for rwho-server

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// API error
    #[error("API error: {0}")]
    Api(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The report carried no session entries where some were required
    #[error("no data")]
    NoData,

    /// The `utmp` field could not be decoded into session entries
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Not found error
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),
}

impl CoreError {
    /// True for errors caused by the submitted payload rather than by storage.
    /// Both render as `error: no data` on the report endpoint.
    pub fn is_payload_error(&self) -> bool {
        matches!(self, CoreError::NoData | CoreError::MalformedPayload(_))
    }
}

/// Result type alias for Core operations
pub type Result<T> = std::result::Result<T, CoreError>;
