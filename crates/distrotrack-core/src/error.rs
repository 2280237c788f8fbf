//! Error types for the DistroTrack client core.

use thiserror::Error;

/// Main error type for core operations.
#[derive(Error, Debug)]
pub enum DistroError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<serde_json::Error> for DistroError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<toml::de::Error> for DistroError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, DistroError>;
