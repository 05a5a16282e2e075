//! Error types shared across the harvester crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid logging setting {key}: {value}")]
    InvalidSetting { key: &'static str, value: String },

    #[error("Invalid filter directive: {0}")]
    FilterDirective(String),

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}
