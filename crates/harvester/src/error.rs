//! Error types for the harvesting pipeline

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarvestError>;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Catalog returned HTTP {status} for {uri}")]
    Status { status: u16, uri: String },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid MARC-XML: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("Invalid base64 MARC payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("MARC payload is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Record {0} carries no MARC payload")]
    MissingPayload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid harvest operation: {0}")]
    InvalidOperation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Commit failed: {0}")]
    Commit(String),
}
