//! Data Sources
//!
//! The report reads from anything that can list the documents of a named
//! collection:
//! - Firestore (REST API)
//! - JSON export files
//! - In-memory collections (tests, demos)

mod firestore;
mod json_file;
mod memory;

pub use firestore::{FirestoreConfig, FirestoreSource};
pub use json_file::JsonFileSource;
pub use memory::InMemorySource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Common trait for all document sources
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// List every document in `collection`, in source order
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, SourceError>;
}

/// One document: an opaque key and an untyped field map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Build a document from a JSON object; anything else gives no fields
    pub fn new(id: impl Into<String>, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Errors that can occur while reading from a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Data source unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Decode(err.to_string())
    }
}
