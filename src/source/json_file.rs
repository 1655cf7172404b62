//! JSON Export Source
//!
//! Reads a collection from a JSON export file. Two layouts are accepted:
//!
//! ```json
//! [{"id": "a", "dni": "111", "registrationDate": "2024-01-05T10:00:00Z"}]
//! ```
//!
//! ```json
//! {"a": {"dni": "111", "registrationDate": "2024-01-05T10:00:00Z"}}
//! ```

use super::*;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Document source backed by a JSON file
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the file contents into documents
    pub fn parse(content: &str) -> Result<Vec<Document>, SourceError> {
        let value: Value = serde_json::from_str(content)?;

        match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| {
                    let Value::Object(mut fields) = item else {
                        return Err(SourceError::Decode(format!(
                            "entry {} is not an object",
                            idx
                        )));
                    };
                    let id = match fields.shift_remove("id") {
                        Some(Value::String(id)) => id,
                        Some(Value::Number(n)) => n.to_string(),
                        _ => {
                            return Err(SourceError::Decode(format!(
                                "entry {} has no string id",
                                idx
                            )))
                        }
                    };
                    Ok(Document { id, fields })
                })
                .collect(),
            Value::Object(map) => Ok(map
                .into_iter()
                .map(|(id, fields)| Document::new(id, fields))
                .collect()),
            _ => Err(SourceError::Decode(
                "expected a JSON array or object at the top level".into(),
            )),
        }
    }
}

#[async_trait]
impl DocumentSource for JsonFileSource {
    fn name(&self) -> &str {
        "json-file"
    }

    /// The file holds a single collection, so `collection` is only logged
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, SourceError> {
        tracing::debug!(path = ?self.path, collection, "Reading JSON export");
        let content = tokio::fs::read_to_string(&self.path).await?;
        Self::parse(&content)
    }
}
