//! In-memory document source

use super::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed collections held in memory.
///
/// Unknown collections list as empty, like Firestore does.
#[derive(Debug, Default)]
pub struct InMemorySource {
    collections: HashMap<String, Vec<Document>>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a collection
    pub fn with_collection(mut self, name: &str, documents: Vec<Document>) -> Self {
        self.collections.insert(name.to_string(), documents);
        self
    }

    /// Make every listing fail with the given message
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Number of `list_documents` calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSource for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            return Err(SourceError::Api {
                status: 503,
                message: message.clone(),
            });
        }

        Ok(self.collections.get(collection).cloned().unwrap_or_default())
    }
}
