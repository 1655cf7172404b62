//! Report Loader
//!
//! Performs the one-shot read of the registration collection and publishes
//! the resulting [`Report`] through an observable [`LoadState`].
//!
//! The state is replaced in one assignment after the report has been fully
//! built, so readers see either the previous state or the complete new one.

use crate::report::{build_report, DateFormatter, FieldNames, RawRegistrationRecord, Report};
use crate::source::{DocumentSource, SourceError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Settings the loader needs beyond the source itself
#[derive(Debug, Clone)]
pub struct ReportSettings {
    /// Collection holding the registrations
    pub collection: String,
    pub fields: FieldNames,
    pub formatter: DateFormatter,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            collection: "users".to_string(),
            fields: FieldNames::default(),
            formatter: DateFormatter::default(),
        }
    }
}

/// Observable result of loading
#[derive(Debug, Clone, Default)]
pub enum LoadState {
    /// No load has completed yet
    #[default]
    NotLoaded,
    /// The last load succeeded
    Loaded(Arc<Report>),
    /// The last load failed; holds the reason
    Failed(String),
}

impl LoadState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded(_))
    }

    pub fn report(&self) -> Option<&Arc<Report>> {
        match self {
            LoadState::Loaded(report) => Some(report),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoadState::NotLoaded => "not_loaded",
            LoadState::Loaded(_) => "loaded",
            LoadState::Failed(_) => "failed",
        }
    }
}

/// Errors returned by [`ReportLoader::load`]
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to fetch '{collection}' from {source_name}: {error}")]
    Fetch {
        source_name: String,
        collection: String,
        #[source]
        error: SourceError,
    },
}

/// Loads registrations from an injected source and builds the report
pub struct ReportLoader {
    source: Arc<dyn DocumentSource>,
    settings: ReportSettings,
    state: Arc<RwLock<LoadState>>,
}

impl ReportLoader {
    pub fn new(source: Arc<dyn DocumentSource>, settings: ReportSettings) -> Self {
        Self {
            source,
            settings,
            state: Arc::new(RwLock::new(LoadState::NotLoaded)),
        }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    /// Snapshot of the current state
    pub async fn state(&self) -> LoadState {
        self.state.read().await.clone()
    }

    /// Fetch the collection once and rebuild the report.
    ///
    /// No retries and no timeout beyond the source's own. On failure the
    /// error is logged and recorded as [`LoadState::Failed`].
    pub async fn load(&self) -> Result<Arc<Report>, LoadError> {
        let collection = &self.settings.collection;
        let start = std::time::Instant::now();

        tracing::info!(source = self.source.name(), collection = %collection, "Loading registrations");

        let documents = match self.source.list_documents(collection).await {
            Ok(documents) => documents,
            Err(error) => {
                tracing::error!(
                    source = self.source.name(),
                    collection = %collection,
                    error = %error,
                    "Error fetching registrations"
                );
                let err = LoadError::Fetch {
                    source_name: self.source.name().to_string(),
                    collection: collection.clone(),
                    error,
                };
                *self.state.write().await = LoadState::Failed(err.to_string());
                return Err(err);
            }
        };

        let records = documents
            .into_iter()
            .map(|doc| RawRegistrationRecord::from_document(doc, &self.settings.fields));
        let report = Arc::new(build_report(records, &self.settings.formatter));

        tracing::info!(
            rows = report.len(),
            days = report.counts.len(),
            invalid = report.invalid_rows(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Registration report built"
        );

        *self.state.write().await = LoadState::Loaded(Arc::clone(&report));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Document, InMemorySource};
    use serde_json::json;

    fn users() -> Vec<Document> {
        vec![
            Document::new("a", json!({"dni": "111", "registrationDate": "2024-01-05T10:00:00Z"})),
            Document::new("b", json!({"dni": "222", "registrationDate": "2024-01-05T09:00:00Z"})),
            Document::new("c", json!({"dni": "333", "registrationDate": "2024-01-06T08:00:00Z"})),
        ]
    }

    #[tokio::test]
    async fn test_initial_state_is_not_loaded() {
        let source = Arc::new(InMemorySource::new());
        let loader = ReportLoader::new(source.clone(), ReportSettings::default());

        assert!(matches!(loader.state().await, LoadState::NotLoaded));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_successful_load() {
        let source = Arc::new(InMemorySource::new().with_collection("users", users()));
        let loader = ReportLoader::new(source.clone(), ReportSettings::default());

        let report = loader.load().await.unwrap();
        let ids: Vec<_> = report.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(report.counts.get("January 5, 2024"), Some(2));
        assert_eq!(source.calls(), 1);

        let state = loader.state().await;
        assert_eq!(state.label(), "loaded");
        assert_eq!(state.report().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_load() {
        let source = Arc::new(InMemorySource::new().failing("permission denied"));
        let loader = ReportLoader::new(source, ReportSettings::default());

        let err = loader.load().await.unwrap_err();
        assert!(err.to_string().contains("permission denied"));

        match loader.state().await {
            LoadState::Failed(reason) => assert!(reason.contains("users")),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_custom_collection_and_fields() {
        let source = Arc::new(InMemorySource::new().with_collection(
            "signups",
            vec![Document::new("x", json!({"nid": 5, "createdAt": 1704448800000i64}))],
        ));
        let settings = ReportSettings {
            collection: "signups".to_string(),
            fields: FieldNames {
                identity: "nid".to_string(),
                timestamp: "createdAt".to_string(),
            },
            ..Default::default()
        };
        let loader = ReportLoader::new(source, settings);

        let report = loader.load().await.unwrap();
        assert_eq!(report.rows[0].identity, "5");
        assert_eq!(report.rows[0].date, "January 5, 2024");
        assert_eq!(report.rows[0].time, "10:00:00 AM");
    }

    #[tokio::test]
    async fn test_empty_collection_loads() {
        let loader = ReportLoader::new(Arc::new(InMemorySource::new()), ReportSettings::default());
        let report = loader.load().await.unwrap();
        assert!(report.is_empty());
        assert!(loader.state().await.is_loaded());
    }
}
