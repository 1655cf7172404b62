//! # Regreport
//!
//! Reads user-registration records from a document database and turns
//! them into a sorted table with a per-day registration count.
//!
//! ## Modules
//!
//! - [`report`]: Registration report builder (formatting, sorting, day counts)
//! - [`source`]: Document sources (Firestore REST, JSON export, in-memory)
//! - [`loader`]: One-shot load with an observable state
//! - [`render`]: Table, summary, JSON and CSV output
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use regreport::{FirestoreConfig, FirestoreSource, ReportLoader, ReportSettings};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = FirestoreSource::new(FirestoreConfig {
//!         project_id: "my-project".to_string(),
//!         api_key: Some("my-key".to_string()),
//!         ..Default::default()
//!     })?;
//!
//!     let loader = ReportLoader::new(Arc::new(source), ReportSettings::default());
//!     let report = loader.load().await?;
//!
//!     for (day, count) in report.counts.iter() {
//!         println!("{}: {}", day, count);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod loader;
pub mod render;
pub mod report;
pub mod source;

// Re-export top-level types for convenience
pub use report::{
    build_report, DateFormatter, DayCounts, FieldNames, FormatError, Locale, RawRegistrationRecord,
    Report, ReportRow, TimeZoneSetting, INVALID_DATE,
};

pub use source::{
    Document, DocumentSource, FirestoreConfig, FirestoreSource, InMemorySource, JsonFileSource,
    SourceError,
};

pub use loader::{LoadError, LoadState, ReportLoader, ReportSettings};

pub use config::{Config, ConfigError, LoggingConfig, ReportConfig, SourceConfig};
