//! Firestore REST Source
//!
//! Lists a collection through the Firestore REST API and decodes the typed
//! value envelopes (`stringValue`, `timestampValue`, ...) into plain JSON.

use super::*;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::BTreeMap;
use std::time::Duration;

/// Firestore REST client
pub struct FirestoreSource {
    client: Client,
    config: FirestoreConfig,
}

/// Configuration for the Firestore source
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// API root (e.g. "https://firestore.googleapis.com")
    pub base_url: String,
    pub project_id: String,
    /// Database id, "(default)" unless a named database is used
    pub database: String,
    /// Web API key, sent as the `key` query parameter
    pub api_key: Option<String>,
    /// OAuth bearer token
    pub bearer_token: Option<String>,
    /// Documents requested per page
    pub page_size: u32,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://firestore.googleapis.com".to_string(),
            project_id: String::new(),
            database: "(default)".to_string(),
            api_key: None,
            bearer_token: None,
            page_size: 300,
            request_timeout_secs: 30,
        }
    }
}

impl FirestoreSource {
    /// Create a new Firestore source
    pub fn new(config: FirestoreConfig) -> Result<Self, SourceError> {
        if config.project_id.is_empty() {
            return Err(SourceError::Config("Firestore project_id is empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("regreport/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/projects/{}/databases/{}/documents/{}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.project_id),
            self.config.database,
            encode_path(collection)
        )
    }

    /// Fetch one page of the collection
    async fn fetch_page(
        &self,
        url: &str,
        page_token: Option<&str>,
    ) -> Result<ListDocumentsResponse, SourceError> {
        let mut query: Vec<(&str, String)> = vec![("pageSize", self.config.page_size.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        if let Some(key) = &self.config.api_key {
            query.push(("key", key.clone()));
        }

        let mut request = self.client.get(url).query(&query);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout
            } else if e.is_connect() {
                SourceError::Unavailable
            } else {
                SourceError::Request(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let text = response.text().await.unwrap_or_default();
            return Err(SourceError::PermissionDenied(text));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Percent-encode each segment so subcollection paths keep their slashes
fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl DocumentSource for FirestoreSource {
    fn name(&self) -> &str {
        "firestore"
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, SourceError> {
        let url = self.collection_url(collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.fetch_page(&url, page_token.as_deref()).await?;
            tracing::debug!(
                collection,
                page_documents = page.documents.len(),
                "Fetched Firestore page"
            );

            for raw in page.documents {
                documents.push(raw.into_document()?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => {
                    if page_token.as_deref() == Some(token.as_str()) {
                        tracing::warn!(collection, token = %token, "Firestore repeated a page token, stopping");
                        break;
                    }
                    page_token = Some(token);
                }
                _ => break,
            }
        }

        Ok(documents)
    }
}

// ============================================
// Wire format
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    /// Full resource name, ending in `/{collection}/{id}`
    name: String,
    #[serde(default)]
    fields: BTreeMap<String, FirestoreValue>,
}

impl FirestoreDocument {
    fn into_document(self) -> Result<Document, SourceError> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SourceError::Decode(format!("bad document name: {}", self.name)))?
            .to_string();

        let fields = self
            .fields
            .into_iter()
            .map(|(key, value)| (key, value.into_json()))
            .collect();

        Ok(Document { id, fields })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
enum FirestoreValue {
    NullValue(Value),
    BooleanValue(bool),
    /// int64 travels as a decimal string
    IntegerValue(String),
    DoubleValue(Value),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(GeoPoint),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Deserialize)]
struct GeoPoint {
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ArrayValue {
    #[serde(default)]
    values: Vec<FirestoreValue>,
}

#[derive(Debug, Deserialize)]
struct MapValue {
    #[serde(default)]
    fields: BTreeMap<String, FirestoreValue>,
}

impl FirestoreValue {
    fn into_json(self) -> Value {
        match self {
            FirestoreValue::NullValue(_) => Value::Null,
            FirestoreValue::BooleanValue(b) => Value::Bool(b),
            FirestoreValue::IntegerValue(s) => s
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or(Value::String(s)),
            FirestoreValue::DoubleValue(v) => v,
            FirestoreValue::TimestampValue(s)
            | FirestoreValue::StringValue(s)
            | FirestoreValue::BytesValue(s)
            | FirestoreValue::ReferenceValue(s) => Value::String(s),
            FirestoreValue::GeoPointValue(p) => serde_json::json!({
                "latitude": p.latitude,
                "longitude": p.longitude,
            }),
            FirestoreValue::ArrayValue(a) => {
                Value::Array(a.values.into_iter().map(FirestoreValue::into_json).collect())
            }
            FirestoreValue::MapValue(m) => Value::Object(
                m.fields
                    .into_iter()
                    .map(|(key, value)| (key, value.into_json()))
                    .collect(),
            ),
        }
    }
}
