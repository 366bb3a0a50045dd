//! Search backend abstraction.
//!
//! Defines the request/response shapes shared by every backend, the
//! [`SearchBackend`] trait the product search tool is written against,
//! and [`struct_field`], the defaulting accessor for a document's
//! loosely-typed structured payload.

pub mod discovery_engine;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SearchError;

pub use discovery_engine::DiscoveryEngineClient;

/// Sentinel rendered for any field the payload does not provide.
pub const MISSING_FIELD: &str = "N/A";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One search call: where to send it, what to look for, how many to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Full serving-config resource name.
    pub serving_config: String,
    pub query: String,
    pub page_size: i32,
}

/// A matching document.  `struct_data` is whatever the data store's
/// ingested schema put there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub struct_data: Option<Value>,
}

impl Document {
    /// The structured payload as a map, or `None` when absent or not an object.
    pub fn payload(&self) -> Option<&Map<String, Value>> {
        self.struct_data.as_ref().and_then(Value::as_object)
    }
}

/// One ranked hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub document: Option<Document>,
}

/// The single page of results returned for a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub total_size: Option<i64>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// A hosted document search service.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Short name used in logs.
    fn backend_name(&self) -> &'static str;

    /// Run one search.  Implementations must not retry.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError>;
}

// ---------------------------------------------------------------------------
// Payload access
// ---------------------------------------------------------------------------

/// Read `key` from a structured payload as display text.
///
/// Strings are returned as-is, other JSON values in their compact JSON
/// form.  A missing payload, a missing key, or an explicit `null` all
/// yield [`MISSING_FIELD`].
pub fn struct_field(payload: Option<&Map<String, Value>>, key: &str) -> String {
    match payload.and_then(|p| p.get(key)) {
        None | Some(Value::Null) => MISSING_FIELD.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
