//! Discovery Engine (Vertex AI Search) REST client.
//!
//! Issues `POST {endpoint}/v1beta/{serving_config}:search` with a bearer
//! token and decodes the first page of results.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::{SearchBackend, SearchRequest, SearchResponse};
use crate::auth::TokenSource;
use crate::config::SearchConfig;
use crate::error::SearchError;

/// API version segment used for every call.
pub const API_VERSION: &str = "v1beta";

/// Search client bound to one data store.
pub struct DiscoveryEngineClient {
    endpoint: String,
    project_id: String,
    tokens: Box<dyn TokenSource>,
    client: Client,
}

impl DiscoveryEngineClient {
    /// Build a client for the endpoint and project in `config`.
    pub fn new(config: &SearchConfig, tokens: Box<dyn TokenSource>) -> Result<Self, SearchError> {
        // no total timeout; the service's own deadline applies
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            endpoint: config.api_endpoint.clone(),
            project_id: config.project_id.clone(),
            tokens,
            client,
        })
    }

    /// URL for the `:search` method of a serving config.
    pub fn search_url(&self, serving_config: &str) -> String {
        format!("{}/{API_VERSION}/{serving_config}:search", self.endpoint)
    }
}

/// Pull `error.message` out of a Google API error envelope, falling back
/// to the raw body.
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl SearchBackend for DiscoveryEngineClient {
    fn backend_name(&self) -> &'static str {
        "discovery-engine"
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let token = self.tokens.access_token().await?;
        let url = self.search_url(&request.serving_config);
        let body = json!({
            "query": request.query,
            "pageSize": request.page_size,
        });

        debug!(url = %url, page_size = request.page_size, "discovery engine search");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("x-goog-user-project", &self.project_id)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(SearchError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&text),
            });
        }

        let text = resp.text().await?;
        let parsed: SearchResponse =
            serde_json::from_str(&text).map_err(|e| SearchError::Malformed(e.to_string()))?;
        debug!(
            results = parsed.results.len(),
            total = ?parsed.total_size,
            "discovery engine search returned"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenSource;

    #[test]
    fn search_url_appends_method() {
        let cfg = SearchConfig::new("p", "global", "d");
        let c = DiscoveryEngineClient::new(&cfg, Box::new(StaticTokenSource::new("t"))).unwrap();
        assert_eq!(
            c.search_url(&cfg.serving_config),
            "https://discoveryengine.googleapis.com/v1beta/projects/p/locations/global/dataStores/d/servingConfigs/default_config:search"
        );
    }

    #[test]
    fn rejection_message_reads_google_envelope() {
        let body = r#"{"error":{"code":404,"message":"DataStore not found","status":"NOT_FOUND"}}"#;
        assert_eq!(rejection_message(body), "DataStore not found");
    }

    #[test]
    fn rejection_message_falls_back_to_body() {
        assert_eq!(rejection_message("  upstream timeout \n"), "upstream timeout");
    }
}
