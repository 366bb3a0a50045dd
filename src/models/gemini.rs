//! Gemini `generateContent` provider with function calling.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    synthetic_call_id, Content, FunctionCallItem, ModelProvider, Part, ProviderResponse,
    TokenUsage,
};
use crate::config::ModelConfig;

/// Provider that talks to the Gemini REST API.
pub struct GeminiProvider {
    api_key: String,
    endpoint: String,
    model: String,
    client: Client,
}

impl GeminiProvider {
    /// Create a provider with explicit configuration.
    ///
    /// `endpoint` is the API base (e.g. `https://generativelanguage.googleapis.com`).
    pub fn with_config(api_key: String, endpoint: String, model: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            client,
        })
    }

    pub fn from_config(cfg: &ModelConfig) -> anyhow::Result<Self> {
        Self::with_config(cfg.api_key.clone(), cfg.endpoint.clone(), cfg.model.clone())
    }

    pub fn generate_url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Serialise one part into Gemini's camelCase part object.
fn serialize_part(part: &Part) -> Value {
    match part {
        Part::Text(t) => json!({ "text": t }),
        Part::FunctionCall { name, args, .. } => json!({
            "functionCall": { "name": name, "args": args }
        }),
        Part::FunctionResponse { name, response, .. } => json!({
            "functionResponse": { "name": name, "response": response }
        }),
    }
}

/// Serialise contents into the `contents` array of a request.
pub fn serialize_contents(contents: &[Content]) -> Vec<Value> {
    contents
        .iter()
        .map(|c| {
            json!({
                "role": c.role,
                "parts": c.parts.iter().map(serialize_part).collect::<Vec<_>>(),
            })
        })
        .collect()
}

/// Build the full `generateContent` request body.
pub fn build_request_body(system_instruction: &str, contents: &[Content], functions: &[Value]) -> Value {
    let mut body = json!({ "contents": serialize_contents(contents) });
    if !system_instruction.trim().is_empty() {
        body["systemInstruction"] = json!({ "parts": [{ "text": system_instruction }] });
    }
    if !functions.is_empty() {
        body["tools"] = json!([{ "functionDeclarations": functions }]);
    }
    body
}

/// Extract `usageMetadata` from a response.
pub fn parse_token_usage(json: &Value) -> Option<TokenUsage> {
    let usage = json.get("usageMetadata")?;
    Some(TokenUsage {
        prompt_tokens: usage["promptTokenCount"].as_u64().unwrap_or(0),
        completion_tokens: usage["candidatesTokenCount"].as_u64().unwrap_or(0),
        total_tokens: usage["totalTokenCount"].as_u64().unwrap_or(0),
    })
}

/// Turn a `generateContent` response into a [`ProviderResponse`].
///
/// Function calls take precedence over text in the same candidate.
pub fn parse_response(json: &Value) -> anyhow::Result<ProviderResponse> {
    let Some(candidate) = json.get("candidates").and_then(|c| c.get(0)) else {
        let reason = json["promptFeedback"]["blockReason"]
            .as_str()
            .unwrap_or("no candidates");
        anyhow::bail!("Gemini returned no candidates ({reason})");
    };

    let parts = candidate["content"]["parts"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    let calls: Vec<FunctionCallItem> = parts
        .iter()
        .filter_map(|p| {
            let fc = p.get("functionCall")?;
            let name = fc.get("name")?.as_str()?.to_string();
            let id = fc
                .get("id")
                .and_then(|i| i.as_str())
                .filter(|s| !s.is_empty())
                .map(String::from)
                .unwrap_or_else(synthetic_call_id);
            Some(FunctionCallItem {
                id,
                name,
                arguments: fc.get("args").cloned().unwrap_or_else(|| json!({})),
            })
        })
        .collect();

    if let Some(resp) = ProviderResponse::from_calls(calls) {
        return Ok(resp);
    }

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    Ok(ProviderResponse::Final(text))
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn send_chat_with_functions(
        &self,
        system_instruction: &str,
        contents: &[Content],
        functions: &[Value],
    ) -> Result<(ProviderResponse, Option<TokenUsage>), anyhow::Error> {
        let body = build_request_body(system_instruction, contents, functions);

        let resp = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API returned {status}: {text}");
        }

        let json: Value = resp.json().await?;
        let usage = parse_token_usage(&json);
        let parsed = parse_response(&json)?;
        debug!(model = %self.model, usage = ?usage, "gemini call completed");
        Ok((parsed, usage))
    }
}
