//! Model provider abstractions.
//!
//! Defines the [`ModelProvider`] trait, the [`Content`] / [`Part`]
//! conversation representation shared with [`crate::session`], the
//! function-calling aware [`ProviderResponse`], and the concrete
//! [`GeminiProvider`].

pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use gemini::GeminiProvider;

// ---------------------------------------------------------------------------
// Content – shared message representation
// ---------------------------------------------------------------------------

/// One piece of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    /// The model asks for a tool to run.
    FunctionCall {
        /// Call id; synthesised when the API does not return one.
        id: String,
        name: String,
        args: Value,
    },
    /// The result of a tool run, answering the call with the same id.
    FunctionResponse {
        id: String,
        name: String,
        response: Value,
    },
}

/// A message: a role (`"user"` or `"model"`) and its parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            role: role.into(),
            parts,
        }
    }

    /// A user message with a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new("user", vec![Part::Text(text.into())])
    }

    /// A model message with a single text part.
    pub fn model_text(text: impl Into<String>) -> Self {
        Self::new("model", vec![Part::Text(text.into())])
    }

    /// Concatenation of all text parts (empty when there are none).
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn function_calls(&self) -> impl Iterator<Item = &Part> {
        self.parts
            .iter()
            .filter(|p| matches!(p, Part::FunctionCall { .. }))
    }

    pub fn has_function_parts(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, Part::FunctionCall { .. } | Part::FunctionResponse { .. }))
    }
}

// ---------------------------------------------------------------------------
// ProviderResponse – function-calling aware response
// ---------------------------------------------------------------------------

/// Token usage statistics returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// A single function call within a multi-call response.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallItem {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Response from a model that may be a final text reply or a function call.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResponse {
    /// Plain text reply from the model.
    Final(String),
    /// The model wants to invoke a single function.
    FunctionCall {
        id: String,
        name: String,
        arguments: Value,
    },
    /// The model wants to invoke several functions in one step.
    MultiFunctionCall(Vec<FunctionCallItem>),
}

impl ProviderResponse {
    /// Build from a list of calls: one → `FunctionCall`, several →
    /// `MultiFunctionCall`, none → `None`.
    pub fn from_calls(mut calls: Vec<FunctionCallItem>) -> Option<Self> {
        match calls.len() {
            0 => None,
            1 => {
                let item = calls.remove(0);
                Some(ProviderResponse::FunctionCall {
                    id: item.id,
                    name: item.name,
                    arguments: item.arguments,
                })
            }
            _ => Some(ProviderResponse::MultiFunctionCall(calls)),
        }
    }

    /// Flatten into the list of calls (empty for `Final`).
    pub fn into_calls(self) -> Vec<FunctionCallItem> {
        match self {
            ProviderResponse::Final(_) => Vec::new(),
            ProviderResponse::FunctionCall { id, name, arguments } => {
                vec![FunctionCallItem { id, name, arguments }]
            }
            ProviderResponse::MultiFunctionCall(calls) => calls,
        }
    }
}

// ---------------------------------------------------------------------------
// ModelProvider trait
// ---------------------------------------------------------------------------

/// Trait implemented by every LLM backend.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Model id this provider sends requests for.
    fn model_id(&self) -> &str;

    /// Send a conversation plus function declarations; the reply is
    /// either final text or one or more function calls.
    async fn send_chat_with_functions(
        &self,
        system_instruction: &str,
        contents: &[Content],
        functions: &[Value],
    ) -> Result<(ProviderResponse, Option<TokenUsage>), anyhow::Error>;
}

/// Generate a short pseudo-random id for function calls the API left
/// unnamed.
pub fn synthetic_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}
