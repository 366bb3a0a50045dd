//! Tool registry.
//!
//! A [`ToolRegistry`] tracks every tool an agent may call: its name,
//! description, JSON-Schema for its arguments, and the async handler
//! that runs it.  Each agent owns its registry; use
//! [`ToolRegistry::function_declarations`] to hand the catalogue to a
//! model and [`ToolRegistry::call_tool`] to dispatch a call.

pub mod builtins;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

// ── Tool metadata ────────────────────────────────────────────

/// Metadata describing a tool available to agents.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolMeta {
    /// Short machine-friendly name (e.g. `"retrieve_product_details_from_search"`).
    pub name: String,
    /// Human-readable description the model uses to decide when to call it.
    pub description: String,
    /// JSON Schema object describing the expected arguments.
    pub args_schema: Value,
}

/// Async handler function that tools register for dispatch.
pub type ToolHandler =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>> + Send + Sync>;

struct ToolEntry {
    meta: ToolMeta,
    handler: ToolHandler,
}

// ── Registry ─────────────────────────────────────────────────

#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool with its handler.
    ///
    /// Duplicate names are ignored (first registration wins); returns
    /// whether the tool was added.
    pub fn register(&mut self, meta: ToolMeta, handler: ToolHandler) -> bool {
        if self.entries.iter().any(|e| e.meta.name == meta.name) {
            warn!(tool = %meta.name, "tool already registered, ignoring duplicate");
            return false;
        }
        debug!(tool = %meta.name, "tool registered");
        self.entries.push(ToolEntry { meta, handler });
        true
    }

    /// Metadata for every registered tool, in registration order.
    pub fn list_tools(&self) -> Vec<ToolMeta> {
        self.entries.iter().map(|e| e.meta.clone()).collect()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.meta.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Function declarations in the `{name, description, parameters}`
    /// shape model APIs expect.
    pub fn function_declarations(&self) -> Vec<Value> {
        self.entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "name": e.meta.name,
                    "description": e.meta.description,
                    "parameters": e.meta.args_schema,
                })
            })
            .collect()
    }

    /// Call a registered tool by name.
    pub async fn call_tool(&self, name: &str, args: Value) -> anyhow::Result<Value> {
        let handler = self
            .entries
            .iter()
            .find(|e| e.meta.name == name)
            .map(|e| Arc::clone(&e.handler))
            .ok_or_else(|| anyhow::anyhow!("unknown tool: {name}"))?;
        handler(args).await
    }
}
