//! `retrieve_product_details_from_search`: look up products in the
//! Vertex AI Search data store and render title + image URL per hit.
//!
//! Every outcome is a `String`: the rendered list, or one of three fixed
//! messages (empty query, no results, backend error).  Backend errors are
//! logged and folded into the returned text; nothing propagates to the
//! agent as an error.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error};

use crate::search::{struct_field, SearchBackend, SearchRequest};
use crate::tools::{ToolMeta, ToolRegistry};

pub const TOOL_NAME: &str = "retrieve_product_details_from_search";

/// Page size used when the caller gives none.
pub const DEFAULT_MAX_RESULTS: i32 = 10;

pub const EMPTY_QUERY_MESSAGE: &str = "Please provide a query to search for product details.";
pub const NO_RESULTS_MESSAGE: &str =
    "No relevant product details found in the data store for your query.";
pub const ERROR_PREFIX: &str = "An error occurred while searching for product details: ";
pub const FOUND_HEADER: &str = "Found the following product details:\n\n";
pub const BLOCK_SEPARATOR: &str = "\n---\n";

/// Payload key holding the product title.
pub const TITLE_KEY: &str = "title_y";
/// Payload key holding the main product image.
pub const IMAGE_URL_KEY: &str = "main_image_url";

/// The product lookup bound to one serving config and backend.
#[derive(Clone)]
pub struct ProductSearch {
    backend: Arc<dyn SearchBackend>,
    serving_config: String,
}

impl ProductSearch {
    pub fn new(backend: Arc<dyn SearchBackend>, serving_config: impl Into<String>) -> Self {
        Self {
            backend,
            serving_config: serving_config.into(),
        }
    }

    pub fn serving_config(&self) -> &str {
        &self.serving_config
    }

    /// Search for `query` and render up to `max_results` products.
    pub async fn retrieve_product_details_from_search(&self, query: &str, max_results: i32) -> String {
        if query.is_empty() {
            return EMPTY_QUERY_MESSAGE.to_string();
        }

        let request = SearchRequest {
            serving_config: self.serving_config.clone(),
            query: query.to_string(),
            page_size: max_results,
        };

        let response = match self.backend.search(&request).await {
            Ok(r) => r,
            Err(e) => {
                error!(
                    backend = self.backend.backend_name(),
                    error = %e,
                    "product search failed"
                );
                return format!("{ERROR_PREFIX}{e}");
            }
        };

        let limit = usize::try_from(max_results)
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(usize::MAX);

        let blocks: Vec<String> = response
            .results
            .iter()
            .take(limit)
            .map(|result| {
                let payload = result.document.as_ref().and_then(|d| d.payload());
                render_block(
                    &struct_field(payload, TITLE_KEY),
                    &struct_field(payload, IMAGE_URL_KEY),
                )
            })
            .collect();

        debug!(
            query = %query,
            page_size = max_results,
            rendered = blocks.len(),
            "product search completed"
        );

        render_summary(&blocks)
    }
}

/// One product as the agent sees it.
pub fn render_block(title: &str, image_url: &str) -> String {
    format!("Title: {title}\nImage URL: {image_url}\n")
}

/// Header plus separator-joined blocks, or the no-results message.
pub fn render_summary(blocks: &[String]) -> String {
    if blocks.is_empty() {
        return NO_RESULTS_MESSAGE.to_string();
    }
    format!("{FOUND_HEADER}{}", blocks.join(BLOCK_SEPARATOR))
}

/// Decode `max_results` from tool-call arguments.
///
/// Models sometimes send integers as floats (`3.0`); integral floats are
/// accepted, anything else falls back to [`DEFAULT_MAX_RESULTS`].
fn max_results_arg(args: &Value) -> i32 {
    let v = &args["max_results"];
    v.as_i64()
        .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        .and_then(|n| i32::try_from(n).ok())
        .unwrap_or(DEFAULT_MAX_RESULTS)
}

/// Tool-call entry point: decode arguments and wrap the summary.
pub async fn call(search: &ProductSearch, args: Value) -> anyhow::Result<Value> {
    let query = args["query"].as_str().unwrap_or_default();
    let max_results = max_results_arg(&args);
    let summary = search
        .retrieve_product_details_from_search(query, max_results)
        .await;
    Ok(json!({ "result": summary }))
}

pub fn meta() -> ToolMeta {
    ToolMeta {
        name: TOOL_NAME.into(),
        description: "Searches the Vertex AI Search data store for products relevant to the query \
            and retrieves their titles and image URLs. Useful when the user asks for product \
            details that include visuals or specific product names. Returns a formatted list of \
            titles and image URLs, or a message if nothing was found."
            .into(),
        args_schema: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query, e.g. \"laptops with good battery life\" or \"images of product XYZ\"."
                },
                "max_results": {
                    "type": "integer",
                    "description": "The maximum number of product details to retrieve. Defaults to 10."
                }
            },
            "required": ["query"]
        }),
    }
}

/// Add the tool to `registry`, bound to `search`.
pub fn register(registry: &mut ToolRegistry, search: ProductSearch) -> bool {
    let search = Arc::new(search);
    registry.register(
        meta(),
        Arc::new(move |args| {
            let search = Arc::clone(&search);
            Box::pin(async move { call(&search, args).await })
        }),
    )
}
