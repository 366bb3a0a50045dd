//! The product recommendation agent: identity, its single search tool,
//! and the one-shot "ask a question, print the answer" flow.

use std::sync::Arc;

use tokio_stream::StreamExt;
use tracing::{debug, info};

use crate::agent::{Agent, Runner};
use crate::models::{Content, ModelProvider};
use crate::session::{InMemorySessionService, Session};
use crate::tools::builtins::product_search::{self, ProductSearch};
use crate::tools::ToolRegistry;

pub const AGENT_NAME: &str = "VertexAISearchAgent";
pub const AGENT_DESCRIPTION: &str =
    "An agent that provides product information by searching a Vertex AI Search data store.";
pub const AGENT_INSTRUCTION: &str = "You are a helpful assistant that give recommendations of products based on user query.
Recommend products based on query using tools provided to you to find information from internal documents.
take help from search_tool tool to retrieve customized information about title and image url of retrieved products,
at the end show title and image url to user
";

pub const APP_NAME: &str = "product_app";
pub const USER_ID: &str = "1234";
pub const SESSION_ID: &str = "session1234";

/// Build the agent with the product search tool as its only tool.
pub fn build_root_agent(provider: Arc<dyn ModelProvider>, search: ProductSearch) -> Agent {
    let mut tools = ToolRegistry::new();
    product_search::register(&mut tools, search);
    Agent::new(AGENT_NAME, provider)
        .with_description(AGENT_DESCRIPTION)
        .with_instruction(AGENT_INSTRUCTION)
        .with_tools(tools)
}

/// Fresh in-memory session store with the fixed session, plus a runner
/// bound to it.
pub async fn setup_session_and_runner(agent: Arc<Agent>) -> anyhow::Result<(Session, Runner)> {
    let session_service = Arc::new(InMemorySessionService::new());
    let session = session_service
        .create_session(APP_NAME, USER_ID, SESSION_ID)
        .await?;
    let runner = Runner::new(agent, APP_NAME, session_service);
    Ok((session, runner))
}

/// Send `query` to the agent and print the first final response.
///
/// Returns the final text, or `None` if the stream ended without one.
pub async fn call_agent_async(agent: Arc<Agent>, query: &str) -> anyhow::Result<Option<String>> {
    let (_session, runner) = setup_session_and_runner(agent).await?;
    let mut events = runner.run_async(USER_ID, SESSION_ID, Content::user_text(query));

    while let Some(event) = events.next().await {
        let event = event?;
        debug!(author = %event.author, event = %event.id, "event received");
        if event.is_final_response() {
            let text = event.text().unwrap_or_default();
            println!("final answer : {text}");
            info!(chars = text.len(), "final answer delivered");
            return Ok(Some(text));
        }
    }
    Ok(None)
}
