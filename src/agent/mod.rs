//! Agent runtime: agent identity plus the [`Runner`] that executes one
//! user message against a session.
//!
//! A turn goes: append the user message, call the model, and while the
//! model asks for tools, dispatch them through the agent's
//! [`ToolRegistry`] and feed the results back.  Every step is appended to
//! the session as an [`Event`]; all but the user message are also streamed
//! to the caller.

use std::pin::Pin;
use std::sync::Arc;

use anyhow::Context;
use futures_core::Stream;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::models::{Content, FunctionCallItem, ModelProvider, Part, ProviderResponse};
use crate::session::{Event, InMemorySessionService, USER_AUTHOR};
use crate::tools::ToolRegistry;

/// Tool rounds allowed per turn before the runner gives up.
pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 5;

/// Stream of events produced by [`Runner::run_async`].
pub type EventStream<'a> = Pin<Box<dyn Stream<Item = anyhow::Result<Event>> + Send + 'a>>;

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// A named model + instruction + tool set.
pub struct Agent {
    pub name: String,
    pub model: String,
    pub description: String,
    pub instruction: String,
    pub tools: ToolRegistry,
    pub max_tool_iterations: usize,
    provider: Arc<dyn ModelProvider>,
}

impl Agent {
    /// Create an agent with no tools; `model` is taken from the provider.
    pub fn new(name: impl Into<String>, provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            name: name.into(),
            model: provider.model_id().to_string(),
            description: String::new(),
            instruction: String::new(),
            tools: ToolRegistry::new(),
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            provider,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = n;
        self
    }

    /// Run one tool call.  Failures become `{"error": ...}` so the model
    /// can see them; the turn itself keeps going.
    async fn dispatch(&self, call: &FunctionCallItem) -> Value {
        let timer = std::time::Instant::now();
        let result = self.tools.call_tool(&call.name, call.arguments.clone()).await;
        let elapsed_ms = timer.elapsed().as_millis() as u64;
        match result {
            Ok(v) => {
                debug!(agent = %self.name, tool = %call.name, elapsed_ms, "tool call completed");
                as_response_object(v)
            }
            Err(e) => {
                warn!(agent = %self.name, tool = %call.name, error = %e, "tool call failed");
                json!({ "error": e.to_string() })
            }
        }
    }
}

/// Function responses must be JSON objects; wrap anything else.
fn as_response_object(v: Value) -> Value {
    if v.is_object() {
        v
    } else {
        json!({ "result": v })
    }
}

/// Reply used when the model is still asking for tools after the last
/// allowed round.
fn exhausted_reply(response: &ProviderResponse) -> String {
    match response {
        ProviderResponse::Final(text) => text.clone(),
        ProviderResponse::FunctionCall { name, arguments, .. } => {
            format!("[tool loop exhausted] last call: {}({})", name, arguments)
        }
        ProviderResponse::MultiFunctionCall(calls) => {
            let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
            format!("[tool loop exhausted] last calls: {}", names.join(", "))
        }
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Binds an agent to an app name and a session store.
pub struct Runner {
    agent: Arc<Agent>,
    app_name: String,
    session_service: Arc<InMemorySessionService>,
}

impl Runner {
    pub fn new(
        agent: Arc<Agent>,
        app_name: impl Into<String>,
        session_service: Arc<InMemorySessionService>,
    ) -> Self {
        Self {
            agent,
            app_name: app_name.into(),
            session_service,
        }
    }

    pub fn session_service(&self) -> &Arc<InMemorySessionService> {
        &self.session_service
    }

    async fn record(&self, user_id: &str, session_id: &str, event: &Event) -> anyhow::Result<()> {
        self.session_service
            .append_event(&self.app_name, user_id, session_id, event.clone())
            .await
    }

    /// Run one user message through the agent.
    ///
    /// The session must already exist.  The stream ends after the first
    /// final response; errors from the model end it early.
    pub fn run_async<'a>(
        &'a self,
        user_id: &'a str,
        session_id: &'a str,
        new_message: Content,
    ) -> EventStream<'a> {
        Box::pin(async_stream::try_stream! {
            let agent = &self.agent;
            let session = self
                .session_service
                .get_session(&self.app_name, user_id, session_id)
                .await
                .ok_or_else(|| anyhow::anyhow!(
                    "session not found: {}/{user_id}/{session_id}", self.app_name
                ))?;

            let invocation_id = format!("inv_{}", uuid::Uuid::new_v4().simple());
            info!(
                agent = %agent.name,
                session = session_id,
                invocation = %invocation_id,
                "turn started"
            );

            let mut contents = session.contents();
            contents.push(new_message.clone());
            // recorded, not streamed back to the caller
            let user_event = Event::new(&invocation_id, USER_AUTHOR, new_message);
            self.record(user_id, session_id, &user_event).await?;

            let functions = agent.tools.function_declarations();
            let mut rounds = 0usize;

            loop {
                let (response, usage) = agent
                    .provider
                    .send_chat_with_functions(&agent.instruction, &contents, &functions)
                    .await
                    .context("model call failed")?;
                if let Some(u) = usage {
                    debug!(
                        agent = %agent.name,
                        prompt_tokens = u.prompt_tokens,
                        completion_tokens = u.completion_tokens,
                        total_tokens = u.total_tokens,
                        "token usage"
                    );
                }

                if let ProviderResponse::Final(text) = response {
                    let event = Event::new(&invocation_id, &agent.name, Content::model_text(text));
                    self.record(user_id, session_id, &event).await?;
                    info!(agent = %agent.name, rounds, "turn completed");
                    yield event;
                    break;
                }

                if rounds >= agent.max_tool_iterations {
                    let reply = exhausted_reply(&response);
                    warn!(agent = %agent.name, rounds, "tool loop exhausted");
                    let event = Event::new(&invocation_id, &agent.name, Content::model_text(reply));
                    self.record(user_id, session_id, &event).await?;
                    yield event;
                    break;
                }
                rounds += 1;

                let calls = response.into_calls();
                let call_content = Content::new(
                    "model",
                    calls
                        .iter()
                        .map(|c| Part::FunctionCall {
                            id: c.id.clone(),
                            name: c.name.clone(),
                            args: c.arguments.clone(),
                        })
                        .collect(),
                );
                contents.push(call_content.clone());
                let call_event = Event::new(&invocation_id, &agent.name, call_content);
                self.record(user_id, session_id, &call_event).await?;
                yield call_event;

                let mut responses = Vec::with_capacity(calls.len());
                for call in &calls {
                    let response = agent.dispatch(call).await;
                    responses.push(Part::FunctionResponse {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        response,
                    });
                }
                let response_content = Content::new("user", responses);
                contents.push(response_content.clone());
                let response_event = Event::new(&invocation_id, &agent.name, response_content);
                self.record(user_id, session_id, &response_event).await?;
                yield response_event;
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
