//! Session abstraction: `Event`, `Session`, and `InMemorySessionService`.
//!
//! A session is the ordered event history of one conversation, keyed by
//! `(app_name, user_id, session_id)`.  Sessions live in process memory
//! only and vanish when the process exits.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::Content;

// ── Event ────────────────────────────────────────────────────

/// Author recorded on events that carry the user's message.
pub const USER_AUTHOR: &str = "user";

/// One entry in a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    /// Id shared by every event produced while answering one user message.
    pub invocation_id: String,
    /// `"user"` or the name of the agent that produced the event.
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(invocation_id: impl Into<String>, author: impl Into<String>, content: Content) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            invocation_id: invocation_id.into(),
            author: author.into(),
            content: Some(content),
            timestamp: Utc::now(),
        }
    }

    /// True when an agent-authored event carries content with no function
    /// calls or function responses.  User messages are never final.
    pub fn is_final_response(&self) -> bool {
        self.author != USER_AUTHOR
            && self
                .content
                .as_ref()
                .is_some_and(|c| !c.has_function_parts())
    }

    /// Text of the event's content, if any.
    pub fn text(&self) -> Option<String> {
        self.content.as_ref().map(Content::text)
    }
}

// ── Session ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    pub events: Vec<Event>,
    pub last_update_time: DateTime<Utc>,
}

impl Session {
    fn new(app_name: &str, user_id: &str, id: &str) -> Self {
        Self {
            id: id.to_string(),
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            events: Vec::new(),
            last_update_time: Utc::now(),
        }
    }

    /// Conversation contents in order, skipping events without content.
    pub fn contents(&self) -> Vec<Content> {
        self.events
            .iter()
            .filter_map(|e| e.content.clone())
            .collect()
    }
}

// ── InMemorySessionService ───────────────────────────────────

type SessionKey = (String, String, String);

fn key(app_name: &str, user_id: &str, session_id: &str) -> SessionKey {
    (app_name.to_string(), user_id.to_string(), session_id.to_string())
}

/// Process-local session store.
#[derive(Default)]
pub struct InMemorySessionService {
    sessions: RwLock<HashMap<SessionKey, Session>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty session.  Fails if the key is already taken.
    pub async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> anyhow::Result<Session> {
        let mut sessions = self.sessions.write().await;
        let k = key(app_name, user_id, session_id);
        if sessions.contains_key(&k) {
            anyhow::bail!("session already exists: {app_name}/{user_id}/{session_id}");
        }
        let session = Session::new(app_name, user_id, session_id);
        sessions.insert(k, session.clone());
        debug!(app = app_name, user = user_id, session = session_id, "session created");
        Ok(session)
    }

    /// Snapshot of a session, if it exists.
    pub async fn get_session(&self, app_name: &str, user_id: &str, session_id: &str) -> Option<Session> {
        self.sessions
            .read()
            .await
            .get(&key(app_name, user_id, session_id))
            .cloned()
    }

    /// Append `event` to an existing session.
    pub async fn append_event(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        event: Event,
    ) -> anyhow::Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&key(app_name, user_id, session_id))
            .ok_or_else(|| anyhow::anyhow!("session not found: {app_name}/{user_id}/{session_id}"))?;
        session.last_update_time = event.timestamp;
        session.events.push(event);
        Ok(())
    }
}
