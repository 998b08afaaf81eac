//! Request and response bodies for chat queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reference record attached to an answer
pub type Source = serde_json::Map<String, serde_json::Value>;

/// Inbound chat query (HTTP body or WebSocket frame)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The user's question
    #[serde(default)]
    pub query: String,
    /// Conversation identifier supplied by the client
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl ChatMessage {
    /// Create a message without a conversation id
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            conversation_id: None,
        }
    }

    /// The supplied conversation id, or a fresh one.
    ///
    /// Conversations never span requests; every message without an id starts a new one.
    pub fn conversation_id_or_new(&self) -> String {
        match self.conversation_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        }
    }

    /// True when the query has no visible characters
    pub fn is_blank(&self) -> bool {
        self.query.trim().is_empty()
    }
}

/// Response body for `POST /ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Status text ("Success" or the failure description)
    pub message: String,
    /// The generated answer, `null` on failure
    pub response: Option<String>,
    /// Conversation identifier
    pub conversation_id: String,
    /// When the response was produced
    pub timestamp: DateTime<Utc>,
    /// Reference records for the answer
    pub sources: Vec<Source>,
}
