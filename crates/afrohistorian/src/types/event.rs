//! Outbound WebSocket events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::chat::Source;

/// Event pushed to a client, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The assistant is working on a query
    Typing {
        message: String,
        conversation_id: String,
    },
    /// Complete answer for a query
    Response {
        message: String,
        response: Option<String>,
        conversation_id: String,
        timestamp: DateTime<Utc>,
        sources: Vec<Source>,
    },
    /// Query could not be processed
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conversation_id: Option<String>,
    },
    /// A streamed answer begins
    StreamStart { conversation_id: String },
    /// One increment of a streamed answer
    StreamChunk {
        text: String,
        conversation_id: String,
        is_final: bool,
    },
    /// A streamed answer completed
    StreamEnd {
        conversation_id: String,
        sources: Vec<Source>,
        timestamp: DateTime<Utc>,
    },
}

impl ServerEvent {
    pub fn typing(assistant: &str, conversation_id: &str) -> Self {
        Self::Typing {
            message: format!("{} is thinking...", assistant),
            conversation_id: conversation_id.to_string(),
        }
    }

    pub fn error(message: impl Into<String>, conversation_id: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            conversation_id: conversation_id.map(str::to_string),
        }
    }

    pub fn stream_chunk(text: impl Into<String>, conversation_id: &str) -> Self {
        Self::StreamChunk {
            text: text.into(),
            conversation_id: conversation_id.to_string(),
            is_final: false,
        }
    }

    pub fn stream_end(conversation_id: &str) -> Self {
        Self::StreamEnd {
            conversation_id: conversation_id.to_string(),
            sources: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Value of the `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Typing { .. } => "typing",
            Self::Response { .. } => "response",
            Self::Error { .. } => "error",
            Self::StreamStart { .. } => "stream_start",
            Self::StreamChunk { .. } => "stream_chunk",
            Self::StreamEnd { .. } => "stream_end",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stream_chunk_wire_format() {
        let value = serde_json::to_value(ServerEvent::stream_chunk("Timbuktu", "c-9")).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "stream_chunk",
                "text": "Timbuktu",
                "conversation_id": "c-9",
                "is_final": false
            })
        );
    }

    #[test]
    fn test_empty_query_error_has_no_conversation_id() {
        let value =
            serde_json::to_value(ServerEvent::error("Query cannot be empty", None)).unwrap();
        assert_eq!(value, json!({"type": "error", "message": "Query cannot be empty"}));
    }

    #[test]
    fn test_typing_message_uses_assistant_name() {
        let event = ServerEvent::typing("Afrohistorian", "c-1");
        assert_eq!(event.kind(), "typing");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["message"], "Afrohistorian is thinking...");
    }

    #[test]
    fn test_stream_end_fields() {
        let value = serde_json::to_value(ServerEvent::stream_end("c-2")).unwrap();
        assert_eq!(value["type"], "stream_end");
        assert_eq!(value["sources"], json!([]));
        assert!(value["timestamp"].is_string());
    }
}
