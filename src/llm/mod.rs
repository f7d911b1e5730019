//! Reply provider abstraction
//!
//! A chat turn is answered by one of two interchangeable providers behind the
//! `ReplyProvider` trait: the delegation relay (primary) and the direct
//! OpenRouter call (fallback). The orchestrator drives the failover between
//! them; providers only know how to turn a `TurnRequest` into reply text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::sessions::{MessageRecord, MessageRole};

pub mod catalog;
pub mod context;
pub mod openrouter;
pub mod orchestrator;
pub mod relay;

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors from a single provider attempt
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Provider returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Role of a message on the provider wire
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::System => write!(f, "system"),
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Message in a provider payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&MessageRecord> for ChatMessage {
    fn from(record: &MessageRecord) -> Self {
        Self {
            role: match record.role {
                MessageRole::User => ChatRole::User,
                MessageRole::Assistant => ChatRole::Assistant,
            },
            content: record.content.clone(),
        }
    }
}

/// One chat turn as seen by a provider: the new user message, the bounded
/// history window, and the already-resolved model identifier.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub message: String,
    pub history: Vec<ChatMessage>,
    pub model: String,
}

/// A provider capable of producing a reply for a chat turn
#[async_trait]
pub trait ReplyProvider: Send + Sync {
    /// Short provider name used in logs
    fn name(&self) -> &str;

    /// Produce the reply text for a turn
    async fn complete(&self, request: &TurnRequest) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_constructors() {
        let msg = ChatMessage::user("Hello");
        assert_eq!(msg.role, ChatRole::User);
        assert_eq!(msg.content, "Hello");

        assert_eq!(ChatMessage::assistant("Hi").role, ChatRole::Assistant);
        assert_eq!(ChatMessage::system("Be nice").role, ChatRole::System);
    }

    #[test]
    fn test_chat_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::user("x")).unwrap();
        assert!(json.contains(r#""role":"user""#));

        let json = serde_json::to_string(&ChatMessage::system("x")).unwrap();
        assert!(json.contains(r#""role":"system""#));
    }

    #[test]
    fn test_from_message_record() {
        let record = MessageRecord {
            id: 7,
            role: MessageRole::Assistant,
            content: "reply".to_string(),
            created_at: 100,
        };
        let msg = ChatMessage::from(&record);
        assert_eq!(msg.role, ChatRole::Assistant);
        assert_eq!(msg.content, "reply");
    }
}
