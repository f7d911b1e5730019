//! Response orchestration
//!
//! Per chat turn the orchestrator resolves the model once, persists the user
//! turn, builds the bounded context window, and then walks a two-state
//! failover: primary relay attempt, and on any failure exactly one direct
//! fallback attempt. Both attempts run under a request timeout. Failure of
//! both is terminal for the turn; the user's message stays persisted either
//! way.

use std::time::Duration;

use super::catalog;
use super::context::{context_window, DEFAULT_MAX_TURNS};
use super::{ChatMessage, ReplyProvider, TurnRequest};
use crate::db::sessions::{MessageRole, SessionRepository};
use crate::error::{Result, ServiceError};

/// Reply text plus the model that was resolved for the turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub model: String,
}

pub struct Orchestrator {
    primary: Box<dyn ReplyProvider>,
    fallback: Box<dyn ReplyProvider>,
    attempt_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        primary: Box<dyn ReplyProvider>,
        fallback: Box<dyn ReplyProvider>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            attempt_timeout,
        }
    }

    /// Obtain a reply: primary attempt, then at most one fallback attempt.
    pub async fn reply(&self, request: &TurnRequest) -> Result<String> {
        match tokio::time::timeout(self.attempt_timeout, self.primary.complete(request)).await {
            Ok(Ok(reply)) => {
                tracing::debug!(provider = self.primary.name(), "Primary attempt succeeded");
                return Ok(reply);
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    provider = self.primary.name(),
                    error = %e,
                    "Primary attempt failed, falling back"
                );
            }
            Err(_) => {
                tracing::warn!(
                    provider = self.primary.name(),
                    "Primary attempt timed out, falling back"
                );
            }
        }

        match tokio::time::timeout(self.attempt_timeout, self.fallback.complete(request)).await {
            Ok(Ok(reply)) => {
                tracing::info!(provider = self.fallback.name(), "Fallback attempt succeeded");
                Ok(reply)
            }
            Ok(Err(e)) => {
                tracing::error!(
                    provider = self.fallback.name(),
                    error = %e,
                    "Fallback attempt failed, turn exhausted"
                );
                Err(ServiceError::Exhausted)
            }
            Err(_) => {
                tracing::error!(
                    provider = self.fallback.name(),
                    "Fallback attempt timed out, turn exhausted"
                );
                Err(ServiceError::Exhausted)
            }
        }
    }
}

/// Chat turn coordination over the store and the provider chain
pub struct ChatService {
    sessions: SessionRepository,
    orchestrator: Orchestrator,
    default_model: String,
}

impl ChatService {
    pub fn new(sessions: SessionRepository, orchestrator: Orchestrator, default_model: String) -> Self {
        Self {
            sessions,
            orchestrator,
            default_model,
        }
    }

    /// Run one full chat turn.
    ///
    /// The user message is appended before any provider attempt, so a turn
    /// that exhausts both providers still leaves the question in the
    /// history. The assistant turn is appended only on success.
    pub async fn chat_turn(
        &self,
        session_id: &str,
        message: &str,
        requested_model: Option<&str>,
    ) -> Result<TurnOutcome> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or(ServiceError::NotFound("Session"))?;

        // Resolved once; both attempts use the same identifier
        let model = catalog::resolve(requested_model, &self.default_model);

        self.sessions
            .append_message(session_id, MessageRole::User, message)
            .await?;

        let history = self.sessions.history(session_id).await?;
        let window = context_window(&history, DEFAULT_MAX_TURNS);

        let request = TurnRequest {
            message: message.to_string(),
            history: window.iter().map(ChatMessage::from).collect(),
            model: model.clone(),
        };

        let reply = self.orchestrator.reply(&request).await?;

        self.sessions
            .append_message(session_id, MessageRole::Assistant, &reply)
            .await?;

        tracing::info!(session_id, model = %model, "Chat turn completed");

        Ok(TurnOutcome { reply, model })
    }
}
