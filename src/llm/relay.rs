//! Primary delegation provider
//!
//! POSTs the chat turn to a generic HTTP relay (e.g. an n8n webhook) that
//! itself may call any backing provider. The relay's response schema is not
//! fixed, so reply extraction tries an ordered list of conventional field
//! names and, when none yields text, falls back to serializing the whole
//! payload as the reply.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::{ProviderError, ReplyProvider, Result, TurnRequest};
use crate::config::RelayConfig;

/// Reply fields tried in priority order; first non-empty string wins
const REPLY_FIELDS: &[&str] = &["response", "output", "text"];

pub struct RelayProvider {
    webhook_url: String,
    client: Client,
}

impl RelayProvider {
    pub fn new(config: &RelayConfig, timeout: Duration) -> Self {
        Self {
            webhook_url: config.webhook_url.clone(),
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl ReplyProvider for RelayProvider {
    fn name(&self) -> &str {
        "relay"
    }

    async fn complete(&self, request: &TurnRequest) -> Result<String> {
        let payload = json!({
            "message": request.message,
            "history": request.history,
            "model": request.model,
        });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http { status, body });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(extract_reply(&data))
    }
}

/// Pull the reply text out of a loosely-schemed relay response.
///
/// Tries each known field in order; a field counts only when it holds a
/// non-empty string. When nothing matches the entire payload is returned
/// serialized, so the caller always gets some reply text.
pub fn extract_reply(data: &Value) -> String {
    for field in REPLY_FIELDS {
        if let Some(text) = data.get(field).and_then(|v| v.as_str()) {
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }
    data.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> TurnRequest {
        TurnRequest {
            message: "what is phishing?".to_string(),
            history: vec![ChatMessage::user("what is phishing?")],
            model: "openai/gpt-4o".to_string(),
        }
    }

    fn provider(url: &str) -> RelayProvider {
        RelayProvider::new(
            &RelayConfig {
                webhook_url: format!("{url}/webhook/cyber-chat"),
            },
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_extract_reply_field_priority() {
        let data = json!({"output": "second", "response": "first"});
        assert_eq!(extract_reply(&data), "first");

        let data = json!({"text": "third", "output": "second"});
        assert_eq!(extract_reply(&data), "second");

        let data = json!({"text": "third"});
        assert_eq!(extract_reply(&data), "third");
    }

    #[test]
    fn test_extract_reply_skips_empty_and_non_string() {
        let data = json!({"response": "", "output": "fallback"});
        assert_eq!(extract_reply(&data), "fallback");

        let data = json!({"response": 42, "text": "text wins"});
        assert_eq!(extract_reply(&data), "text wins");
    }

    #[test]
    fn test_extract_reply_serializes_unknown_payload() {
        let data = json!({"unexpected": {"shape": true}});
        assert_eq!(extract_reply(&data), data.to_string());
    }

    #[tokio::test]
    async fn test_complete_posts_turn_and_extracts_reply() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/webhook/cyber-chat"))
            .and(body_partial_json(json!({
                "message": "what is phishing?",
                "model": "openai/gpt-4o",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "reply"})))
            .expect(1)
            .mount(&server)
            .await;

        let reply = provider(&server.uri()).complete(&request()).await.unwrap();
        assert_eq!(reply, "reply");
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("relay exploded"))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).complete(&request()).await.unwrap_err();
        match err {
            ProviderError::Http { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "relay exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
