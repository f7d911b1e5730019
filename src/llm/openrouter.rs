//! Direct OpenRouter fallback provider
//!
//! Used only after the relay attempt fails. Builds its own message list —
//! the fixed persona system prompt, then the bounded history window, then
//! the new user message unless it is already the window's last entry — and
//! calls the chat completions endpoint with bounded output and a fixed
//! sampling temperature.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::{ChatMessage, ChatRole, ProviderError, ReplyProvider, Result, TurnRequest};
use crate::config::OpenRouterConfig;

/// Persona, language, and tone constraints for the direct fallback call
const SYSTEM_PROMPT: &str = "คุณคือ CyberGuard ผู้ช่วย AI ด้านความปลอดภัยทางไซเบอร์ที่เป็นมิตรและเข้าถึงได้ง่าย ภารกิจของคุณคือช่วยให้คนทั่วไปชาวไทยเข้าใจเรื่องความปลอดภัยทางไซเบอร์

กฎการตอบ:
- ตอบเป็นภาษาไทยเสมอ ไม่ว่าผู้ใช้จะถามเป็นภาษาอะไรก็ตาม
- อธิบายทุกอย่างด้วยภาษาไทยง่ายๆ ที่คนทั่วไปเข้าใจได้ ไม่ใช้ศัพท์เทคนิค
- หากต้องใช้คำศัพท์เทคนิค ให้อธิบายความหมายทันทีด้วยภาษาที่เข้าใจง่าย
- ใช้การเปรียบเทียบกับสิ่งของในชีวิตประจำวัน เช่น ประตูบ้าน กุญแจ ตู้จดหมาย
- พูดด้วยน้ำเสียงที่อบอุ่น เป็นกันเอง และให้กำลังใจ เพราะความปลอดภัยทางไซเบอร์อาจดูน่ากลัว
- ตอบให้กระชับ (2-4 ย่อหน้า เว้นแต่ผู้ใช้ต้องการรายละเอียดเพิ่มเติม)
- เมื่อให้คำแนะนำ ให้ใช้ขั้นตอนที่ชัดเจนและปฏิบัติได้จริง
- หากมีคำถามเกี่ยวกับสิ่งผิดกฎหมายหรืออันตราย ปฏิเสธอย่างสุภาพและเปลี่ยนเรื่อง
- ส่งเสริมนิสัยความปลอดภัยที่ดีโดยไม่ตัดสินผู้ใช้";

/// Reply used when the completion comes back without content
const APOLOGY: &str = "I apologize, but I could not generate a response. Please try again.";

const MAX_TOKENS: u32 = 1024;
const TEMPERATURE: f64 = 0.7;

pub struct OpenRouterProvider {
    config: OpenRouterConfig,
    api_key: Option<String>,
    client: Client,
}

impl OpenRouterProvider {
    pub fn new(config: OpenRouterConfig, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            config,
            api_key,
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Construct with the API key from the `OPENROUTER_API_KEY` env var
    pub fn from_env(config: OpenRouterConfig, timeout: Duration) -> Self {
        let api_key = std::env::var("OPENROUTER_API_KEY").ok().filter(|k| !k.is_empty());
        Self::new(config, api_key, timeout)
    }

    /// Assemble the completion message list.
    ///
    /// The new user message is appended only when the window's last entry is
    /// not already that exact text with the user role. The check is
    /// exact-string and role-sensitive on purpose: a window that diverges
    /// from the literal message (trimmed differently, say) gets the message
    /// appended again.
    fn build_messages(request: &TurnRequest) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        messages.extend(request.history.iter().cloned());

        let duplicated = messages
            .last()
            .map(|last| last.role == ChatRole::User && last.content == request.message)
            .unwrap_or(false);
        if !duplicated {
            messages.push(ChatMessage::user(request.message.clone()));
        }

        messages
    }
}

#[async_trait]
impl ReplyProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, request: &TurnRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Unavailable("OPENROUTER_API_KEY not set".to_string()))?;

        let messages = Self::build_messages(request);
        let payload = json!({
            "model": request.model,
            "messages": messages,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        });

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.app_title)
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

        let reply = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .unwrap_or(APOLOGY);

        Ok(reply.to_string())
    }
}
