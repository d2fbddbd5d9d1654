//! Telegram Bot API notifier.

use crate::models::{BotError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

/// Telegram rejects messages longer than this many characters.
const MAX_MESSAGE_CHARS: usize = 4096;

/// Destination for human-readable notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text` to the configured chat.
    async fn send_message(&self, text: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct TgResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends plain-text messages to a single chat.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a notifier for `chat_id` using the bot `token`.
    pub fn new(
        token: impl Into<String>,
        chat_id: impl Into<String>,
        api_base: impl Into<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.unwrap_or(30)))
            .build()
            .map_err(BotError::Client)?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        })
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }

    async fn send_chunk(&self, chunk: &str) -> std::result::Result<(), String> {
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": chunk,
        });

        // reqwest errors embed the URL, which carries the bot token.
        let response = self
            .client
            .post(self.send_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("sendMessage request failed: {}", e.without_url()))?;

        let status = response.status();
        let body: TgResponse = response.json().await.map_err(|e| {
            format!(
                "sendMessage returned HTTP {status} with unreadable body: {}",
                e.without_url()
            )
        })?;

        if !body.ok {
            return Err(body
                .description
                .unwrap_or_else(|| format!("sendMessage failed with HTTP {status}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            if let Err(reason) = self.send_chunk(&chunk).await {
                error!(chat_id = %self.chat_id, %reason, "Failed to send message to chat");
                return Err(BotError::SendMessage(reason));
            }
        }
        debug!(chat_id = %self.chat_id, "Message sent to chat");
        Ok(())
    }
}

/// Split `text` into pieces of at most `max_chars` characters.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}
