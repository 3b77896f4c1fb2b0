//! Telegram Bot API notifier

use super::ClientError;
use bonus_monitor_core::{MonitorError, Notifier, Result, TelegramConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Sends messages to one chat through `sendMessage`
pub struct TelegramNotifier {
    endpoint: String,
    chat_id: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl TelegramNotifier {
    /// Create a notifier; every send is bounded by `timeout`
    pub fn new(config: &TelegramConfig, timeout: Duration) -> Self {
        Self {
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
            client: reqwest::Client::new(),
            timeout,
        }
    }

    async fn send_message(&self, text: &str) -> std::result::Result<(), ClientError> {
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ClientError::network)?;

        let status = response.status();
        let body: Option<TelegramResponse> = response.json().await.ok();

        if !status.is_success() {
            return Err(ClientError::Server {
                status: status.as_u16(),
                message: body
                    .and_then(|b| b.description)
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        match body {
            Some(TelegramResponse { ok: true, .. }) => Ok(()),
            Some(TelegramResponse { description, .. }) => Err(ClientError::Rejected(
                description.unwrap_or_else(|| "ok=false".to_string()),
            )),
            None => Err(ClientError::Parse("unexpected sendMessage response".to_string())),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, message: &str) -> Result<()> {
        self.send_message(message)
            .await
            .map_err(|e| MonitorError::notification(e.to_string()))?;

        debug!(chat_id = %self.chat_id, "Telegram message delivered");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}
