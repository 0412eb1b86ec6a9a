//! Telegram Notifier
//!
//! Delivers notifications through the Bot API `sendMessage` method.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::adapters::http::DEFAULT_TIMEOUT;
use crate::ports::notifier::{Notification, Notifier, NotifyError, NotifyTarget};

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_base_url: String,
    pub bot_token: String,
    pub operator_chat_id: i64,
    pub admin_chat_id: i64,
    pub timeout: Duration,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.telegram.org".to_string(),
            bot_token: String::new(),
            operator_chat_id: 0,
            admin_chat_id: 0,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct BotApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    config: TelegramConfig,
    http: Client,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        if config.bot_token.is_empty() {
            return Err(NotifyError::NotConfigured("telegram bot token".to_string()));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotifyError::Delivery(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    /// Chat id a target resolves to; 0 means the chat is not configured
    pub fn chat_id(&self, target: NotifyTarget) -> Result<i64, NotifyError> {
        let chat_id = match target {
            NotifyTarget::Operators => self.config.operator_chat_id,
            NotifyTarget::Admin => self.config.admin_chat_id,
            NotifyTarget::Client(user_id) => user_id,
        };
        if chat_id == 0 {
            return Err(NotifyError::NotConfigured(format!("{:?} chat", target)));
        }
        Ok(chat_id)
    }

    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base_url, self.config.bot_token
        );

        let response = self
            .http
            .post(&url)
            .json(&SendMessage {
                chat_id,
                text,
                disable_web_page_preview: true,
            })
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let reply: BotApiReply = response
            .json()
            .await
            .map_err(|e| NotifyError::Delivery(format!("Failed to parse Bot API reply: {}", e)))?;

        if !reply.ok {
            return Err(NotifyError::Delivery(
                reply.description.unwrap_or_else(|| "sendMessage failed".to_string()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let chat_id = self.chat_id(notification.target())?;
        self.send_text(chat_id, &notification.render()).await
    }
}
