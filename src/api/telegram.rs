use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::Result;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Fire-and-forget channel for the per-cycle signal digest
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, bullish: &[String], bearish: &[String]) -> Result<()>;
}

/// Render the digest sent after every screening cycle
pub fn format_signal_message(title: &str, bullish: &[String], bearish: &[String]) -> String {
    let mut message = format!(
        "[{}]\n\n ✅ Got {} coins alert uptrend!",
        title,
        bullish.len()
    );
    for symbol in bullish {
        message.push('\n');
        message.push_str(symbol);
    }

    message.push_str(&format!(
        "\n\n ⛔ Got {} coins alert downtrend!",
        bearish.len()
    ));
    for symbol in bearish {
        message.push('\n');
        message.push_str(symbol);
    }
    message
}

#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            client: Client::new(),
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token,
            chat_id,
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub async fn send_message(&self, message: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": message,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("telegram sendMessage failed ({}): {}", status, body).into());
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, title: &str, bullish: &[String], bearish: &[String]) -> Result<()> {
        self.send_message(&format_signal_message(title, bullish, bearish))
            .await
    }
}

/// Writes the digest to the log when no chat is configured
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, bullish: &[String], bearish: &[String]) -> Result<()> {
        tracing::info!("{}", format_signal_message(title, bullish, bearish));
        Ok(())
    }
}
