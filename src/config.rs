use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::execution::{MonitorConfig, ScannerConfig, TradingConfig};
use crate::indicators::IndicatorConfig;
use crate::strategy::SignalConfig;

/// Process-wide configuration, built once at start and handed to each component
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub binance: BinanceConfig,
    pub sheets: SheetsConfig,
    pub telegram: TelegramConfig,
    pub scanner: ScannerConfig,
    pub indicators: IndicatorConfig,
    pub signals: SignalConfig,
    pub trading: TradingConfig,
    pub monitor: MonitorConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BinanceConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub rest_url: String,
    pub recv_window_ms: u64,
    pub requests_per_minute: u32,
    pub request_timeout_secs: u64,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            rest_url: "https://api.binance.com".to_string(),
            recv_window_ms: 5000,
            requests_per_minute: 1200,
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub spreadsheet_id: Option<String>,
    pub access_token: Option<String>,
    pub api_base: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            access_token: None,
            api_base: "https://sheets.googleapis.com/v4".to_string(),
        }
    }
}

impl SheetsConfig {
    /// Spreadsheet id and token, when both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.spreadsheet_id.as_deref(), self.access_token.as_deref()) {
            (Some(id), Some(token)) if !id.is_empty() && !token.is_empty() => Some((id, token)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

/// How the configured Telegram settings resolve at start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelegramSetup<'a> {
    Active { bot_token: &'a str, chat_id: &'a str },
    Disabled,
    /// Token and chat id are set but `enabled` is false
    CredentialsIgnored,
    /// Enabled without a usable token and chat id
    Incomplete,
}

impl TelegramConfig {
    pub fn setup(&self) -> TelegramSetup<'_> {
        let credentials = match (self.bot_token.as_deref(), self.chat_id.as_deref()) {
            (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                Some((token, chat_id))
            }
            _ => None,
        };
        match (self.enabled, credentials) {
            (true, Some((bot_token, chat_id))) => TelegramSetup::Active { bot_token, chat_id },
            (true, None) => TelegramSetup::Incomplete,
            (false, Some(_)) => TelegramSetup::CredentialsIgnored,
            (false, None) => TelegramSetup::Disabled,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Legacy variable names still honoured on top of the `SPOTBOT_` namespace
const LEGACY_OVERRIDES: &[(&str, &str)] = &[
    ("BINANCE_API_KEY", "binance.api_key"),
    ("BINANCE_SECRET_KEY", "binance.api_secret"),
    ("SPREADSHEET_ID", "sheets.spreadsheet_id"),
    ("SHEETS_ACCESS_TOKEN", "sheets.access_token"),
    ("BOT_TOKEN", "telegram.bot_token"),
    ("RECEIVER_USER_ID", "telegram.chat_id"),
    ("PORT", "server.port"),
];

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::Environment::with_prefix("SPOTBOT")
                    .prefix_separator("_")
                    .separator("__"),
            );

        for (var, key) in LEGACY_OVERRIDES {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_override(*key, value)?;
            }
        }

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}
