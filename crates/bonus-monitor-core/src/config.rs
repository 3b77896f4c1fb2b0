//! Monitor configuration
//!
//! Built once at startup and passed by reference; components never read
//! the environment themselves.

use crate::error::{MonitorError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Page watched by default
pub const DEFAULT_URL: &str = "https://www.bonusveicolielettrici.mase.gov.it/index.html";

/// Text shown by the page once every resource has been booked
pub const DEFAULT_EXHAUSTED_PHRASE: &str = "tutte le risorse risultano al momento prenotate";

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_OBSERVE_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STATE_FILE: &str = "status_bonus.json";
pub const DEFAULT_FAILURE_WARN_THRESHOLD: u32 = 10;
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Placeholders used when no credentials are supplied
pub const PLACEHOLDER_BOT_TOKEN: &str = "INSERT_TELEGRAM_BOT_TOKEN";
pub const PLACEHOLDER_CHAT_ID: &str = "INSERT_TELEGRAM_CHAT_ID";

/// Immutable monitor settings
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Resource being watched
    pub url: String,
    /// Phrase whose presence means the funds are exhausted
    pub exhausted_phrase: String,
    /// Wait between the end of one cycle and the start of the next
    pub poll_interval: Duration,
    /// Upper bound on a single observation
    pub observe_timeout: Duration,
    /// Upper bound on a single notification delivery
    pub notify_timeout: Duration,
    /// Location of the persisted record
    pub state_path: PathBuf,
    /// Consecutive failed cycles between two escalation warnings
    pub failure_warn_threshold: u32,
    pub telegram: TelegramConfig,
}

/// Credentials and endpoint for the Telegram notifier
#[derive(Clone)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: String,
    pub chat_id: String,
}

// The token is a secret; keep it out of debug logs.
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_base", &self.api_base)
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            bot_token: PLACEHOLDER_BOT_TOKEN.to_string(),
            chat_id: PLACEHOLDER_CHAT_ID.to_string(),
        }
    }
}

impl TelegramConfig {
    /// Whether real credentials were supplied
    pub fn is_placeholder(&self) -> bool {
        self.bot_token == PLACEHOLDER_BOT_TOKEN || self.chat_id == PLACEHOLDER_CHAT_ID
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            exhausted_phrase: DEFAULT_EXHAUSTED_PHRASE.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            observe_timeout: Duration::from_secs(DEFAULT_OBSERVE_TIMEOUT_SECS),
            notify_timeout: Duration::from_secs(DEFAULT_NOTIFY_TIMEOUT_SECS),
            state_path: PathBuf::from(DEFAULT_STATE_FILE),
            failure_warn_threshold: DEFAULT_FAILURE_WARN_THRESHOLD,
            telegram: TelegramConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Set the watched URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the state file location
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = path.into();
        self
    }

    /// Set the Telegram settings
    pub fn with_telegram(mut self, telegram: TelegramConfig) -> Self {
        self.telegram = telegram;
        self
    }

    /// Reject settings the loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(MonitorError::config("url must not be empty"));
        }
        if self.exhausted_phrase.trim().is_empty() {
            return Err(MonitorError::config("exhausted phrase must not be empty"));
        }
        if self.poll_interval.is_zero() {
            return Err(MonitorError::config("poll interval must be greater than zero"));
        }
        if self.observe_timeout.is_zero() || self.notify_timeout.is_zero() {
            return Err(MonitorError::config("timeouts must be greater than zero"));
        }
        if self.failure_warn_threshold == 0 {
            return Err(MonitorError::config("failure warn threshold must be at least 1"));
        }
        Ok(())
    }
}
