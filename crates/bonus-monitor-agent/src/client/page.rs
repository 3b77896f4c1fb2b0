//! Page observer
//!
//! Downloads the watched page and looks for the "all resources booked"
//! phrase in its visible text.

use super::ClientError;
use bonus_monitor_core::{MonitorConfig, MonitorError, Observer, Result, Status};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::debug;

/// Observer backed by an HTTP GET of the configured URL
pub struct PageObserver {
    url: String,
    phrase: String,
    client: reqwest::Client,
}

impl PageObserver {
    /// Create an observer with the configured request timeout
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.observe_timeout)
            .user_agent(concat!("bonus-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MonitorError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: config.url.clone(),
            phrase: normalize(&config.exhausted_phrase),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> std::result::Result<String, ClientError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(ClientError::network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Server {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ClientError::Parse(e.without_url().to_string()))
    }
}

#[async_trait::async_trait]
impl Observer for PageObserver {
    fn name(&self) -> &str {
        "page"
    }

    async fn observe(&self) -> Result<Status> {
        let start = Instant::now();
        let html = self
            .fetch()
            .await
            .map_err(|e| MonitorError::observation(e.to_string()))?;

        let status = classify(&html, &self.phrase);
        debug!(
            status = %status,
            bytes = html.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Page classified"
        );
        Ok(status)
    }
}

/// Classify a page: exhausted iff its visible text contains `phrase`
pub fn classify(html: &str, phrase: &str) -> Status {
    let text = extract_text(html);
    if text.contains(&normalize(phrase)) {
        Status::Exhausted
    } else {
        Status::Available
    }
}

struct Patterns {
    hidden: Regex,
    comment: Regex,
    tag: Regex,
    numeric_entity: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        hidden: Regex::new(r"(?is)<(script|style|noscript|template)\b[^>]*>.*?</(script|style|noscript|template)\s*>")
            .expect("valid regex"),
        comment: Regex::new(r"(?s)<!--.*?-->").expect("valid regex"),
        tag: Regex::new(r"</?[A-Za-z!?][^>]*>").expect("valid regex"),
        numeric_entity: Regex::new(r"&#([xX][0-9a-fA-F]+|[0-9]+);").expect("valid regex"),
    })
}

/// Visible text of an HTML document, lowercased with whitespace collapsed
pub fn extract_text(html: &str) -> String {
    let p = patterns();

    let text = p.hidden.replace_all(html, " ");
    let text = p.comment.replace_all(&text, " ");
    let text = p.tag.replace_all(&text, " ");
    let text = p.numeric_entity.replace_all(&text, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x').or_else(|| raw.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_else(|| " ".to_string())
    });

    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&agrave;", "à")
        .replace("&egrave;", "è")
        .replace("&eacute;", "é")
        .replace("&igrave;", "ì")
        .replace("&ograve;", "ò")
        .replace("&ugrave;", "ù")
        .replace("&amp;", "&");

    normalize(&text)
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
