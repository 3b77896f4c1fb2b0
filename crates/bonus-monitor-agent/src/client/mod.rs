//! HTTP clients for the collaborators of the monitor core
//!
//! [`PageObserver`] fetches and classifies the bonus page,
//! [`TelegramNotifier`] delivers transition messages.

mod page;
mod telegram;

pub use page::{classify, extract_text, PageObserver};
pub use telegram::TelegramNotifier;

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl ClientError {
    // Request URLs may embed the bot token; never let them reach a log line.
    pub(crate) fn network(err: reqwest::Error) -> Self {
        ClientError::Network(err.without_url().to_string())
    }
}
