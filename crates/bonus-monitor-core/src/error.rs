//! Error types for the monitor core
//!
//! Observation and notification failures are recovered where they happen;
//! only store failures escape the poll loop.

use thiserror::Error;

/// Main error type for monitor operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The monitored resource could not be fetched or classified
    #[error("Observation failed: {0}")]
    Observation(String),

    /// The notification channel rejected or dropped a message
    #[error("Notification failed: {0}")]
    Notification(String),

    /// The durable state medium could not be written
    #[error("State store error: {0}")]
    Store(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MonitorError {
    /// Create an observation error
    pub fn observation(msg: impl Into<String>) -> Self {
        MonitorError::Observation(msg.into())
    }

    /// Create a notification error
    pub fn notification(msg: impl Into<String>) -> Self {
        MonitorError::Notification(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        MonitorError::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        MonitorError::Config(msg.into())
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Serialization(format!("JSON error: {}", err))
    }
}

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;
