//! Traits for the collaborators around the core loop
//!
//! The core never fetches pages or talks to a messaging API itself; it is
//! handed an [`Observer`] and a [`Notifier`] at construction time.

use crate::contracts::Status;
use crate::error::Result;

/// Produces a classification of the monitored resource
///
/// Implementations should bound their own network calls. Any error is
/// turned into an inconclusive observation by the scheduler.
#[async_trait::async_trait]
pub trait Observer: Send + Sync {
    /// Identifier used in log lines
    fn name(&self) -> &str;

    /// Fetch and classify the resource once
    async fn observe(&self) -> Result<Status>;
}

/// Delivers a message to a fixed recipient
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Identifier used in log lines
    fn name(&self) -> &str;

    /// Send the message, resolving only once delivery succeeded or failed
    async fn send(&self, message: &str) -> Result<()>;
}
