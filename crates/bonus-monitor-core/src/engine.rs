//! Transition engine
//!
//! Compares each observation with the persisted status and, on a change,
//! persists first and notifies second. A crash between the two loses the
//! notification; the reverse order could send it twice.

use crate::collaborators::Notifier;
use crate::config::MonitorConfig;
use crate::contracts::{Action, NotificationEvent, Observation};
use crate::error::{MonitorError, Result};
use crate::store::StateStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

/// Decides transitions and orchestrates persist-then-notify
pub struct TransitionEngine {
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    resource_url: String,
    notify_timeout: Duration,
}

impl TransitionEngine {
    pub fn new(
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            resource_url: config.url.clone(),
            notify_timeout: config.notify_timeout,
        }
    }

    /// Feed one observation through the engine
    ///
    /// Only a failed store write is returned as an error; notification
    /// failures are logged and the transition still stands.
    pub async fn process(&self, observation: Observation) -> Result<Action> {
        let current = match observation {
            Observation::Status(status) => status,
            Observation::Unknown => {
                info!("Inconclusive observation, persisted state left untouched");
                return Ok(Action::None);
            }
        };

        let previous = self.store.read();

        if previous == Some(current) {
            info!(status = %current, "No change");
            return Ok(Action::None);
        }

        self.store.write(current, Utc::now())?;

        let event = NotificationEvent::new(previous, current, self.resource_url.clone());
        info!(
            event_id = %event.event_id,
            previous = %previous.map(|s| s.to_string()).unwrap_or_else(|| "unknown".into()),
            current = %current,
            "Status transition persisted"
        );

        self.deliver(&event).await;

        Ok(Action::Transitioned { previous, current })
    }

    async fn deliver(&self, event: &NotificationEvent) {
        let message = event.message();
        let outcome = match timeout(self.notify_timeout, self.notifier.send(&message)).await {
            Ok(result) => result,
            Err(_) => Err(MonitorError::notification(format!(
                "delivery timed out after {}ms",
                self.notify_timeout.as_millis()
            ))),
        };

        match outcome {
            Ok(()) => info!(
                event_id = %event.event_id,
                notifier = self.notifier.name(),
                "Notification sent"
            ),
            Err(e) => error!(
                event_id = %event.event_id,
                notifier = self.notifier.name(),
                error = %e,
                "Notification failed, transition kept"
            ),
        }
    }
}
