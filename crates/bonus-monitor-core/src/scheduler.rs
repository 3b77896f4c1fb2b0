//! Poll scheduler
//!
//! Runs observe → process → sleep cycles until the shutdown channel flips.
//! The first cycle starts immediately and cycles never overlap.

use crate::collaborators::Observer;
use crate::config::MonitorConfig;
use crate::contracts::{Action, Observation};
use crate::engine::TransitionEngine;
use crate::error::Result;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

/// Counters kept across cycles, for logging
#[derive(Debug, Clone, Default)]
pub struct CycleStats {
    pub cycles: u64,
    pub unknown_observations: u64,
    pub transitions: u64,
    pub consecutive_failures: u32,
    pub last_success_at: Option<DateTime<Utc>>,
}

/// Drives the observer and the transition engine at a fixed interval
pub struct PollScheduler {
    observer: Arc<dyn Observer>,
    engine: TransitionEngine,
    poll_interval: Duration,
    observe_timeout: Duration,
    failure_warn_threshold: u32,
    stats: CycleStats,
}

impl PollScheduler {
    pub fn new(observer: Arc<dyn Observer>, engine: TransitionEngine, config: &MonitorConfig) -> Self {
        Self {
            observer,
            engine,
            poll_interval: config.poll_interval,
            observe_timeout: config.observe_timeout,
            failure_warn_threshold: config.failure_warn_threshold.max(1),
            stats: CycleStats::default(),
        }
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Run until `shutdown` becomes `true` or its sender is dropped
    ///
    /// Returns an error only when the state store can no longer be written.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            observer = self.observer.name(),
            interval_secs = self.poll_interval.as_secs(),
            "Poll loop started"
        );

        while !*shutdown.borrow() {
            if let Err(e) = self.tick().await {
                error!(error = %e, "State store unavailable, stopping poll loop");
                return Err(e);
            }

            if self.wait_or_shutdown(&mut shutdown).await {
                break;
            }
        }

        info!(cycles = self.stats.cycles, "Poll loop stopped");
        Ok(())
    }

    /// Run exactly one cycle without sleeping
    pub async fn tick(&mut self) -> Result<Action> {
        let observation = self.observe().await;
        self.record(observation);

        let action = self.engine.process(observation).await?;
        if action.is_transition() {
            self.stats.transitions += 1;
        }
        Ok(action)
    }

    /// Call the observer, mapping every failure mode to `Unknown`
    pub async fn observe(&self) -> Observation {
        let call = AssertUnwindSafe(self.observer.observe()).catch_unwind();

        match timeout(self.observe_timeout, call).await {
            Ok(Ok(Ok(status))) => Observation::Status(status),
            Ok(Ok(Err(e))) => {
                warn!(observer = self.observer.name(), error = %e, "Observation failed");
                Observation::Unknown
            }
            Ok(Err(_)) => {
                error!(observer = self.observer.name(), "Observer panicked");
                Observation::Unknown
            }
            Err(_) => {
                warn!(
                    observer = self.observer.name(),
                    timeout_ms = self.observe_timeout.as_millis() as u64,
                    "Observation timed out"
                );
                Observation::Unknown
            }
        }
    }

    fn record(&mut self, observation: Observation) {
        self.stats.cycles += 1;

        if observation.is_unknown() {
            self.stats.unknown_observations += 1;
            self.stats.consecutive_failures += 1;

            if self.stats.consecutive_failures % self.failure_warn_threshold == 0 {
                warn!(
                    consecutive_failures = self.stats.consecutive_failures,
                    last_success_at = ?self.stats.last_success_at,
                    "Observer failing repeatedly, monitored resource state unknown"
                );
            }
            return;
        }

        if self.stats.consecutive_failures > 0 {
            info!(
                after_failures = self.stats.consecutive_failures,
                "Observer recovered"
            );
        }
        self.stats.consecutive_failures = 0;
        self.stats.last_success_at = Some(Utc::now());
    }

    /// Sleep for the poll interval; `true` means shutdown was requested
    async fn wait_or_shutdown(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let pause = sleep(self.poll_interval);
        tokio::pin!(pause);

        loop {
            tokio::select! {
                _ = &mut pause => return false,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return true;
                    }
                }
            }
        }
    }
}
