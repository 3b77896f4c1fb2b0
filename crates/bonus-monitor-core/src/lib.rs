//! Bonus Monitor Core
//!
//! Detects changes in the funding status of a single watched page and
//! notifies at most once per real transition, across process restarts.
//!
//! # Cycle
//! - [`PollScheduler`] asks an [`Observer`] for the current [`Status`]
//! - [`TransitionEngine`] compares it with the [`StateStore`] record
//! - on a change the record is written first, then the [`Notifier`] is called

pub mod collaborators;
pub mod config;
pub mod contracts;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod store;

pub use collaborators::{Notifier, Observer};
pub use config::{MonitorConfig, TelegramConfig};
pub use contracts::*;
pub use engine::TransitionEngine;
pub use error::{MonitorError, Result};
pub use scheduler::{CycleStats, PollScheduler};
pub use store::{JsonFileStore, MemoryStore, StateStore};
