//! Bonus Monitor Agent
//!
//! Wires the monitor core to the outside world: the bonus page over HTTP,
//! Telegram for alerts and a liveness route for the hosting platform.

pub mod client;
pub mod handler;

pub use client::{ClientError, PageObserver, TelegramNotifier};
pub use handler::create_router;
