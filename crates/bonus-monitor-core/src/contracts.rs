//! Monitor contracts
//!
//! Value types shared by the store, the transition engine and the
//! collaborators that feed or consume them.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Classification of the monitored resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Funds can still be booked
    Available,
    /// The page reports every resource as booked
    Exhausted,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Available => write!(f, "AVAILABLE"),
            Status::Exhausted => write!(f, "EXHAUSTED"),
        }
    }
}

/// Outcome of a single poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// A confirmed classification
    Status(Status),
    /// The cycle produced no usable reading
    Unknown,
}

impl Observation {
    /// The confirmed status, if any
    pub fn status(&self) -> Option<Status> {
        match self {
            Observation::Status(s) => Some(*s),
            Observation::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Observation::Unknown)
    }
}

impl From<Status> for Observation {
    fn from(status: Status) -> Self {
        Observation::Status(status)
    }
}

/// The durable record: last confirmed status and when it was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub status: Status,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Accepts RFC 3339 as well as offset-less ISO-8601, read as UTC
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;

    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(serde::de::Error::custom)
}

impl PersistedState {
    pub fn new(status: Status, timestamp: DateTime<Utc>) -> Self {
        Self { status, timestamp }
    }
}

/// Result of feeding one observation to the transition engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing changed, or the observation was inconclusive
    None,
    /// The persisted status moved from `previous` to `current`
    Transitioned {
        previous: Option<Status>,
        current: Status,
    },
}

impl Action {
    pub fn is_transition(&self) -> bool {
        matches!(self, Action::Transitioned { .. })
    }
}

/// A detected transition, ready to be rendered for the notifier
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    /// Correlates the log lines of one delivery attempt
    pub event_id: Uuid,
    pub previous: Option<Status>,
    pub current: Status,
    pub resource_url: String,
    pub detected_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(previous: Option<Status>, current: Status, resource_url: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            previous,
            current,
            resource_url: resource_url.into(),
            detected_at: Utc::now(),
        }
    }

    /// Human-readable message handed to the notifier
    pub fn message(&self) -> String {
        let previous = self
            .previous
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        format!(
            "⚡ Funds status changed: {} → {}\n🔗 {}",
            previous, self.current, self.resource_url
        )
    }
}
