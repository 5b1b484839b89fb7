use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every state change in the timer produces an Event.
/// The host polls for events; the alert dispatcher subscribes to completions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        planned_minutes: u32,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerStopped {
        elapsed_ms: i64,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero while the host was watching.
    TimerCompleted {
        duration_min: u32,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero while the host was closed or suspended;
    /// surfaced on the next restore.
    MissedCompletion {
        duration_min: u32,
        completed_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    SessionSaved {
        id: i64,
        duration_min: u32,
        at: DateTime<Utc>,
    },
    SessionSkipped {
        duration_min: u32,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Planned minutes of the finished session if this event ends a countdown.
    pub fn completed_minutes(&self) -> Option<u32> {
        match self {
            Event::TimerCompleted { duration_min, .. }
            | Event::MissedCompletion { duration_min, .. } => Some(*duration_min),
            _ => None,
        }
    }
}
