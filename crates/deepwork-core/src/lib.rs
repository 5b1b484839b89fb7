//! # Deep Work Core Library
//!
//! This library provides the core business logic for the Deep Work timer:
//! a single countdown that, once finished and rated, becomes a recorded
//! session. The CLI binary is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine; remaining time is
//!   always recomputed from absolute timestamps, so `tick()` may be called on
//!   any cadence
//! - **Timer Controller**: Persists a snapshot on every transition, reconciles
//!   it on restore, and hands completions to the alert dispatcher
//! - **Storage**: SQLite session store with non-destructive merge-import,
//!   JSON settings and TOML configuration
//! - **Alerts**: Notifications and a cancellable repeating alarm driven through
//!   a host capability trait
//! - **Stats**: Pure aggregations for progress charts, heatmaps and summaries
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerController`]: Engine plus persistence and alerts
//! - [`Database`]: Session storage, export and merge-import
//! - [`Config`]: Application configuration management
//! - [`AlertHost`]: Platform capabilities for notifications and sound

pub mod alerts;
pub mod clock;
pub mod error;
pub mod events;
pub mod stats;
pub mod storage;
pub mod timer;

pub use alerts::{AlertDispatcher, AlertHost, HostMessage, NotifyOptions, ToneSpec};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::Event;
pub use storage::{
    BackupDocument, Config, Database, ImportSummary, NewSession, Session, SessionPatch, Settings,
    SettingsStore, SnapshotStore,
};
pub use timer::{SaveOutcome, TimerController, TimerEngine, TimerPhase, TimerSnapshot, TimerStatus};
