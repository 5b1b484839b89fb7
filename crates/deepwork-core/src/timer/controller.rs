//! Timer controller.
//!
//! Wires the engine to its collaborators: every phase transition is persisted
//! through the snapshot store, completions go to the alert dispatcher, and a
//! saved session lands in the database and advances the auto-backup counters.
//!
//! Transition-time snapshot failures are returned to the caller, but the
//! in-memory transition stands and the write is retried on the next tick.
//! Opportunistic writes while running only log.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use super::engine::{TimerEngine, TimerPhase, TimerStatus};
use crate::alerts::AlertDispatcher;
use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::storage::{
    write_backup_file, AutoBackupPolicy, BackupCounters, Config, Database, KeyValueStore,
    NewSession, Settings, SettingsStore, SnapshotStore,
};

/// Result of [`TimerController::save_session`].
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub event: Event,
    pub session_id: i64,
    /// Path of the automatic backup, if one was written.
    pub backup: Option<PathBuf>,
}

pub struct TimerController<'a, S: KeyValueStore> {
    engine: TimerEngine,
    snapshots: SnapshotStore<S>,
    db: &'a Database,
    clock: &'a dyn Clock,
    alerts: AlertDispatcher,
    settings: Settings,
    backup_policy: AutoBackupPolicy,
    backup_dir: Option<PathBuf>,
    snapshot_every: chrono::Duration,
    last_write: Option<DateTime<Utc>>,
    dirty: bool,
}

impl<'a, S: KeyValueStore> TimerController<'a, S> {
    /// Build an idle controller. Call [`restore`](Self::restore) to pick up a
    /// persisted countdown.
    pub fn new(
        db: &'a Database,
        snapshot_store: S,
        clock: &'a dyn Clock,
        alerts: AlertDispatcher,
        config: &Config,
    ) -> Result<Self> {
        let settings = SettingsStore::new(db).load()?;
        Ok(Self {
            engine: TimerEngine::new(),
            snapshots: SnapshotStore::new(snapshot_store),
            db,
            clock,
            alerts,
            settings,
            backup_policy: config.backup_policy(),
            backup_dir: None,
            snapshot_every: config.snapshot_interval(),
            last_write: None,
            dirty: false,
        })
    }

    /// Write automatic backups into `dir` when they fall due.
    pub fn with_auto_backup(mut self, dir: PathBuf) -> Self {
        self.backup_dir = Some(dir);
        self
    }

    /// Load and reconcile the persisted snapshot.
    ///
    /// Returns `Some(Event::MissedCompletion)` when the countdown ran out while
    /// nothing was ticking; the alert has already been dispatched and the
    /// completed state persisted so it will not fire again.
    pub fn restore(&mut self) -> Result<Option<Event>> {
        let now = self.clock.now();
        let Some(restored) = self.snapshots.load(now)? else {
            self.engine = TimerEngine::new();
            return Ok(None);
        };
        self.engine = restored.engine;
        self.last_write = restored.persisted_at;

        if let Some(missed) = &restored.missed {
            self.dispatch(missed);
            self.persist_transition(now)?;
        }
        Ok(restored.missed)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        self.engine.phase()
    }

    pub fn status(&self) -> TimerStatus {
        self.engine.status(self.clock.now())
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_alarm_active(&self) -> bool {
        self.alerts.is_alarm_active()
    }

    /// Whether the last snapshot write failed and is waiting for a retry.
    pub fn has_pending_write(&self) -> bool {
        self.dirty
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, planned_minutes: i64) -> Result<Event> {
        let now = self.clock.now();
        let event = self.engine.start(planned_minutes, now)?;
        // A new countdown silences a leftover alarm.
        self.alerts.stop_alarm();
        self.persist_transition(now)?;
        Ok(event)
    }

    /// Start with the user's default duration.
    pub fn start_default(&mut self) -> Result<Event> {
        self.start(self.settings.default_duration.total_minutes())
    }

    pub fn pause(&mut self) -> Result<Event> {
        let now = self.clock.now();
        let event = self.engine.pause(now)?;
        if event.completed_minutes().is_some() {
            self.dispatch(&event);
        }
        self.persist_transition(now)?;
        Ok(event)
    }

    pub fn resume(&mut self) -> Result<Event> {
        let now = self.clock.now();
        let event = self.engine.resume(now)?;
        self.persist_transition(now)?;
        Ok(event)
    }

    pub fn stop(&mut self) -> Result<Event> {
        let now = self.clock.now();
        let event = self.engine.stop(now)?;
        self.persist_transition(now)?;
        Ok(event)
    }

    /// Advance against the clock. Returns the completion event the first time
    /// the countdown is observed at zero.
    pub fn tick(&mut self) -> Option<Event> {
        let now = self.clock.now();
        if let Some(event) = self.engine.tick(now) {
            self.dispatch(&event);
            if let Err(e) = self.persist_transition(now) {
                tracing::warn!("failed to persist completed timer: {e}");
            }
            return Some(event);
        }

        if self.write_due(now) {
            if let Err(e) = self.persist_transition(now) {
                tracing::warn!("snapshot write failed, will retry: {e}");
            }
        }
        None
    }

    /// Record the completed countdown as a rated session.
    ///
    /// # Errors
    /// `InvalidTransition` unless the timer is completed; `InvalidSession` on
    /// a bad rating, in which case the timer stays completed.
    pub fn save_session(&mut self, rating: i64, notes: Option<String>) -> Result<SaveOutcome> {
        let now = self.clock.now();
        let snapshot = self.engine.snapshot();
        if snapshot.phase != TimerPhase::Completed {
            return Err(CoreError::InvalidTransition {
                from: snapshot.phase,
                action: "save session",
            });
        }

        let started_at = snapshot
            .session_started_at
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let mut session = NewSession::new(started_at, i64::from(snapshot.planned_minutes), rating);
        session.notes = notes;
        let session_id = self.db.add_session(&session)?;

        let finished = self.engine.acknowledge()?;
        self.alerts.stop_alarm();
        if let Err(e) = self.persist_transition(now) {
            tracing::warn!("failed to clear snapshot after save: {e}");
        }

        let backup = self.after_session_saved(now);
        Ok(SaveOutcome {
            event: Event::SessionSaved {
                id: session_id,
                duration_min: finished.duration_min,
                at: now,
            },
            session_id,
            backup,
        })
    }

    /// Discard the completed countdown without recording it.
    pub fn skip_session(&mut self) -> Result<Event> {
        let now = self.clock.now();
        let finished = self.engine.acknowledge()?;
        self.alerts.stop_alarm();
        self.persist_transition(now)?;
        Ok(Event::SessionSkipped {
            duration_min: finished.duration_min,
            at: now,
        })
    }

    /// Silence the alarm without leaving `Completed`.
    pub fn stop_alarm(&mut self) -> bool {
        self.alerts.stop_alarm()
    }

    /// Re-read settings from the store (after the user edits them).
    pub fn reload_settings(&mut self) -> Result<()> {
        self.settings = SettingsStore::new(self.db).load()?;
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn dispatch(&mut self, event: &Event) {
        if let Some(minutes) = event.completed_minutes() {
            self.alerts.on_complete(minutes, &self.settings);
        }
    }

    fn write_due(&self, now: DateTime<Utc>) -> bool {
        if self.dirty {
            return true;
        }
        if self.engine.phase() != TimerPhase::Running {
            return false;
        }
        match self.last_write {
            Some(last) => now - last >= self.snapshot_every,
            None => true,
        }
    }

    fn persist_transition(&mut self, now: DateTime<Utc>) -> Result<()> {
        let written = match self.engine.phase() {
            TimerPhase::Idle => self.snapshots.clear(),
            _ => self.snapshots.save(&self.engine.snapshot(), now),
        };
        match written {
            Ok(()) => {
                self.dirty = false;
                self.last_write = Some(now);
                Ok(())
            }
            Err(e) => {
                self.dirty = true;
                Err(e.into())
            }
        }
    }

    fn after_session_saved(&mut self, now: DateTime<Utc>) -> Option<PathBuf> {
        let mut counters = match BackupCounters::load(self.db) {
            Ok(counters) => counters,
            Err(e) => {
                tracing::warn!("could not read backup counters: {e}");
                return None;
            }
        };
        counters.record_session();

        let mut written = None;
        if let Some(dir) = &self.backup_dir {
            if self.backup_policy.is_due(&counters, now) {
                match self
                    .db
                    .export(now)
                    .and_then(|doc| write_backup_file(dir, &doc))
                {
                    Ok(path) => {
                        tracing::info!(path = %path.display(), "automatic backup written");
                        counters.mark_backed_up(now);
                        written = Some(path);
                    }
                    Err(e) => tracing::warn!("automatic backup failed: {e}"),
                }
            }
        }

        if let Err(e) = counters.save(self.db) {
            tracing::warn!("could not store backup counters: {e}");
        }
        written
    }
}
