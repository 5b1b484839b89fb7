//! Timer snapshot persistence.
//!
//! The snapshot is written on every phase transition and opportunistically
//! while running. Loading always reconciles against the wall clock: the
//! stored state carries absolute timestamps only, never a remaining count.

use chrono::{DateTime, Utc};

use super::kv::KeyValueStore;
use crate::error::{Result, StorageError};
use crate::events::Event;
use crate::timer::{TimerEngine, TimerSnapshot};

pub const SNAPSHOT_KEY: &str = "timer_snapshot";

/// Outcome of [`SnapshotStore::load`].
#[derive(Debug, Clone)]
pub struct RestoredTimer {
    pub engine: TimerEngine,
    /// `Some(Event::MissedCompletion)` when the countdown ended while nobody
    /// was watching.
    pub missed: Option<Event>,
    /// When the snapshot was last written.
    pub persisted_at: Option<DateTime<Utc>>,
}

pub struct SnapshotStore<S> {
    store: S,
}

impl<S: KeyValueStore> SnapshotStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persist the snapshot, stamping `persisted_at`.
    pub fn save(&self, snapshot: &TimerSnapshot, now: DateTime<Utc>) -> Result<(), StorageError> {
        let mut stamped = snapshot.clone();
        stamped.persisted_at = Some(now);
        let json = serde_json::to_string(&stamped)
            .map_err(|e| StorageError::QueryFailed(format!("encode snapshot: {e}")))?;
        self.store.kv_set(SNAPSHOT_KEY, &json)
    }

    /// Load the stored snapshot without reconciliation.
    pub fn load_raw(&self) -> Result<Option<TimerSnapshot>> {
        let Some(json) = self.store.kv_get(SNAPSHOT_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<TimerSnapshot>(&json) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                tracing::warn!("discarding unreadable timer snapshot: {e}");
                if let Err(e) = self.store.kv_remove(SNAPSHOT_KEY) {
                    tracing::warn!("failed to clear unreadable snapshot: {e}");
                }
                Ok(None)
            }
        }
    }

    /// Load and reconcile against `now`. `None` when nothing is stored.
    pub fn load(&self, now: DateTime<Utc>) -> Result<Option<RestoredTimer>> {
        let Some(snapshot) = self.load_raw()? else {
            return Ok(None);
        };
        let persisted_at = snapshot.persisted_at;
        let (engine, missed) = TimerEngine::restore_from_snapshot(snapshot, now);
        if missed.is_some() {
            tracing::info!(?persisted_at, "timer finished while host was away");
        }
        Ok(Some(RestoredTimer {
            engine,
            missed,
            persisted_at,
        }))
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.kv_remove(SNAPSHOT_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::timer::TimerPhase;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap()
    }

    #[test]
    fn load_empty_store_is_none() {
        let store = MemoryStore::new();
        assert!(SnapshotStore::new(&store).load(t0()).unwrap().is_none());
    }

    #[test]
    fn save_then_load_reconciles_remaining() {
        let store = MemoryStore::new();
        let snapshots = SnapshotStore::new(&store);
        let mut engine = TimerEngine::new();
        engine.start(30, t0()).unwrap();
        snapshots.save(&engine.snapshot(), t0()).unwrap();

        let later = t0() + Duration::minutes(12);
        let restored = snapshots.load(later).unwrap().unwrap();
        assert!(restored.missed.is_none());
        assert_eq!(restored.persisted_at, Some(t0()));
        assert_eq!(restored.engine.remaining_secs(later), 18 * 60);
    }

    #[test]
    fn load_after_end_reports_missed_completion() {
        let store = MemoryStore::new();
        let snapshots = SnapshotStore::new(&store);
        let mut engine = TimerEngine::new();
        engine.start(25, t0()).unwrap();
        snapshots.save(&engine.snapshot(), t0()).unwrap();

        let restored = snapshots
            .load(t0() + Duration::minutes(25) + Duration::milliseconds(1))
            .unwrap()
            .unwrap();
        assert_eq!(restored.engine.phase(), TimerPhase::Completed);
        assert!(matches!(
            restored.missed,
            Some(Event::MissedCompletion { duration_min: 25, .. })
        ));
    }

    #[test]
    fn corrupt_snapshot_is_discarded() {
        let store = MemoryStore::new();
        store.kv_set(SNAPSHOT_KEY, "{not json").unwrap();
        let snapshots = SnapshotStore::new(&store);
        assert!(snapshots.load(t0()).unwrap().is_none());
        assert!(store.kv_get(SNAPSHOT_KEY).unwrap().is_none());
    }

    #[test]
    fn clear_removes_snapshot() {
        let store = MemoryStore::new();
        let snapshots = SnapshotStore::new(&store);
        snapshots.save(&TimerSnapshot::idle(), t0()).unwrap();
        snapshots.clear().unwrap();
        assert!(snapshots.load_raw().unwrap().is_none());
    }
}
