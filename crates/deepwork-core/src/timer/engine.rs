//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads or counters - remaining time is always recomputed from the
//! absolute start timestamp and the banked elapsed time, so the caller may
//! call `tick()` on any cadence (or not at all while suspended) without drift.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused | Completed)
//! Paused -> (Running | Idle)
//! Completed -> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new();
//! engine.start(25, clock.now())?;
//! // In a loop:
//! engine.tick(clock.now()); // Returns Some(Event) once, when the countdown hits zero
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::from_epoch_ms;
use crate::error::{CoreError, Result};
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Persistable copy of the timer state.
///
/// `accumulated_pause_millis` holds the running time banked by earlier
/// intervals: `pause()` adds `now - start_epoch_millis` to it. Elapsed time is
/// `now - start_epoch_millis + accumulated_pause_millis` while running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    pub planned_duration_seconds: u64,
    #[serde(default)]
    pub planned_minutes: u32,
    #[serde(default)]
    pub start_epoch_millis: Option<i64>,
    #[serde(default)]
    pub accumulated_pause_millis: i64,
    /// When the first interval began; becomes the saved session's start time.
    #[serde(default)]
    pub session_started_at: Option<DateTime<Utc>>,
    /// Stamped by the snapshot store on every write.
    #[serde(default)]
    pub persisted_at: Option<DateTime<Utc>>,
}

impl TimerSnapshot {
    pub fn idle() -> Self {
        Self {
            phase: TimerPhase::Idle,
            planned_duration_seconds: 0,
            planned_minutes: 0,
            start_epoch_millis: None,
            accumulated_pause_millis: 0,
            session_started_at: None,
            persisted_at: None,
        }
    }
}

impl Default for TimerSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

/// What a finished countdown hands to the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishedInterval {
    pub started_at: DateTime<Utc>,
    pub duration_min: u32,
}

/// Serializable view of the timer at a given instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerStatus {
    pub phase: TimerPhase,
    pub planned_minutes: u32,
    pub remaining_secs: u64,
    pub elapsed_ms: i64,
    /// 0.0 .. 1.0 progress through the planned duration.
    pub progress: f64,
    pub session_started_at: Option<DateTime<Utc>>,
}

/// Core timer engine.
///
/// Operates on absolute wall-clock timestamps -- no internal thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerEngine {
    state: TimerSnapshot,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerEngine {
    /// Create an idle engine.
    pub fn new() -> Self {
        Self {
            state: TimerSnapshot::idle(),
        }
    }

    /// Rebuild an engine from a persisted snapshot, reconciling it against `now`.
    ///
    /// A running snapshot whose countdown already reached zero (the host was
    /// closed or suspended past the end) comes back `Completed` and yields
    /// `Event::MissedCompletion` so the alert still fires. Completed snapshots
    /// are restored silently; their alert already fired.
    pub fn restore_from_snapshot(
        snapshot: TimerSnapshot,
        now: DateTime<Utc>,
    ) -> (Self, Option<Event>) {
        let mut state = snapshot;
        state.persisted_at = None;

        if state.phase != TimerPhase::Idle && state.planned_duration_seconds == 0 {
            tracing::warn!(phase = ?state.phase, "discarding snapshot without planned duration");
            return (Self::new(), None);
        }
        if state.phase == TimerPhase::Running && state.start_epoch_millis.is_none() {
            tracing::warn!("running snapshot has no start timestamp; restoring as paused");
            state.phase = TimerPhase::Paused;
        }

        let mut engine = Self { state };
        if engine.state.phase != TimerPhase::Running || engine.remaining_secs(now) > 0 {
            return (engine, None);
        }

        let completed_at = engine.zero_crossing().unwrap_or(now);
        engine.finish();
        let event = Event::MissedCompletion {
            duration_min: engine.state.planned_minutes,
            completed_at,
            at: now,
        };
        (engine, Some(event))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        self.state.phase
    }

    pub fn planned_minutes(&self) -> u32 {
        self.state.planned_minutes
    }

    pub fn planned_ms(&self) -> i64 {
        (self.state.planned_duration_seconds as i64).saturating_mul(1000)
    }

    /// Copy of the current state for persistence.
    pub fn snapshot(&self) -> TimerSnapshot {
        self.state.clone()
    }

    /// Elapsed running time in milliseconds at `now`.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> i64 {
        match (self.state.phase, self.state.start_epoch_millis) {
            (TimerPhase::Idle, _) => 0,
            (TimerPhase::Running, Some(start)) => {
                let interval = (now.timestamp_millis() - start).max(0);
                interval.saturating_add(self.state.accumulated_pause_millis)
            }
            _ => self.state.accumulated_pause_millis,
        }
    }

    /// `max(0, planned - floor(elapsed / 1000))`.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        if self.state.phase == TimerPhase::Idle {
            return 0;
        }
        let elapsed_secs = (self.elapsed_ms(now) / 1000).max(0) as u64;
        self.state
            .planned_duration_seconds
            .saturating_sub(elapsed_secs)
    }

    /// 0.0 .. 1.0 progress through the planned duration.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        let planned = self.planned_ms();
        if planned == 0 {
            return 0.0;
        }
        (self.elapsed_ms(now) as f64 / planned as f64).clamp(0.0, 1.0)
    }

    pub fn status(&self, now: DateTime<Utc>) -> TimerStatus {
        TimerStatus {
            phase: self.state.phase,
            planned_minutes: self.state.planned_minutes,
            remaining_secs: self.remaining_secs(now),
            elapsed_ms: self.elapsed_ms(now),
            progress: self.progress(now),
            session_started_at: self.state.session_started_at,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, planned_minutes: i64, now: DateTime<Utc>) -> Result<Event> {
        if planned_minutes <= 0 || planned_minutes > u32::MAX as i64 {
            return Err(CoreError::InvalidDuration {
                minutes: planned_minutes,
            });
        }
        if self.state.phase != TimerPhase::Idle {
            return Err(self.rejected("start"));
        }

        let planned_minutes = planned_minutes as u32;
        self.state = TimerSnapshot {
            phase: TimerPhase::Running,
            planned_duration_seconds: u64::from(planned_minutes) * 60,
            planned_minutes,
            start_epoch_millis: Some(now.timestamp_millis()),
            accumulated_pause_millis: 0,
            session_started_at: Some(now),
            persisted_at: None,
        };
        Ok(Event::TimerStarted {
            planned_minutes,
            duration_secs: self.state.planned_duration_seconds,
            at: now,
        })
    }

    /// Bank the current interval and pause.
    ///
    /// If the countdown already ran out but no tick observed it yet, the timer
    /// completes instead and the completion event is returned.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<Event> {
        if self.state.phase != TimerPhase::Running {
            return Err(self.rejected("pause"));
        }
        if let Some(completed) = self.tick(now) {
            return Ok(completed);
        }

        self.state.accumulated_pause_millis = self.elapsed_ms(now);
        self.state.start_epoch_millis = None;
        self.state.phase = TimerPhase::Paused;
        Ok(Event::TimerPaused {
            remaining_secs: self.remaining_secs(now),
            at: now,
        })
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<Event> {
        if self.state.phase != TimerPhase::Paused {
            return Err(self.rejected("resume"));
        }
        self.state.start_epoch_millis = Some(now.timestamp_millis());
        self.state.phase = TimerPhase::Running;
        Ok(Event::TimerResumed {
            remaining_secs: self.remaining_secs(now),
            at: now,
        })
    }

    /// Abandon the countdown. Valid while running or paused.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<Event> {
        match self.state.phase {
            TimerPhase::Running | TimerPhase::Paused => {
                let elapsed_ms = self.elapsed_ms(now);
                self.state = TimerSnapshot::idle();
                Ok(Event::TimerStopped { elapsed_ms, at: now })
            }
            _ => Err(self.rejected("stop")),
        }
    }

    /// Recompute progress; returns `Some(Event::TimerCompleted)` exactly once,
    /// on the first call that observes zero remaining while running.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state.phase != TimerPhase::Running || self.remaining_secs(now) > 0 {
            return None;
        }
        self.finish();
        Some(Event::TimerCompleted {
            duration_min: self.state.planned_minutes,
            at: now,
        })
    }

    /// Leave `Completed` after the session was saved or skipped.
    pub fn acknowledge(&mut self) -> Result<FinishedInterval> {
        if self.state.phase != TimerPhase::Completed {
            return Err(self.rejected("acknowledge"));
        }
        let started_at = self
            .state
            .session_started_at
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let finished = FinishedInterval {
            started_at,
            duration_min: self.state.planned_minutes,
        };
        self.state = TimerSnapshot::idle();
        Ok(finished)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn finish(&mut self) {
        self.state.phase = TimerPhase::Completed;
        self.state.start_epoch_millis = None;
        self.state.accumulated_pause_millis = self.planned_ms();
    }

    /// Instant at which a running countdown reaches zero.
    fn zero_crossing(&self) -> Option<DateTime<Utc>> {
        let start = self.state.start_epoch_millis?;
        let left = self.planned_ms() - self.state.accumulated_pause_millis;
        Some(from_epoch_ms(start.saturating_add(left.max(0))))
    }

    fn rejected(&self, action: &'static str) -> CoreError {
        CoreError::InvalidTransition {
            from: self.state.phase,
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn start_pause_resume() {
        let mut engine = TimerEngine::new();
        assert_eq!(engine.phase(), TimerPhase::Idle);

        engine.start(25, t0()).unwrap();
        assert_eq!(engine.phase(), TimerPhase::Running);

        engine.pause(t0() + Duration::minutes(5)).unwrap();
        assert_eq!(engine.phase(), TimerPhase::Paused);
        assert_eq!(engine.remaining_secs(t0() + Duration::minutes(30)), 20 * 60);

        engine.resume(t0() + Duration::minutes(30)).unwrap();
        assert_eq!(engine.phase(), TimerPhase::Running);
        assert_eq!(engine.remaining_secs(t0() + Duration::minutes(40)), 10 * 60);
    }

    #[test]
    fn start_rejects_non_positive_duration() {
        let mut engine = TimerEngine::new();
        assert!(matches!(
            engine.start(0, t0()),
            Err(CoreError::InvalidDuration { minutes: 0 })
        ));
        assert!(matches!(
            engine.start(-5, t0()),
            Err(CoreError::InvalidDuration { minutes: -5 })
        ));
        assert_eq!(engine.phase(), TimerPhase::Idle);
    }

    #[test]
    fn start_while_running_is_rejected() {
        let mut engine = TimerEngine::new();
        engine.start(25, t0()).unwrap();
        assert!(matches!(
            engine.start(10, t0()),
            Err(CoreError::InvalidTransition { action: "start", .. })
        ));
        assert_eq!(engine.planned_minutes(), 25);
    }

    #[test]
    fn second_pause_does_not_double_count() {
        let mut engine = TimerEngine::new();
        engine.start(25, t0()).unwrap();
        engine.pause(t0() + Duration::minutes(5)).unwrap();
        let banked = engine.snapshot().accumulated_pause_millis;

        let second = engine.pause(t0() + Duration::minutes(9));
        assert!(matches!(
            second,
            Err(CoreError::InvalidTransition { action: "pause", .. })
        ));
        assert_eq!(engine.snapshot().accumulated_pause_millis, banked);
    }

    #[test]
    fn tick_completes_exactly_once() {
        let mut engine = TimerEngine::new();
        engine.start(25, t0()).unwrap();

        assert!(engine.tick(t0() + Duration::minutes(24)).is_none());
        let done = engine.tick(t0() + Duration::minutes(25));
        assert!(matches!(
            done,
            Some(Event::TimerCompleted { duration_min: 25, .. })
        ));
        assert_eq!(engine.phase(), TimerPhase::Completed);
        assert!(engine.tick(t0() + Duration::minutes(26)).is_none());
        assert!(engine.tick(t0() + Duration::hours(3)).is_none());
    }

    #[test]
    fn sparse_ticks_do_not_drift() {
        // A suspended host may tick once after a long gap.
        let mut engine = TimerEngine::new();
        engine.start(60, t0()).unwrap();
        assert!(engine.tick(t0() + Duration::seconds(1)).is_none());
        assert!(engine.tick(t0() + Duration::minutes(40)).is_none());
        assert_eq!(engine.remaining_secs(t0() + Duration::minutes(40)), 20 * 60);
    }

    #[test]
    fn pause_after_zero_completes_instead() {
        let mut engine = TimerEngine::new();
        engine.start(1, t0()).unwrap();
        let event = engine.pause(t0() + Duration::minutes(2)).unwrap();
        assert!(matches!(event, Event::TimerCompleted { .. }));
        assert_eq!(engine.phase(), TimerPhase::Completed);
    }

    #[test]
    fn stop_clears_everything() {
        let mut engine = TimerEngine::new();
        engine.start(25, t0()).unwrap();
        engine.pause(t0() + Duration::minutes(1)).unwrap();
        engine.stop(t0() + Duration::minutes(2)).unwrap();
        assert_eq!(engine.snapshot(), TimerSnapshot::idle());
        assert!(engine.stop(t0()).is_err());
    }

    #[test]
    fn acknowledge_returns_original_start() {
        let mut engine = TimerEngine::new();
        engine.start(1, t0()).unwrap();
        engine.pause(t0() + Duration::seconds(30)).unwrap();
        engine.resume(t0() + Duration::minutes(10)).unwrap();
        engine.tick(t0() + Duration::minutes(11)).unwrap();

        let finished = engine.acknowledge().unwrap();
        assert_eq!(finished.started_at, t0());
        assert_eq!(finished.duration_min, 1);
        assert_eq!(engine.phase(), TimerPhase::Idle);
    }

    #[test]
    fn restore_running_past_zero_reports_missed_completion() {
        let mut engine = TimerEngine::new();
        engine.start(25, t0()).unwrap();
        let snapshot = engine.snapshot();

        let now = t0() + Duration::minutes(25) + Duration::seconds(1);
        let (restored, event) = TimerEngine::restore_from_snapshot(snapshot, now);
        assert_eq!(restored.phase(), TimerPhase::Completed);
        match event {
            Some(Event::MissedCompletion {
                duration_min,
                completed_at,
                ..
            }) => {
                assert_eq!(duration_min, 25);
                assert_eq!(completed_at, t0() + Duration::minutes(25));
            }
            other => panic!("Expected MissedCompletion, got {other:?}"),
        }

        // Restoring the completed state again does not re-alert.
        let (_, again) = TimerEngine::restore_from_snapshot(restored.snapshot(), now);
        assert!(again.is_none());
    }

    #[test]
    fn restore_running_before_zero_keeps_counting() {
        let mut engine = TimerEngine::new();
        engine.start(25, t0()).unwrap();
        let (restored, event) =
            TimerEngine::restore_from_snapshot(engine.snapshot(), t0() + Duration::minutes(10));
        assert!(event.is_none());
        assert_eq!(restored.phase(), TimerPhase::Running);
        assert_eq!(restored.remaining_secs(t0() + Duration::minutes(10)), 15 * 60);
    }

    #[test]
    fn restore_paused_ignores_wall_clock() {
        let mut engine = TimerEngine::new();
        engine.start(25, t0()).unwrap();
        engine.pause(t0() + Duration::minutes(5)).unwrap();
        let (restored, event) =
            TimerEngine::restore_from_snapshot(engine.snapshot(), t0() + Duration::days(2));
        assert!(event.is_none());
        assert_eq!(restored.phase(), TimerPhase::Paused);
        assert_eq!(restored.remaining_secs(t0() + Duration::days(2)), 20 * 60);
    }

    #[test]
    fn restore_discards_malformed_snapshot() {
        let snapshot = TimerSnapshot {
            phase: TimerPhase::Running,
            ..TimerSnapshot::idle()
        };
        let (restored, event) = TimerEngine::restore_from_snapshot(snapshot, t0());
        assert_eq!(restored.phase(), TimerPhase::Idle);
        assert!(event.is_none());
    }

    #[test]
    fn snapshot_json_uses_camel_case() {
        let mut engine = TimerEngine::new();
        engine.start(25, t0()).unwrap();
        let json = serde_json::to_value(engine.snapshot()).unwrap();
        assert_eq!(json["phase"], "running");
        assert_eq!(json["plannedDurationSeconds"], 1500);
        assert_eq!(json["startEpochMillis"], t0().timestamp_millis());
        assert_eq!(json["accumulatedPauseMillis"], 0);
    }

    proptest! {
        #[test]
        fn fresh_start_reports_full_duration(minutes in 1i64..=24 * 60) {
            let mut engine = TimerEngine::new();
            engine.start(minutes, t0()).unwrap();
            prop_assert!(engine.tick(t0()).is_none());
            prop_assert_eq!(engine.remaining_secs(t0()), minutes as u64 * 60);
        }

        #[test]
        fn remaining_never_increases(minutes in 1i64..=120, a in 0i64..10_000, b in 0i64..10_000) {
            let mut engine = TimerEngine::new();
            engine.start(minutes, t0()).unwrap();
            let (early, late) = if a <= b { (a, b) } else { (b, a) };
            let r1 = engine.remaining_secs(t0() + Duration::seconds(early));
            let r2 = engine.remaining_secs(t0() + Duration::seconds(late));
            prop_assert!(r2 <= r1);
        }

        #[test]
        fn pause_resume_preserves_remaining(minutes in 2i64..=120, run in 0i64..60, gap in 0i64..100_000) {
            let mut engine = TimerEngine::new();
            engine.start(minutes, t0()).unwrap();
            let paused_at = t0() + Duration::seconds(run);
            engine.pause(paused_at).unwrap();
            let before = engine.remaining_secs(paused_at);
            let resumed_at = paused_at + Duration::seconds(gap);
            engine.resume(resumed_at).unwrap();
            prop_assert_eq!(engine.remaining_secs(resumed_at), before);
        }
    }
}
