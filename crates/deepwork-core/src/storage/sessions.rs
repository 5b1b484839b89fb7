//! Session records.
//!
//! Sessions are append-only: they are created when a countdown finishes and
//! the user rates it, edited only through [`SessionPatch`] (rating and notes),
//! and removed only by explicit delete.

use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::database::Database;
use crate::clock::day_bounds;
use crate::error::{CoreError, Result, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    /// Minutes.
    pub duration: u32,
    /// Subjective focus score, 1..=5.
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Session {
    pub fn hours(&self) -> f64 {
        f64::from(self.duration) / 60.0
    }
}

/// Input for [`Database::add_session`]. Numeric fields are wide so that
/// malformed input can be rejected rather than truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub start_time: DateTime<Utc>,
    pub duration: i64,
    pub rating: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewSession {
    pub fn new(start_time: DateTime<Utc>, duration: i64, rating: i64) -> Self {
        Self {
            start_time,
            duration,
            rating,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Validate and narrow to `(duration, rating, notes)`.
    pub(crate) fn validate(&self) -> Result<(u32, u8, Option<String>), ValidationError> {
        if self.duration <= 0 || self.duration > i64::from(u32::MAX) {
            return Err(ValidationError::NonPositiveDuration(self.duration));
        }
        let rating = validate_rating(self.rating)?;
        Ok((self.duration as u32, rating, normalize_notes(self.notes.as_deref())))
    }
}

/// Partial edit of a session. `None` leaves the field unchanged; an empty
/// notes string clears the notes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPatch {
    pub rating: Option<i64>,
    pub notes: Option<String>,
}

pub(crate) fn validate_rating(rating: i64) -> Result<u8, ValidationError> {
    if !(1..=5).contains(&rating) {
        return Err(ValidationError::RatingOutOfRange(rating));
    }
    Ok(rating as u8)
}

fn normalize_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Sortable storage form: UTC, millisecond precision, `Z` suffix.
pub(crate) fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let started_at: String = row.get(1)?;
    Ok(Session {
        id: row.get(0)?,
        start_time: decode_time(&started_at)?,
        duration: row.get(2)?,
        rating: row.get(3)?,
        notes: row.get(4)?,
    })
}

const SELECT_SESSION: &str = "SELECT id, started_at, duration_min, rating, notes FROM sessions";

impl Database {
    /// Record a completed session; returns the assigned id.
    ///
    /// # Errors
    /// `InvalidSession` when the duration is not positive or the rating is
    /// outside 1..=5.
    pub fn add_session(&self, session: &NewSession) -> Result<i64> {
        let (duration, rating, notes) = session.validate()?;
        self.conn().execute(
            "INSERT INTO sessions (started_at, duration_min, rating, notes)
             VALUES (?1, ?2, ?3, ?4)",
            params![encode_time(session.start_time), duration, rating, notes],
        )?;
        let id = self.conn().last_insert_rowid();
        tracing::debug!(id, duration, rating, "session recorded");
        Ok(id)
    }

    /// All sessions, newest first.
    pub fn all_sessions(&self) -> Result<Vec<Session>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("{SELECT_SESSION} ORDER BY started_at DESC, id DESC"))?;
        let rows = stmt.query_map([], row_to_session)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_session(&self, id: i64) -> Result<Option<Session>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("{SELECT_SESSION} WHERE id = ?1"))?;
        Ok(stmt.query_row(params![id], row_to_session).optional()?)
    }

    /// Sessions starting in `[from, to)`, oldest first.
    pub fn sessions_in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Session>> {
        let mut stmt = self.conn().prepare(&format!(
            "{SELECT_SESSION} WHERE started_at >= ?1 AND started_at < ?2 ORDER BY started_at ASC, id ASC"
        ))?;
        let rows = stmt.query_map(params![encode_time(from), encode_time(to)], row_to_session)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn session_count(&self) -> Result<u64> {
        Ok(self
            .conn()
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?)
    }

    /// Minutes recorded on the local calendar day containing `now`.
    pub fn today_total(&self, now: DateTime<Utc>) -> Result<u32> {
        self.day_total(now.with_timezone(&Local))
    }

    /// Minutes recorded on the calendar day containing `now`, in `now`'s timezone.
    pub fn day_total<Tz: TimeZone>(&self, now: DateTime<Tz>) -> Result<u32> {
        let (start, end) = day_bounds(&now.timezone(), now.date_naive());
        let total: i64 = self.conn().query_row(
            "SELECT COALESCE(SUM(duration_min), 0) FROM sessions
             WHERE started_at >= ?1 AND started_at < ?2",
            params![encode_time(start), encode_time(end)],
            |row| row.get(0),
        )?;
        Ok(u32::try_from(total).unwrap_or(u32::MAX))
    }

    /// Apply a rating/notes edit.
    ///
    /// # Errors
    /// `NotFound` if no session has `id`; `InvalidSession` on a bad rating.
    pub fn update_session(&self, id: i64, patch: &SessionPatch) -> Result<Session> {
        let rating = patch.rating.map(validate_rating).transpose()?;
        let mut current = self.get_session(id)?.ok_or(CoreError::NotFound { id })?;

        if let Some(rating) = rating {
            current.rating = rating;
        }
        if let Some(notes) = patch.notes.as_deref() {
            current.notes = normalize_notes(Some(notes));
        }
        self.conn().execute(
            "UPDATE sessions SET rating = ?1, notes = ?2 WHERE id = ?3",
            params![current.rating, current.notes, id],
        )?;
        Ok(current)
    }

    /// Delete a session. Deleting an absent id is not an error; returns
    /// whether a row was removed.
    pub fn delete_session(&self, id: i64) -> Result<bool> {
        let removed = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}
