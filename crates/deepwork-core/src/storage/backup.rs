//! Backup export and merge-import.
//!
//! Import never overwrites: incoming sessions whose `(startTime, duration,
//! rating)` already exist are skipped, the rest are appended with fresh ids,
//! and settings are merged key by key. The whole import runs in one
//! transaction and validates the document before touching any row, so a
//! rejected document leaves the store exactly as it was.
//!
//! Two distinct sessions that share start time, duration and rating are
//! treated as duplicates. This is a known limitation of the content key.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::database::Database;
use super::kv::KeyValueStore;
use super::sessions::{encode_time, NewSession, Session};
use super::settings::{merge_settings, parse_settings_blob, SETTINGS_KEY};
use crate::error::{CoreError, Result};

pub const BACKUP_VERSION: &str = "1.0";

const COUNTER_SESSIONS_KEY: &str = "backup_sessions_since";
const COUNTER_LAST_KEY: &str = "backup_last_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub total_sessions: usize,
    pub sessions: Vec<Session>,
    pub settings: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: usize,
    pub duplicates_skipped: usize,
    pub existing_kept: usize,
}

type DuplicateKey = (i64, u32, u8);

fn duplicate_key(start: DateTime<Utc>, duration: u32, rating: u8) -> DuplicateKey {
    (start.timestamp_millis(), duration, rating)
}

/// A session from an incoming document, validated but not yet stored.
struct IncomingSession {
    start_time: DateTime<Utc>,
    duration: u32,
    rating: u8,
    notes: Option<String>,
}

/// Schema check for an incoming document. Nothing is written here.
fn parse_document(document: &Value) -> Result<(Vec<IncomingSession>, Map<String, Value>)> {
    let obj = document
        .as_object()
        .ok_or_else(|| CoreError::InvalidFormat("backup must be a JSON object".into()))?;

    let version = obj
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::InvalidFormat("missing version".into()))?;
    let major = version.split('.').next().unwrap_or_default();
    if major != "1" {
        return Err(CoreError::InvalidFormat(format!(
            "unsupported backup version '{version}'"
        )));
    }

    let raw_sessions = obj
        .get("sessions")
        .and_then(Value::as_array)
        .ok_or_else(|| CoreError::InvalidFormat("sessions must be an array".into()))?;

    let settings = match obj.get("settings") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return Err(CoreError::InvalidFormat("settings must be an object".into())),
    };

    let mut sessions = Vec::with_capacity(raw_sessions.len());
    for (index, raw) in raw_sessions.iter().enumerate() {
        let parsed: NewSession = serde_json::from_value(raw.clone())
            .map_err(|e| CoreError::InvalidFormat(format!("session {index}: {e}")))?;
        let (duration, rating, notes) = parsed
            .validate()
            .map_err(|e| CoreError::InvalidFormat(format!("session {index}: {e}")))?;
        sessions.push(IncomingSession {
            start_time: parsed.start_time,
            duration,
            rating,
            notes,
        });
    }
    Ok((sessions, settings))
}

impl Database {
    /// Build a versioned backup of every session plus the settings object.
    pub fn export(&self, now: DateTime<Utc>) -> Result<BackupDocument> {
        let sessions = self.all_sessions()?;
        let settings = parse_settings_blob(self.kv_get(SETTINGS_KEY)?.as_deref());
        Ok(BackupDocument {
            version: BACKUP_VERSION.to_string(),
            export_date: now,
            total_sessions: sessions.len(),
            sessions,
            settings,
        })
    }

    /// Merge a backup document into the store.
    ///
    /// # Errors
    /// `InvalidFormat` when the version or sessions shape is wrong; the store
    /// is left unmodified.
    pub fn import_merge(&self, document: &Value) -> Result<ImportSummary> {
        let (incoming, incoming_settings) = parse_document(document)?;

        let tx = self.conn().unchecked_transaction()?;

        let mut seen: HashSet<DuplicateKey> = HashSet::new();
        let existing_kept = {
            let mut stmt = tx.prepare("SELECT started_at, duration_min, rating FROM sessions")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u8>(2)?,
                ))
            })?;
            let mut count = 0;
            for row in rows {
                let (started_at, duration, rating) = row?;
                count += 1;
                match DateTime::parse_from_rfc3339(&started_at) {
                    Ok(start) => {
                        seen.insert(duplicate_key(start.with_timezone(&Utc), duration, rating));
                    }
                    Err(e) => tracing::warn!(started_at, "unparseable stored start time: {e}"),
                }
            }
            count
        };

        let mut summary = ImportSummary {
            existing_kept,
            ..ImportSummary::default()
        };
        {
            let mut insert = tx.prepare(
                "INSERT INTO sessions (started_at, duration_min, rating, notes)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for session in &incoming {
                let key = duplicate_key(session.start_time, session.duration, session.rating);
                if !seen.insert(key) {
                    summary.duplicates_skipped += 1;
                    continue;
                }
                insert.execute(params![
                    encode_time(session.start_time),
                    session.duration,
                    session.rating,
                    session.notes,
                ])?;
                summary.imported += 1;
            }
        }

        if !incoming_settings.is_empty() {
            let stored: Option<String> = tx
                .query_row(
                    "SELECT value FROM kv WHERE key = ?1",
                    params![SETTINGS_KEY],
                    |row| row.get(0),
                )
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            let merged = merge_settings(
                &parse_settings_blob(stored.as_deref()),
                &incoming_settings,
            );
            tx.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![SETTINGS_KEY, serde_json::to_string(&merged)?],
            )?;
        }

        tx.commit()?;
        tracing::info!(
            imported = summary.imported,
            duplicates = summary.duplicates_skipped,
            existing = summary.existing_kept,
            "backup merged"
        );
        Ok(summary)
    }

    /// Parse a backup file's text and merge it.
    pub fn import_merge_str(&self, json: &str) -> Result<ImportSummary> {
        let document: Value = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidFormat(format!("not valid JSON: {e}")))?;
        self.import_merge(&document)
    }
}

/// Write `document` as `deepwork-backup-YYYY-MM-DD.json` in `dir`.
pub fn write_backup_file(dir: &Path, document: &BackupDocument) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let name = format!(
        "deepwork-backup-{}.json",
        document.export_date.format("%Y-%m-%d")
    );
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(document)?)?;
    Ok(path)
}

/// Progress toward the next automatic backup. Not part of exports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupCounters {
    pub sessions_completed_since_backup: u32,
    pub last_backup_timestamp: Option<DateTime<Utc>>,
}

impl BackupCounters {
    pub fn load<S: KeyValueStore>(store: &S) -> Result<Self> {
        let sessions = store
            .kv_get(COUNTER_SESSIONS_KEY)?
            .and_then(|raw| raw.parse::<u32>().ok())
            .unwrap_or(0);
        let last = store
            .kv_get(COUNTER_LAST_KEY)?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Ok(Self {
            sessions_completed_since_backup: sessions,
            last_backup_timestamp: last,
        })
    }

    pub fn save<S: KeyValueStore>(&self, store: &S) -> Result<()> {
        store.kv_set(
            COUNTER_SESSIONS_KEY,
            &self.sessions_completed_since_backup.to_string(),
        )?;
        match self.last_backup_timestamp {
            Some(at) => store.kv_set(COUNTER_LAST_KEY, &encode_time(at))?,
            None => store.kv_remove(COUNTER_LAST_KEY)?,
        }
        Ok(())
    }

    pub fn record_session(&mut self) {
        self.sessions_completed_since_backup = self.sessions_completed_since_backup.saturating_add(1);
    }

    pub fn mark_backed_up(&mut self, at: DateTime<Utc>) {
        self.sessions_completed_since_backup = 0;
        self.last_backup_timestamp = Some(at);
    }
}

/// When an automatic backup is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoBackupPolicy {
    pub interval: chrono::Duration,
    pub session_threshold: u32,
}

impl Default for AutoBackupPolicy {
    fn default() -> Self {
        Self {
            interval: chrono::Duration::hours(24),
            session_threshold: 10,
        }
    }
}

impl AutoBackupPolicy {
    /// Due when the interval has elapsed since the last backup (or there never
    /// was one) or enough sessions accumulated.
    pub fn is_due(&self, counters: &BackupCounters, now: DateTime<Utc>) -> bool {
        let time_due = match counters.last_backup_timestamp {
            Some(last) => now - last >= self.interval,
            None => true,
        };
        time_due || counters.sessions_completed_since_backup >= self.session_threshold
    }
}
