//! TOML-based application configuration.
//!
//! Holds host-level knobs that are not user settings:
//! - Tick and snapshot cadence of the running timer
//! - Automatic backup interval, session threshold and target directory
//! - Alarm repeat interval
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::backup::AutoBackupPolicy;
use super::data_dir;
use crate::error::ConfigError;

/// Timer cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// How often a running countdown is snapshotted between transitions.
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,
}

/// Automatic backup configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_true")]
    pub auto: bool,
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u32,
    #[serde(default = "default_session_threshold")]
    pub session_threshold: u32,
    /// Defaults to `<data dir>/backups` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmConfig {
    #[serde(default = "default_repeat_interval_ms")]
    pub repeat_interval_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub alarm: AlarmConfig,
}

/// One day; a running countdown is never left unsnapshotted for longer.
const MAX_SNAPSHOT_INTERVAL_SECS: u64 = 86_400;

fn default_tick_interval_ms() -> u64 {
    100
}
fn default_snapshot_interval_secs() -> u64 {
    5
}
fn default_true() -> bool {
    true
}
fn default_interval_hours() -> u32 {
    24
}
fn default_session_threshold() -> u32 {
    10
}
fn default_repeat_interval_ms() -> u64 {
    1000
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            snapshot_interval_secs: default_snapshot_interval_secs(),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            auto: true,
            interval_hours: default_interval_hours(),
            session_threshold: default_session_threshold(),
            directory: None,
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            repeat_interval_ms: default_repeat_interval_ms(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parents) = parents {
            for part in parents.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }
        let obj = current.as_object_mut().ok_or_else(unknown)?;

        // Optional fields are absent from the serialized form until set.
        let new_value = match obj.get(leaf) {
            Some(serde_json::Value::Bool(_)) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|e| invalid(e.to_string()))?,
            ),
            Some(serde_json::Value::Number(_)) => value
                .parse::<u64>()
                .map(|n| serde_json::Value::Number(n.into()))
                .map_err(|_| invalid(format!("cannot parse '{value}' as a non-negative integer")))?,
            Some(serde_json::Value::Object(_)) | Some(serde_json::Value::Array(_)) => {
                return Err(invalid("cannot replace a whole section".into()));
            }
            Some(_) => serde_json::Value::String(value.into()),
            None if key == "backup.directory" => serde_json::Value::String(value.into()),
            None => return Err(unknown()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    /// `<data dir>/config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the default
    /// config cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Self = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without persisting.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse as
    /// the field's type.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive = |key: &str, value: u64| {
            if value == 0 {
                Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".into(),
                })
            } else {
                Ok(())
            }
        };
        positive("timer.tick_interval_ms", self.timer.tick_interval_ms)?;
        positive("timer.snapshot_interval_secs", self.timer.snapshot_interval_secs)?;
        if self.timer.snapshot_interval_secs > MAX_SNAPSHOT_INTERVAL_SECS {
            return Err(ConfigError::InvalidValue {
                key: "timer.snapshot_interval_secs".into(),
                message: format!("must be at most {MAX_SNAPSHOT_INTERVAL_SECS}"),
            });
        }
        positive("alarm.repeat_interval_ms", self.alarm.repeat_interval_ms)?;
        positive("backup.interval_hours", u64::from(self.backup.interval_hours))?;
        positive(
            "backup.session_threshold",
            u64::from(self.backup.session_threshold),
        )
    }


    pub fn backup_policy(&self) -> AutoBackupPolicy {
        AutoBackupPolicy {
            interval: chrono::Duration::hours(i64::from(self.backup.interval_hours)),
            session_threshold: self.backup.session_threshold,
        }
    }

    /// Where automatic backups are written.
    pub fn backup_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.backup.directory {
            Some(dir) => Ok(dir.clone()),
            None => Ok(data_dir()?.join("backups")),
        }
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timer.tick_interval_ms)
    }

    pub fn snapshot_interval(&self) -> chrono::Duration {
        i64::try_from(self.timer.snapshot_interval_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn alarm_repeat_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.alarm.repeat_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.timer.tick_interval_ms, 100);
        assert_eq!(parsed.alarm.repeat_interval_ms, 1000);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[backup]\nsession_threshold = 3\n").unwrap();
        assert_eq!(parsed.backup.session_threshold, 3);
        assert_eq!(parsed.backup.interval_hours, 24);
        assert_eq!(parsed.timer.snapshot_interval_secs, 5);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("backup.auto").as_deref(), Some("true"));
        assert_eq!(cfg.get("timer.tick_interval_ms").as_deref(), Some("100"));
        assert!(cfg.get("timer.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set_value("backup.auto", "false").unwrap();
        cfg.set_value("backup.interval_hours", "12").unwrap();
        cfg.set_value("backup.directory", "/tmp/deepwork-backups").unwrap();
        assert!(!cfg.backup.auto);
        assert_eq!(cfg.backup.interval_hours, 12);
        assert_eq!(
            cfg.backup.directory.as_deref(),
            Some(Path::new("/tmp/deepwork-backups"))
        );
        assert_eq!(cfg.backup_policy().interval, chrono::Duration::hours(12));
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set_value("timer.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set_value("backup.auto", "not_a_bool"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set_value("timer.tick_interval_ms", "0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.set_value("timer", "{}").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg;
        changed.alarm.repeat_interval_ms = 2000;
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().alarm.repeat_interval_ms, 2000);
    }

    #[test]
    fn load_from_rejects_out_of_range_intervals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "[alarm]\nrepeat_interval_ms = 0\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "alarm.repeat_interval_ms"
        ));

        std::fs::write(&path, "[timer]\ntick_interval_ms = 0\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "timer.tick_interval_ms"
        ));

        std::fs::write(&path, "[timer]\nsnapshot_interval_secs = 1000000000000000000\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "timer.snapshot_interval_secs"
        ));
    }

    #[test]
    fn snapshot_interval_saturates_instead_of_panicking() {
        let mut cfg = Config::default();
        cfg.timer.snapshot_interval_secs = u64::MAX;
        assert_eq!(cfg.snapshot_interval(), chrono::Duration::MAX);
        assert_eq!(Config::default().snapshot_interval(), chrono::Duration::seconds(5));
    }

    #[test]
    fn load_from_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timer = 3").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
