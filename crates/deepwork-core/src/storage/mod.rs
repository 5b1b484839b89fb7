mod backup;
mod config;
pub mod database;
mod kv;
pub mod migrations;
mod sessions;
mod settings;
mod snapshot;

pub use backup::{
    write_backup_file, AutoBackupPolicy, BackupCounters, BackupDocument, ImportSummary,
    BACKUP_VERSION,
};
pub use config::{AlarmConfig, BackupConfig, Config, TimerConfig};
pub use database::Database;
pub use kv::{KeyValueStore, MemoryStore};
pub use sessions::{NewSession, Session, SessionPatch};
pub use settings::{DefaultDuration, Settings, SettingsStore, SoundType, SETTINGS_KEY};
pub use snapshot::{RestoredTimer, SnapshotStore, SNAPSHOT_KEY};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory.
///
/// `DEEPWORK_DATA_DIR` overrides the location entirely; otherwise this is
/// `~/.config/deepwork[-dev]/`, with `DEEPWORK_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("DEEPWORK_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("DEEPWORK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("deepwork-dev")
            } else {
                base_dir.join("deepwork")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
