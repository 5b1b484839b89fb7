use std::path::PathBuf;

use clap::Subcommand;
use deepwork_core::storage::BackupCounters;
use deepwork_core::{Config, Database};

use super::print_json;

#[derive(Subcommand)]
pub enum BackupAction {
    /// Write a backup document (stdout unless --output is given)
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Merge a backup file into the store without overwriting anything
    Import { path: PathBuf },
    /// Show automatic backup progress
    Status,
}

pub fn run(action: BackupAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        BackupAction::Export { output } => {
            let document = db.export(chrono::Utc::now())?;
            match output {
                Some(path) => {
                    std::fs::write(&path, serde_json::to_string_pretty(&document)?)?;
                    print_json(&serde_json::json!({
                        "path": path,
                        "totalSessions": document.total_sessions,
                    }))?;
                }
                None => print_json(&document)?,
            }
        }
        BackupAction::Import { path } => {
            let text = std::fs::read_to_string(&path)?;
            let summary = db.import_merge_str(&text)?;
            print_json(&summary)?;
        }
        BackupAction::Status => {
            let config = Config::load()?;
            let counters = BackupCounters::load(&db)?;
            let due = config
                .backup_policy()
                .is_due(&counters, chrono::Utc::now());
            print_json(&serde_json::json!({
                "auto": config.backup.auto,
                "directory": config.backup_dir()?,
                "sessionsCompletedSinceBackup": counters.sessions_completed_since_backup,
                "lastBackupTimestamp": counters.last_backup_timestamp,
                "due": due,
            }))?;
        }
    }
    Ok(())
}
