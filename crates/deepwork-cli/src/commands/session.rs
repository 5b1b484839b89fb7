use clap::Subcommand;
use deepwork_core::{Database, SessionPatch};

use super::print_json;

#[derive(Subcommand)]
pub enum SessionAction {
    /// List recorded sessions, newest first
    List {
        /// Show at most this many sessions
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Minutes recorded today (local calendar day)
    Today,
    /// Change a session's rating or notes
    Edit {
        id: i64,
        #[arg(long)]
        rating: Option<i64>,
        /// New notes; an empty string clears them
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a session (succeeds if it is already gone)
    Delete { id: i64 },
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        SessionAction::List { limit } => {
            let mut sessions = db.all_sessions()?;
            if let Some(limit) = limit {
                sessions.truncate(limit);
            }
            print_json(&sessions)?;
        }
        SessionAction::Today => {
            let minutes = db.today_total(chrono::Utc::now())?;
            print_json(&serde_json::json!({ "todayMinutes": minutes }))?;
        }
        SessionAction::Edit { id, rating, notes } => {
            let session = db.update_session(id, &SessionPatch { rating, notes })?;
            print_json(&session)?;
        }
        SessionAction::Delete { id } => {
            let removed = db.delete_session(id)?;
            print_json(&serde_json::json!({ "id": id, "removed": removed }))?;
        }
    }
    Ok(())
}
