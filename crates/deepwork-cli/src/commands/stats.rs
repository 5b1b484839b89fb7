use chrono::{Local, NaiveDate};
use clap::Subcommand;
use deepwork_core::stats::{month_over_month, monthly_heatmap, progress_series, summarize, TimeRange};
use deepwork_core::storage::Database;

use super::print_json;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Cumulative hours over a range (week, month, 6months, year, 5years)
    Range {
        #[arg(default_value = "week")]
        range: TimeRange,
    },
    /// Per-day hours and focus score for a month
    Heatmap {
        /// Month as YYYY-MM (defaults to the current month)
        #[arg(long, value_parser = parse_month)]
        month: Option<NaiveDate>,
    },
    /// Weighted focus score against the previous month
    Monthly {
        #[arg(long, value_parser = parse_month)]
        month: Option<NaiveDate>,
    },
    /// All-time totals
    Summary,
}

fn parse_month(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
        .map_err(|_| format!("'{raw}' is not a YYYY-MM month"))
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let sessions = db.all_sessions()?;
    let now = Local::now();

    match action {
        StatsAction::Range { range } => {
            print_json(&progress_series(&sessions, range, now))?;
        }
        StatsAction::Heatmap { month } => {
            let month = month.unwrap_or_else(|| now.date_naive());
            print_json(&monthly_heatmap(&sessions, month, &Local))?;
        }
        StatsAction::Monthly { month } => {
            let month = month.unwrap_or_else(|| now.date_naive());
            print_json(&month_over_month(&sessions, month, &Local))?;
        }
        StatsAction::Summary => {
            print_json(&summarize(&sessions, now))?;
        }
    }
    Ok(())
}
