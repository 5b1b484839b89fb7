use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use super::heatmap::weighted_rating;
use super::{local_date, round2};
use crate::storage::Session;

/// Headline numbers for the whole history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_sessions: usize,
    pub total_minutes: u64,
    pub total_hours: f64,
    pub today_minutes: u64,
    /// Duration-weighted average rating; 0 without sessions.
    pub average_rating: f64,
}

pub fn summarize<Tz: TimeZone>(sessions: &[Session], now: DateTime<Tz>) -> Summary {
    let tz = now.timezone();
    let today = now.date_naive();

    let total_minutes: u64 = sessions.iter().map(|s| u64::from(s.duration)).sum();
    let today_minutes: u64 = sessions
        .iter()
        .filter(|s| local_date(&tz, s) == today)
        .map(|s| u64::from(s.duration))
        .sum();

    Summary {
        total_sessions: sessions.len(),
        total_minutes,
        total_hours: round2(total_minutes as f64 / 60.0),
        today_minutes,
        average_rating: round2(weighted_rating(sessions, &tz, NaiveDate::MIN, NaiveDate::MAX)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn totals_and_weighted_rating() {
        let at = |d: u32| Utc.with_ymd_and_hms(2024, 1, d, 9, 0, 0).unwrap();
        let sessions = vec![
            Session {
                id: 1,
                start_time: at(1),
                duration: 25,
                rating: 4,
                notes: None,
            },
            Session {
                id: 2,
                start_time: at(2),
                duration: 75,
                rating: 2,
                notes: None,
            },
        ];

        let summary = summarize(&sessions, at(2));
        assert_eq!(summary.total_sessions, 2);
        assert_eq!(summary.total_minutes, 100);
        assert_eq!(summary.total_hours, 1.67);
        assert_eq!(summary.today_minutes, 75);
        assert_eq!(summary.average_rating, 2.5);
    }

    #[test]
    fn empty_history() {
        let summary = summarize(&[], Utc::now());
        assert_eq!(summary.total_sessions, 0);
        assert_eq!(summary.average_rating, 0.0);
    }
}
