//! Analytics over sessions read back from the store.

use chrono::{NaiveDate, TimeZone, Utc};
use deepwork_core::stats::{month_over_month, monthly_heatmap, progress_series, summarize, TimeRange};
use deepwork_core::{Database, NewSession};

#[test]
fn test_heatmap_scenario_from_store() {
    let db = Database::open_memory().unwrap();
    db.add_session(&NewSession::new(
        Utc.with_ymd_and_hms(2024, 6, 12, 9, 0, 0).unwrap(),
        30,
        4,
    ))
    .unwrap();
    db.add_session(&NewSession::new(
        Utc.with_ymd_and_hms(2024, 6, 12, 15, 0, 0).unwrap(),
        60,
        2,
    ))
    .unwrap();
    let sessions = db.all_sessions().unwrap();

    let june = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let days = monthly_heatmap(&sessions, june, &Utc);
    assert_eq!(days.len(), 30);
    let day = days
        .iter()
        .find(|d| d.date == NaiveDate::from_ymd_opt(2024, 6, 12).unwrap())
        .unwrap();
    assert_eq!(day.productivity, 4.0);
    assert_eq!(day.sessions, 2);

    let stats = month_over_month(&sessions, june, &Utc);
    assert_eq!(stats.average_score, 2.67);
    assert_eq!(stats.percentage_change, 0.0);

    let now = Utc.with_ymd_and_hms(2024, 6, 14, 18, 0, 0).unwrap();
    let week = progress_series(&sessions, TimeRange::Week, now);
    assert_eq!(week.last().unwrap().cumulative_hours, 1.5);

    let summary = summarize(&sessions, now);
    assert_eq!(summary.total_minutes, 90);
    assert_eq!(summary.today_minutes, 0);
}
