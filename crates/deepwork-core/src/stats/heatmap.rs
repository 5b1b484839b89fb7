//! Calendar heatmap and month-over-month focus score.
//!
//! The productivity score of a day is `Σ rating × hours`; the monthly average
//! score is that sum divided by the hours, i.e. a duration-weighted rating.

use chrono::{Datelike, Days, Months, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use super::{local_date, round1, round2};
use crate::storage::Session;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapDay {
    pub date: NaiveDate,
    pub hours: f64,
    pub productivity: f64,
    pub sessions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyComparison {
    pub average_score: f64,
    pub previous_average: f64,
    /// Percent change against the previous month; 0 when it had no sessions.
    pub percentage_change: f64,
}

/// First and one-past-last day of the month containing `date`.
fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let next = first.checked_add_months(Months::new(1)).unwrap_or(first);
    (first, next)
}

/// One cell per day of the month containing `month`, in `tz`'s calendar.
pub fn monthly_heatmap<Tz: TimeZone>(
    sessions: &[Session],
    month: NaiveDate,
    tz: &Tz,
) -> Vec<HeatmapDay> {
    let (first, next) = month_bounds(month);
    let mut days: Vec<HeatmapDay> = first
        .iter_days()
        .take_while(|d| *d < next)
        .map(|date| HeatmapDay {
            date,
            hours: 0.0,
            productivity: 0.0,
            sessions: 0,
        })
        .collect();

    for session in sessions {
        let date = local_date(tz, session);
        if date < first || date >= next {
            continue;
        }
        let index = (date - first).num_days() as usize;
        if let Some(day) = days.get_mut(index) {
            let hours = session.hours();
            day.hours += hours;
            day.productivity += f64::from(session.rating) * hours;
            day.sessions += 1;
        }
    }

    for day in &mut days {
        day.productivity = if day.hours > 0.0 {
            round2(day.productivity)
        } else {
            0.0
        };
        day.hours = round2(day.hours);
    }
    days
}

/// Duration-weighted rating over sessions in `[from, to)`; 0 without sessions.
pub(crate) fn weighted_rating<Tz: TimeZone>(
    sessions: &[Session],
    tz: &Tz,
    from: NaiveDate,
    to: NaiveDate,
) -> f64 {
    let (score, hours) = sessions
        .iter()
        .filter(|s| {
            let date = local_date(tz, s);
            date >= from && date < to
        })
        .fold((0.0, 0.0), |(score, hours), s| {
            (score + f64::from(s.rating) * s.hours(), hours + s.hours())
        });
    if hours > 0.0 {
        score / hours
    } else {
        0.0
    }
}

/// Weighted average rating of the month containing `month` against the month
/// before it.
pub fn month_over_month<Tz: TimeZone>(
    sessions: &[Session],
    month: NaiveDate,
    tz: &Tz,
) -> MonthlyComparison {
    let (first, next) = month_bounds(month);
    let previous = first
        .checked_sub_days(Days::new(1))
        .map(month_bounds)
        .unwrap_or((first, first));

    let current = weighted_rating(sessions, tz, first, next);
    let prior = weighted_rating(sessions, tz, previous.0, previous.1);
    let change = if prior > 0.0 {
        (current - prior) / prior * 100.0
    } else {
        0.0
    };

    MonthlyComparison {
        average_score: round2(current),
        previous_average: round2(prior),
        percentage_change: round1(change),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn session(d: u32, hour: u32, minutes: u32, rating: u8) -> Session {
        Session {
            id: i64::from(d * 100 + hour),
            start_time: Utc.with_ymd_and_hms(2024, 2, d, hour, 0, 0).unwrap(),
            duration: minutes,
            rating,
            notes: None,
        }
    }

    fn feb() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()
    }

    #[test]
    fn productivity_is_rating_times_hours() {
        let sessions = vec![session(5, 9, 30, 4), session(5, 14, 60, 2)];
        let days = monthly_heatmap(&sessions, feb(), &Utc);

        assert_eq!(days.len(), 29);
        let day = &days[4];
        assert_eq!(day.date, NaiveDate::from_ymd_opt(2024, 2, 5).unwrap());
        assert_eq!(day.sessions, 2);
        assert_eq!(day.hours, 1.5);
        assert_eq!(day.productivity, 4.0);
    }

    #[test]
    fn empty_days_score_zero() {
        let days = monthly_heatmap(&[session(5, 9, 30, 4)], feb(), &Utc);
        assert!(days
            .iter()
            .filter(|d| d.sessions == 0)
            .all(|d| d.hours == 0.0 && d.productivity == 0.0));
    }

    #[test]
    fn sessions_outside_the_month_are_ignored() {
        let march = Session {
            start_time: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            ..session(1, 9, 60, 5)
        };
        let days = monthly_heatmap(&[march], feb(), &Utc);
        assert!(days.iter().all(|d| d.sessions == 0));
    }

    #[test]
    fn month_over_month_change() {
        let january = |d: u32, minutes: u32, rating: u8| Session {
            start_time: Utc.with_ymd_and_hms(2024, 1, d, 9, 0, 0).unwrap(),
            ..session(1, 9, minutes, rating)
        };
        let sessions = vec![
            january(3, 60, 2),
            january(4, 60, 4),
            session(5, 9, 30, 4),
            session(6, 9, 90, 4),
        ];
        let stats = month_over_month(&sessions, feb(), &Utc);
        assert_eq!(stats.previous_average, 3.0);
        assert_eq!(stats.average_score, 4.0);
        assert_eq!(stats.percentage_change, 33.3);
    }

    #[test]
    fn no_previous_month_means_no_change() {
        let stats = month_over_month(&[session(5, 9, 30, 5)], feb(), &Utc);
        assert_eq!(stats.average_score, 5.0);
        assert_eq!(stats.percentage_change, 0.0);
    }
}
