//! Cumulative progress series over a time range.

use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use super::{local_date, round2};
use crate::error::ValidationError;
use crate::storage::Session;

/// Range shown on the progress chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "year")]
    Year,
    #[serde(rename = "5years")]
    FiveYears,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::SixMonths => "6months",
            TimeRange::Year => "year",
            TimeRange::FiveYears => "5years",
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            TimeRange::Week | TimeRange::Month => Granularity::Day,
            TimeRange::SixMonths => Granularity::Week,
            TimeRange::Year => Granularity::Month,
            TimeRange::FiveYears => Granularity::Year,
        }
    }
}

impl FromStr for TimeRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            "6months" => Ok(TimeRange::SixMonths),
            "year" => Ok(TimeRange::Year),
            "5years" => Ok(TimeRange::FiveYears),
            other => Err(ValidationError::InvalidValue {
                field: "range".into(),
                message: format!("'{other}' is not one of week, month, 6months, year, 5years"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Year,
}

/// One point on the progress chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressBucket {
    /// First calendar day covered by the bucket.
    pub start_date: NaiveDate,
    pub label: String,
    /// Hours recorded inside this bucket.
    pub hours: f64,
    /// Hours recorded from the first bucket through this one.
    pub cumulative_hours: f64,
}

/// Bucket start dates for `range` ending at `today`, each paired with the
/// exclusive end date.
fn bucket_bounds(range: TimeRange, today: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let day = |d: NaiveDate| d.checked_add_days(Days::new(1)).unwrap_or(d);
    let month_start = |d: NaiveDate| d.with_day(1).unwrap_or(d);
    let year_start = |year: i32| NaiveDate::from_ymd_opt(year, 1, 1);

    let mut bounds = Vec::new();
    match range {
        TimeRange::Week | TimeRange::Month => {
            let first = match range {
                TimeRange::Week => today.checked_sub_days(Days::new(6)),
                _ => today.checked_sub_months(Months::new(1)).map(day),
            }
            .unwrap_or(today);
            let mut cursor = first;
            while cursor <= today {
                let next = day(cursor);
                bounds.push((cursor, next));
                if next == cursor {
                    break;
                }
                cursor = next;
            }
        }
        TimeRange::SixMonths => {
            let from = today.checked_sub_months(Months::new(6)).unwrap_or(today);
            let back = u64::from(from.weekday().num_days_from_sunday());
            let mut cursor = from.checked_sub_days(Days::new(back)).unwrap_or(from);
            while cursor <= today {
                let Some(next) = cursor.checked_add_days(Days::new(7)) else {
                    break;
                };
                bounds.push((cursor, next));
                cursor = next;
            }
        }
        TimeRange::Year => {
            let this_month = month_start(today);
            for back in (0..12).rev() {
                let Some(start) = this_month.checked_sub_months(Months::new(back)) else {
                    continue;
                };
                let end = start.checked_add_months(Months::new(1)).unwrap_or(start);
                bounds.push((start, end));
            }
        }
        TimeRange::FiveYears => {
            for year in (today.year() - 4)..=today.year() {
                if let (Some(start), Some(end)) = (year_start(year), year_start(year + 1)) {
                    bounds.push((start, end));
                }
            }
        }
    }
    bounds
}

fn label(granularity: Granularity, start: NaiveDate) -> String {
    match granularity {
        Granularity::Day | Granularity::Week => start.format("%b %-d").to_string(),
        Granularity::Month => start.format("%b %Y").to_string(),
        Granularity::Year => start.year().to_string(),
    }
}

/// Hours per bucket and running total for `range`, ending on the calendar day
/// of `now` in `now`'s timezone.
pub fn progress_series<Tz: TimeZone>(
    sessions: &[Session],
    range: TimeRange,
    now: DateTime<Tz>,
) -> Vec<ProgressBucket> {
    let tz = now.timezone();
    let today = now.date_naive();
    let granularity = range.granularity();

    let dated: Vec<(NaiveDate, u32)> = sessions
        .iter()
        .map(|s| (local_date(&tz, s), s.duration))
        .collect();

    let mut cumulative = 0.0;
    bucket_bounds(range, today)
        .into_iter()
        .map(|(start, end)| {
            let minutes: u64 = dated
                .iter()
                .filter(|(date, _)| *date >= start && *date < end)
                .map(|(_, duration)| u64::from(*duration))
                .sum();
            let hours = minutes as f64 / 60.0;
            cumulative += hours;
            ProgressBucket {
                start_date: start,
                label: label(granularity, start),
                hours: round2(hours),
                cumulative_hours: round2(cumulative),
            }
        })
        .collect()
}
