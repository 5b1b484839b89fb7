//! Analytics over recorded sessions.
//!
//! Pure functions over a session slice: cumulative progress series, the
//! monthly heatmap, month-over-month focus score and a headline summary.
//! Calendar grouping uses the timezone of the `now` (or `tz`) argument.

mod heatmap;
mod progress;
mod summary;

pub use heatmap::{month_over_month, monthly_heatmap, HeatmapDay, MonthlyComparison};
pub use progress::{progress_series, Granularity, ProgressBucket, TimeRange};
pub use summary::{summarize, Summary};

use chrono::{NaiveDate, TimeZone};

use crate::storage::Session;

fn local_date<Tz: TimeZone>(tz: &Tz, session: &Session) -> NaiveDate {
    session.start_time.with_timezone(tz).date_naive()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
