//! Monthly statistics aggregation.
//!
//! The statistics backend answers with a per-month series
//! `[{"month": "YYYY-MM", "<metric>": 5}, ...]` and, for the `month` and `year`
//! periods, with totals it has already computed. For the `all` period the
//! total is summed here over the months of one year.
//!
//! None of these functions fail. Malformed values count as zero and malformed
//! months are dropped; both are reported as `warn` events so bad data does not
//! disappear without a trace.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::DeskError;
use crate::models::{lenient_string, Priority, Task, TaskStatus};

pub const TASKS_STARTED: &str = "tasks_started";
pub const TASKS_DONE: &str = "tasks_done";

/// One month of a server time series.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatRecord {
    /// `YYYY-MM`. A null or non-string month is kept as text and later
    /// dropped by the year filter.
    #[serde(default, deserialize_with = "lenient_string")]
    pub month: String,
    #[serde(flatten)]
    pub metrics: Map<String, Value>,
}

impl StatRecord {
    pub fn new(month: impl Into<String>) -> Self {
        StatRecord {
            month: month.into(),
            metrics: Map::new(),
        }
    }

    pub fn with(mut self, metric: &str, value: impl Into<Value>) -> Self {
        self.metrics.insert(metric.to_string(), value.into());
        self
    }

    pub fn value(&self, metric: &str) -> f64 {
        coerce_metric(self.metrics.get(metric))
    }
}

/// A chart point.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Bucket {
    pub month: String,
    pub value: f64,
}

/// A calendar month parsed from `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn parse(raw: &str) -> Option<MonthKey> {
        let raw = raw.trim();
        // Reject anything longer than YYYY-MM before handing it to chrono.
        if raw.len() != 7 {
            return None;
        }
        let first = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok()?;
        Some(MonthKey::from_date(first))
    }

    pub fn from_date(date: NaiveDate) -> MonthKey {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Aggregation granularity of a statistics view.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Month,
    Year,
    #[default]
    All,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Period::Month => "month",
            Period::Year => "year",
            Period::All => "all",
        })
    }
}

impl FromStr for Period {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            "all" => Ok(Period::All),
            other => Err(DeskError::validation(format!(
                "unknown period '{}'. Supported: month, year, all",
                other
            ))),
        }
    }
}

/// A statistics response: server totals plus the monthly series.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StatsPayload {
    #[serde(default)]
    pub totals: Map<String, Value>,
    #[serde(default)]
    pub series: Vec<StatRecord>,
}

/// Reads a metric as a number.
///
/// Numbers pass through and numeric strings are parsed. Everything else,
/// including a missing field, counts as zero.
pub fn coerce_metric(value: Option<&Value>) -> f64 {
    match value {
        None | Some(Value::Null) => {
            warn!("missing metric counted as zero");
            0.0
        }
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                warn!(value = %s, "non-numeric metric counted as zero");
                0.0
            }
        },
        Some(other) => {
            warn!(value = %other, "non-numeric metric counted as zero");
            0.0
        }
    }
}

/// Keeps the records whose month falls in `year`.
pub fn filter_year(records: &[StatRecord], year: i32) -> Vec<&StatRecord> {
    records
        .iter()
        .filter(|r| match MonthKey::parse(&r.month) {
            Some(key) => key.year == year,
            None => {
                warn!(month = %r.month, "dropping statistics record with malformed month");
                false
            }
        })
        .collect()
}

/// Sums `metric` over the months of `year`.
pub fn sum_metric(records: &[StatRecord], metric: &str, year: i32) -> f64 {
    filter_year(records, year)
        .into_iter()
        .map(|r| r.value(metric))
        .sum()
}

/// Chart series for `metric`, oldest month first.
pub fn series(records: &[StatRecord], metric: &str) -> Vec<Bucket> {
    to_buckets(records.iter(), metric)
}

/// Chart series for `metric`, restricted to `year`.
pub fn series_for_year(records: &[StatRecord], metric: &str, year: i32) -> Vec<Bucket> {
    to_buckets(filter_year(records, year).into_iter(), metric)
}

fn to_buckets<'a>(records: impl Iterator<Item = &'a StatRecord>, metric: &str) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = records
        .map(|r| Bucket {
            month: r.month.clone(),
            value: r.value(metric),
        })
        .collect();
    // Zero-padded YYYY-MM sorts chronologically as plain text.
    buckets.sort_by(|a, b| a.month.cmp(&b.month));
    buckets
}

/// The scalar shown for `metric` over `period`.
///
/// `month` and `year` use the server's total as is; `all` sums the series
/// over `year`.
pub fn resolve(payload: &StatsPayload, metric: &str, period: Period, year: i32) -> f64 {
    match period {
        Period::Month | Period::Year => coerce_metric(payload.totals.get(metric)),
        Period::All => sum_metric(&payload.series, metric, year),
    }
}

/// Builds monthly records from local tasks.
///
/// `tasks_started` counts tasks by the month they start in, `tasks_done`
/// counts finished tasks by the month they end in.
pub fn task_records(tasks: &[Task]) -> Vec<StatRecord> {
    let mut months: BTreeMap<MonthKey, (u64, u64)> = BTreeMap::new();
    for t in tasks {
        if let Some(start) = t.start_day() {
            months.entry(MonthKey::from_date(start)).or_default().0 += 1;
        }
        if t.status == TaskStatus::Done {
            if let Some(end) = t.end_day() {
                months.entry(MonthKey::from_date(end)).or_default().1 += 1;
            }
        }
    }
    months
        .into_iter()
        .map(|(key, (started, done))| {
            StatRecord::new(key.to_string())
                .with(TASKS_STARTED, started)
                .with(TASKS_DONE, done)
        })
        .collect()
}

/// Task counts for the member dashboard.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct StatusSummary {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl StatusSummary {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut s = StatusSummary {
            total: tasks.len(),
            ..Default::default()
        };
        for t in tasks {
            match t.status {
                TaskStatus::Todo => s.todo += 1,
                TaskStatus::InProgress => s.in_progress += 1,
                TaskStatus::Done => s.done += 1,
            }
            match t.priority {
                Priority::High => s.high += 1,
                Priority::Medium => s.medium += 1,
                Priority::Low => s.low += 1,
            }
        }
        s
    }

    /// Share of finished tasks, `0.0` when there are none.
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.done as f64 / self.total as f64
        }
    }
}
