//! Trend summaries over retained history.

use crate::core::history::HistoryRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Relative change between the older and newer half treated as stable.
const STABLE_TOLERANCE: f64 = 0.05;

/// Minimum records needed to call a direction.
const MIN_RECORDS_FOR_DIRECTION: usize = 4;

/// Direction of a metric over its retained history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
    Unknown,
}

/// Descriptive statistics for one metric's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation, `None` with fewer than two records
    pub std_dev: Option<f64>,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    pub direction: TrendDirection,
}

impl TrendSummary {
    /// Summarize `records`. Returns `None` for an empty history.
    pub fn from_records(records: &[HistoryRecord]) -> Option<Self> {
        let first = records.first()?;
        let last = records.last()?;
        let values: Vec<f64> = records.iter().map(|r| r.value).collect();

        let std_dev = if values.len() >= 2 {
            Some(Statistics::std_dev(values.iter()))
        } else {
            None
        };

        Some(Self {
            count: values.len(),
            min: Statistics::min(values.iter()),
            max: Statistics::max(values.iter()),
            mean: Statistics::mean(values.iter()),
            std_dev,
            first: first.timestamp,
            last: last.timestamp,
            direction: direction(&values),
        })
    }
}

/// Compare the mean of the newer half against the older half.
fn direction(values: &[f64]) -> TrendDirection {
    if values.len() < MIN_RECORDS_FOR_DIRECTION {
        return TrendDirection::Unknown;
    }

    let (older, newer) = values.split_at(values.len() / 2);
    let older_mean = Statistics::mean(older.iter());
    let newer_mean = Statistics::mean(newer.iter());

    if older_mean == 0.0 {
        return TrendDirection::Unknown;
    }

    let change = (newer_mean - older_mean) / older_mean.abs();
    if change > STABLE_TOLERANCE {
        TrendDirection::Increasing
    } else if change < -STABLE_TOLERANCE {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}
