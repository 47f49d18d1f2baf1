//! Rolling per-metric history.
//!
//! Records are kept in insertion order and pruned to the retention window on
//! every append and every refresh. Reads never prune.

use crate::core::metric::{parse_display_value, MetricKind, MetricSample};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How long history records are kept.
pub const RETENTION_DAYS: i64 = 30;

/// One historized numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl HistoryRecord {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Derive a record from a sample's display string.
    ///
    /// Returns `None` for the sentinel or any value that does not parse.
    pub fn from_sample(sample: &MetricSample) -> Option<Self> {
        parse_display_value(&sample.display_value).map(|value| Self::new(sample.timestamp, value))
    }
}

/// Retained history for every metric.
#[derive(Debug, Clone)]
pub struct MetricHistory {
    series: BTreeMap<MetricKind, Vec<HistoryRecord>>,
    retention: Duration,
}

impl MetricHistory {
    /// Create an empty history with the default 30 day retention.
    pub fn new() -> Self {
        Self::with_retention(Duration::days(RETENTION_DAYS))
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            series: BTreeMap::new(),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Replace a metric's history with previously stored records.
    ///
    /// Records are taken as-is; pruning happens on the next append.
    pub fn seed(&mut self, kind: MetricKind, records: Vec<HistoryRecord>) {
        self.series.insert(kind, records);
    }

    /// Append a record and drop everything at or before `now - retention`.
    ///
    /// Returns the metric's history after pruning.
    pub fn append(
        &mut self,
        kind: MetricKind,
        record: HistoryRecord,
        now: DateTime<Utc>,
    ) -> &[HistoryRecord] {
        let cutoff = now - self.retention;
        let series = self.series.entry(kind).or_default();
        series.push(record);
        series.retain(|r| r.timestamp > cutoff);
        series
    }

    /// Drop expired records from every metric.
    ///
    /// Returns the metrics that lost at least one record.
    pub fn prune(&mut self, now: DateTime<Utc>) -> Vec<MetricKind> {
        let cutoff = now - self.retention;
        let mut shrunk = Vec::new();
        for (kind, series) in self.series.iter_mut() {
            let before = series.len();
            series.retain(|r| r.timestamp > cutoff);
            if series.len() < before {
                shrunk.push(*kind);
            }
        }
        shrunk
    }

    /// History of one metric, oldest first.
    pub fn get(&self, kind: MetricKind) -> &[HistoryRecord] {
        self.series.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The most recent record of a metric.
    pub fn latest(&self, kind: MetricKind) -> Option<&HistoryRecord> {
        self.get(kind).last()
    }

    /// Iterate over metrics that have at least one record.
    pub fn iter(&self) -> impl Iterator<Item = (MetricKind, &[HistoryRecord])> {
        self.series
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(kind, records)| (*kind, records.as_slice()))
    }

    /// Total number of records across all metrics.
    pub fn len(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MetricHistory {
    fn default() -> Self {
        Self::new()
    }
}
