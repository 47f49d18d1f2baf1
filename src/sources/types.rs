//! Query and result types shared by all metric sources.
//!
//! Sources hand back raw values in the unit the aggregator asks for. Formatting
//! into display strings happens in the aggregator, never in a source.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Quantity-typed health metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityMetric {
    /// Heart rate variability (SDNN)
    HeartRateVariability,
    RestingHeartRate,
    StepCount,
    ActiveEnergyBurned,
}

/// Category-typed health metrics, reported as tagged time intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryMetric {
    SleepAnalysis,
    MindfulSession,
}

/// Unit a quantity value is requested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Seconds,
    BeatsPerMinute,
    Count,
    Kilocalories,
}

/// How a quantity source should reduce its samples to a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// The single most recent sample, regardless of age
    MostRecent,
    /// Sum of all samples in `[start, end)`
    Sum {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// State tag carried by a category interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalState {
    InBed,
    /// Unstaged sleep
    Asleep,
    AsleepCore,
    AsleepDeep,
    AsleepRem,
    Awake,
    /// A mindfulness session (no further state)
    Session,
}

impl IntervalState {
    /// Whether this tag counts towards sleep duration.
    pub fn is_asleep(self) -> bool {
        matches!(
            self,
            IntervalState::Asleep
                | IntervalState::AsleepCore
                | IntervalState::AsleepDeep
                | IntervalState::AsleepRem
        )
    }
}

/// A tagged interval returned by a category source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub state: IntervalState,
}

impl CategoryInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, state: IntervalState) -> Self {
        Self { start, end, state }
    }

    /// Check if this interval overlaps `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }

    /// Length of the part of this interval that falls inside `[start, end)`.
    ///
    /// Inverted or non-overlapping intervals contribute nothing.
    pub fn clipped_duration(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
        let from = self.start.max(start);
        let to = self.end.min(end);
        if to > from {
            to - from
        } else {
            Duration::zero()
        }
    }
}

/// Current conditions reported by a weather source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Temperature in degrees Celsius
    pub temperature_c: f64,
    /// Human readable condition, e.g. "Partly Cloudy"
    pub condition: String,
}

/// An upcoming calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Errors a source can report for a single query.
///
/// None of these ever escape a refresh cycle; they are logged and replaced
/// by the no-data sentinel.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Not authorized to read {0}")]
    NotAuthorized(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Invalid fixture: {0}")]
    Fixture(String),
}
