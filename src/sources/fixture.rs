//! JSON fixture source.
//!
//! Replays recorded samples through the source traits. Used by the CLI
//! (`--fixture path.json`) and by tests. Quantity values are stored in the
//! metric's canonical unit: seconds for HRV, beats/min for resting heart
//! rate, a count for steps and kilocalories for active energy.

use crate::sources::types::{
    CalendarEvent, CategoryInterval, CategoryMetric, IntervalState, QuantityMetric,
    SelectionPolicy, SourceError, Unit, WeatherReading,
};
use crate::sources::{CalendarSource, CategorySource, QuantitySource, WeatherSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One recorded quantity sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitySample {
    pub metric: QuantityMetric,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// One recorded category interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureInterval {
    pub metric: CategoryMetric,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub state: IntervalState,
}

/// Contents of a fixture file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureData {
    #[serde(default)]
    pub quantities: Vec<QuantitySample>,
    #[serde(default)]
    pub intervals: Vec<FixtureInterval>,
    #[serde(default)]
    pub weather: Option<WeatherReading>,
    #[serde(default)]
    pub events: Vec<CalendarEvent>,
    /// Quantity metrics whose queries fail as unauthorized
    #[serde(default)]
    pub denied: Vec<QuantityMetric>,
}

/// A source backed by [`FixtureData`].
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    data: FixtureData,
}

impl FixtureSource {
    pub fn new(data: FixtureData) -> Self {
        Self { data }
    }

    /// Load a fixture from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SourceError::Fixture(format!("{}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    /// Parse a fixture from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        let data: FixtureData =
            serde_json::from_str(json).map_err(|e| SourceError::Fixture(e.to_string()))?;
        Ok(Self::new(data))
    }

    /// Add a quantity sample.
    pub fn with_quantity(
        mut self,
        metric: QuantityMetric,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        self.data.quantities.push(QuantitySample {
            metric,
            value,
            timestamp,
        });
        self
    }

    /// Add a category interval.
    pub fn with_interval(
        mut self,
        metric: CategoryMetric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        state: IntervalState,
    ) -> Self {
        self.data.intervals.push(FixtureInterval {
            metric,
            start,
            end,
            state,
        });
        self
    }

    pub fn with_weather(mut self, temperature_c: f64, condition: impl Into<String>) -> Self {
        self.data.weather = Some(WeatherReading {
            temperature_c,
            condition: condition.into(),
        });
        self
    }

    pub fn with_event(
        mut self,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        self.data.events.push(CalendarEvent {
            title: title.into(),
            start,
            end,
        });
        self
    }

    /// Make every query for `metric` fail as unauthorized.
    pub fn deny(mut self, metric: QuantityMetric) -> Self {
        self.data.denied.push(metric);
        self
    }

    pub fn data(&self) -> &FixtureData {
        &self.data
    }
}

/// The unit fixture values of `metric` are recorded in.
fn canonical_unit(metric: QuantityMetric) -> Unit {
    match metric {
        QuantityMetric::HeartRateVariability => Unit::Seconds,
        QuantityMetric::RestingHeartRate => Unit::BeatsPerMinute,
        QuantityMetric::StepCount => Unit::Count,
        QuantityMetric::ActiveEnergyBurned => Unit::Kilocalories,
    }
}

impl QuantitySource for FixtureSource {
    fn quantity(
        &self,
        metric: QuantityMetric,
        policy: SelectionPolicy,
        unit: Unit,
    ) -> Result<Option<f64>, SourceError> {
        if self.data.denied.contains(&metric) {
            return Err(SourceError::NotAuthorized(format!("{metric:?}")));
        }
        if unit != canonical_unit(metric) {
            return Err(SourceError::Query(format!(
                "{metric:?} is not available in {unit:?}"
            )));
        }

        let samples = self.data.quantities.iter().filter(|s| s.metric == metric);

        let value = match policy {
            SelectionPolicy::MostRecent => samples.max_by_key(|s| s.timestamp).map(|s| s.value),
            SelectionPolicy::Sum { start, end } => {
                let mut in_window = samples
                    .filter(|s| s.timestamp >= start && s.timestamp < end)
                    .peekable();
                if in_window.peek().is_none() {
                    None
                } else {
                    Some(in_window.map(|s| s.value).sum::<f64>())
                }
            }
        };

        Ok(value)
    }
}

impl CategorySource for FixtureSource {
    fn intervals(
        &self,
        metric: CategoryMetric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CategoryInterval>, SourceError> {
        Ok(self
            .data
            .intervals
            .iter()
            .filter(|i| i.metric == metric)
            .map(|i| CategoryInterval::new(i.start, i.end, i.state))
            .filter(|i| i.overlaps(start, end))
            .collect())
    }
}

impl WeatherSource for FixtureSource {
    fn current(&self) -> Result<Option<WeatherReading>, SourceError> {
        Ok(self.data.weather.clone())
    }
}

impl CalendarSource for FixtureSource {
    fn events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, SourceError> {
        let mut events: Vec<CalendarEvent> = self
            .data
            .events
            .iter()
            .filter(|e| e.start >= start && e.start < end)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start);
        Ok(events)
    }
}
