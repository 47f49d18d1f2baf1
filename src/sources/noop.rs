//! No-data source.
//!
//! This exists so the crate (and binary) run on hosts without a health store.
//! Every query succeeds with no data, so every metric shows the sentinel.

use crate::sources::types::{
    CalendarEvent, CategoryInterval, CategoryMetric, QuantityMetric, SelectionPolicy,
    SourceError, Unit, WeatherReading,
};
use crate::sources::{CalendarSource, CategorySource, QuantitySource, WeatherSource};
use chrono::{DateTime, Utc};

/// A source that never has data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDataSource;

impl QuantitySource for NoDataSource {
    fn quantity(
        &self,
        _metric: QuantityMetric,
        _policy: SelectionPolicy,
        _unit: Unit,
    ) -> Result<Option<f64>, SourceError> {
        Ok(None)
    }
}

impl CategorySource for NoDataSource {
    fn intervals(
        &self,
        _metric: CategoryMetric,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<CategoryInterval>, SourceError> {
        Ok(Vec::new())
    }
}

impl WeatherSource for NoDataSource {
    fn current(&self) -> Result<Option<WeatherReading>, SourceError> {
        Ok(None)
    }
}

impl CalendarSource for NoDataSource {
    fn events(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, SourceError> {
        Ok(Vec::new())
    }
}
