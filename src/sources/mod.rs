//! Metric sources consumed by the aggregator.
//!
//! Platform bindings (health store, weather service, calendar store) live
//! outside this crate. They plug in by implementing the traits below; this
//! module ships a no-data source for hosts without a health store and a
//! fixture source fed from a JSON file.

pub mod clock;
pub mod fixture;
pub mod noop;
pub mod types;

use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use clock::{Clock, FixedClock, SystemClock};
pub use fixture::{FixtureData, FixtureSource};
pub use noop::NoDataSource;
pub use types::{
    CalendarEvent, CategoryInterval, CategoryMetric, IntervalState, QuantityMetric,
    SelectionPolicy, SourceError, Unit, WeatherReading,
};

/// Reads numeric quantity samples.
pub trait QuantitySource {
    /// Return the value selected by `policy`, expressed in `unit`, or `None`
    /// when no samples exist.
    fn quantity(
        &self,
        metric: QuantityMetric,
        policy: SelectionPolicy,
        unit: Unit,
    ) -> Result<Option<f64>, SourceError>;
}

/// Reads tagged category intervals.
pub trait CategorySource {
    /// Return every interval of `metric` overlapping `[start, end)`.
    fn intervals(
        &self,
        metric: CategoryMetric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CategoryInterval>, SourceError>;
}

/// Reads current weather for the device location.
pub trait WeatherSource {
    /// `None` when the location is not yet known.
    fn current(&self) -> Result<Option<WeatherReading>, SourceError>;
}

/// Reads calendar events.
pub trait CalendarSource {
    /// Events starting in `[start, end)`, ordered by start time.
    fn events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, SourceError>;
}

impl<T: QuantitySource + ?Sized> QuantitySource for Arc<T> {
    fn quantity(
        &self,
        metric: QuantityMetric,
        policy: SelectionPolicy,
        unit: Unit,
    ) -> Result<Option<f64>, SourceError> {
        (**self).quantity(metric, policy, unit)
    }
}

impl<T: CategorySource + ?Sized> CategorySource for Arc<T> {
    fn intervals(
        &self,
        metric: CategoryMetric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CategoryInterval>, SourceError> {
        (**self).intervals(metric, start, end)
    }
}

impl<T: WeatherSource + ?Sized> WeatherSource for Arc<T> {
    fn current(&self) -> Result<Option<WeatherReading>, SourceError> {
        (**self).current()
    }
}

impl<T: CalendarSource + ?Sized> CalendarSource for Arc<T> {
    fn events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, SourceError> {
        (**self).events(start, end)
    }
}

/// A provider implementing every source capability.
pub trait HealthProvider:
    QuantitySource + CategorySource + WeatherSource + CalendarSource + Send + Sync
{
}

impl<T> HealthProvider for T where
    T: QuantitySource + CategorySource + WeatherSource + CalendarSource + Send + Sync
{
}

/// The set of sources one aggregator reads from.
pub struct Sources {
    pub quantities: Box<dyn QuantitySource + Send>,
    pub categories: Box<dyn CategorySource + Send>,
    pub weather: Option<Box<dyn WeatherSource + Send>>,
    pub calendar: Option<Box<dyn CalendarSource + Send>>,
}

impl Sources {
    /// Create a source set with only the health capabilities.
    pub fn new(
        quantities: impl QuantitySource + Send + 'static,
        categories: impl CategorySource + Send + 'static,
    ) -> Self {
        Self {
            quantities: Box::new(quantities),
            categories: Box::new(categories),
            weather: None,
            calendar: None,
        }
    }

    /// Use one provider for every capability.
    pub fn from_provider<P: HealthProvider + 'static>(provider: Arc<P>) -> Self {
        Self::new(provider.clone(), provider.clone())
            .with_weather(provider.clone())
            .with_calendar(provider)
    }

    /// Attach a weather source.
    pub fn with_weather(mut self, weather: impl WeatherSource + Send + 'static) -> Self {
        self.weather = Some(Box::new(weather));
        self
    }

    /// Attach a calendar source.
    pub fn with_calendar(mut self, calendar: impl CalendarSource + Send + 'static) -> Self {
        self.calendar = Some(Box::new(calendar));
        self
    }
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources")
            .field("weather", &self.weather.is_some())
            .field("calendar", &self.calendar.is_some())
            .finish_non_exhaustive()
    }
}
