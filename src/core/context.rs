//! Contextual readings shown next to the health metrics.
//!
//! Weather and the next calendar event are read each refresh but never enter
//! history. A failed or empty read simply leaves the reading out.

use crate::core::metric::MetricSample;
use crate::sources::{CalendarSource, WeatherSource};
use chrono::{DateTime, Duration, Utc};

pub const WEATHER_TITLE: &str = "Weather";
pub const NEXT_EVENT_TITLE: &str = "Next Event";

/// How far ahead the calendar is searched.
const EVENT_LOOKAHEAD_HOURS: i64 = 24;

/// Current weather as `"<temp>° / <condition>"`.
pub fn weather_sample(source: &dyn WeatherSource, now: DateTime<Utc>) -> Option<MetricSample> {
    match source.current() {
        Ok(Some(reading)) => Some(MetricSample::new(
            WEATHER_TITLE,
            format!(
                "{}° / {}",
                reading.temperature_c.round() as i64,
                reading.condition
            ),
            now,
        )),
        Ok(None) => None,
        Err(e) => {
            tracing::debug!(error = %e, "Weather unavailable");
            None
        }
    }
}

/// The first event starting within the next 24 hours, stamped with its start.
pub fn next_event_sample(
    source: &dyn CalendarSource,
    now: DateTime<Utc>,
) -> Option<MetricSample> {
    let end = now + Duration::hours(EVENT_LOOKAHEAD_HOURS);
    match source.events(now, end) {
        Ok(events) => events
            .into_iter()
            .min_by_key(|e| e.start)
            .map(|e| MetricSample::new(NEXT_EVENT_TITLE, e.title, e.start)),
        Err(e) => {
            tracing::debug!(error = %e, "Calendar unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{FixtureSource, NoDataSource};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 12, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_weather_format() {
        let source = FixtureSource::default().with_weather(21.4, "Partly Cloudy");
        let sample = weather_sample(&source, now()).unwrap();

        assert_eq!(sample.title, WEATHER_TITLE);
        assert_eq!(sample.display_value, "21° / Partly Cloudy");
        assert_eq!(sample.timestamp, now());
    }

    #[test]
    fn test_next_event_uses_event_start() {
        let start = now() + Duration::hours(3);
        let source = FixtureSource::default()
            .with_event("Standup", start, start + Duration::minutes(15))
            .with_event("Tomorrow", now() + Duration::hours(30), now() + Duration::hours(31));

        let sample = next_event_sample(&source, now()).unwrap();
        assert_eq!(sample.display_value, "Standup");
        assert_eq!(sample.timestamp, start);
    }

    #[test]
    fn test_missing_context_is_omitted() {
        assert!(weather_sample(&NoDataSource, now()).is_none());
        assert!(next_event_sample(&NoDataSource, now()).is_none());
    }
}
