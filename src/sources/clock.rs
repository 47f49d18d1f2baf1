//! Wall-clock access and local day boundaries.

use chrono::{DateTime, Duration, LocalResult, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::{Arc, Mutex};

/// Supplies the current instant and local calendar day boundaries.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Local midnight of the day containing `instant`.
    fn start_of_day(&self, instant: DateTime<Utc>) -> DateTime<Utc>;
}

/// The host clock, optionally pinned to an IANA timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    zone: Option<Tz>,
}

impl SystemClock {
    /// Use the host's local timezone.
    pub fn new() -> Self {
        Self { zone: None }
    }

    /// Use an explicit timezone for day boundaries.
    pub fn with_zone(zone: Tz) -> Self {
        Self { zone: Some(zone) }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn start_of_day(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        match self.zone {
            Some(zone) => midnight_in(instant, &zone),
            None => midnight_in(instant, &chrono::Local),
        }
    }
}

/// A manually driven clock for tests and replays.
///
/// Clones share the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
    zone: Tz,
}

impl FixedClock {
    /// Create a clock frozen at `now`, with days bounded in UTC.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_zone(now, Tz::UTC)
    }

    pub fn with_zone(now: DateTime<Utc>, zone: Tz) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            zone,
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn start_of_day(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        midnight_in(instant, &self.zone)
    }
}

/// Midnight of the local day containing `instant`, in `zone`.
pub fn midnight_in<Z: TimeZone>(instant: DateTime<Utc>, zone: &Z) -> DateTime<Utc> {
    let midnight = instant
        .with_timezone(zone)
        .date_naive()
        .and_time(NaiveTime::MIN);

    match zone.from_local_datetime(&midnight) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Midnight skipped by a DST jump: the day starts at the first valid hour.
        LocalResult::None => zone
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(instant),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midnight_utc() {
        let instant = Utc.with_ymd_and_hms(2025, 6, 12, 15, 30, 0).unwrap();
        let clock = FixedClock::new(instant);

        assert_eq!(
            clock.start_of_day(instant),
            Utc.with_ymd_and_hms(2025, 6, 12, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_midnight_in_zone() {
        // 03:00 UTC is still the previous evening in Los Angeles (UTC-7 in June).
        let instant = Utc.with_ymd_and_hms(2025, 6, 12, 3, 0, 0).unwrap();
        let clock = FixedClock::with_zone(instant, chrono_tz::America::Los_Angeles);

        assert_eq!(
            clock.start_of_day(instant),
            Utc.with_ymd_and_hms(2025, 6, 11, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_midnight_skipped_by_dst() {
        // Santiago springs forward at local midnight on 2024-09-08.
        let instant = Utc.with_ymd_and_hms(2024, 9, 8, 15, 0, 0).unwrap();
        let start = midnight_in(instant, &chrono_tz::America::Santiago);

        assert!(start < instant);
        assert_eq!(
            start.with_timezone(&chrono_tz::America::Santiago).date_naive(),
            instant
                .with_timezone(&chrono_tz::America::Santiago)
                .date_naive()
        );
    }

    #[test]
    fn test_fixed_clock_shared_between_clones() {
        let instant = Utc.with_ymd_and_hms(2025, 6, 12, 8, 0, 0).unwrap();
        let clock = FixedClock::new(instant);
        let other = clock.clone();

        clock.advance(Duration::hours(2));
        assert_eq!(other.now(), instant + Duration::hours(2));
    }
}
