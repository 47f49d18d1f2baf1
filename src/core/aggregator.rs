//! Metric aggregation and history retention.
//!
//! One [`MetricAggregator::refresh`] call:
//! 1. Reads the six metrics from their sources, formatting each into a
//!    display string (or the `--` sentinel)
//! 2. Reads the contextual weather and calendar readings
//! 3. Replaces the current snapshot
//! 4. Derives a history record from every display string that parses,
//!    appending it and pruning to the retention window
//! 5. Persists the HRV history and notifies subscribers
//!
//! A refresh never fails. Source errors become the sentinel, parse failures
//! skip the history append, and store failures are logged and retried on
//! the next append.

use crate::core::context::{next_event_sample, weather_sample};
use crate::core::history::{HistoryRecord, MetricHistory};
use crate::core::metric::{MetricKind, MetricQuery, MetricSample};
use crate::sources::types::{CategoryMetric, SelectionPolicy, SourceError};
use crate::sources::{Clock, Sources};
use crate::store::{load_hrv_history, save_hrv_history, KeyValueStore};
use crate::transparency::SharedTransparencyLog;
use chrono::{DateTime, Duration, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The complete result of one refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique id of the refresh that produced this snapshot
    pub id: Uuid,
    pub taken_at: DateTime<Utc>,
    /// One sample per metric, in [`MetricKind::ALL`] order
    pub metrics: Vec<MetricSample>,
    /// Weather and next event, when available
    pub context: Vec<MetricSample>,
}

impl Snapshot {
    /// The sample for one metric.
    pub fn metric(&self, kind: MetricKind) -> Option<&MetricSample> {
        self.metrics.iter().find(|s| s.title == kind.title())
    }

    /// Metrics followed by context readings.
    pub fn samples(&self) -> impl Iterator<Item = &MetricSample> {
        self.metrics.iter().chain(self.context.iter())
    }
}

/// Published to subscribers after every refresh.
#[derive(Debug, Clone)]
pub struct StateUpdate {
    pub snapshot: Snapshot,
    /// Metrics whose history gained a record this cycle
    pub updated: Vec<MetricKind>,
}

/// Owns the current snapshot and the retained history.
pub struct MetricAggregator {
    sources: Sources,
    store: Box<dyn KeyValueStore + Send>,
    clock: Box<dyn Clock + Send>,
    snapshot: Option<Snapshot>,
    history: MetricHistory,
    subscribers: Vec<Sender<StateUpdate>>,
    log: Option<SharedTransparencyLog>,
}

impl MetricAggregator {
    /// Create an aggregator, seeding HRV history from `store`.
    ///
    /// An unreadable or corrupt stored history starts empty.
    pub fn new(
        sources: Sources,
        store: impl KeyValueStore + Send + 'static,
        clock: impl Clock + Send + 'static,
    ) -> Self {
        Self::with_history(sources, store, clock, MetricHistory::new())
    }

    /// Create an aggregator around an existing history, e.g. one with a
    /// shorter retention window.
    pub fn with_history(
        sources: Sources,
        store: impl KeyValueStore + Send + 'static,
        clock: impl Clock + Send + 'static,
        mut history: MetricHistory,
    ) -> Self {
        match load_hrv_history(&store) {
            Ok(records) => {
                debug!(records = records.len(), "Loaded persisted HRV history");
                history.seed(MetricKind::Hrv, records);
            }
            Err(e) => warn!(error = %e, "Could not load persisted HRV history, starting empty"),
        }

        Self {
            sources,
            store: Box::new(store),
            clock: Box::new(clock),
            snapshot: None,
            history,
            subscribers: Vec::new(),
            log: None,
        }
    }

    /// Count reads and appends in a transparency log.
    pub fn with_transparency_log(mut self, log: SharedTransparencyLog) -> Self {
        self.log = Some(log);
        self
    }

    /// The latest snapshot, `None` before the first refresh.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn history(&self) -> &MetricHistory {
        &self.history
    }

    /// Receive a [`StateUpdate`] after every refresh.
    pub fn subscribe(&mut self) -> Receiver<StateUpdate> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        receiver
    }

    /// Run one refresh cycle.
    pub fn refresh(&mut self) -> &Snapshot {
        let now = self.clock.now();
        let day_start = self.clock.start_of_day(now);
        let id = Uuid::new_v4();

        let metrics: Vec<MetricSample> = MetricKind::ALL
            .into_iter()
            .map(|kind| self.read_metric(kind, now, day_start))
            .collect();

        let mut context = Vec::new();
        if let Some(ref weather) = self.sources.weather {
            context.extend(weather_sample(&**weather, now));
        }
        if let Some(ref calendar) = self.sources.calendar {
            context.extend(next_event_sample(&**calendar, now));
        }

        let snapshot = Snapshot {
            id,
            taken_at: now,
            metrics,
            context,
        };
        let updated = self.record_history(&snapshot.metrics, now);

        if let Some(ref log) = self.log {
            log.record_refresh();
            for sample in &snapshot.metrics {
                log.record_sample(sample.has_data());
            }
            log.record_appended(updated.len() as u64);
        }

        info!(
            refresh = %id,
            with_data = snapshot.metrics.iter().filter(|s| s.has_data()).count(),
            appended = updated.len(),
            "Refresh complete"
        );

        self.publish(StateUpdate {
            snapshot: snapshot.clone(),
            updated,
        });
        self.snapshot.insert(snapshot)
    }

    fn read_metric(
        &self,
        kind: MetricKind,
        now: DateTime<Utc>,
        day_start: DateTime<Utc>,
    ) -> MetricSample {
        let value = match kind.query() {
            MetricQuery::Latest { metric, unit } => {
                self.sources
                    .quantities
                    .quantity(metric, SelectionPolicy::MostRecent, unit)
            }
            MetricQuery::DailySum { metric, unit } => self.sources.quantities.quantity(
                metric,
                SelectionPolicy::Sum {
                    start: day_start,
                    end: now,
                },
                unit,
            ),
            MetricQuery::DailyDuration {
                metric,
                asleep_only,
            } => self
                .daily_duration(metric, asleep_only, day_start, now)
                .map(|total| total.map(|d| duration_in(kind, d))),
        };

        match value {
            Ok(Some(v)) if v.is_finite() => MetricSample::new(kind.title(), kind.format(v), now),
            Ok(_) => MetricSample::no_data(kind, now),
            Err(e) => {
                debug!(metric = kind.title(), error = %e, "Metric unavailable");
                MetricSample::no_data(kind, now)
            }
        }
    }

    /// Total interval time in `[start, end)`, `None` when no interval matches.
    fn daily_duration(
        &self,
        metric: CategoryMetric,
        asleep_only: bool,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Duration>, SourceError> {
        let intervals = self.sources.categories.intervals(metric, start, end)?;

        let mut matched = intervals
            .iter()
            .filter(|i| !asleep_only || i.state.is_asleep())
            .peekable();
        if matched.peek().is_none() {
            return Ok(None);
        }

        Ok(Some(
            matched.fold(Duration::zero(), |total, i| {
                total + i.clipped_duration(start, end)
            }),
        ))
    }

    /// Append a record for every parseable sample, then prune every metric
    /// to the retention window. Returns the metrics appended to.
    fn record_history(&mut self, samples: &[MetricSample], now: DateTime<Utc>) -> Vec<MetricKind> {
        let mut updated = Vec::new();

        for sample in samples {
            let Some(kind) = sample.kind() else {
                continue;
            };
            let Some(record) = HistoryRecord::from_sample(sample) else {
                continue;
            };

            self.history.append(kind, record, now);
            if kind.is_persisted() {
                self.persist(kind);
            }
            updated.push(kind);
        }

        // Metrics without a record this cycle still age out.
        for kind in self.history.prune(now) {
            debug!(metric = kind.title(), "Pruned expired history");
            if kind.is_persisted() {
                self.persist(kind);
            }
        }

        updated
    }

    fn persist(&self, kind: MetricKind) {
        if let Err(e) = save_hrv_history(&*self.store, self.history.get(kind)) {
            warn!(metric = kind.title(), error = %e, "Could not persist history");
            if let Some(ref log) = self.log {
                log.record_persist_failure();
            }
        }
    }

    fn publish(&mut self, update: StateUpdate) {
        self.subscribers
            .retain(|subscriber| subscriber.send(update.clone()).is_ok());
    }
}

impl std::fmt::Debug for MetricAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricAggregator")
            .field("sources", &self.sources)
            .field("snapshot", &self.snapshot)
            .field("history_records", &self.history.len())
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

/// Convert an interval total into the unit `kind` is formatted in.
fn duration_in(kind: MetricKind, total: Duration) -> f64 {
    let secs = total.num_milliseconds() as f64 / 1000.0;
    match kind {
        MetricKind::Sleep => secs / 3600.0,
        _ => secs / 60.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::history::RETENTION_DAYS;
    use crate::core::metric::NO_DATA;
    use crate::sources::{
        FixedClock, FixtureSource, IntervalState, NoDataSource, QuantityMetric,
    };
    use crate::store::{MemoryStore, StoreError};
    use crate::transparency::TransparencyLog;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Memory store whose writes can be switched to fail.
    #[derive(Clone, Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failing: Arc<AtomicBool>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.inner.set(key, value)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 12, 9, 0, 0).unwrap()
    }

    fn midnight() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 12, 0, 0, 0).unwrap()
    }

    fn aggregator(fixture: FixtureSource) -> MetricAggregator {
        MetricAggregator::new(
            Sources::from_provider(Arc::new(fixture)),
            MemoryStore::new(),
            FixedClock::new(now()),
        )
    }

    #[test]
    fn test_snapshot_has_every_metric() {
        let mut agg = aggregator(FixtureSource::default());
        assert!(agg.snapshot().is_none());

        let snapshot = agg.refresh();
        let titles: Vec<&str> = snapshot.metrics.iter().map(|s| s.title.as_str()).collect();
        let expected: Vec<&str> = MetricKind::ALL.iter().map(|k| k.title()).collect();
        assert_eq!(titles, expected);
        assert!(snapshot.metrics.iter().all(|s| s.display_value == NO_DATA));
        assert!(snapshot.context.is_empty());
    }

    #[test]
    fn test_hrv_seconds_to_milliseconds() {
        let mut agg = aggregator(FixtureSource::default().with_quantity(
            QuantityMetric::HeartRateVariability,
            0.065,
            now() - Duration::hours(3),
        ));

        let snapshot = agg.refresh().clone();
        assert_eq!(snapshot.metric(MetricKind::Hrv).unwrap().display_value, "65 ms");
        assert_eq!(agg.history().get(MetricKind::Hrv)[0].value, 65.0);
    }

    #[test]
    fn test_sleep_counts_only_asleep_intervals() {
        let fixture = FixtureSource::default()
            .with_interval(
                CategoryMetric::SleepAnalysis,
                midnight(),
                midnight() + Duration::hours(1),
                IntervalState::InBed,
            )
            .with_interval(
                CategoryMetric::SleepAnalysis,
                midnight() + Duration::hours(1),
                midnight() + Duration::hours(4),
                IntervalState::Asleep,
            )
            .with_interval(
                CategoryMetric::SleepAnalysis,
                midnight() + Duration::minutes(4 * 60),
                midnight() + Duration::minutes(8 * 60 + 30),
                IntervalState::Asleep,
            );

        let mut agg = aggregator(fixture);
        let snapshot = agg.refresh();
        assert_eq!(snapshot.metric(MetricKind::Sleep).unwrap().display_value, "7.5 h");
    }

    #[test]
    fn test_only_in_bed_is_no_data() {
        let fixture = FixtureSource::default().with_interval(
            CategoryMetric::SleepAnalysis,
            midnight(),
            midnight() + Duration::hours(6),
            IntervalState::InBed,
        );

        let mut agg = aggregator(fixture);
        assert_eq!(
            agg.refresh().metric(MetricKind::Sleep).unwrap().display_value,
            NO_DATA
        );
    }

    #[test]
    fn test_intervals_are_clipped_to_today() {
        // Fell asleep at 22:00 yesterday, woke at 06:00: only 6 h fall today.
        let fixture = FixtureSource::default().with_interval(
            CategoryMetric::SleepAnalysis,
            midnight() - Duration::hours(2),
            midnight() + Duration::hours(6),
            IntervalState::AsleepCore,
        );

        let mut agg = aggregator(fixture);
        assert_eq!(
            agg.refresh().metric(MetricKind::Sleep).unwrap().display_value,
            "6.0 h"
        );
    }

    #[test]
    fn test_mindful_minutes() {
        let fixture = FixtureSource::default()
            .with_interval(
                CategoryMetric::MindfulSession,
                midnight() + Duration::hours(7),
                midnight() + Duration::minutes(7 * 60 + 10),
                IntervalState::Session,
            )
            .with_interval(
                CategoryMetric::MindfulSession,
                midnight() + Duration::hours(8),
                midnight() + Duration::minutes(8 * 60 + 5),
                IntervalState::Session,
            );

        let mut agg = aggregator(fixture);
        assert_eq!(
            agg.refresh()
                .metric(MetricKind::MindfulMinutes)
                .unwrap()
                .display_value,
            "15 min"
        );
    }

    #[test]
    fn test_source_error_becomes_sentinel() {
        let fixture = FixtureSource::default()
            .with_quantity(QuantityMetric::StepCount, 900.0, now() - Duration::hours(1))
            .deny(QuantityMetric::HeartRateVariability);

        let mut agg = aggregator(fixture);
        let snapshot = agg.refresh().clone();
        assert_eq!(snapshot.metric(MetricKind::Hrv).unwrap().display_value, NO_DATA);
        assert_eq!(snapshot.metric(MetricKind::Steps).unwrap().display_value, "900");
        assert!(agg.history().get(MetricKind::Hrv).is_empty());
    }

    #[test]
    fn test_context_readings_are_not_historized() {
        let fixture = FixtureSource::default()
            .with_weather(18.0, "Rain")
            .with_event("Dentist", now() + Duration::hours(2), now() + Duration::hours(3));

        let mut agg = aggregator(fixture);
        let snapshot = agg.refresh().clone();
        assert_eq!(snapshot.context.len(), 2);
        assert_eq!(snapshot.samples().count(), 8);
        assert!(agg.history().is_empty());
    }

    #[test]
    fn test_subscribers_receive_updates() {
        let mut agg = aggregator(FixtureSource::default().with_quantity(
            QuantityMetric::RestingHeartRate,
            57.0,
            now() - Duration::hours(8),
        ));
        let updates = agg.subscribe();
        let dropped = agg.subscribe();
        drop(dropped);

        agg.refresh();

        let update = updates.try_recv().unwrap();
        assert_eq!(update.updated, vec![MetricKind::RestingHeartRate]);
        assert_eq!(
            update
                .snapshot
                .metric(MetricKind::RestingHeartRate)
                .unwrap()
                .display_value,
            "57 bpm"
        );
        assert_eq!(agg.subscribers.len(), 1);
    }

    #[test]
    fn test_no_data_source_never_appends() {
        let mut agg = MetricAggregator::new(
            Sources::new(NoDataSource, NoDataSource),
            MemoryStore::new(),
            FixedClock::new(now()),
        );
        agg.refresh();
        agg.refresh();
        assert!(agg.history().is_empty());
    }

    #[test]
    fn test_failed_write_is_counted_and_retried() {
        let store = FlakyStore::default();
        store.failing.store(true, Ordering::SeqCst);
        let clock = FixedClock::new(now());
        let log = Arc::new(TransparencyLog::new());
        let fixture = FixtureSource::default().with_quantity(
            QuantityMetric::HeartRateVariability,
            0.065,
            now() - Duration::hours(3),
        );

        let mut agg = MetricAggregator::new(
            Sources::from_provider(Arc::new(fixture)),
            store.clone(),
            clock.clone(),
        )
        .with_transparency_log(log.clone());

        agg.refresh();
        assert_eq!(log.stats().persist_failures, 1);
        assert_eq!(agg.history().get(MetricKind::Hrv).len(), 1);
        assert!(load_hrv_history(&store.inner).unwrap().is_empty());

        store.failing.store(false, Ordering::SeqCst);
        clock.advance(Duration::days(1));
        agg.refresh();

        assert_eq!(log.stats().persist_failures, 1);
        assert_eq!(load_hrv_history(&store.inner).unwrap().len(), 2);
    }

    #[test]
    fn test_metric_without_new_data_still_expires() {
        let clock = FixedClock::new(now());
        let fixture = FixtureSource::default().with_quantity(
            QuantityMetric::StepCount,
            4321.0,
            now() - Duration::hours(1),
        );
        let mut agg = MetricAggregator::new(
            Sources::from_provider(Arc::new(fixture)),
            MemoryStore::new(),
            clock.clone(),
        );

        agg.refresh();
        assert_eq!(agg.history().get(MetricKind::Steps).len(), 1);

        clock.advance(Duration::days(RETENTION_DAYS));
        let snapshot = agg.refresh().clone();
        assert_eq!(snapshot.metric(MetricKind::Steps).unwrap().display_value, NO_DATA);
        assert!(agg.history().get(MetricKind::Steps).is_empty());
    }

    #[test]
    fn test_custom_retention_prunes_persisted_history() {
        let store = MemoryStore::new();
        save_hrv_history(
            &store,
            &[
                HistoryRecord::new(now() - Duration::days(10), 48.0),
                HistoryRecord::new(now() - Duration::days(2), 61.0),
            ],
        )
        .unwrap();

        let mut agg = MetricAggregator::with_history(
            Sources::new(NoDataSource, NoDataSource),
            store.clone(),
            FixedClock::new(now()),
            MetricHistory::with_retention(Duration::days(7)),
        );
        assert_eq!(agg.history().get(MetricKind::Hrv).len(), 2);

        agg.refresh();

        let values: Vec<f64> = agg
            .history()
            .get(MetricKind::Hrv)
            .iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(values, vec![61.0]);
        assert_eq!(load_hrv_history(&store).unwrap().len(), 1);
    }
}
