//! Refresh triggering.
//!
//! Triggers (user action, timer, authorization granted) are turned into
//! refresh requests. At most one request is pending at any time: requests
//! arriving while one is pending are coalesced into it. The pending flag is
//! cleared before the refresh runs, so a trigger arriving mid-refresh queues
//! exactly one follow-up.

use crate::core::aggregator::MetricAggregator;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Why a refresh was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    UserRequested,
    Timer,
    AuthorizationGranted,
}

/// Authorization state reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Denied,
    Granted,
}

/// Cloneable handle for requesting refreshes from any thread.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    sender: Sender<RefreshTrigger>,
    pending: Arc<AtomicBool>,
}

impl RefreshHandle {
    /// Request a refresh. Returns `false` when coalesced into a pending one.
    pub fn request(&self, trigger: RefreshTrigger) -> bool {
        if self.pending.swap(true, Ordering::SeqCst) {
            tracing::trace!(?trigger, "Refresh already pending");
            return false;
        }

        match self.sender.try_send(trigger) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Disconnected(_)) => {
                self.pending.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    /// React to an authorization change: a grant requests one refresh.
    pub fn authorization_changed(&self, status: AuthorizationStatus) -> bool {
        match status {
            AuthorizationStatus::Granted => self.request(RefreshTrigger::AuthorizationGranted),
            _ => false,
        }
    }

    /// Whether a request is waiting to run.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Receives refresh requests and runs them against an aggregator.
#[derive(Debug)]
pub struct RefreshScheduler {
    receiver: Receiver<RefreshTrigger>,
    handle: RefreshHandle,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(1);
        Self {
            receiver,
            handle: RefreshHandle {
                sender,
                pending: Arc::new(AtomicBool::new(false)),
            },
        }
    }

    pub fn handle(&self) -> RefreshHandle {
        self.handle.clone()
    }

    /// Run the pending refresh, if any, without blocking.
    pub fn run_pending(&self, aggregator: &mut MetricAggregator) -> Option<RefreshTrigger> {
        let trigger = self.receiver.try_recv().ok()?;
        self.run(trigger, aggregator);
        Some(trigger)
    }

    /// Wait up to `timeout` for a request and run it.
    pub fn run_next(
        &self,
        aggregator: &mut MetricAggregator,
        timeout: Duration,
    ) -> Result<RefreshTrigger, RecvTimeoutError> {
        let trigger = self.receiver.recv_timeout(timeout)?;
        self.run(trigger, aggregator);
        Ok(trigger)
    }

    fn run(&self, trigger: RefreshTrigger, aggregator: &mut MetricAggregator) {
        self.handle.pending.store(false, Ordering::SeqCst);
        tracing::debug!(?trigger, "Running refresh");
        aggregator.refresh();
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{FixedClock, NoDataSource, Sources};
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn aggregator() -> MetricAggregator {
        MetricAggregator::new(
            Sources::new(NoDataSource, NoDataSource),
            MemoryStore::new(),
            FixedClock::new(Utc::now()),
        )
    }

    #[test]
    fn test_requests_coalesce() {
        let scheduler = RefreshScheduler::new();
        let handle = scheduler.handle();
        let mut agg = aggregator();
        let updates = agg.subscribe();

        assert!(handle.request(RefreshTrigger::UserRequested));
        assert!(!handle.request(RefreshTrigger::Timer));
        assert!(!handle.authorization_changed(AuthorizationStatus::Granted));
        assert!(handle.is_pending());

        assert_eq!(
            scheduler.run_pending(&mut agg),
            Some(RefreshTrigger::UserRequested)
        );
        assert_eq!(scheduler.run_pending(&mut agg), None);
        assert_eq!(updates.try_iter().count(), 1);
        assert!(!handle.is_pending());
    }

    #[test]
    fn test_request_after_run_is_accepted() {
        let scheduler = RefreshScheduler::new();
        let handle = scheduler.handle();
        let mut agg = aggregator();

        handle.request(RefreshTrigger::Timer);
        scheduler.run_pending(&mut agg);

        assert!(handle.request(RefreshTrigger::Timer));
        assert_eq!(scheduler.run_pending(&mut agg), Some(RefreshTrigger::Timer));
    }

    #[test]
    fn test_only_grant_triggers_refresh() {
        let scheduler = RefreshScheduler::new();
        let handle = scheduler.handle();

        assert!(!handle.authorization_changed(AuthorizationStatus::Denied));
        assert!(!handle.authorization_changed(AuthorizationStatus::NotDetermined));
        assert!(!handle.is_pending());
        assert!(handle.authorization_changed(AuthorizationStatus::Granted));
    }

    #[test]
    fn test_run_next_times_out() {
        let scheduler = RefreshScheduler::new();
        let mut agg = aggregator();

        let result = scheduler.run_next(&mut agg, Duration::from_millis(10));
        assert_eq!(result, Err(RecvTimeoutError::Timeout));
        assert!(agg.snapshot().is_none());
    }

    #[test]
    fn test_request_from_another_thread() {
        let scheduler = RefreshScheduler::new();
        let handle = scheduler.handle();
        let mut agg = aggregator();

        std::thread::spawn(move || handle.request(RefreshTrigger::UserRequested))
            .join()
            .unwrap();

        let result = scheduler.run_next(&mut agg, Duration::from_secs(1));
        assert_eq!(result, Ok(RefreshTrigger::UserRequested));
        assert!(agg.snapshot().is_some());
    }
}
