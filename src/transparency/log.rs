//! Health data transparency log.
//!
//! Tracks how much health data the agent has read and retained, without
//! storing any of the values themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current session.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Number of refresh cycles completed
    refresh_cycles: AtomicU64,
    /// Number of metric reads that returned data
    samples_read: AtomicU64,
    /// Number of metric reads that returned no data
    samples_missing: AtomicU64,
    /// Number of history records appended
    records_appended: AtomicU64,
    /// Number of failed persisted-history writes
    persist_failures: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    pub fn new() -> Self {
        Self {
            refresh_cycles: AtomicU64::new(0),
            samples_read: AtomicU64::new(0),
            samples_missing: AtomicU64::new(0),
            records_appended: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that loads and saves cumulative counters at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!(error = %e, "Could not load previous transparency stats");
        }

        log
    }

    pub fn record_refresh(&self) {
        self.refresh_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one metric read.
    pub fn record_sample(&self, has_data: bool) {
        if has_data {
            self.samples_read.fetch_add(1, Ordering::Relaxed);
        } else {
            self.samples_missing.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_appended(&self, count: u64) {
        self.records_appended.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            refresh_cycles: self.refresh_cycles.load(Ordering::Relaxed),
            samples_read: self.samples_read.load(Ordering::Relaxed),
            samples_missing: self.samples_missing.load(Ordering::Relaxed),
            records_appended: self.records_appended.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Refresh cycles: {}\n\
             - Metric reads with data: {}\n\
             - Metric reads without data: {}\n\
             - History records appended: {}\n\
             - Failed history writes: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Data Handling:\n\
             - Health data is read only, never written back\n\
             - Only HRV history is stored on this device\n\
             - History older than 30 days is discarded",
            stats.refresh_cycles,
            stats.samples_read,
            stats.samples_missing,
            stats.records_appended,
            stats.persist_failures,
            stats.session_duration_secs
        )
    }

    /// Save counters to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                refresh_cycles: stats.refresh_cycles,
                samples_read: stats.samples_read,
                samples_missing: stats.samples_missing,
                records_appended: stats.records_appended,
                persist_failures: stats.persist_failures,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.refresh_cycles
                    .store(persisted.refresh_cycles, Ordering::Relaxed);
                self.samples_read
                    .store(persisted.samples_read, Ordering::Relaxed);
                self.samples_missing
                    .store(persisted.samples_missing, Ordering::Relaxed);
                self.records_appended
                    .store(persisted.records_appended, Ordering::Relaxed);
                self.persist_failures
                    .store(persisted.persist_failures, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub refresh_cycles: u64,
    pub samples_read: u64,
    pub samples_missing: u64,
    pub records_appended: u64,
    pub persist_failures: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    refresh_cycles: u64,
    samples_read: u64,
    samples_missing: u64,
    records_appended: u64,
    #[serde(default)]
    persist_failures: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}
