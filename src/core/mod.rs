//! Core functionality of the dashboard agent.
//!
//! This module contains:
//! - The metric definitions and display formatting
//! - The aggregator that runs refresh cycles
//! - Rolling history with retention
//! - Refresh scheduling and trend summaries

pub mod aggregator;
pub mod context;
pub mod history;
pub mod metric;
pub mod scheduler;
pub mod trends;

// Re-export commonly used types
pub use aggregator::{MetricAggregator, Snapshot, StateUpdate};
pub use history::{HistoryRecord, MetricHistory, RETENTION_DAYS};
pub use metric::{parse_display_value, MetricKind, MetricSample, NO_DATA};
pub use scheduler::{AuthorizationStatus, RefreshHandle, RefreshScheduler, RefreshTrigger};
pub use trends::{TrendDirection, TrendSummary};
