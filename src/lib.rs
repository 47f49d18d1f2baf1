//! HRV Dashboard - health metric aggregation with rolling history.
//!
//! This library reads biometric signals (HRV, resting heart rate, sleep,
//! mindfulness, steps, active energy) from pluggable sources, formats them
//! for display, and keeps a rolling 30 day history per metric. HRV history
//! is persisted across restarts.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       HRV Dashboard                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │   Sources   │──▶│ Aggregator  │──▶│  Snapshot   │──▶ subscribers
//! │  │ (traits)    │   │ (refresh)   │   │ + History   │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │         ▲                 │                 │               │
//! │  ┌─────────────┐          ▼                 ▼               │
//! │  │  Scheduler  │   ┌─────────────┐   ┌─────────────┐        │
//! │  │ (triggers)  │   │Transparency │   │    Store    │        │
//! │  └─────────────┘   │    Log      │   │ (HRV only)  │        │
//! │                    └─────────────┘   └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use hrv_dashboard::{sources, store, MetricAggregator};
//!
//! let sources = sources::Sources::new(sources::NoDataSource, sources::NoDataSource);
//! let store = store::FileStore::new("/tmp/hrv-dashboard");
//! let mut aggregator = MetricAggregator::new(sources, store, sources::SystemClock::new());
//!
//! for sample in &aggregator.refresh().metrics {
//!     println!("{}: {}", sample.title, sample.display_value);
//! }
//! ```

pub mod config;
pub mod core;
pub mod sources;
pub mod store;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use config::{Config, DisplaySettings};
pub use core::{
    HistoryRecord, MetricAggregator, MetricHistory, MetricKind, MetricSample, RefreshScheduler,
    RefreshTrigger, Snapshot, StateUpdate, TrendSummary, NO_DATA,
};
pub use sources::{Clock, Sources, SystemClock};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Data handling declaration that can be displayed to users.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║              HRV DASHBOARD - HEALTH DATA DECLARATION             ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This dashboard reads health data to show your daily metrics.    ║
║                                                                  ║
║  ✓ WHAT WE READ:                                                 ║
║    • Heart rate variability and resting heart rate               ║
║    • Sleep and mindfulness sessions for today                    ║
║    • Steps and active energy for today                           ║
║    • Current weather and your next calendar event                ║
║                                                                  ║
║  ✓ WHAT WE KEEP:                                                 ║
║    • Up to 30 days of HRV values, on this device only            ║
║                                                                  ║
║  ✗ WHAT WE NEVER DO:                                             ║
║    • Write anything back to your health data                     ║
║    • Send your readings off this device                          ║
║    • Keep anything older than 30 days                            ║
║                                                                  ║
║  You can view collection statistics anytime with:                ║
║    hrv-dash status                                               ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
