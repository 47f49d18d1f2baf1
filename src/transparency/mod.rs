//! Transparency module.
//!
//! Tracks and exposes what health data the agent reads and keeps,
//! supporting user trust.

pub mod log;

pub use log::{
    create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats,
};
