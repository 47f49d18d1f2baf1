//! Durable storage for the persisted metric history.

pub mod hrv;
pub mod kv;

pub use hrv::{
    latest_persisted_hrv, load_hrv_history, load_hrv_records, save_hrv_history, HrvRecord,
    HRV_HISTORY_KEY,
};
pub use kv::{FileStore, KeyValueStore, MemoryStore, StoreError};
