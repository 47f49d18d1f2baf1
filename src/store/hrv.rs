//! Persisted HRV history.
//!
//! HRV is the one metric whose history outlives the process. It is stored as
//! a JSON array of `{date, value}` records with integer millisecond values,
//! overwritten wholesale on every append.

use crate::core::history::HistoryRecord;
use crate::store::kv::{KeyValueStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store key for the HRV history.
pub const HRV_HISTORY_KEY: &str = "hrvHistory";

/// Stored form of one HRV record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrvRecord {
    pub date: DateTime<Utc>,
    /// HRV in milliseconds
    pub value: i64,
}

impl From<&HistoryRecord> for HrvRecord {
    fn from(record: &HistoryRecord) -> Self {
        Self {
            date: record.timestamp,
            value: record.value.round() as i64,
        }
    }
}

impl From<HrvRecord> for HistoryRecord {
    fn from(record: HrvRecord) -> Self {
        HistoryRecord::new(record.date, record.value as f64)
    }
}

/// Read the stored HRV records. A missing entry is an empty history.
pub fn load_hrv_records(store: &dyn KeyValueStore) -> Result<Vec<HrvRecord>, StoreError> {
    match store.get(HRV_HISTORY_KEY)? {
        Some(bytes) => {
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))
        }
        None => Ok(Vec::new()),
    }
}

/// Read the stored HRV history as history records.
pub fn load_hrv_history(store: &dyn KeyValueStore) -> Result<Vec<HistoryRecord>, StoreError> {
    Ok(load_hrv_records(store)?
        .into_iter()
        .map(HistoryRecord::from)
        .collect())
}

/// Overwrite the stored HRV history.
pub fn save_hrv_history(
    store: &dyn KeyValueStore,
    records: &[HistoryRecord],
) -> Result<(), StoreError> {
    let stored: Vec<HrvRecord> = records.iter().map(HrvRecord::from).collect();
    let bytes = serde_json::to_vec(&stored).map_err(|e| StoreError::Encode(e.to_string()))?;
    store.set(HRV_HISTORY_KEY, &bytes)
}

/// The most recent stored HRV value in milliseconds, or 0 when there is none.
///
/// This is what the home-screen widget shows.
pub fn latest_persisted_hrv(store: &dyn KeyValueStore) -> i64 {
    load_hrv_records(store)
        .ok()
        .and_then(|records| records.last().map(|r| r.value))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::kv::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 12, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let store = MemoryStore::new();
        let records = vec![
            HistoryRecord::new(now() - Duration::days(1), 61.0),
            HistoryRecord::new(now(), 65.0),
        ];

        save_hrv_history(&store, &records).unwrap();
        assert_eq!(load_hrv_history(&store).unwrap(), records);
    }

    #[test]
    fn test_stored_values_are_integers() {
        let store = MemoryStore::new();
        save_hrv_history(&store, &[HistoryRecord::new(now(), 64.6)]).unwrap();

        let raw = store.get(HRV_HISTORY_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(json[0]["value"], 65);
        assert!(json[0]["date"].as_str().is_some());
    }

    #[test]
    fn test_missing_entry_is_empty() {
        let store = MemoryStore::new();
        assert!(load_hrv_history(&store).unwrap().is_empty());
        assert_eq!(latest_persisted_hrv(&store), 0);
    }

    #[test]
    fn test_corrupt_entry_is_decode_error() {
        let store = MemoryStore::new();
        store.set(HRV_HISTORY_KEY, b"{not json").unwrap();

        assert!(matches!(load_hrv_history(&store), Err(StoreError::Decode(_))));
        assert_eq!(latest_persisted_hrv(&store), 0);
    }

    #[test]
    fn test_latest_persisted_hrv() {
        let store = MemoryStore::new();
        save_hrv_history(
            &store,
            &[
                HistoryRecord::new(now() - Duration::days(1), 58.0),
                HistoryRecord::new(now(), 71.0),
            ],
        )
        .unwrap();

        assert_eq!(latest_persisted_hrv(&store), 71);
    }
}
