//! Storage collaborator boundary
//!
//! The host owns persistence (an on-device database). The pipeline only needs
//! somewhere to hand finished records, so storage is a trait; an in-memory
//! implementation backs tests, the CLI and hosts without their own store.

use crate::types::GameRecord;
use chrono::{DateTime, Utc};

/// Error raised by a record store
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Persists finished game records
pub trait RecordStore {
    /// Save one record
    fn save(&mut self, record: &GameRecord) -> Result<(), StoreError>;

    /// All records, newest first
    fn list(&self) -> Result<Vec<GameRecord>, StoreError>;

    /// Delete the record saved with this timestamp; returns whether one existed
    fn delete(&mut self, timestamp: DateTime<Utc>) -> Result<bool, StoreError>;
}

/// Records kept in memory for the lifetime of the store
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Vec<GameRecord>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove and return every record, newest first
    pub fn drain(&mut self) -> Vec<GameRecord> {
        let mut records = std::mem::take(&mut self.records);
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records
    }
}

impl RecordStore for MemoryRecordStore {
    fn save(&mut self, record: &GameRecord) -> Result<(), StoreError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<GameRecord>, StoreError> {
        let mut records = self.records.clone();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    fn delete(&mut self, timestamp: DateTime<Utc>) -> Result<bool, StoreError> {
        let before = self.records.len();
        self.records.retain(|r| r.timestamp != timestamp);
        Ok(self.records.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(offset_secs: i64) -> GameRecord {
        GameRecord {
            accuracy: 40,
            brain_power: 55,
            super_power: 50,
            endurance: 90,
            stability: 80,
            score: 200,
            success_count: 2,
            throw_count: 3,
            attention_avg: 70,
            meditation_avg: 60,
            coordination: 75,
            brain_activity: 50,
            focus: 70,
            perception: 40,
            user_name: "player".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
                + Duration::seconds(offset_secs),
            completion_time: 90,
        }
    }

    #[test]
    fn test_list_newest_first() {
        let mut store = MemoryRecordStore::new();
        store.save(&record(0)).unwrap();
        store.save(&record(60)).unwrap();
        store.save(&record(30)).unwrap();

        let listed = store.list().unwrap();
        let offsets: Vec<i64> = listed
            .iter()
            .map(|r| (r.timestamp - record(0).timestamp).num_seconds())
            .collect();
        assert_eq!(offsets, vec![60, 30, 0]);
    }

    #[test]
    fn test_delete_by_timestamp() {
        let mut store = MemoryRecordStore::new();
        store.save(&record(0)).unwrap();
        store.save(&record(10)).unwrap();

        assert!(store.delete(record(10).timestamp).unwrap());
        assert!(!store.delete(record(10).timestamp).unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_drain_empties_store() {
        let mut store = MemoryRecordStore::new();
        store.save(&record(0)).unwrap();
        store.save(&record(20)).unwrap();

        let drained = store.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].timestamp, record(20).timestamp);
        assert!(store.is_empty());
        assert!(store.drain().is_empty());
    }
}
