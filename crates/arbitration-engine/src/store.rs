//! Arbitration Record Store
//!
//! Uses sled embedded database to persist arbitration records across restarts.
//! Records are JSON objects keyed `arbitrationHash/<lowercased hash>`; updates
//! are shallow merges and every write is flushed before returning.

use crate::error::StoreError;
use arbitration_types::{record_key, ArbitrationRecord, ARBITRATION_PREFIX};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use sled::Db;
use std::collections::BTreeMap;
use std::path::Path;

/// Durable keyed record store
pub struct ArbitrationStore {
    /// Sled database instance
    db: Db,
}

impl ArbitrationStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(&path)?;

        tracing::info!("Opened arbitration store at {:?}", path.as_ref());

        Ok(Self { db })
    }

    /// Get the record for a transaction hash (any case)
    pub fn get(&self, hash: &str) -> Result<Option<ArbitrationRecord>, StoreError> {
        self.get_json(&record_key(hash))
    }

    /// Shallow-merge `patch` into the record for `hash`, creating it if absent.
    ///
    /// Fields absent from the patch keep their stored value. Concurrent writers
    /// to the same key are serialized by compare-and-swap: a writer that lost
    /// the race re-reads and merges on top of the winner's record.
    pub fn upsert(&self, hash: &str, patch: &ArbitrationRecord) -> Result<ArbitrationRecord, StoreError> {
        let key = record_key(hash);
        let mut patch = patch.clone();
        patch.updated_at = Some(chrono::Utc::now().timestamp());
        let patch = match serde_json::to_value(&patch)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };

        let merged = loop {
            let current = self.db.get(&key)?;
            let mut fields = match current.as_deref() {
                Some(bytes) => match serde_json::from_slice::<Value>(bytes)? {
                    Value::Object(fields) => fields,
                    _ => Map::new(),
                },
                None => Map::new(),
            };
            for (field, value) in &patch {
                fields.insert(field.clone(), value.clone());
            }
            let merged = Value::Object(fields);
            let bytes = serde_json::to_vec(&merged)?;

            match self.db.compare_and_swap(&key, current, Some(bytes))? {
                Ok(()) => break merged,
                Err(_) => {
                    tracing::debug!("Concurrent write to {}, retrying merge", key);
                    continue;
                }
            }
        };

        self.flush()?;
        Ok(serde_json::from_value(merged)?)
    }

    /// All records under `prefix`, keyed by the remainder of the key
    pub fn get_all<T: DeserializeOwned>(&self, prefix: &str) -> Result<BTreeMap<String, T>, StoreError> {
        let mut entries = BTreeMap::new();

        for result in self.db.scan_prefix(prefix) {
            let (key, value) = result?;
            let key = String::from_utf8_lossy(&key);
            let name = key.strip_prefix(prefix).unwrap_or(key.as_ref()).to_string();
            entries.insert(name, serde_json::from_slice(&value)?);
        }

        Ok(entries)
    }

    /// All arbitration records keyed by normalized hash
    pub fn records(&self) -> Result<BTreeMap<String, ArbitrationRecord>, StoreError> {
        self.get_all(ARBITRATION_PREFIX)
    }

    /// Read a JSON value stored under a raw key
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.db.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Replace the JSON value stored under a raw key
    pub fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value)?;
        self.db.insert(key, bytes)?;
        self.flush()
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}
