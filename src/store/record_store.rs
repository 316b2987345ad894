use std::{collections::HashSet, sync::Arc};

use crate::{log_info, log_warn};
use crate::{models::Receipt, storage::KeyValueStorage};

// Set to false to silence store diagnostics.
const ENABLE_LOGS: bool = true;

/// Receipts in insertion order, written through to one storage key.
///
/// Every mutation rewrites the whole collection. When the medium cannot be
/// read or written the store stays usable in memory and reports itself as
/// degraded until a later write succeeds.
///
/// A medium that could not be read is never written: its contents are unknown,
/// so a rewrite could drop receipts. Writes resume once a read succeeds, with
/// the receipts taken in the meantime appended after the persisted ones.
pub struct RecordStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    records: Vec<Receipt>,
    degraded: bool,
    unreadable: bool,
}

impl RecordStore {
    pub fn open(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        let mut store = Self {
            storage,
            key: key.into(),
            records: Vec::new(),
            degraded: false,
            unreadable: false,
        };
        store.reload();
        log_info!(
            "Opened receipt store '{}' with {} receipts",
            store.key,
            store.records.len()
        );
        store
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the persisted collection. Absent, unreadable or unparsable data is
    /// an empty collection; malformed entries are skipped.
    pub fn load(&self) -> Vec<Receipt> {
        self.read_persisted().unwrap_or_default()
    }

    /// Replace the in-memory collection with what the medium holds.
    pub fn reload(&mut self) {
        match self.read_persisted() {
            Some(records) => {
                self.records = records;
                self.degraded = false;
                self.unreadable = false;
            }
            None => {
                self.records.clear();
                self.degraded = true;
                self.unreadable = true;
            }
        }
    }

    /// `None` only when the medium itself failed.
    fn read_persisted(&self) -> Option<Vec<Receipt>> {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Some(Vec::new()),
            Err(err) => {
                log_warn!("Receipt storage unavailable, continuing in memory: {err:#}");
                return None;
            }
        };

        let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                log_warn!("Ignoring unparsable receipt data under '{}': {err}", self.key);
                return Some(Vec::new());
            }
        };

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<Receipt>(entry) {
                Ok(record) if seen.insert(record.id) => records.push(record),
                Ok(record) => log_warn!("Skipping duplicate receipt id {}", record.id),
                Err(err) => log_warn!("Skipping malformed receipt at index {index}: {err}"),
            }
        }
        Some(records)
    }

    /// Re-read an unreadable medium and fold the in-memory receipts in after
    /// the persisted ones. Returns false while the medium still cannot be read.
    fn recover(&mut self) -> bool {
        let Some(persisted) = self.read_persisted() else {
            return false;
        };

        let pending = std::mem::replace(&mut self.records, persisted);
        let recovered = pending.len();
        for mut record in pending {
            if self.records.iter().any(|existing| existing.id == record.id) {
                let id = self.next_id(record.id);
                log_warn!("Receipt id {} already persisted, storing it as {id}", record.id);
                record.id = id;
            }
            self.records.push(record);
        }
        self.unreadable = false;
        log_info!(
            "Receipt storage readable again, merged {recovered} receipts held in memory"
        );
        true
    }

    fn persist(&mut self) {
        if self.unreadable && !self.recover() {
            log_warn!(
                "Receipt storage still unreadable, holding {} receipts in memory",
                self.records.len()
            );
            self.degraded = true;
            return;
        }

        let result = serde_json::to_string(&self.records)
            .map_err(anyhow::Error::from)
            .and_then(|payload| self.storage.set(&self.key, &payload));

        match result {
            Ok(()) => self.degraded = false,
            Err(err) => {
                log_warn!("Failed to persist receipts, keeping them in memory only: {err:#}");
                self.degraded = true;
            }
        }
    }

    /// Smallest id not below `now_ms` that keeps ids increasing.
    pub fn next_id(&self, now_ms: i64) -> i64 {
        match self.records.iter().map(|record| record.id).max() {
            Some(last) if last >= now_ms => last + 1,
            _ => now_ms,
        }
    }

    /// Add `record` and persist. Returns false, leaving the store untouched,
    /// when a record with the same id already exists.
    pub fn append(&mut self, record: Receipt) -> bool {
        if self.records.iter().any(|existing| existing.id == record.id) {
            log_warn!("Refusing to append duplicate receipt id {}", record.id);
            return false;
        }
        self.records.push(record);
        self.persist();
        true
    }

    pub fn remove(&mut self, id: i64) -> bool {
        let Some(position) = self.records.iter().position(|record| record.id == id) else {
            return false;
        };
        self.records.remove(position);
        self.persist();
        true
    }

    /// Newest first.
    pub fn list(&self) -> Vec<Receipt> {
        self.records.iter().rev().cloned().collect()
    }

    pub fn get(&self, id: i64) -> Option<Receipt> {
        self.records.iter().find(|record| record.id == id).cloned()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        match self.storage.remove(&self.key) {
            Ok(()) => {
                self.degraded = false;
                self.unreadable = false;
            }
            Err(err) => {
                log_warn!("Failed to clear persisted receipts: {err:#}");
                self.degraded = true;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}
