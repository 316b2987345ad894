use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        RwLock,
    },
};

use anyhow::{anyhow, bail, Result};

use super::KeyValueStorage;

/// Process-local storage. Survives new handles only when shared via `Arc`.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set`/`remove` fail, as a full or revoked
    /// storage quota would.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `get` fail, as an unreadable medium would.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("memory storage could not read '{key}'");
        }
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("memory storage lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("memory storage rejected write to '{key}'");
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("memory storage lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("memory storage rejected removal of '{key}'");
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("memory storage lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("receipts").unwrap(), None);
        storage.set("receipts", "[]").unwrap();
        assert_eq!(storage.get("receipts").unwrap().as_deref(), Some("[]"));
        storage.remove("receipts").unwrap();
        assert_eq!(storage.raw("receipts"), None);
    }

    #[test]
    fn failing_writes_leave_previous_value() {
        let storage = MemoryStorage::new();
        storage.set("receipts", "[1]").unwrap();
        storage.fail_writes(true);
        assert!(storage.set("receipts", "[2]").is_err());
        assert!(storage.remove("receipts").is_err());
        assert_eq!(storage.raw("receipts").as_deref(), Some("[1]"));
    }

    #[test]
    fn failing_reads_keep_the_value() {
        let storage = MemoryStorage::new();
        storage.set("receipts", "[1]").unwrap();
        storage.fail_reads(true);
        assert!(storage.get("receipts").is_err());
        storage.fail_reads(false);
        assert_eq!(storage.get("receipts").unwrap().as_deref(), Some("[1]"));
    }
}
