//! In-memory hook store. Same semantics as the SQLite store, no durability.
//! Used by tests and for ephemeral runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use duehook_core::{DuehookError, Result};

use crate::{KEY_PREFIX, ScheduleStore, namespaced};

/// BTreeMap-backed store; scans come back sorted like the SQLite impl.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.records
            .lock()
            .map_err(|e| DuehookError::Store(format!("Lock: {e}")))
    }
}

impl ScheduleStore for MemoryStore {
    fn put(&self, id: &str, value: &str) -> Result<()> {
        self.lock()?.insert(namespaced(id), value.to_string());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(&namespaced(id)).cloned())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.lock()?.remove(&namespaced(id)).is_some())
    }

    fn scan_ids(&self, prefix: &str) -> Result<Vec<String>> {
        let needle = namespaced(prefix);
        Ok(self
            .lock()?
            .keys()
            .filter(|key| key.starts_with(&needle))
            .filter_map(|key| key.strip_prefix(KEY_PREFIX).map(String::from))
            .collect())
    }

    fn ping(&self) -> Result<()> {
        self.lock()?;
        Ok(())
    }
}
