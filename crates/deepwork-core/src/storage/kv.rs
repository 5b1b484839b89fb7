//! Key-value backing store abstraction.
//!
//! The snapshot store, settings and backup counters only need string
//! get/set/remove. Production uses the SQLite `kv` table; tests use
//! [`MemoryStore`], which can also simulate an unavailable backend.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::error::StorageError;

pub trait KeyValueStore {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn kv_remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).kv_get(key)
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).kv_set(key, value)
    }

    fn kv_remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).kv_remove(key)
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
    writes_fail: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes and removals fail until reset.
    pub fn set_writes_fail(&self, fail: bool) {
        self.writes_fail.set(fail);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.writes_fail.get() {
            return Err(StorageError::Unavailable("memory store is read-only".into()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn kv_remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.kv_get("k").unwrap().is_none());
        store.kv_set("k", "v").unwrap();
        assert_eq!(store.kv_get("k").unwrap().as_deref(), Some("v"));
        store.kv_remove("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn failing_writes_leave_contents() {
        let store = MemoryStore::new();
        store.kv_set("k", "v").unwrap();
        store.set_writes_fail(true);
        assert!(store.kv_set("k", "w").is_err());
        assert!(store.kv_remove("k").is_err());
        assert_eq!(store.kv_get("k").unwrap().as_deref(), Some("v"));
    }
}
