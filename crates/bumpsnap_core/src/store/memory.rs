//! Volatile in-process backing store.

use super::{BackingStore, StoreResult};
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Seeds one raw entry, bypassing any encoding.
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.borrow_mut().insert(key.into(), value.into());
        self
    }

    /// Raw stored text for `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl BackingStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
