//! In-memory `TextStore`, used by tests and by callers that persist
//! entries themselves.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::traits::{validate_name, TextStore};
use crate::error::Result;

/// Interior mutability via `parking_lot::Mutex`, so a single instance can
/// be shared behind an `Arc` like the file-backed store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all entries, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}

impl TextStore for MemoryStore {
    fn read_text(&self, name: &str) -> Result<Option<String>> {
        validate_name(name)?;
        Ok(self.entries.lock().get(name).cloned())
    }

    fn write_text(&self, name: &str, content: &str) -> Result<()> {
        validate_name(name)?;
        self.entries
            .lock()
            .insert(name.to_string(), content.to_string());
        Ok(())
    }

    fn append_line(&self, name: &str, line: &str) -> Result<()> {
        validate_name(name)?;
        let mut entries = self.entries.lock();
        let entry = entries.entry(name.to_string()).or_default();
        entry.push_str(line);
        entry.push('\n');
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        Ok(self.entries.lock().contains_key(name))
    }

    fn create_new(&self, name: &str, content: &str) -> Result<bool> {
        validate_name(name)?;
        let mut entries = self.entries.lock();
        if entries.contains_key(name) {
            return Ok(false);
        }
        entries.insert(name.to_string(), content.to_string());
        Ok(true)
    }
}
