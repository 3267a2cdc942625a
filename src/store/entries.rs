//! JSON object files holding many `name -> text` entries.
//!
//! Used for the signature store and the sealed-metadata files. The whole
//! object is read, modified and rewritten; there is no locking, so two
//! concurrent writers to the same file can lose an update.

use serde_json::{Map, Value};

use super::traits::TextStore;
use crate::error::{ProtectionError, Result};

fn load_map(store: &dyn TextStore, file: &str) -> Result<Map<String, Value>> {
    let Some(text) = store.read_text(file)? else {
        return Ok(Map::new());
    };
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ProtectionError::corrupt(file, "expected a JSON object")),
        Err(e) => Err(ProtectionError::corrupt(file, e)),
    }
}

/// Read one entry. `None` if the file or the key does not exist.
pub fn get_entry(store: &dyn TextStore, file: &str, key: &str) -> Result<Option<String>> {
    let map = load_map(store, file)?;
    match map.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ProtectionError::corrupt(
            file,
            format!("entry {key:?} is not a string"),
        )),
    }
}

/// Insert or overwrite one entry, keeping all others.
pub fn put_entry(store: &dyn TextStore, file: &str, key: &str, value: &str) -> Result<()> {
    let mut map = load_map(store, file)?;
    map.insert(key.to_string(), Value::String(value.to_string()));
    let text = serde_json::to_string_pretty(&Value::Object(map))?;
    store.write_text(file, &text)
}
