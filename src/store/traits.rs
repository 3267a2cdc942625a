//! The `TextStore` trait: named text entries in a flat namespace.

use crate::error::{ProtectionError, Result};

/// Named text entries, the only persistence primitive the protection
/// services use.
///
/// Names are flat (no directories) and are validated with
/// [`validate_name`] by every implementation, so record identifiers can be
/// used to build them without risking path traversal.
pub trait TextStore: Send + Sync {
    /// Read an entry, `None` if it does not exist.
    fn read_text(&self, name: &str) -> Result<Option<String>>;

    /// Create or replace an entry. Readers never observe a partial write.
    fn write_text(&self, name: &str, content: &str) -> Result<()>;

    /// Append `line` plus a newline, creating the entry if needed.
    fn append_line(&self, name: &str, line: &str) -> Result<()>;

    fn exists(&self, name: &str) -> Result<bool>;

    /// Create an entry only if it does not exist yet.
    ///
    /// Returns `false` (and leaves the existing content untouched) when the
    /// entry already exists. Entries created this way are private to the
    /// owner where the backend supports it.
    fn create_new(&self, name: &str, content: &str) -> Result<bool>;
}

/// Reject entry names that are empty, contain path separators or control
/// characters, or refer to `.`/`..`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ProtectionError::invalid("entry name must not be empty"));
    }
    if name == "." || name == ".." {
        return Err(ProtectionError::invalid(format!(
            "entry name {name:?} is reserved"
        )));
    }
    if name.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
        return Err(ProtectionError::invalid(format!(
            "entry name {name:?} contains a path separator or control character"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_record_style_names() {
        validate_name("signatures.json").unwrap();
        validate_name("3f1c2a9e-7b1d-4a5e-9c1e-2b7f0d9e6a11.txt").unwrap();
        validate_name("P-abc.json").unwrap();
    }

    #[test]
    fn rejects_traversal_and_separators() {
        for bad in ["", ".", "..", "../keys", "a/b", "a\\b", "a\nb", "nul\0"] {
            assert!(
                matches!(validate_name(bad), Err(ProtectionError::InvalidInput(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
