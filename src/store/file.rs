//! Directory-backed `TextStore`.
//!
//! Each entry is one file directly under the root directory. Replacing
//! writes go through a temporary file in the same directory followed by a
//! rename, so a crash never leaves a half-written key or signature file.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::traits::{validate_name, TextStore};
use crate::error::{ProtectionError, Result};

#[derive(Debug, Clone)]
pub struct FileStore {
    root_dir: PathBuf,
}

impl FileStore {
    /// Open (creating if necessary) a store rooted at `root_dir`.
    pub fn open(root_dir: impl Into<PathBuf>) -> Result<Self> {
        let root_dir = root_dir.into();
        fs::create_dir_all(&root_dir)
            .map_err(|e| ProtectionError::storage(root_dir.display().to_string(), e))?;
        info!(path = %root_dir.display(), "Opened file store");
        Ok(Self { root_dir })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Absolute path of an entry. The name is validated first.
    pub fn path_of(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root_dir.join(name))
    }

    fn temp_file(&self, name: &str, content: &str) -> Result<NamedTempFile> {
        let mut tmp = NamedTempFile::new_in(&self.root_dir)
            .map_err(|e| ProtectionError::storage(name, e))?;
        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| ProtectionError::storage(name, e))?;
        Ok(tmp)
    }
}

impl TextStore for FileStore {
    fn read_text(&self, name: &str) -> Result<Option<String>> {
        let path = self.path_of(name)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ProtectionError::storage(name, e)),
        }
    }

    fn write_text(&self, name: &str, content: &str) -> Result<()> {
        let path = self.path_of(name)?;
        let tmp = self.temp_file(name, content)?;
        tmp.persist(&path)
            .map_err(|e| ProtectionError::storage(name, e.error))?;
        debug!(entry = name, bytes = content.len(), "Wrote entry");
        Ok(())
    }

    fn append_line(&self, name: &str, line: &str) -> Result<()> {
        let path = self.path_of(name)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ProtectionError::storage(name, e))?;
        file.write_all(format!("{line}\n").as_bytes())
            .map_err(|e| ProtectionError::storage(name, e))?;
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        let path = self.path_of(name)?;
        Ok(path.is_file())
    }

    fn create_new(&self, name: &str, content: &str) -> Result<bool> {
        let path = self.path_of(name)?;
        let tmp = self.temp_file(name, content)?;
        // NamedTempFile is created owner-only on unix; make it explicit.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| ProtectionError::storage(name, e))?;
        }
        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                debug!(entry = name, "Created entry");
                Ok(true)
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(ProtectionError::storage(name, e.error)),
        }
    }
}
