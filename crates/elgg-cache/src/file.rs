//! File-backed cache
//!
//! Each entry is a JSON document named after its key inside the cache
//! directory. The directory is created on first write. Entries are written to
//! a temporary file and renamed into place, so readers never see half a write.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::key::CacheKey;
use crate::pool::Pool;

pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &CacheKey) -> Result<PathBuf> {
        let key = key.normalized()?;
        let valid = !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(CacheError::InvalidKey { key });
        }
        Ok(self.root.join(format!("{}.json", key)))
    }

    /// Store `value` under `key`
    pub fn save(&self, key: impl Into<CacheKey>, value: &Value) -> Result<()> {
        let path = self.entry_path(&key.into())?;
        let bytes = serde_json::to_vec(value)?;
        fs::create_dir_all(&self.root)?;
        let mut file = NamedTempFile::new_in(&self.root)?;
        file.write_all(&bytes)?;
        file.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Load the value stored under `key`, if any
    pub fn load(&self, key: impl Into<CacheKey>) -> Result<Option<Value>> {
        let path = self.entry_path(&key.into())?;
        match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => Ok(Some(value)),
                Err(err) => {
                    warn!("Discarding corrupt cache entry {}: {}", path.display(), err);
                    match fs::remove_file(&path) {
                        Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
                        _ => Ok(None),
                    }
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove the entry stored under `key`
    pub fn delete(&self, key: impl Into<CacheKey>) -> Result<()> {
        let path = self.entry_path(&key.into())?;
        match fs::remove_file(&path) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    /// Remove every entry
    pub fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => {
                debug!("Cleared file cache at {}", self.root.display());
                Ok(())
            }
        }
    }
}

impl Pool for FileCache {
    fn get(&self, key: CacheKey, regenerate: &dyn Fn() -> Value) -> Result<Value> {
        if let Some(value) = self.load(key.clone())? {
            return Ok(value);
        }
        let value = regenerate();
        self.save(key, &value)?;
        Ok(value)
    }

    fn put(&self, key: CacheKey, value: Value) -> Result<()> {
        self.save(key, &value)
    }

    fn invalidate(&self, key: CacheKey) -> Result<()> {
        self.delete(key)
    }
}
