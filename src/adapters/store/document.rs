//! Whole-document JSON persistence.
//!
//! Every store in this crate reads the full document, mutates it in
//! memory, and writes the full document back. A missing file self-heals
//! to the type's default; corrupt JSON is an error, not silent data
//! loss.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::errors::{DomainError, DomainResult};

pub struct JsonDocument<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T> JsonDocument<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, or the default when the file does not exist.
    pub fn load(&self) -> DomainResult<T> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                DomainError::Store(format!(
                    "corrupt document at {}: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(DomainError::Store(format!(
                "cannot read {}: {e}",
                self.path.display()
            ))),
        }
    }

    /// Write the full document, creating parent directories as needed.
    /// Writes go to a sibling temp file first and land via rename, so a
    /// crash mid-write never leaves a truncated document behind.
    pub fn save(&self, value: &T) -> DomainResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(value)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(|e| {
            DomainError::Store(format!("cannot write {}: {e}", tmp.display()))
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            DomainError::Store(format!("cannot replace {}: {e}", self.path.display()))
        })
    }

    /// Load, apply a mutation, save, and return the closure's result.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> DomainResult<R> {
        let mut doc = self.load()?;
        let result = f(&mut doc);
        self.save(&doc)?;
        Ok(result)
    }
}
