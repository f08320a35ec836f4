//! Scoped client-side key-value persistence.
//!
//! The editor core only sees [`ScopedStore`]: `get(scope)` / `put(scope, value)`
//! over JSON text. The browser backs it with `localStorage` (see
//! `crate::dom`), the CLI with one file per scope, tests with memory.
//!
//! Malformed JSON is never fatal: [`load_json`] logs it and falls back to the
//! type's default, as if nothing had been stored.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::EditorError;

/// Minimal string store keyed by scope.
pub trait ScopedStore {
    /// Raw text stored under `scope`, if any.
    fn get(&self, scope: &str) -> Option<String>;

    /// Replace the text stored under `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing medium rejects the write.
    fn put(&mut self, scope: &str, value: &str) -> Result<(), EditorError>;
}

impl<S: ScopedStore + ?Sized> ScopedStore for &mut S {
    fn get(&self, scope: &str) -> Option<String> {
        (**self).get(scope)
    }

    fn put(&mut self, scope: &str, value: &str) -> Result<(), EditorError> {
        (**self).put(scope, value)
    }
}

/// Parse the JSON stored under `scope`.
///
/// Returns `Ok(None)` when nothing is stored.
///
/// # Errors
///
/// Returns [`EditorError::MalformedLocalState`] when the stored text does not parse.
fn load_json_strict<T, S>(store: &S, scope: &str) -> Result<Option<T>, EditorError>
where
    T: DeserializeOwned,
    S: ScopedStore + ?Sized,
{
    let Some(raw) = store.get(scope) else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| EditorError::MalformedLocalState { scope: scope.to_owned(), reason: e.to_string() })
}

/// Parse the JSON stored under `scope`, treating absence or corruption as empty.
pub fn load_json<T, S>(store: &S, scope: &str) -> T
where
    T: DeserializeOwned + Default,
    S: ScopedStore + ?Sized,
{
    match load_json_strict(store, scope) {
        Ok(value) => value.unwrap_or_default(),
        Err(err) => {
            tracing::warn!(error = %err, "discarding malformed local state");
            T::default()
        }
    }
}

/// Serialize `value` as JSON under `scope`.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn save_json<T, S>(store: &mut S, scope: &str, value: &T) -> Result<(), EditorError>
where
    T: Serialize + ?Sized,
    S: ScopedStore + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.put(scope, &raw)
}

// =============================================================
// In-memory store
// =============================================================

/// Store that lives only as long as the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScopedStore for MemoryStore {
    fn get(&self, scope: &str) -> Option<String> {
        self.entries.get(scope).cloned()
    }

    fn put(&mut self, scope: &str, value: &str) -> Result<(), EditorError> {
        self.entries.insert(scope.to_owned(), value.to_owned());
        Ok(())
    }
}

// =============================================================
// File store
// =============================================================

/// One JSON file per scope inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Use (and lazily create) `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `scope`. The scope is percent-encoded, so distinct
    /// scopes always map to distinct files and never leave `dir`.
    #[must_use]
    pub fn path_for(&self, scope: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(scope)))
    }
}

impl ScopedStore for FileStore {
    fn get(&self, scope: &str) -> Option<String> {
        match fs::read_to_string(self.path_for(scope)) {
            Ok(raw) => Some(raw),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(scope, error = %err, "failed to read local state");
                None
            }
        }
    }

    fn put(&mut self, scope: &str, value: &str) -> Result<(), EditorError> {
        let io_err = |e: io::Error| EditorError::MalformedLocalState { scope: scope.to_owned(), reason: e.to_string() };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        fs::write(self.path_for(scope), value).map_err(io_err)
    }
}
