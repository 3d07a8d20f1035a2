//! Key-value persistence backends for the preference store

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("IO error on key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// A string keyed store of opaque byte values.
///
/// Absence of a key is not an error; implementations return `Ok(None)`.
pub trait StorageBackend: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;
}

// =============================================================================

/// Helpers for the `<Page>-<Kind>` storage key convention
pub struct StorageKey;

impl StorageKey {
    pub fn preferences(page: &str) -> String {
        format!("{page}-Preferences")
    }

    pub fn widths(page: &str) -> String {
        format!("{page}-Widths")
    }
}

// =============================================================================

/// Backend that keeps everything in memory.
///
/// Clones share the same map, so a value saved through one store instance can
/// be loaded by a fresh instance built on a clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    map: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let lock = self
            .map
            .lock()
            .map_err(|_| StorageError::Unavailable("poisoned".into()))?;
        Ok(lock.get(key).cloned())
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut lock = self
            .map
            .lock()
            .map_err(|_| StorageError::Unavailable("poisoned".into()))?;
        lock.insert(key.to_string(), value);
        Ok(())
    }
}

// =============================================================================

/// Backend storing one file per key in a directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // keys come from page names; keep them from escaping the directory
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        self.root.join(format!("{name}.cbor"))
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        std::fs::create_dir_all(&self.root).map_err(io_err)?;

        let path = self.path_for(key);
        let tmp = path.with_extension("cbor.tmp");

        std::fs::write(&tmp, value).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)?;

        Ok(())
    }
}
