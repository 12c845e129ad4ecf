//! Typed, failure-absorbing access on top of a [`KeyValueStore`].

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use taskbox_proto::codec;

use super::{FileStore, KeyValueStore, MemoryStore, PersistenceError};

/// The concrete store picked at startup.
///
/// [`Backend::open`] walks the candidates in priority order: the primary
/// data directory, then the fallback directory, then process memory.
#[derive(Debug)]
pub enum Backend {
    /// Files in a directory.
    File(FileStore),
    /// In-process map; nothing survives a restart.
    Memory(MemoryStore),
}

impl Backend {
    /// Opens the first usable backend, never failing.
    ///
    /// Each candidate directory that cannot be created or written is logged
    /// and skipped. When none works, an in-memory store is returned.
    pub async fn open(primary: Option<&Path>, fallback: Option<&Path>) -> Self {
        for dir in [primary, fallback].into_iter().flatten() {
            match FileStore::open(dir).await {
                Ok(store) => {
                    tracing::info!(dir = %dir.display(), "using file storage");
                    return Self::File(store);
                }
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "storage directory unusable");
                }
            }
        }
        tracing::warn!("no usable storage directory, state will not survive a restart");
        Self::Memory(MemoryStore::new())
    }

    /// Short human-readable description of the backend.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::File(store) => format!("file:{}", store.dir().display()),
            Self::Memory(_) => "memory".to_string(),
        }
    }

    /// Returns `true` for the in-memory fallback.
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory(_))
    }
}

impl KeyValueStore for Backend {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match self {
            Self::File(store) => store.get(key).await,
            Self::Memory(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        match self {
            Self::File(store) => store.set(key, value).await,
            Self::Memory(store) => store.set(key, value).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match self {
            Self::File(store) => store.remove(key).await,
            Self::Memory(store) => store.remove(key).await,
        }
    }
}

/// JSON-typed access to a [`KeyValueStore`] that never returns an error.
///
/// - `get` yields `None` on a missing key, an I/O failure, or a payload that
///   does not decode as `T`.
/// - `set` and `remove` log failures and return normally.
///
/// Each call issues at most one store operation; there is no batching and no
/// retry.
#[derive(Debug)]
pub struct PersistenceAdapter<S: KeyValueStore = Backend> {
    store: S,
}

impl<S: KeyValueStore> PersistenceAdapter<S> {
    /// Wraps `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the wrapped store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Reads and decodes the value stored under `key`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let text = match self.store.get(key).await {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "storage read failed");
                return None;
            }
        };
        match codec::decode(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    key,
                    error = %PersistenceError::from(e),
                    "discarding malformed stored payload"
                );
                None
            }
        }
    }

    /// Encodes `value` and stores it under `key`.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let text = match codec::encode(value) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(key, error = %e, "could not encode value for storage");
                return;
            }
        };
        if let Err(e) = self.store.set(key, text).await {
            tracing::warn!(key, error = %e, "storage write failed");
        }
    }

    /// Removes the value stored under `key`.
    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            tracing::warn!(key, error = %e, "storage remove failed");
        }
    }
}
