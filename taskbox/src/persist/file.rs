//! Directory-backed [`KeyValueStore`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{KeyValueStore, PersistenceError, validate_key};

/// Name of the file written and removed while probing a directory.
const PROBE_FILE: &str = ".taskbox-probe";

/// Stores each key as `<dir>/<key>.json`.
///
/// Every `get`/`set`/`remove` maps to exactly one `tokio::fs` call. Writes are
/// not atomic: a crash mid-write can leave a truncated payload, which the
/// adapter then reports as malformed and treats as absent.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating it if needed.
    ///
    /// The directory is probed with a throwaway write so that a read-only or
    /// otherwise unusable location is rejected up front.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Io`] if the directory cannot be created or
    /// written to.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| PersistenceError::Io {
                path: dir.clone(),
                source,
            })?;

        let probe = dir.join(PROBE_FILE);
        tokio::fs::write(&probe, b"ok")
            .await
            .map_err(|source| PersistenceError::Io {
                path: probe.clone(),
                source,
            })?;
        if let Err(e) = tokio::fs::remove_file(&probe).await {
            tracing::debug!(path = %probe.display(), error = %e, "could not remove probe file");
        }

        Ok(Self { dir })
    }

    /// Returns the directory this store writes into.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Io { path, source }),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        tokio::fs::write(&path, value)
            .await
            .map_err(|source| PersistenceError::Io { path, source })
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistenceError::Io { path, source }),
        }
    }
}
