//! Durable key-value persistence for store snapshots.
//!
//! Defines the [`KeyValueStore`] trait over raw string payloads, two
//! backends ([`FileStore`] and [`MemoryStore`]), the [`Backend`] fallback
//! chain, and [`PersistenceAdapter`], which adds typed JSON access and
//! swallows every failure at its boundary. [`SnapshotWriter`] moves writes
//! off the caller's path.
//!
//! Callers above the adapter never see a [`PersistenceError`]: a failed read
//! looks like "no data" and a failed write looks like a no-op, with the cause
//! logged through `tracing`.

mod adapter;
mod file;
mod memory;
mod writer;

pub use adapter::{Backend, PersistenceAdapter};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use writer::SnapshotWriter;

use std::future::Future;
use std::path::PathBuf;

/// Errors raised by a [`KeyValueStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Underlying I/O failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A value could not be encoded or a stored payload could not be decoded.
    #[error(transparent)]
    Serialize(#[from] taskbox_proto::codec::CodecError),

    /// The key cannot be mapped onto the backend.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Raw string key-value storage.
///
/// Implementations include:
/// - [`FileStore`]: one file per key in a directory
/// - [`MemoryStore`]: process-local map, last resort when no directory works
pub trait KeyValueStore: Send + Sync {
    /// Reads the payload stored under `key`, or `None` if nothing is stored.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, PersistenceError>> + Send;

    /// Stores `value` under `key`, replacing any previous payload.
    fn set(&self, key: &str, value: String)
    -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Removes the payload stored under `key`. Removing a missing key is not
    /// an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Checks that `key` is non-empty and made of `[A-Za-z0-9_.-]` only.
///
/// # Errors
///
/// Returns [`PersistenceError::InvalidKey`] otherwise. Keys made only of dots
/// are rejected too since they would name a directory.
pub fn validate_key(key: &str) -> Result<(), PersistenceError> {
    let charset_ok = key
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'));
    if key.is_empty() || !charset_ok || key.bytes().all(|b| b == b'.') {
        return Err(PersistenceError::InvalidKey(key.to_string()));
    }
    Ok(())
}
