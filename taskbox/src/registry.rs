//! Process-wide store context.
//!
//! [`StoreRegistry`] is built once at startup and handed to every consumer,
//! giving single-instance stores without module-level globals.

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::persist::{Backend, MemoryStore, PersistenceAdapter};
use crate::projects::ProjectStore;
use crate::tasks::TaskStore;

/// Owns the task store, the project store and the storage adapter they share.
pub struct StoreRegistry {
    /// Task collection.
    pub tasks: Arc<TaskStore>,
    /// Project collection; reads `tasks` for hydration.
    pub projects: ProjectStore,
    storage: Arc<PersistenceAdapter<Backend>>,
}

impl StoreRegistry {
    /// Opens storage per `config` and restores persisted state.
    ///
    /// Never fails: an unusable storage location degrades to the next
    /// fallback and ultimately to memory.
    pub async fn open(config: &StorageConfig) -> Self {
        let backend = Backend::open(
            Some(config.data_dir.as_path()),
            config.fallback_dir.as_deref(),
        )
        .await;
        tracing::info!(backend = %backend.describe(), "storage ready");
        Self::with_adapter(Arc::new(PersistenceAdapter::new(backend))).await
    }

    /// Builds a registry whose storage lives only in process memory.
    pub async fn in_memory() -> Self {
        let backend = Backend::Memory(MemoryStore::new());
        Self::with_adapter(Arc::new(PersistenceAdapter::new(backend))).await
    }

    /// Returns the shared storage adapter, for collaborators that persist
    /// their own keys.
    #[must_use]
    pub fn storage(&self) -> Arc<PersistenceAdapter<Backend>> {
        Arc::clone(&self.storage)
    }

    /// Waits until every store mutation so far has been written.
    pub async fn flush(&self) {
        self.projects.flush().await;
    }

    async fn with_adapter(storage: Arc<PersistenceAdapter<Backend>>) -> Self {
        let tasks = Arc::new(TaskStore::new());
        let projects = ProjectStore::load(Arc::clone(&storage), Arc::clone(&tasks)).await;
        Self {
            tasks,
            projects,
            storage,
        }
    }
}
