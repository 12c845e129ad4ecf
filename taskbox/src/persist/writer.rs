//! Ordered background writer for store snapshots.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::{KeyValueStore, PersistenceAdapter};

enum WriteCommand<T> {
    Write(T),
    Barrier(oneshot::Sender<()>),
}

/// Fire-and-forget snapshot writer bound to one storage key.
///
/// Snapshots are queued on an unbounded channel and written by a single
/// background task in the order they were queued, one store call each.
/// Failures are logged by the adapter and never retried. The task exits once
/// every [`SnapshotWriter`] handle has been dropped and the queue is drained.
pub struct SnapshotWriter<T> {
    tx: mpsc::UnboundedSender<WriteCommand<T>>,
    key: &'static str,
}

impl<T> SnapshotWriter<T>
where
    T: Serialize + Send + Sync + 'static,
{
    /// Spawns the writer task. Must be called from within a tokio runtime.
    pub fn spawn<S>(adapter: Arc<PersistenceAdapter<S>>, key: &'static str) -> (Self, JoinHandle<()>)
    where
        S: KeyValueStore + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<WriteCommand<T>>();
        let handle = tokio::spawn(async move {
            let mut written: u64 = 0;
            while let Some(cmd) = rx.recv().await {
                match cmd {
                    WriteCommand::Write(snapshot) => {
                        adapter.set(key, &snapshot).await;
                        written += 1;
                    }
                    WriteCommand::Barrier(ack) => {
                        // The waiter may have given up; nothing to do then.
                        let _ = ack.send(());
                    }
                }
            }
            tracing::debug!(key, written, "snapshot writer stopped");
        });
        (Self { tx, key }, handle)
    }

    /// Queues `snapshot` for writing.
    pub fn write(&self, snapshot: T) {
        if self.tx.send(WriteCommand::Write(snapshot)).is_err() {
            tracing::warn!(key = self.key, "snapshot writer gone, dropping write");
        }
    }

    /// Waits until every snapshot queued before this call has been written.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(WriteCommand::Barrier(ack_tx)).is_err() {
            return;
        }
        let _ = ack_rx.await;
    }
}
