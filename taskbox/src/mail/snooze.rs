//! Email snoozing.
//!
//! Snoozing a message swaps its `INBOX` label for `SNOOZED` and records a
//! wake time. [`SnoozeScheduler::poll_once`] re-queries the mailbox and
//! moves every due message back to the inbox;
//! [`SnoozeScheduler::spawn`] runs that poll on a fixed interval.
//!
//! The schedule is persisted under [`SNOOZE_STORAGE_KEY`] so that wake times
//! survive a restart. There is no backoff: a failed poll is logged and the
//! next tick simply tries again.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::persist::{KeyValueStore, PersistenceAdapter, SnapshotWriter};

/// Label carried by snoozed messages.
pub const SNOOZED_LABEL: &str = "SNOOZED";

/// Label of messages visible in the inbox.
pub const INBOX_LABEL: &str = "INBOX";

/// Storage key holding the snooze schedule.
pub const SNOOZE_STORAGE_KEY: &str = "snoozed-emails";

/// Errors reported by a [`Mailbox`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailError {
    /// The mailbox could not be reached.
    #[error("mailbox unavailable: {0}")]
    Unavailable(String),
    /// The message does not exist.
    #[error("message not found: {0}")]
    NotFound(String),
}

/// The remote mailbox, reduced to what snoozing needs.
pub trait Mailbox: Send + Sync {
    /// Returns the ids of messages carrying `label`.
    fn list_labeled(
        &self,
        label: &str,
    ) -> impl Future<Output = Result<Vec<String>, MailError>> + Send;

    /// Adds and removes labels on one message.
    fn modify_labels(
        &self,
        message_id: &str,
        add: &[&str],
        remove: &[&str],
    ) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// In-memory [`Mailbox`] keyed by message id.
#[derive(Debug, Default)]
pub struct MemoryMailbox {
    messages: Mutex<HashMap<String, BTreeSet<String>>>,
    unavailable: AtomicBool,
}

impl MemoryMailbox {
    /// Creates an empty mailbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message to the inbox.
    pub fn deliver(&self, message_id: &str) {
        self.messages
            .lock()
            .entry(message_id.to_string())
            .or_default()
            .insert(INBOX_LABEL.to_string());
    }

    /// Returns the labels on a message, or `None` if it does not exist.
    #[must_use]
    pub fn labels(&self, message_id: &str) -> Option<BTreeSet<String>> {
        self.messages.lock().get(message_id).cloned()
    }

    /// Makes every call fail with [`MailError::Unavailable`] while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), MailError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MailError::Unavailable("offline".to_string()));
        }
        Ok(())
    }
}

impl Mailbox for MemoryMailbox {
    async fn list_labeled(&self, label: &str) -> Result<Vec<String>, MailError> {
        self.check_available()?;
        let mut ids: Vec<String> = self
            .messages
            .lock()
            .iter()
            .filter(|(_, labels)| labels.contains(label))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn modify_labels(
        &self,
        message_id: &str,
        add: &[&str],
        remove: &[&str],
    ) -> Result<(), MailError> {
        self.check_available()?;
        let mut messages = self.messages.lock();
        let labels = messages
            .get_mut(message_id)
            .ok_or_else(|| MailError::NotFound(message_id.to_string()))?;
        for label in remove {
            labels.remove(*label);
        }
        for label in add {
            labels.insert((*label).to_string());
        }
        Ok(())
    }
}

/// One scheduled wake-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnoozeEntry {
    /// Mailbox message id.
    pub message_id: String,
    /// When the message should return to the inbox.
    pub until: DateTime<Utc>,
}

/// Tracks snoozed messages and wakes them when due.
pub struct SnoozeScheduler<M: Mailbox> {
    mailbox: Arc<M>,
    schedule: Mutex<Vec<SnoozeEntry>>,
    writer: SnapshotWriter<Vec<SnoozeEntry>>,
}

impl<M: Mailbox> SnoozeScheduler<M> {
    /// Restores the schedule from `adapter` and starts its snapshot writer.
    /// Must be called from within a tokio runtime.
    pub async fn load<S>(mailbox: Arc<M>, adapter: Arc<PersistenceAdapter<S>>) -> Self
    where
        S: KeyValueStore + 'static,
    {
        let schedule: Vec<SnoozeEntry> = adapter
            .get(SNOOZE_STORAGE_KEY)
            .await
            .unwrap_or_default();
        tracing::info!(count = schedule.len(), "loaded snooze schedule");
        let (writer, _handle) = SnapshotWriter::spawn(adapter, SNOOZE_STORAGE_KEY);
        Self {
            mailbox,
            schedule: Mutex::new(schedule),
            writer,
        }
    }

    /// Hides `message_id` from the inbox until `until`.
    ///
    /// Snoozing an already snoozed message moves its wake time.
    ///
    /// # Errors
    ///
    /// Returns the [`MailError`] from relabeling; the schedule is unchanged
    /// in that case.
    pub async fn snooze(&self, message_id: &str, until: DateTime<Utc>) -> Result<(), MailError> {
        self.mailbox
            .modify_labels(message_id, &[SNOOZED_LABEL], &[INBOX_LABEL])
            .await?;

        let mut schedule = self.schedule.lock();
        schedule.retain(|e| e.message_id != message_id);
        schedule.push(SnoozeEntry {
            message_id: message_id.to_string(),
            until,
        });
        self.writer.write(schedule.clone());
        drop(schedule);
        tracing::debug!(message_id, %until, "snoozed message");
        Ok(())
    }

    /// Returns a snapshot of the pending wake-ups.
    #[must_use]
    pub fn pending(&self) -> Vec<SnoozeEntry> {
        self.schedule.lock().clone()
    }

    /// Moves every snoozed message due at `now` back to the inbox.
    ///
    /// Schedule entries for messages that no longer carry the snoozed label
    /// are dropped. Messages carrying the label without a schedule entry are
    /// left alone. Returns the number of messages woken; a mailbox failure
    /// is logged and counts as zero.
    ///
    /// [`snooze`](Self::snooze) may run while this awaits the mailbox. Only
    /// entries that are unchanged since the label listing are pruned, and
    /// only the exact entries that were due are removed after waking, so a
    /// concurrent snooze or re-snooze keeps its wake-up.
    pub async fn poll_once(&self, now: DateTime<Utc>) -> usize {
        let listed_against = self.pending();
        let snoozed = match self.mailbox.list_labeled(SNOOZED_LABEL).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "snooze poll failed");
                return 0;
            }
        };

        let due: Vec<SnoozeEntry> = {
            let mut schedule = self.schedule.lock();
            let before = schedule.len();
            schedule.retain(|e| snoozed.contains(&e.message_id) || !listed_against.contains(e));
            if schedule.len() != before {
                tracing::debug!(pruned = before - schedule.len(), "pruned stale snoozes");
                self.writer.write(schedule.clone());
            }
            schedule.iter().filter(|e| e.until <= now).cloned().collect()
        };

        let mut woken = Vec::with_capacity(due.len());
        for entry in due {
            match self
                .mailbox
                .modify_labels(&entry.message_id, &[INBOX_LABEL], &[SNOOZED_LABEL])
                .await
            {
                Ok(()) => woken.push(entry),
                Err(e) => {
                    tracing::warn!(message_id = %entry.message_id, error = %e, "could not unsnooze message");
                }
            }
        }
        if woken.is_empty() {
            return 0;
        }

        let resnoozed: Vec<String> = {
            let mut schedule = self.schedule.lock();
            schedule.retain(|e| !woken.contains(e));
            self.writer.write(schedule.clone());
            woken
                .iter()
                .filter(|w| schedule.iter().any(|e| e.message_id == w.message_id))
                .map(|w| w.message_id.clone())
                .collect()
        };

        // A message re-snoozed while its wake-up was in flight may have lost
        // the label to that wake-up.
        for message_id in resnoozed {
            if let Err(e) = self
                .mailbox
                .modify_labels(&message_id, &[SNOOZED_LABEL], &[INBOX_LABEL])
                .await
            {
                tracing::warn!(message_id, error = %e, "could not restore snooze label");
            }
        }
        woken.len()
    }

    /// Waits until every schedule change so far has been written.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    /// Spawns a background task that polls every `interval`.
    ///
    /// The task runs until the returned [`tokio::task::JoinHandle`] is
    /// aborted or the runtime shuts down.
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()>
    where
        M: 'static,
    {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            loop {
                tick.tick().await;
                let woken = scheduler.poll_once(Utc::now()).await;
                if woken > 0 {
                    tracing::info!(woken, "snoozed messages returned to inbox");
                }
            }
        })
    }
}
