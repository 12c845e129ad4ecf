//! Integration tests for email snoozing.
//!
//! Drives [`SnoozeScheduler`] against an in-memory mailbox: schedule
//! persistence across restarts, the background poll loop, and tolerance of
//! mailbox outages, including snoozes that race a poll in flight.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;
use taskbox::config::StorageConfig;
use taskbox::mail::snooze::{INBOX_LABEL, SNOOZE_STORAGE_KEY, SNOOZED_LABEL};
use taskbox::mail::{MailError, Mailbox, MemoryMailbox, SnoozeEntry, SnoozeScheduler};
use taskbox::persist::{MemoryStore, PersistenceAdapter};
use taskbox::registry::StoreRegistry;
use tokio::sync::oneshot;

#[tokio::test]
async fn schedule_survives_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        data_dir: tmp.path().to_path_buf(),
        fallback_dir: None,
    };
    let mailbox = Arc::new(MemoryMailbox::new());
    mailbox.deliver("m1");
    let until = Utc::now() + TimeDelta::hours(1);

    let registry = StoreRegistry::open(&config).await;
    let scheduler = SnoozeScheduler::load(Arc::clone(&mailbox), registry.storage()).await;
    scheduler.snooze("m1", until).await.unwrap();
    scheduler.flush().await;
    drop(scheduler);
    drop(registry);

    let registry = StoreRegistry::open(&config).await;
    let restored = SnoozeScheduler::load(Arc::clone(&mailbox), registry.storage()).await;
    assert_eq!(
        restored.pending(),
        [SnoozeEntry {
            message_id: "m1".to_string(),
            until,
        }]
    );

    assert_eq!(restored.poll_once(until).await, 1);
    assert!(mailbox.labels("m1").unwrap().contains(INBOX_LABEL));
}

#[tokio::test]
async fn persisted_schedule_uses_camel_case_keys() {
    let adapter = Arc::new(PersistenceAdapter::new(MemoryStore::new()));
    let mailbox = Arc::new(MemoryMailbox::new());
    mailbox.deliver("m1");
    let scheduler = SnoozeScheduler::load(Arc::clone(&mailbox), Arc::clone(&adapter)).await;

    scheduler
        .snooze("m1", Utc::now() + TimeDelta::minutes(5))
        .await
        .unwrap();
    scheduler.flush().await;

    let raw: serde_json::Value = adapter.get(SNOOZE_STORAGE_KEY).await.unwrap();
    assert_eq!(raw[0]["messageId"], "m1");
    assert!(raw[0]["until"].is_string());
}

#[tokio::test]
async fn background_poller_wakes_due_messages() {
    let adapter = Arc::new(PersistenceAdapter::new(MemoryStore::new()));
    let mailbox = Arc::new(MemoryMailbox::new());
    mailbox.deliver("due");
    mailbox.deliver("later");
    let scheduler = Arc::new(SnoozeScheduler::load(Arc::clone(&mailbox), adapter).await);
    scheduler
        .snooze("due", Utc::now() - TimeDelta::seconds(1))
        .await
        .unwrap();
    scheduler
        .snooze("later", Utc::now() + TimeDelta::hours(1))
        .await
        .unwrap();

    let handle = scheduler.spawn(Duration::from_millis(10));
    let woke = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if mailbox.labels("due").unwrap().contains(INBOX_LABEL) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    handle.abort();

    assert!(woke.is_ok(), "poller never woke the due message");
    assert!(mailbox.labels("later").unwrap().contains(SNOOZED_LABEL));
    assert_eq!(scheduler.pending().len(), 1);
}

#[tokio::test]
async fn outage_defers_wake_to_next_poll() {
    let adapter = Arc::new(PersistenceAdapter::new(MemoryStore::new()));
    let mailbox = Arc::new(MemoryMailbox::new());
    mailbox.deliver("m1");
    let scheduler = SnoozeScheduler::load(Arc::clone(&mailbox), adapter).await;
    let until = Utc::now();
    scheduler.snooze("m1", until).await.unwrap();

    mailbox.set_unavailable(true);
    assert_eq!(scheduler.poll_once(until).await, 0);
    assert!(mailbox.labels("m1").unwrap().contains(SNOOZED_LABEL));

    mailbox.set_unavailable(false);
    assert_eq!(scheduler.poll_once(until).await, 1);
    assert!(scheduler.pending().is_empty());
}

#[tokio::test]
async fn snooze_during_outage_is_reported() {
    let adapter = Arc::new(PersistenceAdapter::new(MemoryStore::new()));
    let mailbox = Arc::new(MemoryMailbox::new());
    mailbox.deliver("m1");
    mailbox.set_unavailable(true);
    let scheduler = SnoozeScheduler::load(Arc::clone(&mailbox), adapter).await;

    assert!(scheduler.snooze("m1", Utc::now()).await.is_err());
    assert!(scheduler.pending().is_empty());
}

// ---------------------------------------------------------------------------
// Snoozes racing a poll
// ---------------------------------------------------------------------------

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, minute, 0).unwrap()
}

/// Where a [`GatedMailbox`] holds the poll.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Gate {
    /// After `list_labeled` has taken its listing.
    AfterListing,
    /// Before the wake-up relabel reaches the mailbox.
    BeforeWake,
}

/// Mailbox that pauses the poll once at `gate` until released.
struct GatedMailbox {
    inner: MemoryMailbox,
    gate: Gate,
    reached: Mutex<Option<oneshot::Sender<()>>>,
    release: Mutex<Option<oneshot::Receiver<()>>>,
}

impl GatedMailbox {
    fn new(gate: Gate) -> (Arc<Self>, oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (reached_tx, reached_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        let mailbox = Arc::new(Self {
            inner: MemoryMailbox::new(),
            gate,
            reached: Mutex::new(Some(reached_tx)),
            release: Mutex::new(Some(release_rx)),
        });
        (mailbox, reached_rx, release_tx)
    }

    async fn pause(&self) {
        let reached = self.reached.lock().take();
        if let Some(reached) = reached {
            let _ = reached.send(());
        }
        let release = self.release.lock().take();
        if let Some(release) = release {
            let _ = release.await;
        }
    }
}

impl Mailbox for GatedMailbox {
    async fn list_labeled(&self, label: &str) -> Result<Vec<String>, MailError> {
        let ids = self.inner.list_labeled(label).await?;
        if self.gate == Gate::AfterListing {
            self.pause().await;
        }
        Ok(ids)
    }

    async fn modify_labels(
        &self,
        message_id: &str,
        add: &[&str],
        remove: &[&str],
    ) -> Result<(), MailError> {
        if self.gate == Gate::BeforeWake && add == [INBOX_LABEL] {
            self.pause().await;
        }
        self.inner.modify_labels(message_id, add, remove).await
    }
}

async fn gated_scheduler(
    gate: Gate,
) -> (
    Arc<GatedMailbox>,
    Arc<SnoozeScheduler<GatedMailbox>>,
    oneshot::Receiver<()>,
    oneshot::Sender<()>,
) {
    let (mailbox, reached, release) = GatedMailbox::new(gate);
    mailbox.inner.deliver("m1");
    let adapter = Arc::new(PersistenceAdapter::new(MemoryStore::new()));
    let scheduler = Arc::new(SnoozeScheduler::load(Arc::clone(&mailbox), adapter).await);
    (mailbox, scheduler, reached, release)
}

#[tokio::test]
async fn snooze_landing_mid_poll_is_not_pruned() {
    let (mailbox, scheduler, reached, release) = gated_scheduler(Gate::AfterListing).await;

    let poll = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        async move { scheduler.poll_once(at(20)).await }
    });
    reached.await.unwrap();
    scheduler.snooze("m1", at(10)).await.unwrap();
    release.send(()).unwrap();

    assert_eq!(poll.await.unwrap(), 1);
    assert!(mailbox.inner.labels("m1").unwrap().contains(INBOX_LABEL));
    assert!(scheduler.pending().is_empty());
}

#[tokio::test]
async fn future_snooze_landing_mid_poll_stays_scheduled() {
    let (mailbox, scheduler, reached, release) = gated_scheduler(Gate::AfterListing).await;

    let poll = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        async move { scheduler.poll_once(at(20)).await }
    });
    reached.await.unwrap();
    scheduler.snooze("m1", at(40)).await.unwrap();
    release.send(()).unwrap();

    assert_eq!(poll.await.unwrap(), 0);
    assert!(mailbox.inner.labels("m1").unwrap().contains(SNOOZED_LABEL));
    assert_eq!(scheduler.pending().len(), 1);
    assert_eq!(scheduler.poll_once(at(40)).await, 1);
}

#[tokio::test]
async fn resnooze_during_wake_keeps_new_wake_time() {
    let (mailbox, scheduler, reached, release) = gated_scheduler(Gate::BeforeWake).await;
    scheduler.snooze("m1", at(10)).await.unwrap();

    let poll = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        async move { scheduler.poll_once(at(20)).await }
    });
    reached.await.unwrap();
    scheduler.snooze("m1", at(50)).await.unwrap();
    release.send(()).unwrap();

    assert_eq!(poll.await.unwrap(), 1);
    assert_eq!(
        scheduler.pending(),
        [SnoozeEntry {
            message_id: "m1".to_string(),
            until: at(50),
        }]
    );
    let labels = mailbox.inner.labels("m1").unwrap();
    assert!(labels.contains(SNOOZED_LABEL));
    assert!(!labels.contains(INBOX_LABEL));

    assert_eq!(scheduler.poll_once(at(30)).await, 0);
    assert_eq!(scheduler.poll_once(at(50)).await, 1);
    assert!(mailbox.inner.labels("m1").unwrap().contains(INBOX_LABEL));
}
