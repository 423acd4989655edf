//! Sync pass orchestration and local authoring.
//!
//! Coordinates one full cycle: remote fetch → merge against the store's
//! current set → persist → notify. Fetching happens before the store's
//! write lock is taken; merging and saving happen inside it, so a record
//! authored while a fetch is in flight is merged rather than overwritten.
//!
//! Local additions take the other path: persist first, then push to the
//! remote in a background task that never rolls the addition back.

use std::sync::Arc;

use anyhow::Result;
use quote_sync_core::merge::merge;
use quote_sync_core::models::{Record, SyncOutcome};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::notify::{Notice, Notifier};
use crate::remote::{fetch_remote, push_record, Remote};
use crate::store::RecordStore;

/// Everything a sync pass or a local addition needs, shared by `Arc`.
#[derive(Clone)]
pub struct SyncService {
    store: Arc<RecordStore>,
    remote: Arc<dyn Remote>,
    notifier: Arc<dyn Notifier>,
}

/// Result of authoring a record locally.
pub struct AddOutcome {
    pub record: Record,
    /// `false` when an identical record was already stored.
    pub inserted: bool,
    /// Background push, present only when the record was inserted.
    /// Resolves to whether the remote accepted it.
    pub push: Option<JoinHandle<bool>>,
}

impl SyncService {
    pub fn new(
        store: Arc<RecordStore>,
        remote: Arc<dyn Remote>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            remote,
            notifier,
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Run one fetch-and-merge pass.
    ///
    /// Remote failures degrade to an empty remote set (the local set is
    /// kept as-is). Errors are only returned when persisting fails.
    pub async fn run_pass(&self) -> Result<SyncOutcome> {
        debug!("sync pass started");
        let remote = fetch_remote(self.remote.as_ref(), self.notifier.as_ref()).await;

        let outcome = self
            .store
            .update(|local| {
                let outcome = merge(local, &remote);
                (outcome.result.clone(), outcome)
            })
            .await?;

        for record in &outcome.added {
            self.notifier.notify(Notice::added(record));
        }
        for record in &outcome.conflicted {
            self.notifier.notify(Notice::conflict(record));
        }

        info!(
            fetched = remote.len(),
            added = outcome.added.len(),
            conflicted = outcome.conflicted.len(),
            unchanged = outcome.unchanged.len(),
            collapsed = outcome.collapsed.len(),
            total = outcome.result.len(),
            "sync pass finished"
        );
        Ok(outcome)
    }

    /// Author a record, persist it, and push it in the background.
    pub async fn add_record(&self, text: &str, category: &str) -> Result<AddOutcome> {
        let record = Record::authored(text, category)?;
        let inserted = self.store.add(record.clone()).await?;
        if !inserted {
            debug!(id = %record.id, "identical quote already stored");
            return Ok(AddOutcome {
                record,
                inserted,
                push: None,
            });
        }

        self.notifier.notify(Notice::local_added(&record));

        let remote = self.remote.clone();
        let notifier = self.notifier.clone();
        let to_push = record.clone();
        let push = tokio::spawn(async move {
            push_record(remote.as_ref(), &to_push, notifier.as_ref()).await
        });

        Ok(AddOutcome {
            record,
            inserted,
            push: Some(push),
        })
    }
}

/// Print a pass summary to stdout.
pub fn print_summary(outcome: &SyncOutcome) {
    let fetched = outcome.added.len() + outcome.conflicted.len() + outcome.unchanged.len();
    println!("sync");
    println!("  fetched: {} records", fetched);
    println!("  added: {}", outcome.added.len());
    println!("  conflicts resolved: {}", outcome.conflicted.len());
    println!("  unchanged: {}", outcome.unchanged.len());
    if !outcome.collapsed.is_empty() {
        println!("  duplicates collapsed: {}", outcome.collapsed.len());
    }
    println!("  total quotes: {}", outcome.result.len());
    println!("ok");
}
