//! Local record store.
//!
//! [`RecordStore`] owns the one current [`RecordSet`] and mirrors it to the
//! durable key-value surface under the `quotes` key. It is constructed once
//! per process and shared by reference (`Arc`) with the sync pass, the
//! scheduler, and the CLI commands.
//!
//! # Persistence model
//!
//! The set is only ever replaced wholesale. Every replacement runs under
//! the store's write lock and persists before the in-memory copy is swapped,
//! so concurrent writers are serialized and the last one wins without torn
//! writes. Each successful replacement bumps a revision counter that
//! presentation code can observe through [`RecordStore::subscribe`].
//!
//! # Fail-soft loading
//!
//! A missing, unreadable, or unparsable payload is never fatal: it is
//! logged and the store starts from the configured seed set (empty by
//! default).
//!
//! # Pass-through state
//!
//! The last selected category and the last viewed quote are kept under
//! their own keys for the browse commands. Syncing never touches them.

use std::sync::Arc;

use anyhow::{Context, Result};
use quote_sync_core::models::{Record, RecordSet};
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::kv::KvStore;

pub const QUOTES_KEY: &str = "quotes";
pub const LAST_CATEGORY_KEY: &str = "lastCategory";
pub const LAST_VIEWED_KEY: &str = "lastViewedQuote";

pub struct RecordStore {
    kv: Arc<dyn KvStore>,
    seed: RecordSet,
    current: RwLock<RecordSet>,
    revision: watch::Sender<u64>,
}

impl RecordStore {
    /// Open the store and load the current set from durable storage.
    pub async fn open(kv: Arc<dyn KvStore>, config: &StoreConfig) -> Self {
        let (revision, _) = watch::channel(0);
        let store = Self {
            kv,
            seed: seed_set(config),
            current: RwLock::new(RecordSet::new()),
            revision,
        };
        let loaded = store.load().await;
        debug!(records = loaded.len(), "record store opened");
        *store.current.write().await = loaded;
        store
    }

    /// Read the set from durable storage, falling back to the seed set.
    ///
    /// Does not change the in-memory set.
    pub async fn load(&self) -> RecordSet {
        match self.kv.get(QUOTES_KEY).await {
            Ok(Some(payload)) => match serde_json::from_str::<RecordSet>(&payload) {
                Ok(set) => set,
                Err(e) => {
                    warn!(error = %e, "stored quotes are unreadable, starting from seed set");
                    self.seed.clone()
                }
            },
            Ok(None) => self.seed.clone(),
            Err(e) => {
                warn!(error = %format!("{:#}", e), "failed to read stored quotes, starting from seed set");
                self.seed.clone()
            }
        }
    }

    /// Snapshot of the current set.
    pub async fn current(&self) -> RecordSet {
        self.current.read().await.clone()
    }

    /// Replace the current set and persist it.
    pub async fn save(&self, set: RecordSet) -> Result<()> {
        let mut current = self.current.write().await;
        self.persist(&set).await?;
        *current = set;
        self.revision.send_modify(|r| *r += 1);
        Ok(())
    }

    /// Derive a new set from the current one and persist it if it changed.
    ///
    /// `f` runs under the write lock, so no other write can land between
    /// reading the current set and saving its replacement.
    pub async fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&RecordSet) -> (RecordSet, T),
    {
        let mut current = self.current.write().await;
        let (next, value) = f(&current);
        if next != *current {
            self.persist(&next).await?;
            *current = next;
            self.revision.send_modify(|r| *r += 1);
        }
        Ok(value)
    }

    /// Append a locally authored record.
    ///
    /// Returns `false` without writing if a record with the same id and
    /// content is already present.
    pub async fn add(&self, record: Record) -> Result<bool> {
        self.update(|current| {
            if current.iter().any(|r| r.id == record.id && r.same_content(&record)) {
                return (current.clone(), false);
            }
            let mut next = current.clone();
            next.push(record);
            (next, true)
        })
        .await
    }

    /// Append records as-is, without de-duplication.
    pub async fn append(&self, records: Vec<Record>) -> Result<usize> {
        let count = records.len();
        self.update(|current| {
            let mut next = current.clone();
            next.extend(records);
            (next, count)
        })
        .await
    }

    /// Watch the revision counter; it changes after every persisted write.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub async fn last_category(&self) -> Result<Option<String>> {
        self.kv.get(LAST_CATEGORY_KEY).await
    }

    pub async fn set_last_category(&self, category: &str) -> Result<()> {
        self.kv.set(LAST_CATEGORY_KEY, category).await
    }

    /// The last quote shown by `random`, if one was recorded and is readable.
    pub async fn last_viewed(&self) -> Result<Option<Record>> {
        let Some(payload) = self.kv.get(LAST_VIEWED_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&payload) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(error = %e, "last viewed quote is unreadable, ignoring");
                Ok(None)
            }
        }
    }

    pub async fn set_last_viewed(&self, record: &Record) -> Result<()> {
        let payload = serde_json::to_string(record)?;
        self.kv.set(LAST_VIEWED_KEY, &payload).await
    }

    async fn persist(&self, set: &RecordSet) -> Result<()> {
        let payload = serde_json::to_string(set)?;
        self.kv
            .set(QUOTES_KEY, &payload)
            .await
            .with_context(|| "Failed to persist quotes")
    }
}

/// Build the seed set from configuration, skipping repeated quotes.
pub fn seed_set(config: &StoreConfig) -> RecordSet {
    let mut set = RecordSet::new();
    for seed in &config.seed {
        match Record::authored(&seed.text, &seed.category) {
            Ok(record) if !set.contains_id(&record.id) => set.push(record),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "skipping invalid seed quote"),
        }
    }
    set
}
