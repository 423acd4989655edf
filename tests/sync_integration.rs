//! Integration tests for the sync pipeline.
//!
//! These drive `SyncService` and `Scheduler` against an in-memory remote
//! and a real SQLite-backed store, so merging, persistence, notification,
//! and scheduling are exercised together.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use quote_sync::config::{Config, StoreConfig};
use quote_sync::kv::{KvStore, MemoryKv, SqliteKv};
use quote_sync::models::{Record, RecordSet};
use quote_sync::notify::{NoticeKind, NotificationLog};
use quote_sync::remote::Remote;
use quote_sync::scheduler::Scheduler;
use quote_sync::store::{RecordStore, LAST_CATEGORY_KEY, LAST_VIEWED_KEY, QUOTES_KEY};
use quote_sync::sync::SyncService;
use quote_sync::transfer::{import_file, ImportOutcome};
use tempfile::TempDir;

// ─── Test Remote ────────────────────────────────────────────────────

/// A remote that serves a fixed batch and records pushes.
struct InMemoryRemote {
    batch: Mutex<Option<Vec<Record>>>,
    pushed: Mutex<Vec<Record>>,
    fetches: Mutex<usize>,
    reject_pushes: bool,
}

impl InMemoryRemote {
    fn serving(records: Vec<Record>) -> Self {
        Self {
            batch: Mutex::new(Some(records)),
            pushed: Mutex::new(Vec::new()),
            fetches: Mutex::new(0),
            reject_pushes: false,
        }
    }

    /// Every fetch fails, every push fails.
    fn offline() -> Self {
        Self {
            batch: Mutex::new(None),
            pushed: Mutex::new(Vec::new()),
            fetches: Mutex::new(0),
            reject_pushes: true,
        }
    }

    fn set_batch(&self, records: Vec<Record>) {
        *self.batch.lock().unwrap() = Some(records);
    }

    fn fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }

    fn pushed(&self) -> Vec<Record> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Remote for InMemoryRemote {
    async fn fetch(&self) -> Result<RecordSet> {
        *self.fetches.lock().unwrap() += 1;
        let batch = self.batch.lock().unwrap().clone();
        match batch {
            Some(records) => Ok(records.into()),
            None => Err(anyhow!("connection refused")),
        }
    }

    async fn push(&self, record: &Record) -> Result<()> {
        if self.reject_pushes {
            return Err(anyhow!("connection refused"));
        }
        self.pushed.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// A remote whose fetch never completes.
struct StalledRemote;

#[async_trait]
impl Remote for StalledRemote {
    async fn fetch(&self) -> Result<RecordSet> {
        std::future::pending().await
    }

    async fn push(&self, _record: &Record) -> Result<()> {
        std::future::pending().await
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

struct Harness {
    kv: Arc<MemoryKv>,
    store: Arc<RecordStore>,
    remote: Arc<InMemoryRemote>,
    log: Arc<NotificationLog>,
    service: SyncService,
}

async fn harness(local: Vec<Record>, remote: InMemoryRemote) -> Harness {
    let kv = Arc::new(MemoryKv::new());
    if !local.is_empty() {
        let payload = serde_json::to_string(&RecordSet::from(local)).unwrap();
        kv.set(QUOTES_KEY, &payload).await.unwrap();
    }
    let store = Arc::new(RecordStore::open(kv.clone(), &StoreConfig::default()).await);
    let remote = Arc::new(remote);
    let log = Arc::new(NotificationLog::new(Duration::from_secs(5)));
    let service = SyncService::new(store.clone(), remote.clone(), log.clone());
    Harness {
        kv,
        store,
        remote,
        log,
        service,
    }
}

fn ids(set: &RecordSet) -> Vec<&str> {
    set.iter().map(|r| r.id.as_str()).collect()
}

// ─── Sync pass ──────────────────────────────────────────────────────

#[tokio::test]
async fn pass_adds_and_resolves_conflicts_remote_wins() {
    let h = harness(
        vec![
            Record::new("l1", "Mine", "Wisdom"),
            Record::new("srv2", "Old text", "Server"),
        ],
        InMemoryRemote::serving(vec![
            Record::new("srv1", "First", "Server"),
            Record::new("srv2", "New text", "Server"),
        ]),
    )
    .await;

    let outcome = h.service.run_pass().await.unwrap();

    assert_eq!(outcome.added.len(), 1);
    assert_eq!(outcome.conflicted.len(), 1);
    assert_eq!(ids(&outcome.result), vec!["l1", "srv2", "srv1"]);
    assert_eq!(outcome.result.get("srv2").unwrap().text, "New text");

    let current = h.store.current().await;
    assert_eq!(current, outcome.result);

    let persisted = h.kv.get(QUOTES_KEY).await.unwrap().unwrap();
    let persisted: RecordSet = serde_json::from_str(&persisted).unwrap();
    assert_eq!(persisted, outcome.result);

    assert_eq!(h.log.of_kind(NoticeKind::Added).len(), 1);
    let conflicts = h.log.of_kind(NoticeKind::Conflict);
    assert_eq!(conflicts.len(), 1);
    assert!(conflicts[0].message.contains("srv2"));
}

#[tokio::test]
async fn second_pass_is_a_no_op() {
    let h = harness(
        vec![Record::new("l1", "Mine", "Wisdom")],
        InMemoryRemote::serving(vec![Record::new("srv1", "First", "Server")]),
    )
    .await;

    h.service.run_pass().await.unwrap();
    let revisions = h.store.subscribe();
    h.log.clear();

    let again = h.service.run_pass().await.unwrap();
    assert!(!again.has_changes());
    assert_eq!(again.unchanged.len(), 1);
    assert!(h.log.history().is_empty());
    assert!(!revisions.has_changed().unwrap());
}

#[tokio::test]
async fn fetch_failure_keeps_local_set_and_notifies_once() {
    let local = vec![
        Record::new("l1", "Mine", "Wisdom"),
        Record::new("srv1", "Synced earlier", "Server"),
    ];
    let h = harness(local.clone(), InMemoryRemote::offline()).await;

    let outcome = h.service.run_pass().await.unwrap();

    assert!(!outcome.has_changes());
    assert_eq!(h.store.current().await, RecordSet::from(local));
    assert_eq!(h.log.of_kind(NoticeKind::FetchFailed).len(), 1);
    assert_eq!(h.log.history().len(), 1);
}

#[tokio::test]
async fn pass_leaves_browse_state_alone() {
    let h = harness(
        vec![Record::new("l1", "Mine", "Wisdom")],
        InMemoryRemote::serving(vec![Record::new("srv1", "First", "Server")]),
    )
    .await;
    h.store.set_last_category("Wisdom").await.unwrap();
    let viewed = Record::new("l1", "Mine", "Wisdom");
    h.store.set_last_viewed(&viewed).await.unwrap();
    let category_before = h.kv.get(LAST_CATEGORY_KEY).await.unwrap();
    let viewed_before = h.kv.get(LAST_VIEWED_KEY).await.unwrap();

    h.service.run_pass().await.unwrap();

    assert_eq!(h.kv.get(LAST_CATEGORY_KEY).await.unwrap(), category_before);
    assert_eq!(h.kv.get(LAST_VIEWED_KEY).await.unwrap(), viewed_before);
}

// ─── Local authoring ────────────────────────────────────────────────

#[tokio::test]
async fn add_persists_then_pushes() {
    let h = harness(vec![], InMemoryRemote::serving(vec![])).await;

    let added = h.service.add_record("Be kind.", "Wisdom").await.unwrap();
    assert!(added.inserted);
    assert!(added.push.unwrap().await.unwrap());

    assert_eq!(h.store.current().await.len(), 1);
    assert_eq!(h.remote.pushed(), vec![added.record.clone()]);
    assert_eq!(h.log.of_kind(NoticeKind::LocalAdded).len(), 1);
    assert_eq!(h.log.of_kind(NoticeKind::Pushed).len(), 1);
}

#[tokio::test]
async fn failed_push_keeps_local_record() {
    let h = harness(vec![], InMemoryRemote::offline()).await;

    let added = h.service.add_record("Be kind.", "Wisdom").await.unwrap();
    assert!(!added.push.unwrap().await.unwrap());

    let current = h.store.current().await;
    assert_eq!(current.as_slice(), &[added.record]);
    assert_eq!(h.log.of_kind(NoticeKind::PushFailed).len(), 1);
}

#[tokio::test]
async fn adding_identical_record_twice_is_skipped() {
    let h = harness(vec![], InMemoryRemote::serving(vec![])).await;

    let first = h.service.add_record("Be kind.", "Wisdom").await.unwrap();
    first.push.unwrap().await.unwrap();
    let second = h.service.add_record("Be kind.", "Wisdom").await.unwrap();

    assert!(!second.inserted);
    assert!(second.push.is_none());
    assert_eq!(h.store.current().await.len(), 1);
    assert_eq!(h.remote.pushed().len(), 1);
}

#[tokio::test]
async fn blank_text_is_rejected() {
    let h = harness(vec![], InMemoryRemote::serving(vec![])).await;
    assert!(h.service.add_record("   ", "Wisdom").await.is_err());
    assert!(h.store.current().await.is_empty());
}

#[tokio::test]
async fn local_add_during_pass_survives() {
    let h = harness(
        vec![],
        InMemoryRemote::serving(vec![Record::new("srv1", "First", "Server")]),
    )
    .await;

    let service = h.service.clone();
    let (pass, added) = tokio::join!(
        service.run_pass(),
        h.service.add_record("Mine", "Wisdom")
    );
    pass.unwrap();
    let added = added.unwrap();

    let current = h.store.current().await;
    assert!(current.contains_id(&added.record.id));
    assert!(current.contains_id("srv1"));
    assert!(current.has_unique_ids());
}

// ─── Import then merge ──────────────────────────────────────────────

#[tokio::test]
async fn imported_duplicates_are_collapsed_by_next_pass() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("quotes.json");
    std::fs::write(
        &path,
        r#"[
            {"id": "srv1", "text": "Edited offline", "category": "Mine"},
            {"id": "l1", "text": "Copy", "category": "Wisdom"}
        ]"#,
    )
    .unwrap();

    let h = harness(
        vec![Record::new("l1", "Original", "Wisdom")],
        InMemoryRemote::serving(vec![Record::new("srv1", "Server text", "Server")]),
    )
    .await;

    let outcome = import_file(&h.store, &path, h.log.as_ref()).await.unwrap();
    assert_eq!(outcome, ImportOutcome::Imported(2));
    assert!(!h.store.current().await.has_unique_ids());

    let merged = h.service.run_pass().await.unwrap();
    assert!(merged.result.has_unique_ids());
    assert_eq!(merged.collapsed.len(), 1);
    assert_eq!(merged.result.get("l1").unwrap().text, "Original");
    assert_eq!(merged.result.get("srv1").unwrap().text, "Server text");
    assert_eq!(merged.conflicted.len(), 1);
}

// ─── Scheduler ──────────────────────────────────────────────────────

#[tokio::test]
async fn scheduler_runs_limited_passes() {
    let h = harness(
        vec![],
        InMemoryRemote::serving(vec![Record::new("srv1", "First", "Server")]),
    )
    .await;

    let scheduler = Scheduler::new(h.service.clone(), Duration::from_millis(20));
    let report = scheduler.run(Some(3), std::future::pending()).await;

    assert_eq!(report.started, 3);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(h.remote.fetches(), 3);
    assert_eq!(ids(&h.store.current().await), vec!["srv1"]);
}

#[tokio::test]
async fn scheduler_first_pass_is_immediate() {
    let h = harness(
        vec![],
        InMemoryRemote::serving(vec![Record::new("srv1", "First", "Server")]),
    )
    .await;

    let scheduler = Scheduler::new(h.service.clone(), Duration::from_secs(3600));
    let report = tokio::time::timeout(
        Duration::from_secs(5),
        scheduler.run(Some(1), std::future::pending()),
    )
    .await
    .expect("first pass should not wait for the period");

    assert_eq!(report.started, 1);
    assert!(h.store.current().await.contains_id("srv1"));
}

#[tokio::test]
async fn scheduler_stops_on_shutdown() {
    let h = harness(vec![], InMemoryRemote::serving(vec![])).await;

    let scheduler = Scheduler::new(h.service.clone(), Duration::from_millis(10));
    let report = scheduler
        .run(None, tokio::time::sleep(Duration::from_millis(100)))
        .await;

    assert!(report.started >= 1);
    assert!(report.succeeded <= report.started);
}

#[tokio::test]
async fn shutdown_interrupts_draining_passes() {
    let kv = Arc::new(MemoryKv::new());
    let store = Arc::new(RecordStore::open(kv, &StoreConfig::default()).await);
    let log = Arc::new(NotificationLog::new(Duration::from_secs(5)));
    let service = SyncService::new(store, Arc::new(StalledRemote), log);

    let scheduler = Scheduler::new(service, Duration::from_millis(10));
    let report = tokio::time::timeout(
        Duration::from_secs(5),
        scheduler.run(Some(1), tokio::time::sleep(Duration::from_millis(50))),
    )
    .await
    .expect("shutdown should stop the scheduler while it waits for passes");

    assert_eq!(report.started, 1);
    assert_eq!(report.succeeded, 0);
}

#[tokio::test]
async fn scheduler_picks_up_remote_changes() {
    let h = harness(
        vec![],
        InMemoryRemote::serving(vec![Record::new("srv1", "First", "Server")]),
    )
    .await;
    let scheduler = Scheduler::new(h.service.clone(), Duration::from_millis(10));

    scheduler.run(Some(1), std::future::pending()).await;
    h.remote.set_batch(vec![
        Record::new("srv1", "First, edited", "Server"),
        Record::new("srv2", "Second", "Server"),
    ]);
    scheduler.run(Some(1), std::future::pending()).await;

    let current = h.store.current().await;
    assert_eq!(ids(&current), vec!["srv1", "srv2"]);
    assert_eq!(current.get("srv1").unwrap().text, "First, edited");
    assert_eq!(h.log.of_kind(NoticeKind::Conflict).len(), 1);
}

#[tokio::test]
async fn failing_remote_never_fails_a_pass() {
    let h = harness(vec![Record::new("l1", "Mine", "Wisdom")], InMemoryRemote::offline()).await;

    let scheduler = Scheduler::new(h.service.clone(), Duration::from_millis(10));
    let report = scheduler.run(Some(2), std::future::pending()).await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(h.log.of_kind(NoticeKind::FetchFailed).len(), 2);
    assert_eq!(ids(&h.store.current().await), vec!["l1"]);
}

// ─── SQLite persistence ─────────────────────────────────────────────

fn sqlite_config(tmp: &TempDir) -> Config {
    let config_content = format!(
        r#"[db]
path = "{}"
"#,
        tmp.path().join("data/qsync.sqlite").display()
    );
    toml::from_str(&config_content).unwrap()
}

#[tokio::test]
async fn synced_set_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let cfg = sqlite_config(&tmp);

    {
        let kv = Arc::new(SqliteKv::open(&cfg).await.unwrap());
        let store = Arc::new(RecordStore::open(kv.clone(), &cfg.store).await);
        let remote = Arc::new(InMemoryRemote::serving(vec![Record::new(
            "srv1", "First", "Server",
        )]));
        let log = Arc::new(NotificationLog::new(Duration::from_secs(5)));
        let service = SyncService::new(store, remote, log);
        service.run_pass().await.unwrap();
        service.add_record("Mine", "Wisdom").await.unwrap();
        kv.close().await;
    }

    let kv = Arc::new(SqliteKv::open(&cfg).await.unwrap());
    let store = RecordStore::open(kv.clone(), &cfg.store).await;
    let current = store.current().await;
    assert_eq!(current.len(), 2);
    assert_eq!(current.as_slice()[0].id, "srv1");
    assert_eq!(current.as_slice()[1].text, "Mine");
    kv.close().await;
}
