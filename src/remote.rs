//! Remote adapter.
//!
//! Translates between the remote collection's wire shape and [`Record`]s.
//!
//! # Wire shape
//!
//! - `GET <url>` returns a JSON array of items `{"id": 1, "title": "...",
//!   "category": "..."}`. Only `id` is required; it may be an integer or a
//!   non-empty string.
//! - `POST <url>` with one record as the JSON body.
//!
//! # Normalization
//!
//! Only the first `batch_size` items are considered (this is not a
//! pagination client). Each item becomes a record with a namespaced id
//! (`srv` + remote id by default), its title as text (or the placeholder
//! text when absent or blank), and its category (or the default category).
//! Items without a usable id are skipped with a warning.
//!
//! # Failure boundary
//!
//! The [`Remote`] trait reports failures as `Err`. [`fetch_remote`] and
//! [`push_record`] are the boundary: they turn failures into notices and
//! never propagate them, so a broken network degrades to local-only
//! operation.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use quote_sync_core::identity::remote_id;
use quote_sync_core::models::{Record, RecordSet};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::notify::{Notice, Notifier};

/// A remote source of records.
#[async_trait]
pub trait Remote: Send + Sync {
    /// Fetch one bounded batch of normalized records.
    async fn fetch(&self) -> Result<RecordSet>;

    /// Send one locally authored record.
    async fn push(&self, record: &Record) -> Result<()>;
}

/// HTTP implementation of [`Remote`].
pub struct HttpRemote {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl HttpRemote {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Remote for HttpRemote {
    async fn fetch(&self) -> Result<RecordSet> {
        let resp = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.config.url))?
            .error_for_status()?;

        let body: Value = resp
            .json()
            .await
            .context("Server response is not valid JSON")?;

        normalize_batch(&body, &self.config)
    }

    async fn push(&self, record: &Record) -> Result<()> {
        let body = serde_json::to_string(record)?;
        self.client
            .post(&self.config.url)
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .body(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.config.url))?
            .error_for_status()?;
        Ok(())
    }
}

/// Normalize a fetched JSON payload into a bounded record set.
pub fn normalize_batch(body: &Value, config: &RemoteConfig) -> Result<RecordSet> {
    let Some(items) = body.as_array() else {
        bail!("Server response is not a JSON array");
    };

    let mut set = RecordSet::new();
    for item in items.iter().take(config.batch_size) {
        match normalize_item(item, config) {
            Ok(record) => set.push(record),
            Err(e) => warn!(error = %e, "skipping malformed remote item"),
        }
    }
    debug!(
        received = items.len(),
        kept = set.len(),
        "normalized remote batch"
    );
    Ok(set)
}

/// Normalize one remote item.
pub fn normalize_item(item: &Value, config: &RemoteConfig) -> Result<Record> {
    let Some(obj) = item.as_object() else {
        bail!("remote item is not an object");
    };

    let source_id = match obj.get("id") {
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(other) => bail!("remote item has unusable id: {}", other),
        None => bail!("remote item has no id"),
    };

    let text = non_blank(obj.get("title")).unwrap_or(config.placeholder_text.as_str());
    let category = non_blank(obj.get("category")).unwrap_or(config.default_category.as_str());

    Ok(Record::new(
        remote_id(&config.id_prefix, &source_id),
        text,
        category,
    ))
}

fn non_blank(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Fetch from `remote`, degrading to an empty set on failure.
///
/// A failure is logged and reported to `notifier` once.
pub async fn fetch_remote(remote: &dyn Remote, notifier: &dyn Notifier) -> RecordSet {
    match remote.fetch().await {
        Ok(set) => set,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "remote fetch failed");
            notifier.notify(Notice::fetch_failed(&e));
            RecordSet::new()
        }
    }
}

/// Push `record` to `remote` once, best-effort.
///
/// The outcome is reported to `notifier`; nothing is retried. Returns
/// whether the push succeeded.
pub async fn push_record(remote: &dyn Remote, record: &Record, notifier: &dyn Notifier) -> bool {
    match remote.push(record).await {
        Ok(()) => {
            debug!(id = %record.id, "pushed record");
            notifier.notify(Notice::pushed(record));
            true
        }
        Err(e) => {
            warn!(id = %record.id, error = %format!("{:#}", e), "remote push failed");
            notifier.notify(Notice::push_failed(record, &e));
            false
        }
    }
}
