//! Bulk export and import of the record set as JSON.
//!
//! Export writes the current set as a pretty-printed JSON array of
//! records. Import reads the same shape back and appends it to the store
//! without conflict resolution or de-duplication; the next sync pass sorts
//! out any ids that now clash with remote records.
//!
//! Imports are all-or-nothing: one malformed element rejects the whole
//! file and leaves the store untouched.

use std::path::Path;

use anyhow::{bail, Context, Result};
use quote_sync_core::models::Record;
use serde::Deserialize;
use tracing::warn;

use crate::notify::{Notice, Notifier};
use crate::store::RecordStore;

/// Import file element. `id` may be omitted; it is then derived from the
/// content like a locally authored record.
#[derive(Deserialize)]
struct ImportedRecord {
    #[serde(default)]
    id: Option<String>,
    text: String,
    category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported(usize),
    Rejected,
}

/// Export the current set.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes to
/// stdout for piping. Returns the number of records written.
pub async fn run_export(store: &RecordStore, output: Option<&Path>) -> Result<usize> {
    let set = store.current().await;
    let json = serde_json::to_string_pretty(&set)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Exported {} quotes to {}", set.len(), path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(set.len())
}

/// Parse an import payload into records, rejecting it wholesale on any
/// malformed element.
pub fn parse_import(payload: &str) -> Result<Vec<Record>> {
    let items: Vec<ImportedRecord> =
        serde_json::from_str(payload).context("expected a JSON array of quotes")?;

    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        if item.text.trim().is_empty() {
            bail!("quote #{} has empty text", i + 1);
        }
        if item.category.trim().is_empty() {
            bail!("quote #{} has empty category", i + 1);
        }
        let record = match item.id {
            Some(id) if id.trim().is_empty() => bail!("quote #{} has an empty id", i + 1),
            Some(id) => Record::new(id, item.text, item.category),
            // Same trimming and id as a quote authored with `add`.
            None => Record::authored(&item.text, &item.category)?,
        };
        records.push(record);
    }
    Ok(records)
}

/// Import a JSON file into the store.
///
/// Unreadable or malformed files are reported to `notifier` and leave the
/// store unchanged. Errors are only returned when persisting fails.
pub async fn import_file(
    store: &RecordStore,
    path: &Path,
    notifier: &dyn Notifier,
) -> Result<ImportOutcome> {
    let parsed = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))
        .and_then(|payload| parse_import(&payload));

    let records = match parsed {
        Ok(records) => records,
        Err(e) => {
            warn!(path = %path.display(), error = %format!("{:#}", e), "import rejected");
            notifier.notify(Notice::import_rejected(&e));
            return Ok(ImportOutcome::Rejected);
        }
    };

    let count = store.append(records).await?;
    notifier.notify(Notice::imported(count));
    Ok(ImportOutcome::Imported(count))
}
