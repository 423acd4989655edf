//! Browsing the local collection: categories, filtering, and random picks.
//!
//! The category list is derived from whatever records exist; there is no
//! fixed vocabulary. The selection `"all"` matches every record.

use anyhow::Result;
use quote_sync_core::models::{Record, RecordSet};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::store::RecordStore;

/// Selection that matches every category.
pub const ALL: &str = "all";

/// Distinct categories in first-seen order.
pub fn categories(set: &RecordSet) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for record in set {
        if !seen.contains(&record.category.as_str()) {
            seen.push(record.category.as_str());
        }
    }
    seen
}

/// Records matching `selection` (`"all"` or an exact category).
pub fn filter<'a>(set: &'a RecordSet, selection: &str) -> Vec<&'a Record> {
    set.iter()
        .filter(|r| selection == ALL || r.category == selection)
        .collect()
}

/// Uniformly random record among those matching `selection`.
pub fn pick_random<'a, R: Rng + ?Sized>(
    set: &'a RecordSet,
    selection: &str,
    rng: &mut R,
) -> Option<&'a Record> {
    filter(set, selection).choose(rng).copied()
}

/// Display line for a record: `"text" (category)`.
pub fn render(record: &Record) -> String {
    format!("\"{}\" ({})", record.text, record.category)
}

pub async fn run_list(store: &RecordStore, category: Option<&str>) -> Result<()> {
    let set = store.current().await;
    let selection = category.unwrap_or(ALL);
    let matches = filter(&set, selection);
    if matches.is_empty() {
        println!("No quotes available.");
        return Ok(());
    }
    for record in matches {
        println!("{:<18} {}", record.id, render(record));
    }
    Ok(())
}

pub async fn run_categories(store: &RecordStore) -> Result<()> {
    let set = store.current().await;
    let last = store.last_category().await?;
    let marker = |name: &str| {
        if last.as_deref() == Some(name) {
            "*"
        } else {
            " "
        }
    };
    println!("{} {}", marker(ALL), ALL);
    for category in categories(&set) {
        println!("{} {}", marker(category), category);
    }
    Ok(())
}

/// Show a random quote, remembering the selection and the quote shown.
///
/// Without an explicit category the last selected one is reused.
pub async fn run_random(store: &RecordStore, category: Option<&str>) -> Result<()> {
    let selection = match category {
        Some(c) => {
            store.set_last_category(c).await?;
            c.to_string()
        }
        None => store
            .last_category()
            .await?
            .unwrap_or_else(|| ALL.to_string()),
    };

    let set = store.current().await;
    let picked = pick_random(&set, &selection, &mut rand::thread_rng()).cloned();
    match picked {
        Some(record) => {
            println!("{}", render(&record));
            store.set_last_viewed(&record).await?;
        }
        None => println!("No quotes available."),
    }
    Ok(())
}

pub async fn run_last(store: &RecordStore) -> Result<()> {
    match store.last_viewed().await? {
        Some(record) => println!("{}", render(&record)),
        None => println!("No quote viewed yet."),
    }
    Ok(())
}
