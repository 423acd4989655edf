//! The remote-wins merge engine.
//!
//! [`merge`] reconciles the local record set with a freshly fetched remote
//! batch and classifies every remote record:
//!
//! | Local state for `r.id` | Classification | Result keeps |
//! |------------------------|----------------|--------------|
//! | absent | `added` | `r`, appended |
//! | present, same content | `unchanged` | local copy |
//! | present, different content | `conflicted` | `r`, in place of the local copy |
//!
//! Local records the remote batch never mentions are kept untouched: the
//! remote is a partial view, not authoritative over ids it has not seen.
//!
//! The function is pure. It reads no clock, holds no state between calls,
//! and never mutates its inputs, so the same pair of sets always produces
//! the same [`SyncOutcome`]. Re-merging an outcome against the same remote
//! batch is a no-op.
//!
//! # Ordering
//!
//! The merged set lists local records in their original order (conflicted
//! ones replaced in place), followed by added remote records in fetch order.
//!
//! # Duplicate ids
//!
//! The merged set never contains two records with the same id. A local set
//! can only carry duplicates after a bulk import; the first occurrence is
//! kept (or replaced, if the remote disagrees with any copy) and later
//! copies are reported in [`SyncOutcome::collapsed`]. A remote id repeated
//! within one batch is considered only at its first occurrence.
//!
//! # Example
//!
//! ```rust
//! use quote_sync_core::merge::merge;
//! use quote_sync_core::models::{Record, RecordSet};
//!
//! let local: RecordSet = vec![Record::new("x", "A", "C1")].into();
//! let remote: RecordSet = vec![Record::new("x", "B", "C1")].into();
//!
//! let outcome = merge(&local, &remote);
//! assert_eq!(outcome.result.get("x").unwrap().text, "B");
//! assert_eq!(outcome.conflicted.len(), 1);
//! ```

use std::collections::{HashMap, HashSet};

use crate::models::{Record, RecordSet, SyncOutcome};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Class {
    Added,
    Unchanged,
    Conflicted,
}

/// Merge `remote` into `local` under the remote-wins policy.
pub fn merge(local: &RecordSet, remote: &RecordSet) -> SyncOutcome {
    let mut local_copies: HashMap<&str, Vec<&Record>> = HashMap::new();
    for record in local {
        local_copies.entry(record.id.as_str()).or_default().push(record);
    }

    let mut outcome = SyncOutcome::default();
    let mut classified: HashMap<&str, (Class, &Record)> = HashMap::new();
    let mut added_order: Vec<&Record> = Vec::new();

    for r in remote {
        if classified.contains_key(r.id.as_str()) {
            continue;
        }
        let class = match local_copies.get(r.id.as_str()) {
            None => Class::Added,
            Some(copies) if copies.iter().all(|l| l.same_content(r)) => Class::Unchanged,
            Some(_) => Class::Conflicted,
        };
        match class {
            Class::Added => {
                outcome.added.push(r.clone());
                added_order.push(r);
            }
            Class::Unchanged => outcome.unchanged.push(r.clone()),
            Class::Conflicted => outcome.conflicted.push(r.clone()),
        }
        classified.insert(r.id.as_str(), (class, r));
    }

    let mut emitted: HashSet<&str> = HashSet::with_capacity(local.len());
    let mut result = Vec::with_capacity(local.len() + added_order.len());

    for l in local {
        if !emitted.insert(l.id.as_str()) {
            outcome.collapsed.push(l.clone());
            continue;
        }
        match classified.get(l.id.as_str()) {
            Some((Class::Conflicted, r)) => result.push((*r).clone()),
            _ => result.push(l.clone()),
        }
    }

    result.extend(added_order.into_iter().cloned());

    outcome.result = RecordSet::from(result);
    debug_assert!(outcome.result.has_unique_ids());
    outcome
}
