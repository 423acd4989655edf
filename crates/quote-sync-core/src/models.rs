//! Core data models for Quote Sync.
//!
//! A [`Record`] is one quote with its category and stable id. A
//! [`RecordSet`] is the ordered collection the local store owns and the
//! merge engine consumes. A [`SyncOutcome`] is what one merge pass produces.

use std::collections::HashSet;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::identity::content_id;

/// One quote/category pair with a stable identifier.
///
/// Records are immutable values: editing the text or category produces a
/// logically different record. Serialized as
/// `{"id": "...", "text": "...", "category": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub text: String,
    pub category: String,
}

impl Record {
    /// Build a record with an explicit id. No validation is applied.
    pub fn new(id: impl Into<String>, text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            category: category.into(),
        }
    }

    /// Author a record locally.
    ///
    /// Text and category are trimmed and must be non-empty. The id is
    /// derived from the trimmed content, so authoring the same quote twice
    /// yields the same id.
    pub fn authored(text: &str, category: &str) -> Result<Self> {
        let text = text.trim();
        let category = category.trim();
        if text.is_empty() {
            bail!("quote text must not be empty");
        }
        if category.is_empty() {
            bail!("quote category must not be empty");
        }
        Ok(Self::new(content_id(text, category), text, category))
    }

    /// Whether two records carry the same text and category.
    pub fn same_content(&self, other: &Record) -> bool {
        self.text == other.text && self.category == other.category
    }
}

/// An ordered sequence of [`Record`]s.
///
/// Insertion order is kept for display. Every set produced by the merge
/// engine has unique ids; [`RecordSet::push`] and [`RecordSet::extend`] do
/// not check, because bulk import is allowed to append duplicates that the
/// next merge pass collapses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[Record] {
        &self.records
    }

    /// Append a record without checking for an existing id.
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// First record with the given id, if any.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// True when no two records share an id.
    pub fn has_unique_ids(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.records.len());
        self.records.iter().all(|r| seen.insert(r.id.as_str()))
    }

    pub fn into_vec(self) -> Vec<Record> {
        self.records
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl Extend<Record> for RecordSet {
    fn extend<I: IntoIterator<Item = Record>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Result of one merge pass.
///
/// `added`, `conflicted`, and `unchanged` are disjoint and hold remote
/// versions. `collapsed` holds local records that were dropped because an
/// earlier local record already carried the same id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub result: RecordSet,
    pub added: Vec<Record>,
    pub conflicted: Vec<Record>,
    pub unchanged: Vec<Record>,
    pub collapsed: Vec<Record>,
}

impl SyncOutcome {
    /// Whether the merged set differs from the local input.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.conflicted.is_empty() || !self.collapsed.is_empty()
    }
}
