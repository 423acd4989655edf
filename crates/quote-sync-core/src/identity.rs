//! Record identity.
//!
//! Two id spaces exist:
//!
//! - **Content ids** for locally authored records: a SHA-256 digest over the
//!   record's text and category, hex-encoded and truncated to
//!   [`CONTENT_ID_LEN`] characters. Identical content always yields the same
//!   id. Different content yields different ids in practice, but truncation
//!   means this is not collision-proof; any deterministic hash could replace
//!   it without changing the contract.
//! - **Remote ids** for records normalized from the remote source: the
//!   source's own identifier with a namespace prefix (e.g. `srv42`).
//!
//! Content ids are lowercase hex only, so any prefix containing a non-hex
//! character keeps the two spaces disjoint. [`is_valid_prefix`] checks this.
//!
//! # Example
//!
//! ```rust
//! use quote_sync_core::identity::{content_id, remote_id};
//!
//! let a = content_id("Stay hungry.", "Motivation");
//! let b = content_id("Stay hungry.", "Motivation");
//! assert_eq!(a, b);
//! assert_eq!(a.len(), 16);
//! assert_eq!(remote_id("srv", "7"), "srv7");
//! ```

use sha2::{Digest, Sha256};

/// Length of a content-derived id, in hex characters.
pub const CONTENT_ID_LEN: usize = 16;

/// Separates text from category in the digest input so that
/// `("ab", "c")` and `("a", "bc")` hash differently.
const FIELD_SEPARATOR: u8 = 0x1f;

/// Derive the stable id of a locally authored record from its content.
pub fn content_id(text: &str, category: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update([FIELD_SEPARATOR]);
    hasher.update(category.as_bytes());
    let mut id = hex::encode(hasher.finalize());
    id.truncate(CONTENT_ID_LEN);
    id
}

/// Namespace a remote source's identifier.
pub fn remote_id(prefix: &str, source_id: &str) -> String {
    format!("{}{}", prefix, source_id)
}

/// Whether `prefix` keeps remote ids out of the content-id space.
///
/// The prefix must be non-empty and contain at least one character that
/// cannot appear in a lowercase hex digest.
pub fn is_valid_prefix(prefix: &str) -> bool {
    prefix
        .chars()
        .any(|c| !matches!(c, '0'..='9' | 'a'..='f'))
}
