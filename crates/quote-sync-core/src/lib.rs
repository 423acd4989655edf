//! # Quote Sync Core
//!
//! Pure, I/O-free logic for Quote Sync: the record data model, the content
//! identity function, and the merge engine that reconciles a local record
//! set with a remote one.
//!
//! This crate contains no tokio, sqlx, network, or filesystem code, and
//! every function is deterministic. Side effects belong to `quote-sync`.

pub mod identity;
pub mod merge;
pub mod models;
