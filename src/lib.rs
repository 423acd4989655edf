//! # Quote Sync
//!
//! An offline-first quote collection that periodically reconciles with a
//! remote source.
//!
//! Quotes live in a local SQLite-backed key-value store and stay usable
//! without a network. A sync pass fetches a bounded batch from the remote
//! collection, merges it into the local set under a remote-wins policy,
//! persists the result, and tells the user what changed. New local quotes
//! are pushed to the remote best-effort.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Remote (HTTP)│──▶│ merge (core) │──▶│ RecordStore  │
//! │ fetch / push │   │ remote-wins  │   │ SQLite kv    │
//! └──────────────┘   └──────┬───────┘   └──────┬───────┘
//!                           │                  │
//!                           ▼                  ▼
//!                     ┌──────────┐       ┌──────────┐
//!                     │ Notifier │       │   CLI    │
//!                     │ (stderr) │       │ (qsync)  │
//!                     └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! qsync init                                   # create database
//! qsync add "Simplicity wins." --category Design
//! qsync sync                                   # one fetch-and-merge pass
//! qsync random --category Design
//! qsync watch                                  # sync every 30 seconds
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`kv`] | Durable key-value surface |
//! | [`store`] | Local record store |
//! | [`remote`] | Remote adapter (HTTP) |
//! | [`sync`] | Sync pass and local authoring |
//! | [`scheduler`] | Periodic sync driver |
//! | [`notify`] | User-visible notifications |
//! | [`transfer`] | JSON export and import |
//! | [`browse`] | Categories and random quotes |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//!
//! The record model, identity function, and merge engine live in
//! `quote-sync-core` and are re-exported here.

pub mod browse;
pub mod config;
pub mod db;
pub mod kv;
pub mod migrate;
pub mod notify;
pub mod remote;
pub mod scheduler;
pub mod store;
pub mod sync;
pub mod transfer;

pub use quote_sync_core::{identity, merge, models};
