#![doc = "gist-sync-core: core reconciliation logic for gist-sync."]

//! This crate owns everything that decides *what* to write to the remote
//! store: manifest parsing, document validation and keys, rendering, content
//! fetching with retry, the remote index and the per-document reconciler.
//! Wire clients for a concrete store live in the binary crate and plug in
//! through [`contract::RemoteStore`].
//!
//! # Usage
//! Build a [`config::SyncConfig`], pick a [`contract::ContentFetcher`] with
//! [`fetch::fetcher_for`], and hand both plus a store to
//! [`synchronise::synchronise`].

pub mod config;
pub mod contract;
pub mod document;
pub mod dry_run;
pub mod error;
pub mod fetch;
pub mod index;
pub mod manifest;
pub mod reconcile;
pub mod render;
pub mod retry;
pub mod synchronise;
