//! High-level pipeline: manifest → remote index → per-document reconciliation.
//!
//! # Responsibilities
//! - Validate the [`SyncConfig`] before any network call
//! - Load the manifest and build the [`RemoteIndex`] once; failure of either
//!   aborts the run with a [`SyncError`]
//! - Reconcile documents strictly in manifest order, one at a time, and
//!   collect an [`ItemReport`] for each; per-document failures never abort
//!   the batch
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Already-loaded manifests: [`synchronise_manifest`]
//! - Output: [`SyncReport`] and its [`Summary`]

use tracing::{error, info};

use crate::config::{RunOptions, SyncConfig};
use crate::contract::{ContentFetcher, RemoteStore};
use crate::error::SyncError;
use crate::index::RemoteIndex;
use crate::manifest::{load_manifest, Manifest};
use crate::reconcile::{ItemOutcome, ItemReport, Reconciler};

/// Counts per terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
}

impl Summary {
    pub fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Created { .. } => self.created += 1,
            ItemOutcome::Updated { .. } => self.updated += 1,
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::Failed(_) => self.failed += 1,
        }
        self.total += 1;
    }

    /// Documents that ended up mirrored, whether or not a write was needed.
    pub fn succeeded(&self) -> usize {
        self.created + self.updated + self.skipped
    }

    /// Number of remote writes issued.
    pub fn writes(&self) -> usize {
        self.created + self.updated
    }
}

/// Output of one run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub summary: Summary,
    pub items: Vec<ItemReport>,
}

impl SyncReport {
    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items.iter().filter(|item| item.outcome.is_failure())
    }
}

/// Entrypoint: validate config, load the manifest, then reconcile it.
pub async fn synchronise<S, F>(
    config: &SyncConfig,
    store: &S,
    fetcher: &F,
) -> Result<SyncReport, SyncError>
where
    S: RemoteStore + ?Sized,
    F: ContentFetcher + ?Sized,
{
    config.validate().map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Invalid configuration");
        e
    })?;
    info!("[SYNC] Starting synchronisation");

    let options = config.run_options();
    let manifest = load_manifest(fetcher, &config.manifest_path, &options.retry).await?;
    synchronise_manifest(&manifest, store, fetcher, &options).await
}

/// Reconciles an already-loaded manifest against the remote store.
pub async fn synchronise_manifest<S, F>(
    manifest: &Manifest,
    store: &S,
    fetcher: &F,
    options: &RunOptions,
) -> Result<SyncReport, SyncError>
where
    S: RemoteStore + ?Sized,
    F: ContentFetcher + ?Sized,
{
    let index = RemoteIndex::build(store).await.map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Failed to build remote index");
        SyncError::Index(e)
    })?;

    let mut reconciler = Reconciler::new(store, fetcher, options, index);
    let mut report = SyncReport::default();

    for (idx, entry) in manifest.entries().iter().enumerate() {
        let item = reconciler.reconcile(idx + 1, entry).await;
        report.summary.record(&item.outcome);
        report.items.push(item);
    }

    let summary = &report.summary;
    info!(
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped,
        failed = summary.failed,
        total = summary.total,
        "[SYNC] Synchronisation complete: {}/{} succeeded",
        summary.succeeded(),
        summary.total
    );
    Ok(report)
}
