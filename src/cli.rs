use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use gist_sync_core::config::SyncConfig;
use gist_sync_core::contract::RemoteStore;
use gist_sync_core::dry_run::DryRunStore;
use gist_sync_core::fetch::fetcher_for;
use gist_sync_core::reconcile::ItemOutcome;
use gist_sync_core::synchronise::{synchronise, SyncReport};

use crate::gist::GistClient;
use crate::load_config::load_config;

/// CLI for gist-sync: mirror manifest-listed blog posts into GitHub Gists.
#[derive(Parser)]
#[clap(
    name = "gist-sync",
    version,
    about = "Mirror blog posts listed in a manifest into GitHub Gists"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create, update or skip one gist per manifest record
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// List remote gists and report decisions without writing anything
        #[clap(long)]
        dry_run: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config, dry_run } => {
            let config = load_config(config)?;
            config.trace_loaded();
            let prefix = if dry_run { "[dry-run] " } else { "" };
            println!("{prefix}Synchronise starting...");

            let report = run_sync(&config, dry_run).await.map_err(|e| {
                eprintln!("[ERROR] Synchronisation failed: {e:#}");
                e
            })?;
            print_report(&report, prefix);
            Ok(())
        }
    }
}

async fn run_sync(config: &SyncConfig, dry_run: bool) -> Result<SyncReport> {
    let client = GistClient::new(&config.store, &config.credentials, config.request_timeout)
        .context("Failed to initialise gist client")?;
    let store: Box<dyn RemoteStore> = if dry_run {
        tracing::info!("[dry-run] Remote writes are disabled");
        Box::new(DryRunStore::new(client))
    } else {
        Box::new(client)
    };
    let fetcher = fetcher_for(
        &config.source,
        config.credentials.token(),
        config.request_timeout,
    )
    .context("Failed to initialise content fetcher")?;

    let report = synchronise(config, store.as_ref(), fetcher.as_ref()).await?;
    Ok(report)
}

fn print_report(report: &SyncReport, prefix: &str) {
    for item in &report.items {
        let title = item.title.as_deref().unwrap_or("<untitled>");
        match &item.outcome {
            ItemOutcome::Failed(err) => println!(
                "{prefix}#{} [{}] {title}: {err}",
                item.position,
                item.outcome.label()
            ),
            outcome => println!("{prefix}#{} [{}] {title}", item.position, outcome.label()),
        }
    }
    let summary = &report.summary;
    println!(
        "{prefix}Synchronise complete: {}/{} succeeded (created {}, updated {}, skipped {}, failed {})",
        summary.succeeded(),
        summary.total,
        summary.created,
        summary.updated,
        summary.skipped,
        summary.failed
    );
}
