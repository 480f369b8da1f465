//! ingest-worker: runs the fetch → normalize → upsert pipeline on a fixed period.
//!
//! Stops after the in-flight cycle on SIGINT/SIGTERM. `--once` runs a single
//! cycle and exits.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use feedstore_core::Config;
use feedstore_ingest::{Pipeline, Scheduler, SourceKind};
use feedstore_storage::{DocumentStore, ObjectDocumentStore};

// ── CLI ─────────────────────────────────────────────────────────────

/// Periodic feed ingestion worker.
#[derive(Parser, Debug)]
#[command(name = "ingest-worker", version, about)]
struct Cli {
    /// Source to poll: grid or chart. Defaults to INGEST_SOURCE.
    #[arg(long)]
    source: Option<String>,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,

    /// Override the configured period in seconds.
    #[arg(long)]
    interval_secs: Option<u64>,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    feedstore_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_summary();

    let kind: SourceKind = cli.source.as_deref().unwrap_or(&config.schedule.source).parse()?;
    let period = cli
        .interval_secs
        .map(|s| Duration::from_secs(s.max(1)))
        .unwrap_or_else(|| config.schedule.interval());

    let store: Arc<dyn DocumentStore> = Arc::new(ObjectDocumentStore::from_config(&config)?);
    info!(source = %kind, collection = %store.collection(), "ingest-worker starting");
    let pipeline = Pipeline::from_config(&config, kind, store);

    let stats = if cli.once {
        Scheduler::run_once(&pipeline).await
    } else {
        let cancel = CancellationToken::new();
        let signal_token = cancel.clone();
        tokio::spawn(async move {
            os_signal().await;
            info!("shutdown requested, finishing current cycle");
            signal_token.cancel();
        });
        Scheduler::new(period, cancel).run(&pipeline).await
    };

    info!(
        cycles = stats.cycles,
        completed = stats.completed,
        skipped = stats.skipped,
        failures = stats.failures,
        "ingest-worker exited cleanly"
    );
    Ok(())
}

/// Wait for SIGINT or SIGTERM (Unix) or Ctrl+C (cross-platform fallback).
async fn os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT");
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl_c");
    }
}
