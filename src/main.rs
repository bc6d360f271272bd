//! heapwatch - OOM heap-profile watchdog
//!
//! Watches host processes for imminent out-of-memory conditions and captures
//! pprof heap profiles to S3 before the kernel OOM-killer terminates them.

use anyhow::{Context, Result};
use heapwatch::{
    blob::S3BlobStore, config::Config, fetch::HttpProfileFetcher, pipeline::CapturePipeline,
    proc::ProcfsMetricsProvider, watcher::Watcher,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    info!("heapwatch starting up");
    info!("critical threshold set to {}%", config.critical_percent);
    info!("cooldown set to {:?}", config.cooldown);
    info!("bucket set to {}", config.bucket);
    info!("watch interval set to {:?}", config.watch_interval);

    let provider = Arc::new(ProcfsMetricsProvider::new());
    let fetcher =
        Arc::new(HttpProfileFetcher::new().context("failed to build profile fetch client")?);
    let store = Arc::new(S3BlobStore::from_env().await);
    let pipeline = CapturePipeline::new(fetcher, store, config.bucket.clone());

    // Runs until killed; there is no graceful-shutdown contract.
    Watcher::new(config, provider, pipeline).run().await;

    Ok(())
}
