//! cah-ingest - batch cover art harvester
//!
//! Non-interactive: every setting comes from the TOML config (see
//! `cah_common::config`). Each configured collection is ingested in turn and a
//! summary logged. Ctrl+C stops scheduling new covers; in-flight ones finish.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cah_common::TomlConfig;
use cah_ingest::services::{
    CoverPaletteAnalyzer, HttpBlobDownloader, HttpCollectionSource, HttpObjectStore, ObjectStore,
};
use cah_ingest::{IngestReport, IngestionPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    // Resolved silently: the log level lives in the file itself
    let (config, config_source) =
        TomlConfig::load_resolved(None).context("Failed to load configuration")?;

    // RUST_LOG overrides [logging].level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cah-ingest {}", env!("CARGO_PKG_VERSION"));
    match &config_source {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => warn!("No configuration file found, using compiled defaults"),
    }
    info!(
        "Metadata API: {}, object store: {}/{}",
        config.metadata_api.base_url, config.object_store.endpoint, config.object_store.bucket
    );

    if config.pipeline.collections.is_empty() {
        warn!("No collections configured under [pipeline].collections, nothing to do");
        return Ok(());
    }

    let source = Arc::new(
        HttpCollectionSource::new(&config.metadata_api)
            .context("Failed to build metadata API client")?,
    );
    let downloader = Arc::new(
        HttpBlobDownloader::new(Duration::from_secs(config.metadata_api.timeout_secs))
            .context("Failed to build image downloader")?,
    );
    let store: Arc<dyn ObjectStore> = Arc::new(
        HttpObjectStore::new(&config.object_store)
            .context("Failed to build object store client")?,
    );

    let pipeline = IngestionPipeline::from_config(source, downloader, store.clone(), &config);
    let analyzer = config
        .palette
        .analyze_uploaded
        .then(|| CoverPaletteAnalyzer::from_config(store, &config.palette));

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let mut hard_failures = 0usize;
    for collection_id in &config.pipeline.collections {
        if cancel.is_cancelled() {
            break;
        }

        match pipeline.run(collection_id, &cancel).await {
            Ok(report) => {
                info!(
                    run_id = %report.run_id,
                    collection_id = %report.collection_id,
                    uploaded = report.uploaded_count(),
                    skipped = report.skipped_count(),
                    download_failed = report.download_failed_count(),
                    upload_failed = report.upload_failed_count(),
                    rejected = report.rejected.len(),
                    cancelled = report.cancelled,
                    "Collection summary"
                );
                if let Some(analyzer) = &analyzer {
                    log_palettes(analyzer, &report).await;
                }
            }
            Err(e) if e.is_cancelled() => {
                info!(collection_id = %collection_id, "Collection skipped after cancellation");
            }
            Err(e) => {
                error!(collection_id = %collection_id, error = %e, "Collection ingestion failed");
                hard_failures += 1;
            }
        }
    }

    if hard_failures > 0 {
        anyhow::bail!(
            "{} of {} collections failed",
            hard_failures,
            config.pipeline.collections.len()
        );
    }

    info!("cah-ingest finished");
    Ok(())
}

/// Per-cover colors are logged by the analyzer itself
async fn log_palettes(analyzer: &CoverPaletteAnalyzer, report: &IngestReport) {
    let results = analyzer.analyze_uploaded(report).await;
    let failed = results.iter().filter(|(_, result)| result.is_err()).count();
    info!(
        run_id = %report.run_id,
        analyzed = results.len() - failed,
        failed,
        "Palette extraction summary"
    );
}

/// Cancel `token` on Ctrl+C (or SIGTERM on unix)
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, finishing in-flight covers");
        },
        _ = terminate => {
            info!("Received terminate signal, finishing in-flight covers");
        },
    }

    token.cancel();
}
