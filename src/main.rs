use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::time::Instant;
use tracing::{info, warn};

use ccm_exporter::config::AppConfig;
use ccm_exporter::metrics::{ExporterMetrics, ProbeCollector};
use ccm_exporter::store::{DocumentStore, ProbeSource, RedisDocumentStore};
use ccm_exporter::{logging, seed, server, AppState};

#[derive(Parser)]
#[command(name = "ccm-exporter", about = "CCM probe latency exporter")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve /metrics (default).
    Serve,
    /// Write synthetic probe documents into the store.
    Seed {
        /// Documents per origin.
        #[arg(long, default_value = "10")]
        count: usize,

        /// Seconds between consecutive documents.
        #[arg(long, default_value = "60")]
        interval_secs: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let _log_guard = logging::init(&config.logging).context("initialising logging")?;
    match cli.config.as_deref() {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => info!("configuration loaded from defaults and environment"),
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Seed {
            count,
            interval_secs,
        } => {
            let store = RedisDocumentStore::new(&config.store)?;
            let now = chrono::Utc::now().timestamp();
            seed::seed(&store, &config.targets, now, count, interval_secs).await?;
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    // ── 1. Store handle (connects lazily on first scrape) ────────
    let store: Arc<dyn DocumentStore> = Arc::new(RedisDocumentStore::new(&config.store)?);

    // ── 2. Collector ─────────────────────────────────────────────
    let metrics = Arc::new(ExporterMetrics::new().context("registering exporter metrics")?);
    let source = ProbeSource::new(
        store,
        config.targets.clone(),
        config.store.lookback_secs,
        config.store.timeout(),
        metrics.clone(),
    );
    let collector = Arc::new(ProbeCollector::new(source, metrics));

    // ── 3. Warm-up pass; a store outage here is not fatal ────────
    match collector
        .describe(Instant::now() + config.server.scrape_timeout())
        .await
    {
        Ok(descs) => info!(descriptors = descs.len(), "initial describe pass complete"),
        Err(e) => warn!(error = %e, "initial describe pass failed, continuing"),
    }

    // ── 4. Router ────────────────────────────────────────────────
    let state = Arc::new(AppState {
        collector,
        scrape_timeout: config.server.scrape_timeout(),
    });
    let app = server::create_router(state, config.server.request_timeout());

    // ── 5. Bind & serve ──────────────────────────────────────────
    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, origins = config.targets.len(), "start server");
    axum::serve(listener, app)
        .await
        .context("server exited with error")
}
