//! GALA Buyback Bot — Entry Point
//!
//! Initializes configuration, logging, the gSwap client, and the
//! monitoring scheduler. Runs until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Replay the JSONL position log (resume state machine)
//! 4. Create GSwapClient (SwapExecutor + PriceSource ports)
//! 5. Create notifier (webhook or log-only)
//! 6. Wire LifecycleManager + BatchMonitor
//! 7. Spawn metrics/health server (/metrics, /live, /ready)
//! 8. Run the fixed-interval sweep loop (sweeps never overlap: each
//!    tick awaits the previous sweep)
//! 9. Wait for SIGINT → graceful shutdown

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

mod adapters;
mod config;
mod domain;
mod ports;
mod usecases;

use adapters::dex::{GSwapClient, GSwapClientConfig};
use adapters::metrics::MetricsRegistry;
use adapters::notify::EventNotifier;
use adapters::persistence::JsonlPositionRepository;
use usecases::lifecycle::LifecycleManager;
use usecases::monitor::BatchMonitor;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.bot.log_level)
                }),
        )
        .json()
        .init();

    info!(
        name = %config.bot.name,
        version = env!("CARGO_PKG_VERSION"),
        dry_run = config.bot.dry_run,
        base = %config.trading.base_symbol,
        interval_seconds = config.monitor.interval_seconds,
        "Starting GALA buyback bot"
    );

    // ── 3. Shutdown signal channels ─────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let (ready_tx, ready_rx) = watch::channel(true);

    // ── 4. Replay the position log ──────────────────────────
    let repo = Arc::new(
        JsonlPositionRepository::new(&config.persistence.data_dir)
            .await
            .context("Failed to open position log")?,
    );

    // ── 5. Create gSwap client (swap + price ports) ─────────
    let gswap = Arc::new(
        GSwapClient::new(GSwapClientConfig {
            base_url: config.api.gateway_url.clone(),
            timeout: Duration::from_secs(config.api.timeout_seconds),
            dry_run: config.bot.dry_run,
        })
        .context("Failed to create gSwap client")?,
    );

    // ── 6. Create notifier (webhook or log-only) ────────────
    let notifier = Arc::new(
        EventNotifier::from_webhook_url(config.notifications.webhook_url.clone())
            .context("Failed to create notifier")?,
    );

    // ── 7. Wire the lifecycle engine ────────────────────────
    let lifecycle = Arc::new(LifecycleManager::new(
        Arc::clone(&gswap),
        Arc::clone(&gswap),
        Arc::clone(&repo),
        notifier,
        &config.trading,
    ));
    let monitor = BatchMonitor::new(
        Arc::clone(&lifecycle),
        Arc::clone(&repo),
        config.monitor.max_concurrency,
    );

    // ── 8. Spawn metrics/health server ──────────────────────
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let metrics_handle = if config.metrics.enabled {
        let server = Arc::clone(&metrics);
        let bind = config.metrics.bind_address.clone();
        let rx = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = server.serve(bind, ready_rx, rx).await {
                warn!(error = %e, "Metrics server stopped with error");
            }
        }))
    } else {
        None
    };

    // ── 9. Fixed-interval sweep loop ────────────────────────
    // One sweep at a time: the tick handler awaits the sweep, so
    // overlapping runs are impossible by construction.
    let mut interval =
        tokio::time::interval(Duration::from_secs(config.monitor.interval_seconds));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let strategy_filter = config.monitor.strategy_filter.clone();

    info!("Monitoring loop started");
    loop {
        tokio::select! {
            biased;
            _ = signal::ctrl_c() => {
                info!("SIGINT received, initiating graceful shutdown");
                break;
            }
            _ = interval.tick() => {
                let start = Instant::now();
                let summary = monitor
                    .monitor_open_positions(strategy_filter.as_deref())
                    .await;
                metrics.record_sweep(&summary, start.elapsed().as_secs_f64());

                if !summary.success {
                    warn!(
                        error = summary.error.as_deref(),
                        "Sweep skipped: open positions could not be loaded"
                    );
                }
            }
        }
    }

    // ── Graceful shutdown ───────────────────────────────────

    // 1. Mark readiness probe unhealthy (503)
    let _ = ready_tx.send(false);

    // 2. Signal background tasks to stop
    let _ = shutdown_tx.send(());

    // 3. Wait for the metrics server to drain (up to 5s)
    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}
