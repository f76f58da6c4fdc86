//! Prometheus Metrics Registry - Monitoring Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards.
//! Covers sweep activity, buyback outcomes, retry pressure, and
//! realized PnL. Also serves /live and /ready health probes on the
//! same listener.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge,
    Opts, Registry, TextEncoder,
};
use tokio::sync::{broadcast, watch};
use tracing::{info, instrument};

use crate::usecases::monitor::MonitorSummary;

/// Centralized Prometheus metrics for the buyback bot.
///
/// All metrics follow the naming convention `gala_buyback_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Completed monitoring sweeps.
    pub sweeps_total: IntCounter,
    /// Positions checked across all sweeps.
    pub positions_checked_total: IntCounter,
    /// Buybacks that closed a position, labeled by trigger.
    pub buybacks_executed_total: IntCounterVec,
    /// Checks that failed (price miss, swap failure, storage error).
    pub checks_failed_total: IntCounter,
    /// Positions currently open.
    pub open_positions: IntGauge,
    /// Cumulative realized PnL in base asset units.
    pub realized_pnl_base: Gauge,
    /// Sweep duration in seconds.
    pub sweep_duration_seconds: Histogram,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let sweeps_total = IntCounter::new(
            "gala_buyback_sweeps_total",
            "Completed monitoring sweeps",
        )?;

        let positions_checked_total = IntCounter::new(
            "gala_buyback_positions_checked_total",
            "Positions checked across all sweeps",
        )?;

        let buybacks_executed_total = IntCounterVec::new(
            Opts::new(
                "gala_buyback_buybacks_executed_total",
                "Buybacks that closed a position",
            ),
            &["trigger"],
        )?;

        let checks_failed_total = IntCounter::new(
            "gala_buyback_checks_failed_total",
            "Position checks that failed this or any sweep",
        )?;

        let open_positions = IntGauge::new(
            "gala_buyback_open_positions",
            "Positions currently open",
        )?;

        let realized_pnl_base = Gauge::new(
            "gala_buyback_realized_pnl_base",
            "Cumulative realized PnL in base asset units",
        )?;

        let sweep_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "gala_buyback_sweep_duration_seconds",
                "Monitoring sweep duration in seconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(sweeps_total.clone()))?;
        registry.register(Box::new(positions_checked_total.clone()))?;
        registry.register(Box::new(buybacks_executed_total.clone()))?;
        registry.register(Box::new(checks_failed_total.clone()))?;
        registry.register(Box::new(open_positions.clone()))?;
        registry.register(Box::new(realized_pnl_base.clone()))?;
        registry.register(Box::new(sweep_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            sweeps_total,
            positions_checked_total,
            buybacks_executed_total,
            checks_failed_total,
            open_positions,
            realized_pnl_base,
            sweep_duration_seconds,
        })
    }

    /// Record the aggregate of one monitoring sweep.
    pub fn record_sweep(&self, summary: &MonitorSummary, duration_secs: f64) {
        self.sweeps_total.inc();
        self.sweep_duration_seconds.observe(duration_secs);
        self
            .positions_checked_total
            .inc_by(summary.positions_checked as u64);
        self.checks_failed_total.inc_by(summary.buybacks_failed as u64);

        for result in &summary.results {
            if !result.buyback_executed {
                continue;
            }
            let trigger = result
                .decision
                .map_or_else(|| "MANUAL".to_string(), |d| d.to_string());
            self.buybacks_executed_total.with_label_values(&[&trigger]).inc();
            if let Some(realized) = result.realized {
                self.realized_pnl_base.add(realized.absolute);
            }
        }

        // Every open position is loaded at sweep start, so the open set
        // after the sweep is what was checked minus every terminal exit
        // (closed or failed).
        let still_open =
            summary.positions_checked - summary.buybacks_executed - summary.positions_failed;
        self.open_positions.set(still_open as i64);
    }

    /// Serve /metrics, /live, and /ready until shutdown.
    #[instrument(skip(self, ready_rx, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        ready_rx: watch::Receiver<bool>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new()
            .route(
                "/metrics",
                get(move || {
                    let registry = metrics_self.registry.clone();
                    async move {
                        let encoder = TextEncoder::new();
                        let metric_families = registry.gather();
                        let mut buffer = Vec::new();
                        if encoder.encode(&metric_families, &mut buffer).is_err() {
                            return String::new();
                        }
                        String::from_utf8(buffer).unwrap_or_default()
                    }
                }),
            )
            .route("/live", get(|| async { StatusCode::OK }))
            .route(
                "/ready",
                get(|State(rx): State<watch::Receiver<bool>>| async move {
                    if *rx.borrow() {
                        StatusCode::OK
                    } else {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                }),
            )
            .with_state(ready_rx);

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pnl::{ExitDecision, RealizedPnl};
    use crate::usecases::lifecycle::CheckResult;
    use chrono::Utc;

    fn summary_with_one_close() -> MonitorSummary {
        MonitorSummary {
            success: true,
            positions_checked: 2,
            buybacks_executed: 1,
            buybacks_failed: 0,
            positions_failed: 0,
            results: vec![CheckResult {
                position_id: "pos-1".to_string(),
                pair_symbol: "GALA/GUSDC".to_string(),
                decision: Some(ExitDecision::ProfitTarget),
                pnl_percentage: Some(6.0),
                buyback_executed: true,
                buyback_failed: false,
                position_failed: false,
                realized: Some(RealizedPnl::from_amounts(100.0, 106.0)),
                error: None,
            }],
            error: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_record_sweep_updates_counters() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.record_sweep(&summary_with_one_close(), 0.42);

        assert_eq!(metrics.sweeps_total.get(), 1);
        assert_eq!(metrics.positions_checked_total.get(), 2);
        assert_eq!(
            metrics
                .buybacks_executed_total
                .with_label_values(&["PROFIT_TARGET"])
                .get(),
            1
        );
        assert_eq!(metrics.open_positions.get(), 1);
        assert!((metrics.realized_pnl_base.get() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_terminal_failures_leave_the_open_gauge() {
        // 3 checked: one closed, one went FAILED, one retry-scheduled.
        // Only the retrying position is still open.
        let metrics = MetricsRegistry::new().unwrap();
        let summary = MonitorSummary {
            positions_checked: 3,
            buybacks_failed: 2,
            positions_failed: 1,
            ..summary_with_one_close()
        };
        metrics.record_sweep(&summary, 0.1);

        assert_eq!(metrics.open_positions.get(), 1);
        assert_eq!(metrics.checks_failed_total.get(), 2);
    }
}
