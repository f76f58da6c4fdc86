//! Batch Monitor - One Monitoring Sweep Over All Open Positions
//!
//! Loads every `Open` position, checks each via the lifecycle manager
//! with bounded concurrency, and aggregates a summary. Partial-failure
//! isolation: a failing position is recorded and the sweep continues.
//!
//! The summary itself only reports `success: false` when the initial
//! open-positions load fails — without the list there is nothing to
//! check. An empty list is a normal, successful sweep.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use crate::ports::notifier::Notifier;
use crate::ports::price_source::PriceSource;
use crate::ports::repository::PositionRepository;
use crate::ports::swap::SwapExecutor;

use super::lifecycle::{CheckResult, LifecycleManager};

/// Aggregated result of one monitoring sweep.
#[derive(Debug, Clone)]
pub struct MonitorSummary {
    /// False only when the open-positions load itself failed.
    pub success: bool,
    /// Positions evaluated (or attempted) this sweep.
    pub positions_checked: usize,
    /// Positions closed by a buyback this sweep.
    pub buybacks_executed: usize,
    /// Positions whose check or buyback failed this sweep.
    pub buybacks_failed: usize,
    /// Positions that went `Failed` (terminal) this sweep.
    pub positions_failed: usize,
    /// Per-position results.
    pub results: Vec<CheckResult>,
    /// Load error, when `success` is false.
    pub error: Option<String>,
    /// Sweep timestamp.
    pub timestamp: DateTime<Utc>,
}

impl MonitorSummary {
    fn empty() -> Self {
        Self {
            success: true,
            positions_checked: 0,
            buybacks_executed: 0,
            buybacks_failed: 0,
            positions_failed: 0,
            results: Vec::new(),
            error: None,
            timestamp: Utc::now(),
        }
    }

    fn load_failure(error: String) -> Self {
        Self {
            success: false,
            positions_checked: 0,
            buybacks_executed: 0,
            buybacks_failed: 0,
            positions_failed: 0,
            results: Vec::new(),
            error: Some(error),
            timestamp: Utc::now(),
        }
    }

    fn from_results(results: Vec<CheckResult>) -> Self {
        let buybacks_executed = results.iter().filter(|r| r.buyback_executed).count();
        let buybacks_failed = results.iter().filter(|r| r.buyback_failed).count();
        let positions_failed = results.iter().filter(|r| r.position_failed).count();
        Self {
            success: true,
            positions_checked: results.len(),
            buybacks_executed,
            buybacks_failed,
            positions_failed,
            results,
            error: None,
            timestamp: Utc::now(),
        }
    }
}

/// Drives one sweep per invocation; the caller's scheduler guarantees
/// sweeps never overlap.
pub struct BatchMonitor<P, S, R, N>
where
    P: PriceSource,
    S: SwapExecutor,
    R: PositionRepository,
    N: Notifier,
{
    lifecycle: Arc<LifecycleManager<P, S, R, N>>,
    repo: Arc<R>,
    /// Positions checked concurrently per sweep.
    max_concurrency: usize,
}

impl<P, S, R, N> BatchMonitor<P, S, R, N>
where
    P: PriceSource,
    S: SwapExecutor,
    R: PositionRepository,
    N: Notifier,
{
    /// Create a new batch monitor.
    pub fn new(
        lifecycle: Arc<LifecycleManager<P, S, R, N>>,
        repo: Arc<R>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            lifecycle,
            repo,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Run one monitoring sweep over all open positions.
    ///
    /// Positions are independent units of work, so checks run with
    /// bounded concurrency; the repository serializes writes per
    /// position id.
    #[instrument(skip(self), fields(strategy = strategy_filter.unwrap_or("*")))]
    pub async fn monitor_open_positions(&self, strategy_filter: Option<&str>) -> MonitorSummary {
        let positions = match self.repo.get_open_positions(strategy_filter).await {
            Ok(positions) => positions,
            Err(e) => {
                warn!(error = %e, "Failed to load open positions, skipping sweep");
                return MonitorSummary::load_failure(e.to_string());
            }
        };

        if positions.is_empty() {
            return MonitorSummary::empty();
        }

        info!(
            open_positions = positions.len(),
            concurrency = self.max_concurrency,
            "Starting monitoring sweep"
        );

        let lifecycle = Arc::clone(&self.lifecycle);
        let results: Vec<CheckResult> = stream::iter(positions)
            .map(|position| {
                let lifecycle = Arc::clone(&lifecycle);
                async move { lifecycle.check_position(&position).await }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let summary = MonitorSummary::from_results(results);

        info!(
            checked = summary.positions_checked,
            executed = summary.buybacks_executed,
            failed = summary.buybacks_failed,
            "Monitoring sweep complete"
        );

        summary
    }
}
