//! Position Lifecycle Manager - Open and Check Workflows
//!
//! Owns the per-position state machine:
//!
//! - `open_position` runs the entry swap (base -> token) and creates the
//!   `Open` record.
//! - `check_position` fetches the current price, evaluates PnL, and
//!   hands off to the buyback executor when a threshold is crossed.
//!
//! A price-fetch failure is always a transient skip: the position is
//! left untouched and no buyback retry is consumed.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, instrument, warn};

use crate::config::TradingConfig;
use crate::domain::pnl::{self, ExitDecision, RealizedPnl};
use crate::domain::position::{Position, PositionId};
use crate::ports::notifier::Notifier;
use crate::ports::price_source::PriceSource;
use crate::ports::repository::{NewPosition, PositionRepository};
use crate::ports::swap::{ensure_distinct_pair, SwapExecutor};

use super::buyback::{BuybackExecutor, BuybackOutcome};

/// Request to open a new position by selling base asset for a token.
#[derive(Debug, Clone)]
pub struct EntryRequest {
    /// Strategy tag that produced the entry signal (e.g. "dca").
    pub strategy: String,
    /// Ticker of the token to acquire.
    pub token_symbol: String,
    /// GalaChain composite key of the token.
    pub token_identifier: String,
    /// Base asset to spend.
    pub base_amount: f64,
    /// Per-position override of the configured profit threshold.
    pub profit_threshold: Option<f64>,
    /// Per-position override of the configured loss threshold.
    pub loss_threshold: Option<f64>,
}

/// Result of checking one position during a monitoring cycle.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Position that was checked.
    pub position_id: PositionId,
    /// Pair label for logs and summaries.
    pub pair_symbol: String,
    /// PnL decision, when a price was available.
    pub decision: Option<ExitDecision>,
    /// Unrealized PnL percentage at the fetched price.
    pub pnl_percentage: Option<f64>,
    /// Whether a buyback ran and closed the position.
    pub buyback_executed: bool,
    /// Whether a buyback (or the check itself) failed this cycle.
    pub buyback_failed: bool,
    /// Whether the position went `Failed` (terminal) this cycle.
    pub position_failed: bool,
    /// Realized PnL, when the position closed this cycle.
    pub realized: Option<RealizedPnl>,
    /// Failure description, when anything went wrong.
    pub error: Option<String>,
}

impl CheckResult {
    fn held(position: &Position, pnl_percentage: f64) -> Self {
        Self {
            position_id: position.id.clone(),
            pair_symbol: position.pair_symbol.clone(),
            decision: Some(ExitDecision::Hold),
            pnl_percentage: Some(pnl_percentage),
            buyback_executed: false,
            buyback_failed: false,
            position_failed: false,
            realized: None,
            error: None,
        }
    }

    fn unresolved(position: &Position, error: String) -> Self {
        Self {
            position_id: position.id.clone(),
            pair_symbol: position.pair_symbol.clone(),
            decision: None,
            pnl_percentage: None,
            buyback_executed: false,
            buyback_failed: true,
            position_failed: false,
            realized: None,
            error: Some(error),
        }
    }
}

/// Per-position state machine driver.
pub struct LifecycleManager<P, S, R, N>
where
    P: PriceSource,
    S: SwapExecutor,
    R: PositionRepository,
    N: Notifier,
{
    price_source: Arc<P>,
    swap: Arc<S>,
    repo: Arc<R>,
    notifier: Arc<N>,
    buyback: BuybackExecutor<S, R, N>,
    /// Base asset composite key.
    base_token: String,
    /// Base asset ticker for pair labels.
    base_symbol: String,
    /// Default fractional profit trigger for new positions.
    profit_threshold: f64,
    /// Default fractional loss trigger for new positions.
    loss_threshold: f64,
    /// Fractional slippage tolerance for the entry swap.
    slippage_tolerance: f64,
}

impl<P, S, R, N> LifecycleManager<P, S, R, N>
where
    P: PriceSource,
    S: SwapExecutor,
    R: PositionRepository,
    N: Notifier,
{
    /// Create a new lifecycle manager with injected collaborators.
    pub fn new(
        price_source: Arc<P>,
        swap: Arc<S>,
        repo: Arc<R>,
        notifier: Arc<N>,
        config: &TradingConfig,
    ) -> Self {
        let buyback = BuybackExecutor::new(
            Arc::clone(&swap),
            Arc::clone(&repo),
            Arc::clone(&notifier),
            config,
        );
        Self {
            price_source,
            swap,
            repo,
            notifier,
            buyback,
            base_token: config.base_token_identifier.clone(),
            base_symbol: config.base_symbol.clone(),
            profit_threshold: config.profit_threshold,
            loss_threshold: config.loss_threshold,
            slippage_tolerance: config.slippage_tolerance,
        }
    }

    /// The buyback executor, for forced manual closure.
    pub fn buyback(&self) -> &BuybackExecutor<S, R, N> {
        &self.buyback
    }

    /// Open a new position: entry swap base -> token, then create the
    /// `Open` record.
    ///
    /// The entry trade id comes straight from the swap receipt. If the
    /// repository insert fails after a successful swap, the receipt is
    /// logged as a reconciliation gap and the error propagates.
    #[instrument(skip(self, request), fields(strategy = %request.strategy, token = %request.token_symbol))]
    pub async fn open_position(&self, request: EntryRequest) -> Result<Position> {
        ensure_distinct_pair(&self.base_token, &request.token_identifier)
            .context("Entry would swap the base asset into itself")?;

        let quote = self
            .swap
            .quote(&self.base_token, &request.token_identifier, request.base_amount)
            .await
            .context("Entry quote failed")?;
        let minimum_output = quote.minimum_output(self.slippage_tolerance);

        let receipt = self
            .swap
            .swap(
                &self.base_token,
                &request.token_identifier,
                request.base_amount,
                minimum_output,
            )
            .await
            .context("Entry swap failed")?;

        // Entry price in base units per token.
        let entry_price = request.base_amount / receipt.amount_out;
        let pair_symbol = format!("{}/{}", self.base_symbol, request.token_symbol);

        let data = NewPosition {
            strategy: request.strategy,
            pair_symbol,
            token_symbol: request.token_symbol,
            token_identifier: request.token_identifier,
            entry_trade_id: receipt.trade_id.clone(),
            entry_price,
            entry_amount: request.base_amount,
            token_amount: receipt.amount_out,
            profit_threshold: request.profit_threshold.unwrap_or(self.profit_threshold),
            loss_threshold: request.loss_threshold.unwrap_or(self.loss_threshold),
        };
        data.validate().context("Entry produced invalid position data")?;

        let position = match self.repo.create_position(data).await {
            Ok(position) => position,
            Err(e) => {
                // The swap settled but the record did not: operators must
                // reconcile from the receipt.
                error!(
                    trade_id = %receipt.trade_id,
                    amount_in = receipt.amount_in,
                    amount_out = receipt.amount_out,
                    error = %e,
                    "RECONCILIATION GAP: entry swap succeeded but position creation failed"
                );
                return Err(e).context("Position creation failed after a settled entry swap");
            }
        };

        info!(
            position_id = %position.id,
            pair = %position.pair_symbol,
            entry_price = position.entry_price,
            token_amount = position.token_amount,
            dry_run = receipt.dry_run,
            "Position opened"
        );

        if let Err(e) = self.notifier.notify_opened(&position).await {
            warn!(
                position_id = %position.id,
                error = %e,
                "Open notification failed (ignored)"
            );
        }

        Ok(position)
    }

    /// Check one open position: fetch price, evaluate PnL, buy back when
    /// a threshold is crossed.
    ///
    /// Never returns an error; every failure mode is folded into the
    /// `CheckResult` so one broken position cannot abort a batch.
    #[instrument(skip(self, position), fields(position_id = %position.id, pair = %position.pair_symbol))]
    pub async fn check_position(&self, position: &Position) -> CheckResult {
        let current_price = match self
            .price_source
            .current_price(&position.token_identifier)
            .await
        {
            Ok(price) => price,
            Err(e) => {
                // Transient data-source failure: skip without mutating the
                // position and without consuming a buyback retry.
                warn!(
                    position_id = %position.id,
                    error = %e,
                    "Price unavailable, skipping position this cycle"
                );
                return CheckResult::unresolved(position, e.to_string());
            }
        };

        let evaluation = match pnl::evaluate(
            position.entry_price,
            current_price,
            position.profit_threshold,
            position.loss_threshold,
        ) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                error!(
                    position_id = %position.id,
                    entry_price = position.entry_price,
                    current_price,
                    error = %e,
                    "PnL evaluation rejected stored position data"
                );
                return CheckResult::unresolved(position, e.to_string());
            }
        };

        debug!(
            position_id = %position.id,
            pnl_pct = evaluation.pnl_percentage,
            decision = %evaluation.decision,
            "Position evaluated"
        );

        if !evaluation.decision.triggers_exit() {
            return CheckResult::held(position, evaluation.pnl_percentage);
        }

        info!(
            position_id = %position.id,
            pnl_pct = evaluation.pnl_percentage,
            decision = %evaluation.decision,
            "{}", evaluation.description
        );

        match self.buyback.execute_buyback(position, current_price).await {
            Ok(BuybackOutcome::Closed {
                final_base_amount: _,
                realized,
                ..
            }) => CheckResult {
                position_id: position.id.clone(),
                pair_symbol: position.pair_symbol.clone(),
                decision: Some(evaluation.decision),
                pnl_percentage: Some(evaluation.pnl_percentage),
                buyback_executed: true,
                buyback_failed: false,
                position_failed: false,
                realized: Some(realized),
                error: None,
            },
            Ok(BuybackOutcome::RetryScheduled { error, .. }) => CheckResult {
                position_id: position.id.clone(),
                pair_symbol: position.pair_symbol.clone(),
                decision: Some(evaluation.decision),
                pnl_percentage: Some(evaluation.pnl_percentage),
                buyback_executed: false,
                buyback_failed: true,
                position_failed: false,
                realized: None,
                error: Some(error),
            },
            Ok(BuybackOutcome::Failed { error, .. }) => CheckResult {
                position_id: position.id.clone(),
                pair_symbol: position.pair_symbol.clone(),
                decision: Some(evaluation.decision),
                pnl_percentage: Some(evaluation.pnl_percentage),
                buyback_executed: false,
                buyback_failed: true,
                position_failed: true,
                realized: None,
                error: Some(error),
            },
            Err(e) => CheckResult {
                position_id: position.id.clone(),
                pair_symbol: position.pair_symbol.clone(),
                decision: Some(evaluation.decision),
                pnl_percentage: Some(evaluation.pnl_percentage),
                buyback_executed: false,
                buyback_failed: true,
                position_failed: false,
                realized: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::PositionStatus;
    use chrono::Utc;

    fn sample_position() -> Position {
        Position {
            id: "pos-7".to_string(),
            strategy: "ma-cross".to_string(),
            pair_symbol: "GALA/GWETH".to_string(),
            token_symbol: "GWETH".to_string(),
            token_identifier: "GWETH|Unit|none|none".to_string(),
            entry_trade_id: "trade-7".to_string(),
            entry_price: 0.00002,
            entry_amount: 50.0,
            token_amount: 2_500_000.0,
            profit_threshold: 0.05,
            loss_threshold: -0.02,
            status: PositionStatus::Open,
            close_trade_id: None,
            retry_count: 0,
            created_at: Utc::now(),
            closed_at: None,
            notes: Vec::new(),
        }
    }

    #[test]
    fn test_held_result_shape() {
        let pos = sample_position();
        let result = CheckResult::held(&pos, 1.5);
        assert_eq!(result.decision, Some(ExitDecision::Hold));
        assert!(!result.buyback_executed);
        assert!(!result.buyback_failed);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_unresolved_result_counts_as_failed() {
        let pos = sample_position();
        let result = CheckResult::unresolved(&pos, "feed down".to_string());
        assert!(result.decision.is_none());
        assert!(result.buyback_failed);
        assert!(!result.buyback_executed);
        assert_eq!(result.error.as_deref(), Some("feed down"));
    }
}
