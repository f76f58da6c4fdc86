//! Buyback Executor - Exit Swap Orchestration
//!
//! Runs the exit leg of a position: swaps the held token back into the
//! base asset, interprets success/failure, updates the position record,
//! and applies the bounded-retry policy.
//!
//! Failure accounting: `retry_count + 1 >= max_retries` marks the
//! position `Failed` (terminal); below the cap it stays `Open` with the
//! incremented count and is picked up again next cycle. Retry state is
//! persisted, so a process restart never resets retry history.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::TradingConfig;
use crate::domain::pnl::{self, ExitDecision, RealizedPnl};
use crate::domain::position::{Position, PositionStatus};
use crate::ports::notifier::{BuybackNotification, Notifier};
use crate::ports::repository::{PositionRepository, RepositoryError};
use crate::ports::swap::{SwapError, SwapExecutor};

/// Errors that abort a buyback before any swap is attempted.
///
/// Swap failures are not errors at this level; they fold into
/// `BuybackOutcome::RetryScheduled` / `BuybackOutcome::Failed`.
#[derive(Debug, Error)]
pub enum BuybackError {
    /// The position is not `Open`. Caller bug; logged loudly, never
    /// retried.
    #[error("invalid state: position {id} is {status}, expected OPEN")]
    InvalidState {
        id: String,
        status: PositionStatus,
    },
    /// Repository mutation failed mid-transition.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Outcome of one buyback attempt.
#[derive(Debug, Clone)]
pub enum BuybackOutcome {
    /// Exit swap succeeded; position is `Closed`.
    Closed {
        /// Base asset recovered by the exit swap.
        final_base_amount: f64,
        /// Realized PnL against `entry_amount`.
        realized: RealizedPnl,
        /// Exit trade reference; `None` when unresolvable (closing takes
        /// priority over audit linkage).
        close_trade_id: Option<String>,
    },
    /// Swap failed below the retry cap; position stays `Open`.
    RetryScheduled {
        /// Persisted retry count after this attempt.
        retry_count: u32,
        error: String,
    },
    /// Swap failed at the retry cap; position is `Failed` (terminal).
    Failed {
        retry_count: u32,
        error: String,
    },
}

impl BuybackOutcome {
    /// Whether the exit swap succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }

    /// Whether the position reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed { .. } | Self::Failed { .. })
    }
}

/// Orchestrates exit swaps with bounded retries.
pub struct BuybackExecutor<S: SwapExecutor, R: PositionRepository, N: Notifier> {
    swap: Arc<S>,
    repo: Arc<R>,
    notifier: Arc<N>,
    /// Base asset composite key (e.g. "GALA|Unit|none|none").
    base_token: String,
    /// Failed attempts allowed before the position goes `Failed`.
    max_retries: u32,
    /// Fractional slippage tolerance applied to the quoted output.
    slippage_tolerance: f64,
}

impl<S: SwapExecutor, R: PositionRepository, N: Notifier> BuybackExecutor<S, R, N> {
    /// Create a new buyback executor.
    pub fn new(swap: Arc<S>, repo: Arc<R>, notifier: Arc<N>, config: &TradingConfig) -> Self {
        Self {
            swap,
            repo,
            notifier,
            base_token: config.base_token_identifier.clone(),
            max_retries: config.max_retries,
            slippage_tolerance: config.slippage_tolerance,
        }
    }

    /// Execute the exit swap for an open position.
    ///
    /// Also exposed for forced manual closure: when `current_price` does
    /// not cross either threshold the notification carries a "MANUAL"
    /// trigger.
    ///
    /// # Errors
    /// `InvalidState` when the position is not `Open`; `Repository` when a
    /// status transition cannot be persisted.
    #[instrument(skip(self, position), fields(position_id = %position.id, pair = %position.pair_symbol))]
    pub async fn execute_buyback(
        &self,
        position: &Position,
        current_price: f64,
    ) -> Result<BuybackOutcome, BuybackError> {
        if position.status != PositionStatus::Open {
            error!(
                position_id = %position.id,
                status = %position.status,
                "Buyback requested for non-open position"
            );
            return Err(BuybackError::InvalidState {
                id: position.id.clone(),
                status: position.status,
            });
        }

        let trigger = self.classify_trigger(position, current_price);

        match self.run_exit_swap(position).await {
            Ok(receipt) => {
                let final_base_amount = receipt.amount_out;
                let realized = RealizedPnl::from_amounts(position.entry_amount, final_base_amount);
                let close_trade_id =
                    (!receipt.trade_id.is_empty()).then(|| receipt.trade_id.clone());

                if close_trade_id.is_none() {
                    warn!(
                        position_id = %position.id,
                        "Exit receipt carried no trade id, closing with null reference"
                    );
                }

                let note = format!(
                    "buyback at price {current_price}: recovered {final_base_amount} base \
                      ({:+.2}%), trigger {trigger}",
                    realized.percentage
                );
                self
                    .repo
                    .close_position(&position.id, close_trade_id.clone(), note)
                    .await?;

                info!(
                    position_id = %position.id,
                    final_base_amount,
                    realized_pct = realized.percentage,
                    trigger = %trigger,
                    dry_run = receipt.dry_run,
                    "Position closed"
                );

                let outcome = BuybackOutcome::Closed {
                    final_base_amount,
                    realized,
                    close_trade_id,
                };
                self.notify(position, &outcome, &trigger).await;
                Ok(outcome)
            }
            Err(swap_err) => self.handle_swap_failure(position, &trigger, &swap_err).await,
        }
    }

    /// Quote then swap `token_amount` of the held token back into base.
    async fn run_exit_swap(
        &self,
        position: &Position,
    ) -> Result<crate::ports::swap::SwapReceipt, SwapError> {
        let quote = self
            .swap
            .quote(&position.token_identifier, &self.base_token, position.token_amount)
            .await?;
        let minimum_output = quote.minimum_output(self.slippage_tolerance);

        self
            .swap
            .swap(
                &position.token_identifier,
                &self.base_token,
                position.token_amount,
                minimum_output,
            )
            .await
    }

    /// Apply the bounded-retry policy after a failed exit swap.
    async fn handle_swap_failure(
        &self,
        position: &Position,
        trigger: &str,
        swap_err: &SwapError,
    ) -> Result<BuybackOutcome, BuybackError> {
        let attempted = position.retry_count + 1;
        let reason = swap_err.to_string();

        if attempted >= self.max_retries {
            warn!(
                position_id = %position.id,
                retry_count = attempted,
                max_retries = self.max_retries,
                error = %reason,
                "Retry cap reached, marking position failed"
            );
            self
                .repo
                .mark_failed(
                    &position.id,
                    attempted,
                    format!("buyback retries exhausted: {reason}"),
                )
                .await?;

            let outcome = BuybackOutcome::Failed {
                retry_count: attempted,
                error: reason,
            };
            self.notify(position, &outcome, trigger).await;
            Ok(outcome)
        } else {
            warn!(
                position_id = %position.id,
                retry_count = attempted,
                max_retries = self.max_retries,
                error = %reason,
                "Buyback failed, will retry next cycle"
            );
            self
                .repo
                .update_retry(
                    &position.id,
                    attempted,
                    format!("buyback attempt {attempted} failed: {reason}"),
                )
                .await?;

            Ok(BuybackOutcome::RetryScheduled {
                retry_count: attempted,
                error: reason,
            })
        }
    }

    /// Name the exit trigger for notes and notifications. A price that
    /// crosses neither threshold means the caller is forcing a manual
    /// closure.
    fn classify_trigger(&self, position: &Position, current_price: f64) -> String {
        match pnl::evaluate(
            position.entry_price,
            current_price,
            position.profit_threshold,
            position.loss_threshold,
        ) {
            Ok(eval) if eval.decision.triggers_exit() => eval.decision.to_string(),
            Ok(_) => "MANUAL".to_string(),
            Err(_) => "MANUAL".to_string(),
        }
    }

    /// Fire-and-forget notification of a terminal outcome. Failures are
    /// logged and swallowed; they never roll back the transition.
    async fn notify(&self, position: &Position, outcome: &BuybackOutcome, trigger: &str) {
        let notification = match outcome {
            BuybackOutcome::Closed {
                final_base_amount,
                realized,
                ..
            } => BuybackNotification {
                success: true,
                terminal: true,
                trigger: trigger.to_string(),
                final_base_amount: Some(*final_base_amount),
                realized_pnl_pct: Some(realized.percentage),
                error: None,
            },
            BuybackOutcome::Failed { error, .. } => BuybackNotification {
                success: false,
                terminal: true,
                trigger: trigger.to_string(),
                final_base_amount: None,
                realized_pnl_pct: None,
                error: Some(error.clone()),
            },
            // Non-terminal retries are log-only.
            BuybackOutcome::RetryScheduled { .. } => return,
        };

        if let Err(e) = self.notifier.notify_buyback(position, &notification).await {
            warn!(
                position_id = %position.id,
                error = %e,
                "Buyback notification failed (ignored)"
            );
        }
    }
}
