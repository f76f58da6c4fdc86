//! PnL evaluation engine.
//!
//! Computes percentage profit/loss from entry and current price and
//! classifies a position's exit condition against configured thresholds.
//! Thresholds are supplied as signed fractions (0.05 = +5%, -0.02 = -2%)
//! and compared in percentage units against the computed `pnl_percentage`.
//!
//! Pure and deterministic: no side effects, safe to call concurrently.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from PnL evaluation.
///
/// `InvalidInput` is a programmer-error class: the caller must not retry
/// without correcting the input.
#[derive(Debug, Error, PartialEq)]
pub enum PnlError {
    /// Entry price must be strictly positive; current price non-negative.
    #[error("invalid input: entry_price={entry_price}, current_price={current_price}")]
    InvalidInput {
        entry_price: f64,
        current_price: f64,
    },
}

/// Exit classification for an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitDecision {
    /// Profit threshold reached or exceeded — trigger buyback.
    ProfitTarget,
    /// Loss threshold reached or exceeded — trigger buyback.
    StopLoss,
    /// Price within the hold band — no action.
    Hold,
}

impl ExitDecision {
    /// Whether this decision triggers a buyback.
    pub fn triggers_exit(self) -> bool {
        matches!(self, Self::ProfitTarget | Self::StopLoss)
    }
}

impl std::fmt::Display for ExitDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProfitTarget => write!(f, "PROFIT_TARGET"),
            Self::StopLoss => write!(f, "STOP_LOSS"),
            Self::Hold => write!(f, "HOLD"),
        }
    }
}

/// Result of a single PnL evaluation (transient, never persisted).
#[derive(Debug, Clone, PartialEq)]
pub struct PnlEvaluation {
    /// Signed percentage: `(current - entry) / entry * 100`.
    pub pnl_percentage: f64,
    /// Exit classification against the thresholds.
    pub decision: ExitDecision,
    /// Human-readable justification for logs and notes.
    pub description: String,
}

/// Evaluate current PnL against profit/loss thresholds.
///
/// Boundary policy: equality triggers the exit (`>=` and `<=`, not strict).
/// Thresholds are inclusive by design.
///
/// The profit branch is checked first; with `profit_threshold > 0 >
/// loss_threshold` the two can never match simultaneously.
///
/// # Errors
/// Returns `PnlError::InvalidInput` if `entry_price <= 0` or
/// `current_price < 0`.
pub fn evaluate(
    entry_price: f64,
    current_price: f64,
    profit_threshold: f64,
    loss_threshold: f64,
) -> Result<PnlEvaluation, PnlError> {
    if entry_price <= 0.0 || current_price < 0.0 || !entry_price.is_finite() || !current_price.is_finite() {
        return Err(PnlError::InvalidInput {
            entry_price,
            current_price,
        });
    }

    let pnl_percentage = (current_price - entry_price) / entry_price * 100.0;
    let profit_pct = profit_threshold * 100.0;
    let loss_pct = loss_threshold * 100.0;

    let (decision, description) = if pnl_percentage >= profit_pct {
        (
            ExitDecision::ProfitTarget,
            format!("PnL {pnl_percentage:+.2}% reached profit target {profit_pct:+.2}%"),
        )
    } else if pnl_percentage <= loss_pct {
        (
            ExitDecision::StopLoss,
            format!("PnL {pnl_percentage:+.2}% breached stop loss {loss_pct:+.2}%"),
        )
    } else {
        (
            ExitDecision::Hold,
            format!(
                "PnL {pnl_percentage:+.2}% within hold band ({loss_pct:+.2}% .. {profit_pct:+.2}%)"
            ),
        )
    };

    Ok(PnlEvaluation {
        pnl_percentage,
        decision,
        description,
    })
}

/// Realized PnL of a closed position, in base-asset terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RealizedPnl {
    /// `final_base_amount - entry_amount`.
    pub absolute: f64,
    /// `absolute / entry_amount * 100`.
    pub percentage: f64,
}

impl RealizedPnl {
    /// Compute realized PnL from the base amount spent at entry and the
    /// base amount recovered by the buyback.
    pub fn from_amounts(entry_amount: f64, final_base_amount: f64) -> Self {
        let absolute = final_base_amount - entry_amount;
        let percentage = if entry_amount > 0.0 {
            absolute / entry_amount * 100.0
        } else {
            0.0
        };
        Self {
            absolute,
            percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFIT: f64 = 0.05;
    const LOSS: f64 = -0.02;

    #[test]
    fn test_profit_target_above_threshold() {
        // entry 0.05 -> 0.053 = +6.0%
        let eval = evaluate(0.05, 0.053, PROFIT, LOSS).unwrap();
        assert!((eval.pnl_percentage - 6.0).abs() < 1e-9);
        assert_eq!(eval.decision, ExitDecision::ProfitTarget);
    }

    #[test]
    fn test_stop_loss_at_exact_boundary() {
        // entry 0.05 -> 0.049 = -2.0%, inclusive boundary
        let eval = evaluate(0.05, 0.049, PROFIT, LOSS).unwrap();
        assert!((eval.pnl_percentage - (-2.0)).abs() < 1e-9);
        assert_eq!(eval.decision, ExitDecision::StopLoss);
    }

    #[test]
    fn test_hold_inside_band() {
        // entry 0.05 -> 0.051 = +2.0%
        let eval = evaluate(0.05, 0.051, PROFIT, LOSS).unwrap();
        assert!((eval.pnl_percentage - 2.0).abs() < 1e-9);
        assert_eq!(eval.decision, ExitDecision::Hold);
    }

    #[test]
    fn test_profit_target_at_exact_boundary() {
        let eval = evaluate(1.0, 1.05, PROFIT, LOSS).unwrap();
        assert_eq!(eval.decision, ExitDecision::ProfitTarget);
    }

    #[test]
    fn test_unchanged_price_holds() {
        let eval = evaluate(0.05, 0.05, PROFIT, LOSS).unwrap();
        assert_eq!(eval.pnl_percentage, 0.0);
        assert_eq!(eval.decision, ExitDecision::Hold);
    }

    #[test]
    fn test_zero_current_price_is_full_loss() {
        let eval = evaluate(0.05, 0.0, PROFIT, LOSS).unwrap();
        assert_eq!(eval.pnl_percentage, -100.0);
        assert_eq!(eval.decision, ExitDecision::StopLoss);
    }

    #[test]
    fn test_invalid_entry_price_rejected() {
        assert!(evaluate(0.0, 1.0, PROFIT, LOSS).is_err());
        assert!(evaluate(-1.0, 1.0, PROFIT, LOSS).is_err());
    }

    #[test]
    fn test_negative_current_price_rejected() {
        assert!(evaluate(1.0, -0.01, PROFIT, LOSS).is_err());
    }

    #[test]
    fn test_realized_pnl_from_amounts() {
        let pnl = RealizedPnl::from_amounts(100.0, 106.0);
        assert!((pnl.absolute - 6.0).abs() < 1e-9);
        assert!((pnl.percentage - 6.0).abs() < 1e-9);

        let loss = RealizedPnl::from_amounts(100.0, 97.5);
        assert!((loss.absolute - (-2.5)).abs() < 1e-9);
        assert!((loss.percentage - (-2.5)).abs() < 1e-9);
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(format!("{}", ExitDecision::ProfitTarget), "PROFIT_TARGET");
        assert_eq!(format!("{}", ExitDecision::StopLoss), "STOP_LOSS");
        assert_eq!(format!("{}", ExitDecision::Hold), "HOLD");
    }
}
