//! Swap Executor Port - DEX Quote and Swap Interface
//!
//! Opaque quote-and-swap capability over gSwap pools. The receipt carries
//! the trade identifier synchronously, so the core never has to resolve
//! an exit trade by heuristic timestamp/amount matching.
//!
//! Same-asset swaps are a structural error: implementations must fail
//! fast with `InvalidPair` before any network call (`ensure_distinct_pair`
//! is provided for that guard).

use async_trait::async_trait;
use thiserror::Error;

/// Errors from quote/swap operations.
#[derive(Debug, Error)]
pub enum SwapError {
    /// `from` and `to` name the same asset. Structural guard, never retried.
    #[error("invalid pair: {asset} -> {asset}")]
    InvalidPair { asset: String },
    /// No quote could be produced for the pair.
    #[error("quote unavailable for {from} -> {to}: {reason}")]
    QuoteUnavailable {
        from: String,
        to: String,
        reason: String,
    },
    /// Swap execution failed (liquidity, network, slippage exceeded,
    /// timeout). Recoverable up to the retry cap.
    #[error("swap failed: {0}")]
    SwapFailed(String),
    /// Wallet does not hold enough of the input asset.
    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),
}

/// Fail fast on same-asset swaps before any network call.
pub fn ensure_distinct_pair(from: &str, to: &str) -> Result<(), SwapError> {
    if from == to {
        Err(SwapError::InvalidPair {
            asset: from.to_string(),
        })
    } else {
        Ok(())
    }
}

/// A quote for swapping `amount_in` of one asset into another.
#[derive(Debug, Clone)]
pub struct SwapQuote {
    /// Input asset identifier.
    pub from: String,
    /// Output asset identifier.
    pub to: String,
    /// Input amount quoted.
    pub amount_in: f64,
    /// Expected output before slippage.
    pub expected_output: f64,
    /// Pool fee tier in basis points.
    pub fee_bps: u32,
}

impl SwapQuote {
    /// Minimum acceptable output for a fractional slippage tolerance
    /// (0.01 = 1%).
    pub fn minimum_output(&self, slippage_tolerance: f64) -> f64 {
        self.expected_output * (1.0 - slippage_tolerance)
    }
}

/// Receipt of an executed (or simulated) swap.
#[derive(Debug, Clone)]
pub struct SwapReceipt {
    /// Trade/transaction identifier, assigned by the exchange. Carried
    /// synchronously so exit trades never need post-hoc matching.
    pub trade_id: String,
    /// Input asset identifier.
    pub from: String,
    /// Output asset identifier.
    pub to: String,
    /// Input amount spent.
    pub amount_in: f64,
    /// Output amount: actual in live mode, quoted in dry-run mode.
    pub amount_out: f64,
    /// Whether this receipt was simulated without touching balances.
    pub dry_run: bool,
    /// Execution timestamp (Unix ms).
    pub timestamp_ms: u64,
}

/// Trait for DEX swap providers.
///
/// Implementors wrap the exchange API and honor dry-run mode: when
/// active, `swap` returns a simulated receipt built from the quoted
/// output without mutating real balances.
#[async_trait]
pub trait SwapExecutor: Send + Sync + 'static {
    /// Quote an `from -> to` swap of `amount`.
    async fn quote(&self, from: &str, to: &str, amount: f64) -> Result<SwapQuote, SwapError>;

    /// Execute an `from -> to` swap of `amount`, rejecting fills below
    /// `minimum_output`.
    async fn swap(
        &self,
        from: &str,
        to: &str,
        amount: f64,
        minimum_output: f64,
    ) -> Result<SwapReceipt, SwapError>;

    /// Whether this executor simulates swaps instead of sending them.
    fn is_dry_run(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_asset_pair_rejected() {
        let err = ensure_distinct_pair("GALA|Unit|none|none", "GALA|Unit|none|none");
        assert!(matches!(err, Err(SwapError::InvalidPair { .. })));
    }

    #[test]
    fn test_distinct_pair_accepted() {
        assert!(ensure_distinct_pair("GALA|Unit|none|none", "GUSDC|Unit|none|none").is_ok());
    }

    #[test]
    fn test_minimum_output_applies_slippage() {
        let quote = SwapQuote {
            from: "GUSDC|Unit|none|none".to_string(),
            to: "GALA|Unit|none|none".to_string(),
            amount_in: 100.0,
            expected_output: 2000.0,
            fee_bps: 30,
        };
        assert!((quote.minimum_output(0.01) - 1980.0).abs() < 1e-9);
        assert_eq!(quote.minimum_output(0.0), 2000.0);
    }
}
