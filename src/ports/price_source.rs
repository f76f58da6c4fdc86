//! Price Source Port - Current Price Lookup
//!
//! Single-token spot price denominated in base-asset units. A failure
//! here is always transient: the monitoring cycle skips the position
//! without mutating it, and the buyback retry counter is untouched.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from price lookup.
#[derive(Debug, Error)]
pub enum PriceError {
    /// The source failed or returned no data for this token.
    #[error("price unavailable for {token}: {reason}")]
    Unavailable { token: String, reason: String },
}

/// Trait for spot price providers.
#[async_trait]
pub trait PriceSource: Send + Sync + 'static {
    /// Current price of `token_identifier` in base-asset units.
    ///
    /// # Errors
    /// Returns `PriceError::Unavailable` on any fetch failure; callers
    /// treat this as a skip-this-cycle condition.
    async fn current_price(&self, token_identifier: &str) -> Result<f64, PriceError>;
}
