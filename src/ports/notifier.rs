//! Notifier Port - Lifecycle Event Broadcast
//!
//! Best-effort sink for position lifecycle events. Delivery failures are
//! logged by the caller and swallowed: a notification must never roll
//! back or block a position transition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::position::Position;

/// Outcome summary attached to a buyback notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuybackNotification {
    /// Whether the exit swap succeeded.
    pub success: bool,
    /// Whether the position reached a terminal state (`Closed`/`Failed`).
    pub terminal: bool,
    /// What triggered the exit ("PROFIT_TARGET" / "STOP_LOSS" / "MANUAL").
    pub trigger: String,
    /// Base asset recovered, when the swap succeeded.
    pub final_base_amount: Option<f64>,
    /// Realized PnL percentage, when the swap succeeded.
    pub realized_pnl_pct: Option<f64>,
    /// Failure description, when the swap failed.
    pub error: Option<String>,
}

/// Trait for lifecycle event sinks.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// A position was opened by an entry swap.
    async fn notify_opened(&self, position: &Position) -> anyhow::Result<()>;

    /// A buyback attempt finished (success, scheduled retry, or terminal
    /// failure).
    async fn notify_buyback(
        &self,
        position: &Position,
        outcome: &BuybackNotification,
    ) -> anyhow::Result<()>;
}
