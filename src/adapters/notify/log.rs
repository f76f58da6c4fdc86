//! Log Notifier - Tracing-only Event Sink
//!
//! Fallback sink used when no webhook is configured.

use async_trait::async_trait;
use tracing::info;

use crate::domain::position::Position;
use crate::ports::notifier::{BuybackNotification, Notifier};

/// Emits lifecycle events as structured log lines.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_opened(&self, position: &Position) -> anyhow::Result<()> {
        info!(
            position_id = %position.id,
            pair = %position.pair_symbol,
            strategy = %position.strategy,
            entry_price = position.entry_price,
            entry_amount = position.entry_amount,
            "EVENT position opened"
        );
        Ok(())
    }

    async fn notify_buyback(
        &self,
        position: &Position,
        outcome: &BuybackNotification,
    ) -> anyhow::Result<()> {
        info!(
            position_id = %position.id,
            pair = %position.pair_symbol,
            trigger = %outcome.trigger,
            success = outcome.success,
            terminal = outcome.terminal,
            final_base_amount = outcome.final_base_amount,
            realized_pnl_pct = outcome.realized_pnl_pct,
            error = outcome.error.as_deref(),
            "EVENT buyback finished"
        );
        Ok(())
    }
}
