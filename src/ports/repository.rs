//! Position Repository Port - Persistence Interface
//!
//! CRUD over position records plus the status transitions of the
//! lifecycle state machine. All operations are atomic per-call; the core
//! performs no locking of its own and treats `NotFound`/`Storage` as
//! recoverable-but-loggable per-position conditions.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::position::{Position, PositionId};

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The position does not exist, or is not in the state the operation
    /// requires (e.g. closing an already-terminal position).
    #[error("position not found or not open: {0}")]
    NotFound(PositionId),
    /// I/O failure in the underlying store.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Data for a new position. The repository assigns the id and stamps
/// `created_at`; the record starts `Open` with `retry_count = 0`.
#[derive(Debug, Clone)]
pub struct NewPosition {
    pub strategy: String,
    pub pair_symbol: String,
    pub token_symbol: String,
    pub token_identifier: String,
    pub entry_trade_id: String,
    pub entry_price: f64,
    pub entry_amount: f64,
    pub token_amount: f64,
    pub profit_threshold: f64,
    pub loss_threshold: f64,
}

impl NewPosition {
    /// Validate entry invariants before insertion.
    ///
    /// # Errors
    /// Returns `Storage` with a description when entry price/amounts are
    /// non-positive or the thresholds do not straddle zero.
    pub fn validate(&self) -> Result<(), RepositoryError> {
        let ok = self.entry_price > 0.0
            && self.entry_amount > 0.0
            && self.token_amount > 0.0
            && self.profit_threshold > 0.0
            && self.loss_threshold < 0.0;
        if ok {
            Ok(())
        } else {
            Err(RepositoryError::Storage(format!(
                "invalid position data: entry_price={}, entry_amount={}, token_amount={}, \
                  profit_threshold={}, loss_threshold={}",
                self.entry_price,
                self.entry_amount,
                self.token_amount,
                self.profit_threshold,
                self.loss_threshold
            )))
        }
    }
}

/// Trait for position persistence providers.
///
/// Implementors must serialize writes per position id so that the
/// evaluate-then-act sequence of a monitoring cycle never observes a
/// torn record.
#[async_trait]
pub trait PositionRepository: Send + Sync + 'static {
    /// Insert a new `Open` position and return the stored record.
    async fn create_position(&self, data: NewPosition) -> Result<Position, RepositoryError>;

    /// Fetch a single position by id.
    async fn get_position(&self, id: &PositionId) -> Result<Position, RepositoryError>;

    /// All positions with `status = Open`, optionally filtered by strategy.
    async fn get_open_positions(
        &self,
        strategy_filter: Option<&str>,
    ) -> Result<Vec<Position>, RepositoryError>;

    /// Transition `Open` -> `Closed`, setting `close_trade_id` and
    /// `closed_at` and appending a note.
    ///
    /// # Errors
    /// `NotFound` if the position does not exist or is not `Open`.
    async fn close_position(
        &self,
        id: &PositionId,
        close_trade_id: Option<String>,
        note: String,
    ) -> Result<(), RepositoryError>;

    /// Record a failed buyback attempt while remaining `Open`.
    ///
    /// `new_retry_count` must be strictly greater than the stored count.
    async fn update_retry(
        &self,
        id: &PositionId,
        new_retry_count: u32,
        note: String,
    ) -> Result<(), RepositoryError>;

    /// Transition `Open` -> `Failed` (terminal, stops monitoring),
    /// persisting the final retry count alongside the reason.
    ///
    /// `final_retry_count` must be at least the stored count; a `Failed`
    /// record always carries the count that exhausted the cap.
    async fn mark_failed(
        &self,
        id: &PositionId,
        final_retry_count: u32,
        reason: String,
    ) -> Result<(), RepositoryError>;
}
