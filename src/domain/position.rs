//! Position model - one "sell base, hold token, wait for exit" cycle.
//!
//! A position is created immediately after a successful entry swap and is
//! mutated only by the buyback executor (status, close metadata, retry
//! bookkeeping, notes) until it reaches a terminal state. Terminal
//! positions are retained for audit, never deleted.
//!
//! Invariants:
//! - `Closed` ⟺ `close_trade_id` and `closed_at` are set.
//! - `Failed` ⟺ retry cap reached; the position is no longer monitored.
//! - `retry_count` only increases, and only while `Open`.
//! - `entry_price`, `entry_amount`, `token_amount` are immutable after
//!   creation and strictly positive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lightweight position identifier used at the ports boundary.
pub type PositionId = String;

/// Lifecycle status of a position.
///
/// `Closed` and `Failed` are terminal: no transitions leave them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    /// Entry swap succeeded; position is monitored every cycle.
    Open,
    /// Buyback succeeded; exit trade recorded.
    Closed,
    /// Buyback failed `max_retries` times; monitoring stopped.
    Failed,
}

impl PositionStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

impl std::fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// An open "sell base, hold token, wait for exit" cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Unique identifier, assigned by the repository at creation.
    pub id: PositionId,
    /// Strategy that opened the position (free-form tag, e.g. "dca").
    pub strategy: String,
    /// Human-readable pair label (e.g. "GALA/GUSDC").
    pub pair_symbol: String,
    /// Ticker of the held (non-base) token.
    pub token_symbol: String,
    /// GalaChain composite key of the held token
    /// (e.g. "GUSDC|Unit|none|none").
    pub token_identifier: String,
    /// Trade that opened the position.
    pub entry_trade_id: String,
    /// Price of the held token in base-asset units at entry. Always > 0.
    pub entry_price: f64,
    /// Base asset spent to open the position. Always > 0.
    pub entry_amount: f64,
    /// Held token received at entry. Always > 0.
    pub token_amount: f64,
    /// Fractional profit trigger (0.05 = +5%).
    pub profit_threshold: f64,
    /// Fractional loss trigger, negative (-0.02 = -2%).
    pub loss_threshold: f64,
    /// Lifecycle status.
    pub status: PositionStatus,
    /// Exit trade reference; set only when `Closed`. May be `None` when the
    /// exit succeeded but the trade id could not be resolved — closing takes
    /// priority over complete audit linkage.
    pub close_trade_id: Option<String>,
    /// Failed buyback attempts so far. Monotone while `Open`.
    pub retry_count: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Close timestamp; set only when terminal.
    pub closed_at: Option<DateTime<Utc>>,
    /// Append-only audit trail.
    pub notes: Vec<String>,
}

impl Position {
    /// Whether this position has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether this position is still monitored.
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_open() -> Position {
        Position {
            id: "pos-1".to_string(),
            strategy: "dca".to_string(),
            pair_symbol: "GALA/GUSDC".to_string(),
            token_symbol: "GUSDC".to_string(),
            token_identifier: "GUSDC|Unit|none|none".to_string(),
            entry_trade_id: "trade-entry-1".to_string(),
            entry_price: 0.05,
            entry_amount: 100.0,
            token_amount: 2000.0,
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
    fn test_open_is_not_terminal() {
        let pos = sample_open();
        assert!(pos.is_open());
        assert!(!pos.is_terminal());
    }

    #[test]
    fn test_closed_and_failed_are_terminal() {
        assert!(PositionStatus::Closed.is_terminal());
        assert!(PositionStatus::Failed.is_terminal());
        assert!(!PositionStatus::Open.is_terminal());
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&PositionStatus::Open).unwrap();
        assert_eq!(json, "\"OPEN\"");
        let json = serde_json::to_string(&PositionStatus::Closed).unwrap();
        assert_eq!(json, "\"CLOSED\"");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(format!("{}", PositionStatus::Failed), "FAILED");
    }
}
