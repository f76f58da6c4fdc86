//! Domain layer - Core business logic and models.
//!
//! Pure position-lifecycle logic for the GALA buyback bot.
//! No I/O allowed here (hexagonal architecture inner ring).
//! All types are serializable and testable in isolation.

pub mod pnl;
pub mod position;

// Re-export core types for convenience
pub use pnl::{evaluate, ExitDecision, PnlError, PnlEvaluation, RealizedPnl};
pub use position::{Position, PositionId, PositionStatus};
