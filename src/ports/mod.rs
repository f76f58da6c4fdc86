//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires from
//! the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `PositionRepository`: position CRUD and status transitions
//! - `SwapExecutor`: quote + swap on the DEX, dry-run capable
//! - `PriceSource`: current price lookup per token
//! - `Notifier`: best-effort lifecycle event sink

pub mod notifier;
pub mod price_source;
pub mod repository;
pub mod swap;
