//! Persistence Adapters - JSONL-based File Storage
//!
//! Implements the PositionRepository port using an append-only JSONL
//! log with last-write-wins replay. No database dependency —
//! lightweight and crash-recoverable.

pub mod positions;

pub use positions::JsonlPositionRepository;
