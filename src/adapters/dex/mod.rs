//! DEX Adapters - gSwap REST API Client
//!
//! Implements the SwapExecutor and PriceSource ports against the gSwap
//! backend. Dry-run mode simulates swaps from quotes without touching
//! real balances.

pub mod gswap;

pub use gswap::{GSwapClient, GSwapClientConfig};
