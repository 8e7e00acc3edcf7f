//! Resilience helpers.
//!
//! # Design Decisions
//! - Retry loops back off exponentially with a small jitter
//! - Backoff state resets on the first success

pub mod backoff;

pub use backoff::{calculate_backoff, Backoff};
