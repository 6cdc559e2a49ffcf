//! fleet-select: candidate selection for the fleet load balancer.
//!
//! A [`SelectionStrategy`] holds a sorted, deduplicated candidate set and
//! picks one candidate per call under a fixed [`SelectionPolicy`]:
//!
//! ```text
//! Random      uniform pick, independent across calls
//! RoundRobin  ascending order, cursor advances by one per call
//! ```
//!
//! Sorting on every update gives round-robin an order that does not
//! depend on registration order, and lets the cursor be wrapped back
//! into range when the set shrinks.

pub mod error;
pub mod strategy;

pub use error::{SelectError, SelectResult};
pub use strategy::{SelectionPolicy, SelectionStrategy};
