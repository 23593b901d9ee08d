//! Shared test fixtures and utilities for Arbor crates.
//!
//! Provides small reference rigs with known geometry and a diagnostic sink
//! that records what a solver reported.

pub mod rigs;
pub mod sink;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use rigs::{YRig, offset_chain, reaching_chain, straight_chain, tip_distance, y_rig};
pub use sink::RecordingSink;
