//! Tree-shaped FABRIK inverse kinematics.
//!
//! Rotates the bones of a (possibly branching) [`Skeleton`] so that effector
//! bones reach towards their targets, using forward-reaching sweeps adapted
//! to skeletons with several end effectors.
//!
//! # Architecture
//!
//! ```text
//! Subtree ──► ChainTree ──► EffectorRegistry ──► targets (per solve)
//!                                                   │
//!                          bone rotations ◄── forward sweeps (per iteration)
//! ```
//!
//! A [`FabrikSolver`] is initialized once per subtree selection, splitting it
//! into chains. Each [`solve`](FabrikSolver::solve) then computes the
//! weighted effector targets and runs up to `max_iterations` sweeps from the
//! tips towards the base, averaging the demands of child chains at branch
//! points.
//!
//! [`Skeleton`]: arbor_skeleton::Skeleton

pub mod chain;
pub mod error;
pub mod forward;
pub mod poles;
pub mod registry;
pub mod solver;
pub mod targets;

#[cfg(feature = "bevy")]
pub mod plugin;

pub use chain::{ChainId, ChainTree};
pub use error::IkError;
pub use registry::EffectorRegistry;
pub use solver::{FABRIK_NAME, FabrikSolver, IkResult, IkSolver};
