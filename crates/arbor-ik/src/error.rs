//! Error types for solver initialization.

use std::collections::TryReserveError;

use arbor_core::ConfigError;
use arbor_skeleton::{BoneId, SkeletonError};

/// Errors returned by [`FabrikSolver::init`](crate::FabrikSolver::init).
///
/// Solving itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum IkError {
    /// The subtree selection does not describe a valid part of the skeleton.
    #[error(transparent)]
    Skeleton(#[from] SkeletonError),

    /// The algorithm configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Neither a marked bone nor the subtree root carries an effector.
    #[error("subtree has no effectors")]
    NoEffectors,

    /// A leaf of the subtree has no effector attached.
    #[error("leaf bone {bone} ({name}) has no effector")]
    MissingEffector { bone: BoneId, name: String },

    /// Solver buffers could not be reserved.
    #[error("failed to allocate solver state: {0}")]
    Allocation(#[from] TryReserveError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
