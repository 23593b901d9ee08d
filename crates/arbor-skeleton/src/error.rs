//! Error types for skeleton construction, subtree selection and rig loading.

use std::path::PathBuf;

use crate::types::BoneId;

/// Errors that can occur while building or querying a skeleton.
#[derive(Debug, thiserror::Error)]
pub enum SkeletonError {
    /// Failed to read a rig file.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse rig TOML content.
    #[error("rig parse error: {0}")]
    Parse(String),

    /// A bone with this name already exists.
    #[error("duplicate bone: {0}")]
    DuplicateBone(String),

    /// No bone with this name exists.
    #[error("unknown bone: {0}")]
    UnknownBone(String),

    /// A bone names a parent that has not been declared before it.
    #[error("bone {bone} references unknown parent {parent}")]
    UnknownParent { bone: String, parent: String },

    /// A bone id does not index into the skeleton.
    #[error("bone id {0} out of range")]
    BoneOutOfRange(BoneId),

    /// Bone lengths must be finite and non-negative.
    #[error("invalid length for bone {bone}: {length}")]
    InvalidLength { bone: String, length: f64 },

    /// Effector weights must lie in `[0, 1]`.
    #[error("invalid effector weight for bone {bone}: {weight} (must be in [0, 1])")]
    InvalidWeight { bone: String, weight: f64 },

    /// Positions and targets must have finite coordinates.
    #[error("non-finite {field} for bone {bone}")]
    NonFinite { bone: String, field: &'static str },

    /// A bone selected for solving is not below the subtree root.
    #[error("bone {bone} is not a descendant of subtree root {root}")]
    NotInSubtree { bone: BoneId, root: BoneId },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
