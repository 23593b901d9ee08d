//! Bone tree representation for the Arbor IK solvers.
//!
//! Provides the [`Skeleton`] arena of bones, transforms between bone frames,
//! [`Subtree`] selection of the bones a solver works on, and loading of TOML
//! rig descriptions.

pub mod error;
pub mod parser;
pub mod subtree;
pub mod transform;
pub mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use error::SkeletonError;
pub use parser::{parse_file, parse_string};
pub use subtree::Subtree;
pub use transform::face;
pub use types::{Bone, BoneId, Effector, EffectorFeatures, Pole, Skeleton};
