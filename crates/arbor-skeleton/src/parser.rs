//! TOML rig description parsing.
//!
//! A rig file lists bones parent-first:
//!
//! ```toml
//! [[bones]]
//! name = "upper_arm"
//! length = 0.3
//!
//! [[bones]]
//! name = "forearm"
//! parent = "upper_arm"
//! length = 0.25
//! position = [0.0, 0.0, 0.0]
//! rotation = [0.0, 0.0, 0.0, 1.0] # x, y, z, w
//!
//! [bones.effector]
//! target = [0.2, 0.0, 0.4]
//! weight = 1.0
//! weight_nlerp = false
//! ```

use std::path::Path;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::Deserialize;

use crate::error::SkeletonError;
use crate::types::{Effector, EffectorFeatures, Pole, Skeleton, ensure_finite};

// ---------------------------------------------------------------------------
// File schema
// ---------------------------------------------------------------------------

const fn default_length() -> f64 {
    1.0
}
const fn default_rotation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}
const fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RigFile {
    #[serde(default)]
    bones: Vec<BoneSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BoneSpec {
    name: String,
    parent: Option<String>,
    #[serde(default = "default_length")]
    length: f64,
    #[serde(default)]
    position: [f64; 3],
    #[serde(default = "default_rotation")]
    rotation: [f64; 4],
    effector: Option<EffectorSpec>,
    pole: Option<PoleSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EffectorSpec {
    target: [f64; 3],
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default)]
    weight_nlerp: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PoleSpec {
    #[serde(default)]
    angle: f64,
    #[serde(default)]
    target: [f64; 3],
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a rig file from disk into a [`Skeleton`].
pub fn parse_file(path: impl AsRef<Path>) -> Result<Skeleton, SkeletonError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| SkeletonError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_string(&content)
}

/// Parse a rig TOML string into a [`Skeleton`].
pub fn parse_string(content: &str) -> Result<Skeleton, SkeletonError> {
    let rig: RigFile = toml::from_str(content).map_err(|e| SkeletonError::Parse(e.to_string()))?;
    convert_rig(rig)
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn convert_rig(rig: RigFile) -> Result<Skeleton, SkeletonError> {
    let mut skeleton = Skeleton::new();

    for entry in rig.bones {
        let parent = match &entry.parent {
            Some(parent) => Some(skeleton.find(parent).ok_or_else(|| {
                SkeletonError::UnknownParent {
                    bone: entry.name.clone(),
                    parent: parent.clone(),
                }
            })?),
            None => None,
        };

        let rotation = convert_rotation(&entry.name, entry.rotation)?;
        let position = Vector3::from(entry.position);
        ensure_finite(&entry.name, "position", &position)?;
        let id = skeleton.add_bone(entry.name, parent, entry.length)?;
        {
            let bone = skeleton.bone_mut(id);
            bone.position = position;
            bone.rotation = rotation;
        }

        if let Some(eff) = entry.effector {
            skeleton.attach_effector(
                id,
                Effector {
                    target_position: Vector3::from(eff.target),
                    weight: eff.weight,
                    features: EffectorFeatures {
                        weight_nlerp: eff.weight_nlerp,
                    },
                },
            )?;
        }
        if let Some(pole) = entry.pole {
            skeleton.attach_pole(
                id,
                Pole {
                    angle: pole.angle,
                    target_position: Vector3::from(pole.target),
                },
            )?;
        }
    }

    Ok(skeleton)
}

/// `[x, y, z, w]` to a normalized rotation.
fn convert_rotation(bone: &str, xyzw: [f64; 4]) -> Result<UnitQuaternion<f64>, SkeletonError> {
    let [x, y, z, w] = xyzw;
    let q = Quaternion::new(w, x, y, z);
    if !q.norm().is_normal() {
        return Err(SkeletonError::Parse(format!(
            "bone {bone}: rotation must be a finite, non-zero quaternion"
        )));
    }
    Ok(UnitQuaternion::from_quaternion(q))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
