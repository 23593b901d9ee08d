//! Reference rigs with hand-checked geometry.
//!
//! Fixture construction panics on failure; these are test inputs only.

use std::f64::consts::FRAC_PI_6;

use arbor_skeleton::{BoneId, Effector, Skeleton};
use nalgebra::{UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// Single chains
// ---------------------------------------------------------------------------

/// `count` bones of equal `length` stacked along +Z, named `bone0..`.
///
/// Returns the skeleton and the bone ids base first.
pub fn straight_chain(count: usize, length: f64) -> (Skeleton, Vec<BoneId>) {
    let mut skeleton = Skeleton::new();
    let mut ids = Vec::with_capacity(count);
    let mut parent = None;
    for i in 0..count {
        let id = skeleton
            .add_bone(format!("bone{i}"), parent, length)
            .expect("fixture bone");
        ids.push(id);
        parent = Some(id);
    }
    (skeleton, ids)
}

/// [`straight_chain`] with a full-weight effector on the last bone.
pub fn reaching_chain(count: usize, length: f64, target: Vector3<f64>) -> (Skeleton, Vec<BoneId>) {
    let (mut skeleton, ids) = straight_chain(count, length);
    let tip = *ids.last().expect("chain has at least one bone");
    skeleton
        .attach_effector(tip, Effector::new(target))
        .expect("fixture effector");
    (skeleton, ids)
}

/// Three bones whose heads are offset from their parents' tails.
///
/// Lengths 1.0, 1.0, 0.5. The middle bone sits 0.3 along X from the root's
/// tail, the tip 0.2 along Y and 0.1 along Z from the middle bone's tail.
/// The tip carries a full-weight effector at `target`.
pub fn offset_chain(target: Vector3<f64>) -> (Skeleton, Vec<BoneId>) {
    let mut skeleton = Skeleton::new();
    let root = skeleton.add_bone("root", None, 1.0).expect("fixture bone");
    let mid = skeleton
        .add_bone("mid", Some(root), 1.0)
        .expect("fixture bone");
    let tip = skeleton.add_bone("tip", Some(mid), 0.5).expect("fixture bone");
    skeleton.bone_mut(mid).position = Vector3::new(0.3, 0.0, 0.0);
    skeleton.bone_mut(tip).position = Vector3::new(0.0, 0.2, 0.1);
    skeleton
        .attach_effector(tip, Effector::new(target))
        .expect("fixture effector");
    (skeleton, vec![root, mid, tip])
}

// ---------------------------------------------------------------------------
// Branching rig
// ---------------------------------------------------------------------------

/// A unit trunk splitting into two arms of two unit bones each.
#[derive(Debug, Clone)]
pub struct YRig {
    pub skeleton: Skeleton,
    pub trunk: BoneId,
    /// Base first. The base starts tilted 30 degrees towards +X.
    pub left: [BoneId; 2],
    /// Base first. The base starts tilted 30 degrees towards -X.
    pub right: [BoneId; 2],
}

impl YRig {
    pub const fn left_tip(&self) -> BoneId {
        self.left[1]
    }

    pub const fn right_tip(&self) -> BoneId {
        self.right[1]
    }
}

/// Build a [`YRig`] with full-weight effectors on both arm tips.
pub fn y_rig(left_target: Vector3<f64>, right_target: Vector3<f64>) -> YRig {
    let mut skeleton = Skeleton::new();
    let trunk = skeleton.add_bone("trunk", None, 1.0).expect("fixture bone");
    let left_upper = skeleton
        .add_bone("left_upper", Some(trunk), 1.0)
        .expect("fixture bone");
    let left_lower = skeleton
        .add_bone("left_lower", Some(left_upper), 1.0)
        .expect("fixture bone");
    let right_upper = skeleton
        .add_bone("right_upper", Some(trunk), 1.0)
        .expect("fixture bone");
    let right_lower = skeleton
        .add_bone("right_lower", Some(right_upper), 1.0)
        .expect("fixture bone");

    skeleton.bone_mut(left_upper).rotation =
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_6);
    skeleton.bone_mut(right_upper).rotation =
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -FRAC_PI_6);

    skeleton
        .attach_effector(left_lower, Effector::new(left_target))
        .expect("fixture effector");
    skeleton
        .attach_effector(right_lower, Effector::new(right_target))
        .expect("fixture effector");

    YRig {
        skeleton,
        trunk,
        left: [left_upper, left_lower],
        right: [right_upper, right_lower],
    }
}

// ---------------------------------------------------------------------------
// Measurements
// ---------------------------------------------------------------------------

/// Distance in skeleton space between the tail of `bone` and its effector
/// target.
///
/// # Panics
///
/// Panics if `bone` carries no effector.
pub fn tip_distance(skeleton: &Skeleton, bone: BoneId) -> f64 {
    let target = skeleton
        .bone(bone)
        .effector
        .as_ref()
        .expect("bone carries an effector")
        .target_position;
    (skeleton.global_tail(bone) - target).norm()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
