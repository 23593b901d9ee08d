//! Forward-reaching sweep over a chain tree.
//!
//! Walks every chain from its tip to its base, turning each bone so that its
//! tail faces the working target, then moving the target to where that bone's
//! head would have to be. Branch tips turn the mean of their child chains'
//! heads towards the mean of what those chains ask for.
//!
//! The target is carried through each chain in the frame of the bone being
//! processed, "short" by that bone's parent length: a bone's offset
//! `position` is measured from its parent's tail, so the parent's length is
//! added at the start of the next step.

use arbor_skeleton::{BoneId, Skeleton, face};
use nalgebra::{UnitQuaternion, Vector3};

use crate::chain::{ChainId, ChainTree};

/// Run one sweep and return the anchor for a backward pass.
///
/// `targets` holds one target per effector chain, in registry order, in the
/// frame of the parent of the tree's base bone. The result is the base
/// bone's required head position reflected about its current position.
pub fn solve_forward(
    skeleton: &mut Skeleton,
    tree: &ChainTree,
    targets: &[Vector3<f64>],
) -> Vector3<f64> {
    let base = tree.base_bone();
    let frame = skeleton.bone(base).parent();
    let mut next = 0;
    let target = solve_chain(skeleton, tree, ChainId::ROOT, targets, &mut next, frame);
    debug_assert_eq!(next, targets.len());

    let base_pos = skeleton.bone(base).position;
    base_pos - (target - base_pos)
}

fn solve_chain(
    skeleton: &mut Skeleton,
    tree: &ChainTree,
    chain: ChainId,
    targets: &[Vector3<f64>],
    next: &mut usize,
    frame: Option<BoneId>,
) -> Vector3<f64> {
    let tip = tree.tip(chain);
    let children = tree.children(chain);

    // `head` is set for branch tips: where the child chains' heads sit on
    // average, in the tip's frame.
    let (target, head) = if children.is_empty() {
        let target = targets[*next];
        *next += 1;
        (skeleton.pos_global_to_local(target, frame, Some(tip)), None)
    } else {
        let mut sum = Vector3::zeros();
        let mut heads = Vector3::zeros();
        for &child in children {
            sum += solve_chain(skeleton, tree, child, targets, next, frame);
            heads += skeleton.bone(tree.base(child)).position;
        }
        let length = skeleton.bone(tip).length;
        (
            branch_target(sum, children.len(), length),
            Some(branch_target(heads, children.len(), length)),
        )
    };

    let delta = match head {
        Some(head) => face(&target) * face(&head).inverse(),
        None => face(&target),
    };
    post_rotate(&mut skeleton.bone_mut(tip).rotation, &delta);
    let undo = delta.inverse();
    for &child in children {
        pre_rotate(&undo, &mut skeleton.bone_mut(tree.base(child)).rotation);
    }

    let bone = skeleton.bone(tip);
    let mut target = match head {
        Some(head) => bone.rotation * (undo * target - head) + bone.position,
        None => {
            bone.rotation * Vector3::new(0.0, 0.0, target.norm() - bone.length) + bone.position
        }
    };

    for (parent_id, child_id) in tree.bone_pairs(chain) {
        let length = skeleton.bone(parent_id).length;
        target.z += length;

        // The child's head is not necessarily on this bone's axis.
        let child_head = skeleton.bone(child_id).position + Vector3::z() * length;
        let delta = face(&target) * face(&child_head).inverse();

        post_rotate(&mut skeleton.bone_mut(parent_id).rotation, &delta);
        pre_rotate(&delta.inverse(), &mut skeleton.bone_mut(child_id).rotation);

        let bone = skeleton.bone(parent_id);
        target = bone.rotation * (delta.inverse() * target - child_head) + bone.position;
    }

    target
}

/// Mean of `count` points given relative to a branch tip's tail, moved into
/// the tip's frame.
///
/// Used for both the child chains' required heads and their current heads.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn branch_target(sum: Vector3<f64>, count: usize, tip_length: f64) -> Vector3<f64> {
    sum / count as f64 + Vector3::z() * tip_length
}

/// `rotation = rotation * delta`, in the bone's own frame.
fn post_rotate(rotation: &mut UnitQuaternion<f64>, delta: &UnitQuaternion<f64>) {
    *rotation *= delta;
    rotation.renormalize_fast();
}

/// `rotation = delta * rotation`, in the parent's frame.
fn pre_rotate(delta: &UnitQuaternion<f64>, rotation: &mut UnitQuaternion<f64>) {
    *rotation = delta * *rotation;
    rotation.renormalize_fast();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
