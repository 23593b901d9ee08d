//! Per-solve effector target computation.
//!
//! Targets are stored in the frame of the parent of the tree's base bone.
//! Nothing the solver moves affects that frame, so the targets stay valid
//! for every iteration of one solve.

use arbor_skeleton::{Effector, Skeleton};
use nalgebra::Vector3;

use crate::chain::{ChainId, ChainTree};
use crate::registry::EffectorRegistry;

/// Fill `out` with one target per registered effector chain.
///
/// `out` must already hold one slot per chain.
pub fn compute_targets(
    skeleton: &Skeleton,
    tree: &ChainTree,
    registry: &EffectorRegistry,
    out: &mut [Vector3<f64>],
) {
    debug_assert_eq!(out.len(), registry.len());
    for (slot, &chain) in out.iter_mut().zip(registry.chains()) {
        *slot = effector_target(skeleton, tree, chain);
    }
}

/// Effective target of the effector at the tip of `chain`.
///
/// Blends from the tip's current tail position to the effector target by
/// the effector weight. A tip whose effector has been removed holds its
/// position.
pub fn effector_target(skeleton: &Skeleton, tree: &ChainTree, chain: ChainId) -> Vector3<f64> {
    let frame = skeleton.bone(tree.base_bone()).parent();
    let tip = tree.tip(chain);
    let tip_bone = skeleton.bone(tip);
    let tip_pos = skeleton.pos_local_to_global(tip_bone.tail(), Some(tip), frame);

    let Some(effector) = tip_bone.effector.as_ref() else {
        return tip_pos;
    };

    let goal = skeleton.pos_global_to_local(effector.target_position, None, frame);
    let target = tip_pos + (goal - tip_pos) * effector.weight;

    if effector.features.weight_nlerp {
        nlerp_around_subbase(skeleton, tree, chain, effector, target)
    } else {
        target
    }
}

/// Rescale `target` around the base bone of `chain` so its distance from
/// there blends the effector's and the tip's distances by weight.
fn nlerp_around_subbase(
    skeleton: &Skeleton,
    tree: &ChainTree,
    chain: ChainId,
    effector: &Effector,
    target: Vector3<f64>,
) -> Vector3<f64> {
    let frame = skeleton.bone(tree.base_bone()).parent();
    let subbase = Some(tree.base(chain));
    let tip = tree.tip(chain);

    let to_tip = skeleton.pos_local_to_global(skeleton.bone(tip).tail(), Some(tip), subbase);
    let to_goal = skeleton.pos_global_to_local(effector.target_position, None, subbase);
    let distance =
        to_goal.norm() * effector.weight + to_tip.norm() * (1.0 - effector.weight);

    let local = skeleton.pos_global_to_local(target, frame, subbase);
    let scaled = local.try_normalize(0.0).map_or(local, |dir| dir * distance);
    skeleton.pos_local_to_global(scaled, subbase, frame)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
