//! Selection of the bones a solver works on.
//!
//! A [`Subtree`] is a root bone plus a set of marked bones below it. Its
//! members are the root, the marked bones, and every bone on the paths
//! between them. Leaves are members with no member children; those are the
//! bones a solver treats as end effectors.

use std::collections::BTreeSet;

use crate::error::SkeletonError;
use crate::types::{BoneId, Skeleton};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtree {
    root: BoneId,
    marked: BTreeSet<BoneId>,
}

impl Subtree {
    /// Empty selection rooted at `root`.
    pub fn new(root: BoneId) -> Self {
        Self {
            root,
            marked: BTreeSet::new(),
        }
    }

    /// Select every bone below `root` (inclusive) that carries an effector.
    pub fn from_effectors(skeleton: &Skeleton, root: BoneId) -> Self {
        let marked = skeleton
            .iter()
            .filter(|(id, bone)| bone.effector.is_some() && skeleton.is_ancestor_or_self(root, *id))
            .map(|(id, _)| id)
            .collect();
        Self { root, marked }
    }

    /// Mark `bone` as an end of the selection.
    pub fn mark(&mut self, bone: BoneId) -> &mut Self {
        self.marked.insert(bone);
        self
    }

    pub const fn root(&self) -> BoneId {
        self.root
    }

    pub fn marked(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.marked.iter().copied()
    }

    /// Membership mask indexed by [`BoneId::index`].
    ///
    /// # Errors
    ///
    /// Fails if the root or a marked bone is not in `skeleton`, or if a
    /// marked bone is not below the root.
    pub fn members(&self, skeleton: &Skeleton) -> Result<Vec<bool>, SkeletonError> {
        skeleton.try_bone(self.root)?;

        let mut mask = vec![false; skeleton.len()];
        mask[self.root.index()] = true;

        for &bone in &self.marked {
            skeleton.try_bone(bone)?;
            if !skeleton.is_ancestor_or_self(self.root, bone) {
                return Err(SkeletonError::NotInSubtree {
                    bone,
                    root: self.root,
                });
            }
            // The root is already set, so this stops at the latest there.
            let mut current = bone;
            while !mask[current.index()] {
                mask[current.index()] = true;
                match skeleton.bone(current).parent() {
                    Some(parent) => current = parent,
                    None => break,
                }
            }
        }
        Ok(mask)
    }

    /// Members without member children, in depth-first child order.
    pub fn leaves(&self, skeleton: &Skeleton) -> Result<Vec<BoneId>, SkeletonError> {
        let mask = self.members(skeleton)?;
        let mut leaves = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let children: Vec<BoneId> = skeleton
                .bone(id)
                .children()
                .iter()
                .copied()
                .filter(|c| mask[c.index()])
                .collect();
            if children.is_empty() {
                leaves.push(id);
            }
            stack.extend(children.into_iter().rev());
        }
        Ok(leaves)
    }

    /// Number of leaves, i.e. the number of effector chains a solver builds.
    pub fn leaf_count(&self, skeleton: &Skeleton) -> Result<usize, SkeletonError> {
        self.leaves(skeleton).map(|leaves| leaves.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
