//! Decomposition of a skeleton subtree into chains.
//!
//! A chain is a run of bones in which every bone but the last has exactly
//! one member child. The last bone, the chain's tip, is either a leaf of the
//! subtree or a branch point whose member children each start a child
//! chain. Every member bone belongs to exactly one chain.
//!
//! Chains live in a flat arena indexed by [`ChainId`]; the root chain is
//! [`ChainId::ROOT`]. Bones are stored once, in one contiguous list, and each
//! chain refers to its slice of it.

use std::ops::Range;

use arbor_skeleton::{BoneId, Skeleton, Subtree};

use crate::error::IkError;

/// Index of a chain inside its [`ChainTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub usize);

impl ChainId {
    /// The chain starting at the subtree root.
    pub const ROOT: Self = Self(0);
}

#[derive(Debug, Clone)]
struct ChainNode {
    /// Slice of [`ChainTree::bones`], base first.
    bones: Range<usize>,
    children: Vec<ChainId>,
}

/// Tree of chains covering a [`Subtree`].
#[derive(Debug, Clone)]
pub struct ChainTree {
    bones: Vec<BoneId>,
    nodes: Vec<ChainNode>,
    leaf_count: usize,
}

impl ChainTree {
    /// Split the members of `subtree` into chains.
    ///
    /// # Errors
    ///
    /// Fails if the subtree is malformed, if no effector is selected, if a
    /// leaf bone carries no effector, or if the arena cannot be reserved.
    /// Nothing is retained on failure.
    pub fn build(skeleton: &Skeleton, subtree: &Subtree) -> Result<Self, IkError> {
        let mask = subtree.members(skeleton)?;
        let root = subtree.root();
        if subtree.marked().next().is_none() && skeleton.bone(root).effector.is_none() {
            return Err(IkError::NoEffectors);
        }

        // One chain for the root plus one per member child of each branch point.
        let mut bone_count = 0;
        let mut chain_count = 1;
        for (id, _) in skeleton.iter().filter(|(id, _)| mask[id.index()]) {
            bone_count += 1;
            let children = member_children(skeleton, &mask, id).count();
            if children > 1 {
                chain_count += children;
            }
        }

        let mut tree = Self {
            bones: Vec::new(),
            nodes: Vec::new(),
            leaf_count: 0,
        };
        tree.bones.try_reserve_exact(bone_count)?;
        tree.nodes.try_reserve_exact(chain_count)?;
        tree.build_chain(skeleton, &mask, root)?;

        debug_assert_eq!(tree.bones.len(), bone_count);
        debug_assert_eq!(tree.nodes.len(), chain_count);
        Ok(tree)
    }

    fn build_chain(
        &mut self,
        skeleton: &Skeleton,
        mask: &[bool],
        base: BoneId,
    ) -> Result<ChainId, IkError> {
        let id = ChainId(self.nodes.len());
        let start = self.bones.len();
        self.nodes.push(ChainNode {
            bones: start..start,
            children: Vec::new(),
        });

        let mut tip = base;
        loop {
            self.bones.push(tip);
            let mut children = member_children(skeleton, mask, tip);
            match (children.next(), children.next()) {
                (Some(only), None) => tip = only,
                _ => break,
            }
        }
        self.nodes[id.0].bones = start..self.bones.len();

        let branches = member_children(skeleton, mask, tip).count();
        if branches == 0 {
            let bone = skeleton.bone(tip);
            if bone.effector.is_none() {
                return Err(IkError::MissingEffector {
                    bone: tip,
                    name: bone.name().to_string(),
                });
            }
            self.leaf_count += 1;
            return Ok(id);
        }

        let mut children = Vec::new();
        children.try_reserve_exact(branches)?;
        for child in member_children(skeleton, mask, tip) {
            children.push(self.build_chain(skeleton, mask, child)?);
        }
        self.nodes[id.0].children = children;
        Ok(id)
    }

    /// Number of chains, including the root chain.
    pub fn chain_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of chains without children.
    pub const fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Number of bones over all chains.
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Bones of `chain`, base first. Never empty.
    pub fn bones(&self, chain: ChainId) -> &[BoneId] {
        &self.bones[self.nodes[chain.0].bones.clone()]
    }

    pub fn base(&self, chain: ChainId) -> BoneId {
        self.bones[self.nodes[chain.0].bones.start]
    }

    pub fn tip(&self, chain: ChainId) -> BoneId {
        self.bones[self.nodes[chain.0].bones.end - 1]
    }

    /// Child chains in the skeleton's child order.
    pub fn children(&self, chain: ChainId) -> &[ChainId] {
        &self.nodes[chain.0].children
    }

    pub fn is_leaf(&self, chain: ChainId) -> bool {
        self.nodes[chain.0].children.is_empty()
    }

    /// Base bone of the whole tree, i.e. the subtree root.
    pub fn base_bone(&self) -> BoneId {
        self.base(ChainId::ROOT)
    }

    /// Adjacent `(bone, child)` pairs of `chain`, walking from the tip
    /// towards the base.
    pub fn bone_pairs(&self, chain: ChainId) -> impl Iterator<Item = (BoneId, BoneId)> + '_ {
        self.bones(chain).windows(2).rev().map(|pair| (pair[0], pair[1]))
    }

    /// Every bone, per chain tip to base, then the child chains.
    pub fn for_each_bone(&self, mut visit: impl FnMut(ChainId, BoneId)) {
        self.for_each_bone_in(ChainId::ROOT, &mut visit);
    }

    fn for_each_bone_in(&self, chain: ChainId, visit: &mut impl FnMut(ChainId, BoneId)) {
        for &bone in self.bones(chain).iter().rev() {
            visit(chain, bone);
        }
        for &child in self.children(chain) {
            self.for_each_bone_in(child, visit);
        }
    }
}

fn member_children<'a>(
    skeleton: &'a Skeleton,
    mask: &'a [bool],
    bone: BoneId,
) -> impl Iterator<Item = BoneId> + 'a {
    skeleton
        .bone(bone)
        .children()
        .iter()
        .copied()
        .filter(move |child| mask[child.index()])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
