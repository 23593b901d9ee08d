//! Flat, order-stable list of the chains that end in an effector.

use std::collections::TryReserveError;

use arbor_skeleton::BoneId;

use crate::chain::{ChainId, ChainTree};

/// Every leaf chain of a [`ChainTree`], in discovery order.
///
/// Discovery is depth first: all child chains of a chain (recursively, in
/// child order) come before the chain itself, and only chains without
/// children are recorded. Index `i` here is index `i` of the solver's
/// target buffer.
#[derive(Debug, Clone, Default)]
pub struct EffectorRegistry {
    chains: Vec<ChainId>,
}

impl EffectorRegistry {
    /// Collect the leaf chains of `tree`.
    ///
    /// # Panics
    ///
    /// Panics if the number of chains found differs from `num_effectors`.
    pub fn discover(tree: &ChainTree, num_effectors: usize) -> Result<Self, TryReserveError> {
        let mut chains = Vec::new();
        chains.try_reserve_exact(num_effectors)?;
        collect(tree, ChainId::ROOT, &mut chains);
        assert_eq!(
            chains.len(),
            num_effectors,
            "effector chain count does not match the number of subtree leaves"
        );
        Ok(Self { chains })
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn chains(&self) -> &[ChainId] {
        &self.chains
    }

    /// Tip bones in registry order.
    pub fn tips<'a>(&'a self, tree: &'a ChainTree) -> impl Iterator<Item = BoneId> + 'a {
        self.chains.iter().map(|&chain| tree.tip(chain))
    }
}

fn collect(tree: &ChainTree, chain: ChainId, out: &mut Vec<ChainId>) {
    for &child in tree.children(chain) {
        collect(tree, child, out);
    }
    if tree.is_leaf(chain) {
        out.push(chain);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
