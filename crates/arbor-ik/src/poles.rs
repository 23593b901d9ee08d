//! Static check for poles attached where no solver will read them.

use arbor_core::{Diagnostic, DiagnosticSink};
use arbor_skeleton::Skeleton;

use crate::chain::{ChainId, ChainTree};

/// Report every pole that is not on its chain's tip bone.
///
/// Emits one [`Diagnostic::MisplacedPole`] per offending bone and, if there
/// were any, one [`Diagnostic::MisplacedPoleSummary`]. Returns the number
/// of misplaced poles.
pub fn validate_poles(tree: &ChainTree, skeleton: &Skeleton, sink: &dyn DiagnosticSink) -> usize {
    let count = scan_chain(tree, ChainId::ROOT, skeleton, sink);
    if count > 0 {
        sink.emit(&Diagnostic::MisplacedPoleSummary { count });
    }
    count
}

fn scan_chain(
    tree: &ChainTree,
    chain: ChainId,
    skeleton: &Skeleton,
    sink: &dyn DiagnosticSink,
) -> usize {
    let tip = tree.tip(chain);
    let mut count = 0;
    for &id in tree.bones(chain) {
        let bone = skeleton.bone(id);
        if id != tip && bone.pole.is_some() {
            sink.emit(&Diagnostic::MisplacedPole {
                bone: id.index(),
                name: bone.name().to_string(),
            });
            count += 1;
        }
    }
    for &child in tree.children(chain) {
        count += scan_chain(tree, child, skeleton, sink);
    }
    count
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
