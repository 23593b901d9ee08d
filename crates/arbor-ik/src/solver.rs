//! FABRIK solver facade: initialization, iteration, and read-only visitors.

use std::fmt;
use std::sync::Arc;

use arbor_core::{AlgorithmConfig, Diagnostic, DiagnosticSink, TracingSink};
use arbor_skeleton::{Bone, BoneId, Skeleton, Subtree};
use nalgebra::Vector3;

use crate::chain::{ChainId, ChainTree};
use crate::error::IkError;
use crate::forward::solve_forward;
use crate::poles::validate_poles;
use crate::registry::EffectorRegistry;
use crate::targets::compute_targets;

/// Name under which [`FabrikSolver`] registers as an [`IkSolver`].
pub const FABRIK_NAME: &str = "fabrik";

// ---------------------------------------------------------------------------
// IkResult / IkSolver
// ---------------------------------------------------------------------------

/// Outcome of one [`IkSolver::solve`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkResult {
    /// Number of forward sweeps performed.
    pub iterations: u32,
    /// Whether every effector tip ended within tolerance of its target.
    pub converged: bool,
    /// Anchor for a backward pass, from the last sweep. `None` if no sweep
    /// ran.
    pub backward_target: Option<Vector3<f64>>,
}

/// Common interface of the IK solvers.
pub trait IkSolver: Send + Sync {
    /// Registered solver name.
    fn name(&self) -> &'static str;

    /// Number of end effectors the solver drives.
    fn num_effectors(&self) -> usize;

    /// Rotate the bones of `skeleton` towards the effector targets.
    fn solve(&mut self, skeleton: &mut Skeleton) -> IkResult;

    /// Visit every bone the solver works on.
    fn visit_bones(&self, skeleton: &Skeleton, visit: &mut dyn FnMut(BoneId, &Bone));

    /// Visit the tip bone of every effector chain.
    fn visit_effectors(&self, skeleton: &Skeleton, visit: &mut dyn FnMut(BoneId, &Bone));
}

// ---------------------------------------------------------------------------
// FabrikSolver
// ---------------------------------------------------------------------------

/// Tree-aware FABRIK solver bound to one subtree of one skeleton.
///
/// Built once per subtree selection and reused across solves. Every call
/// that takes a [`Skeleton`] must receive the skeleton the solver was
/// initialized with, with unchanged topology.
pub struct FabrikSolver {
    config: AlgorithmConfig,
    tree: ChainTree,
    registry: EffectorRegistry,
    /// One per effector chain, refreshed at the start of every solve.
    targets: Vec<Vector3<f64>>,
    /// Bone count of the skeleton seen by `init`.
    skeleton_len: usize,
    sink: Arc<dyn DiagnosticSink>,
}

impl FabrikSolver {
    /// Build solver state for `subtree`, reporting through `sink`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration, a malformed subtree, a leaf
    /// without an effector, or if solver buffers cannot be reserved.
    ///
    /// # Panics
    ///
    /// Panics if chain discovery and the subtree disagree on the number of
    /// effectors, which indicates a bug in chain construction.
    pub fn init(
        skeleton: &Skeleton,
        subtree: &Subtree,
        config: AlgorithmConfig,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, IkError> {
        config.validate()?;

        let num_effectors = subtree.leaf_count(skeleton)?;
        let tree = ChainTree::build(skeleton, subtree)?;
        let registry = EffectorRegistry::discover(&tree, num_effectors)?;

        let mut targets = Vec::new();
        targets.try_reserve_exact(num_effectors)?;
        targets.resize(num_effectors, Vector3::zeros());

        report_ignored_effectors(&tree, skeleton, sink.as_ref());
        validate_poles(&tree, skeleton, sink.as_ref());
        if config.constraints {
            tracing::debug!("FABRIK: constraints requested; no constraint layer is available");
        }
        sink.emit(&Diagnostic::Initialized {
            effectors: num_effectors,
            chains: tree.chain_count(),
        });

        Ok(Self {
            config,
            tree,
            registry,
            targets,
            skeleton_len: skeleton.len(),
            sink,
        })
    }

    /// [`init`](Self::init) with diagnostics going to `tracing`.
    pub fn new(
        skeleton: &Skeleton,
        subtree: &Subtree,
        config: AlgorithmConfig,
    ) -> Result<Self, IkError> {
        Self::init(skeleton, subtree, config, Arc::new(TracingSink))
    }

    /// Release all solver state.
    pub fn deinit(self) {
        self.sink.emit(&Diagnostic::Released {
            effectors: self.registry.len(),
        });
    }

    /// Run up to `max_iterations` forward sweeps.
    ///
    /// Targets are computed once up front. With
    /// [`AlgorithmConfig::stop_on_convergence`] set, iteration ends as soon
    /// as every tip is within tolerance.
    ///
    /// # Panics
    ///
    /// Panics if `skeleton` is not the skeleton the solver was initialized
    /// with (its bone count differs).
    pub fn solve(&mut self, skeleton: &mut Skeleton) -> IkResult {
        self.check_skeleton(skeleton);
        compute_targets(skeleton, &self.tree, &self.registry, &mut self.targets);

        let mut result = IkResult {
            iterations: 0,
            converged: false,
            backward_target: None,
        };
        while result.iterations < self.config.max_iterations {
            result.backward_target = Some(solve_forward(skeleton, &self.tree, &self.targets));
            result.iterations += 1;
            tracing::trace!(iteration = result.iterations, "FABRIK forward sweep");

            if self.config.stop_on_convergence && self.within_tolerance(skeleton) {
                result.converged = true;
                break;
            }
        }
        if !result.converged {
            result.converged = self.within_tolerance(skeleton);
        }

        tracing::trace!(
            iterations = result.iterations,
            converged = result.converged,
            "FABRIK solve finished"
        );
        result
    }

    /// # Panics
    ///
    /// Panics if `skeleton` does not have the bone count seen by `init`.
    fn check_skeleton(&self, skeleton: &Skeleton) {
        assert_eq!(
            skeleton.len(),
            self.skeleton_len,
            "FABRIK solver used with a different skeleton than it was initialized with"
        );
    }

    fn within_tolerance(&self, skeleton: &Skeleton) -> bool {
        let frame = skeleton.bone(self.tree.base_bone()).parent();
        let tolerance_sq = self.config.tolerance_squared();
        self.registry
            .tips(&self.tree)
            .zip(&self.targets)
            .all(|(tip, target)| {
                let tail = skeleton.pos_local_to_global(skeleton.bone(tip).tail(), Some(tip), frame);
                (tail - target).norm_squared() <= tolerance_sq
            })
    }

    /// Every bone of the chain tree, per chain tip to base, then child
    /// chains in child order.
    pub fn visit_bones(&self, skeleton: &Skeleton, mut visit: impl FnMut(BoneId, &Bone)) {
        self.check_skeleton(skeleton);
        self.tree
            .for_each_bone(|_, id| visit(id, skeleton.bone(id)));
    }

    /// The tip bone of every effector chain, in registry order.
    pub fn visit_effectors(&self, skeleton: &Skeleton, mut visit: impl FnMut(BoneId, &Bone)) {
        self.check_skeleton(skeleton);
        for tip in self.registry.tips(&self.tree) {
            visit(tip, skeleton.bone(tip));
        }
    }

    pub fn num_effectors(&self) -> usize {
        self.registry.len()
    }

    pub const fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    pub const fn chain_tree(&self) -> &ChainTree {
        &self.tree
    }

    /// Effector chains in registry order.
    pub fn effector_chains(&self) -> &[ChainId] {
        self.registry.chains()
    }

    /// Targets used by the most recent solve, in the frame of the parent of
    /// the base bone. Zero before the first solve.
    pub fn targets(&self) -> &[Vector3<f64>] {
        &self.targets
    }
}

impl fmt::Debug for FabrikSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FabrikSolver")
            .field("config", &self.config)
            .field("tree", &self.tree)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl IkSolver for FabrikSolver {
    fn name(&self) -> &'static str {
        FABRIK_NAME
    }

    fn num_effectors(&self) -> usize {
        Self::num_effectors(self)
    }

    fn solve(&mut self, skeleton: &mut Skeleton) -> IkResult {
        Self::solve(self, skeleton)
    }

    fn visit_bones(&self, skeleton: &Skeleton, visit: &mut dyn FnMut(BoneId, &Bone)) {
        Self::visit_bones(self, skeleton, visit);
    }

    fn visit_effectors(&self, skeleton: &Skeleton, visit: &mut dyn FnMut(BoneId, &Bone)) {
        Self::visit_effectors(self, skeleton, visit);
    }
}

/// Effectors on bones other than leaf-chain tips are never solved for.
fn report_ignored_effectors(tree: &ChainTree, skeleton: &Skeleton, sink: &dyn DiagnosticSink) {
    tree.for_each_bone(|chain, id| {
        let bone = skeleton.bone(id);
        let solved = tree.is_leaf(chain) && tree.tip(chain) == id;
        if bone.effector.is_some() && !solved {
            sink.emit(&Diagnostic::IgnoredEffector {
                bone: id.index(),
                name: bone.name().to_string(),
            });
        }
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::ConfigError;
    use arbor_skeleton::Effector;
    use arbor_test_utils::{RecordingSink, reaching_chain, straight_chain, y_rig};

    fn recording() -> (Arc<RecordingSink>, Arc<dyn DiagnosticSink>) {
        let sink = Arc::new(RecordingSink::new());
        let shared: Arc<dyn DiagnosticSink> = sink.clone();
        (sink, shared)
    }

    #[test]
    fn init_reports_effectors_and_chains() {
        let rig = y_rig(Vector3::x(), -Vector3::x());
        let subtree = Subtree::from_effectors(&rig.skeleton, rig.trunk);
        let (sink, shared) = recording();

        let solver =
            FabrikSolver::init(&rig.skeleton, &subtree, AlgorithmConfig::default(), shared)
                .unwrap();
        assert_eq!(solver.num_effectors(), 2);
        assert_eq!(solver.chain_tree().chain_count(), 3);
        assert_eq!(
            sink.diagnostics(),
            vec![Diagnostic::Initialized {
                effectors: 2,
                chains: 3
            }]
        );
    }

    #[test]
    fn interior_effector_is_reported_and_ignored() {
        let (mut skel, ids) = reaching_chain(3, 1.0, Vector3::new(1.0, 0.0, 2.0));
        skel.attach_effector(ids[1], Effector::new(Vector3::x()))
            .unwrap();
        let subtree = Subtree::from_effectors(&skel, ids[0]);
        let (sink, shared) = recording();

        let solver =
            FabrikSolver::init(&skel, &subtree, AlgorithmConfig::default(), shared).unwrap();
        assert_eq!(solver.num_effectors(), 1);
        assert!(sink.diagnostics().contains(&Diagnostic::IgnoredEffector {
            bone: ids[1].index(),
            name: "bone1".into(),
        }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let (skel, ids) = reaching_chain(2, 1.0, Vector3::x());
        let config = AlgorithmConfig {
            tolerance: f64::NAN,
            ..AlgorithmConfig::default()
        };
        let err = FabrikSolver::new(&skel, &Subtree::from_effectors(&skel, ids[0]), config)
            .unwrap_err();
        assert!(matches!(
            err,
            IkError::Config(ConfigError::InvalidTolerance(_))
        ));
    }

    #[test]
    fn failed_init_emits_nothing() {
        let (skel, ids) = straight_chain(2, 1.0);
        let (sink, shared) = recording();
        let result = FabrikSolver::init(
            &skel,
            &Subtree::new(ids[0]),
            AlgorithmConfig::default(),
            shared,
        );
        assert!(matches!(result, Err(IkError::NoEffectors)));
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn default_config_runs_every_iteration() {
        let (mut skel, ids) = reaching_chain(3, 1.0, Vector3::new(1.5, 0.0, 1.5));
        let mut solver = FabrikSolver::new(
            &skel,
            &Subtree::from_effectors(&skel, ids[0]),
            AlgorithmConfig::default(),
        )
        .unwrap();

        let result = solver.solve(&mut skel);
        assert_eq!(result.iterations, 20);
        assert!(result.converged);
        assert!(result.backward_target.is_some());
    }

    #[test]
    fn zero_iterations_leave_skeleton_untouched() {
        let (mut skel, ids) = reaching_chain(3, 1.0, Vector3::new(1.5, 0.0, 1.5));
        let config = AlgorithmConfig {
            max_iterations: 0,
            ..AlgorithmConfig::default()
        };
        let mut solver =
            FabrikSolver::new(&skel, &Subtree::from_effectors(&skel, ids[0]), config).unwrap();

        let result = solver.solve(&mut skel);
        assert_eq!(result.iterations, 0);
        assert!(!result.converged);
        assert_eq!(result.backward_target, None);
        for &id in &ids {
            assert_eq!(
                skel.bone(id).rotation,
                nalgebra::UnitQuaternion::identity()
            );
        }
    }

    #[test]
    fn visitors_follow_chain_order() {
        let rig = y_rig(Vector3::x(), -Vector3::x());
        let solver = FabrikSolver::new(
            &rig.skeleton,
            &Subtree::from_effectors(&rig.skeleton, rig.trunk),
            AlgorithmConfig::default(),
        )
        .unwrap();

        let mut bones = Vec::new();
        solver.visit_bones(&rig.skeleton, |id, _| bones.push(id));
        assert_eq!(
            bones,
            vec![rig.trunk, rig.left[1], rig.left[0], rig.right[1], rig.right[0]]
        );

        let mut tips = Vec::new();
        solver.visit_effectors(&rig.skeleton, |_, bone| tips.push(bone.name().to_string()));
        assert_eq!(tips, vec!["left_lower", "right_lower"]);
    }

    #[test]
    fn usable_through_trait_object() {
        let (mut skel, ids) = reaching_chain(2, 1.0, Vector3::new(1.0, 0.0, 1.0));
        let mut solver: Box<dyn IkSolver> = Box::new(
            FabrikSolver::new(
                &skel,
                &Subtree::from_effectors(&skel, ids[0]),
                AlgorithmConfig::default(),
            )
            .unwrap(),
        );

        assert_eq!(solver.name(), "fabrik");
        assert_eq!(solver.num_effectors(), 1);
        assert_eq!(solver.solve(&mut skel).iterations, 20);

        let mut count = 0;
        solver.visit_bones(&skel, &mut |_, _| count += 1);
        assert_eq!(count, 2);
    }

    #[test]
    fn deinit_reports_release() {
        let (skel, ids) = reaching_chain(2, 1.0, Vector3::x());
        let (sink, shared) = recording();
        let solver = FabrikSolver::init(
            &skel,
            &Subtree::from_effectors(&skel, ids[0]),
            AlgorithmConfig::default(),
            shared,
        )
        .unwrap();
        sink.clear();

        solver.deinit();
        assert_eq!(
            sink.diagnostics(),
            vec![Diagnostic::Released { effectors: 1 }]
        );
    }

    #[test]
    #[should_panic(expected = "different skeleton")]
    fn solve_rejects_a_smaller_skeleton() {
        let (skel, ids) = reaching_chain(3, 1.0, Vector3::x());
        let mut solver = FabrikSolver::new(
            &skel,
            &Subtree::from_effectors(&skel, ids[0]),
            AlgorithmConfig::default(),
        )
        .unwrap();

        let (mut other, _) = reaching_chain(2, 1.0, Vector3::x());
        solver.solve(&mut other);
    }

    #[test]
    #[should_panic(expected = "different skeleton")]
    fn visitors_reject_a_smaller_skeleton() {
        let (skel, ids) = reaching_chain(3, 1.0, Vector3::x());
        let solver = FabrikSolver::new(
            &skel,
            &Subtree::from_effectors(&skel, ids[0]),
            AlgorithmConfig::default(),
        )
        .unwrap();

        let (other, _) = reaching_chain(1, 1.0, Vector3::x());
        solver.visit_effectors(&other, |_, _| {});
    }

    #[test]
    fn solver_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FabrikSolver>();
    }
}
