//! Bevy ECS integration for the FABRIK solver.
//!
//! Provides [`ArborIkPlugin`], which owns a set of rigs in the [`IkRigs`]
//! resource and solves every enabled rig once per frame.
//!
//! # Usage
//!
//! 1. Add [`ArborIkPlugin`] to your app.
//! 2. Register a skeleton with [`IkRigs::build_and_insert`].
//! 3. Move effector targets with [`IkRigs::set_target`].
//!
//! The solve system runs in [`IkSet::Solve`] on [`Update`]; order your own
//! systems against that set.

use std::collections::HashMap;

use bevy::prelude::*;
use nalgebra::Vector3;

use arbor_core::AlgorithmConfig;
use arbor_skeleton::{BoneId, Skeleton, Subtree};

use crate::error::IkError;
use crate::solver::{FabrikSolver, IkResult};

/// Bevy plugin that solves registered rigs each frame.
pub struct ArborIkPlugin;

impl Plugin for ArborIkPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<IkRigs>()
            .add_systems(Update, ik_solve_system.in_set(IkSet::Solve));
    }
}

/// System set containing the IK solve.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IkSet {
    Solve,
}

/// Identifier of a rig inside [`IkRigs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RigId(pub u32);

/// A skeleton together with the solver bound to it.
#[derive(Debug)]
pub struct IkRigEntry {
    pub skeleton: Skeleton,
    pub solver: FabrikSolver,
    /// Disabled rigs are skipped by [`ik_solve_system`].
    pub enabled: bool,
    /// Result of the most recent solve, if any.
    pub last_result: Option<IkResult>,
}

/// Resource mapping [`RigId`] to rig data.
#[derive(Resource, Debug, Default)]
pub struct IkRigs {
    rigs: HashMap<RigId, IkRigEntry>,
}

impl IkRigs {
    /// Insert a pre-built rig entry, returning the one it replaces.
    pub fn insert(&mut self, rig_id: RigId, entry: IkRigEntry) -> Option<IkRigEntry> {
        self.rigs.insert(rig_id, entry)
    }

    /// Build a [`FabrikSolver`] for `subtree` of `skeleton` and register both.
    ///
    /// The rig starts enabled.
    ///
    /// # Errors
    ///
    /// Returns the solver initialization error; nothing is inserted then.
    pub fn build_and_insert(
        &mut self,
        rig_id: RigId,
        skeleton: Skeleton,
        subtree: &Subtree,
        config: AlgorithmConfig,
    ) -> Result<(), IkError> {
        let solver = FabrikSolver::new(&skeleton, subtree, config)?;
        if let Some(old) = self.insert(
            rig_id,
            IkRigEntry {
                skeleton,
                solver,
                enabled: true,
                last_result: None,
            },
        ) {
            old.solver.deinit();
        }
        Ok(())
    }

    /// Move the effector target on `bone` of a rig.
    ///
    /// Returns `false` if the rig, the bone, or its effector does not exist.
    pub fn set_target(&mut self, rig_id: RigId, bone: BoneId, target: Vector3<f64>) -> bool {
        self.rigs
            .get_mut(&rig_id)
            .is_some_and(|entry| {
                matches!(entry.skeleton.set_effector_target(bone, target), Ok(true))
            })
    }

    /// Enable or disable solving for a rig.
    pub fn set_enabled(&mut self, rig_id: RigId, enabled: bool) {
        if let Some(entry) = self.rigs.get_mut(&rig_id) {
            entry.enabled = enabled;
        }
    }

    pub fn get(&self, rig_id: RigId) -> Option<&IkRigEntry> {
        self.rigs.get(&rig_id)
    }

    pub fn get_mut(&mut self, rig_id: RigId) -> Option<&mut IkRigEntry> {
        self.rigs.get_mut(&rig_id)
    }

    /// Unregister a rig, releasing its solver and handing back the skeleton.
    pub fn remove(&mut self, rig_id: RigId) -> Option<Skeleton> {
        let entry = self.rigs.remove(&rig_id)?;
        entry.solver.deinit();
        Some(entry.skeleton)
    }

    pub fn len(&self) -> usize {
        self.rigs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rigs.is_empty()
    }
}

/// Solve every enabled rig once.
pub fn ik_solve_system(mut rigs: ResMut<IkRigs>) {
    for entry in rigs.rigs.values_mut().filter(|entry| entry.enabled) {
        let result = entry.solver.solve(&mut entry.skeleton);
        entry.last_result = Some(result);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_test_utils::{reaching_chain, tip_distance};

    fn arm() -> (Skeleton, Subtree, BoneId) {
        let (skel, ids) = reaching_chain(3, 1.0, Vector3::new(1.5, 0.0, 1.5));
        let subtree = Subtree::from_effectors(&skel, ids[0]);
        (skel, subtree, ids[2])
    }

    #[test]
    fn plugin_builds() {
        let mut app = App::new();
        app.add_plugins(ArborIkPlugin);
        app.finish();
        app.cleanup();
        app.update();

        assert!(app.world().get_resource::<IkRigs>().is_some());
    }

    #[test]
    fn build_and_insert_rig() {
        let (skel, subtree, _) = arm();
        let mut rigs = IkRigs::default();
        rigs.build_and_insert(RigId(0), skel, &subtree, AlgorithmConfig::default())
            .unwrap();

        let entry = rigs.get(RigId(0)).unwrap();
        assert!(entry.enabled);
        assert!(entry.last_result.is_none());
        assert_eq!(entry.solver.num_effectors(), 1);
        assert_eq!(rigs.len(), 1);
    }

    #[test]
    fn build_and_insert_failure_inserts_nothing() {
        let (skel, ids) = arbor_test_utils::straight_chain(2, 1.0);
        let mut rigs = IkRigs::default();
        let result = rigs.build_and_insert(
            RigId(0),
            skel,
            &Subtree::new(ids[0]),
            AlgorithmConfig::default(),
        );
        assert!(result.is_err());
        assert!(rigs.is_empty());
    }

    #[test]
    fn set_target_and_enable() {
        let (skel, subtree, tip) = arm();
        let mut rigs = IkRigs::default();
        rigs.build_and_insert(RigId(1), skel, &subtree, AlgorithmConfig::default())
            .unwrap();

        assert!(rigs.set_target(RigId(1), tip, Vector3::new(0.0, 1.5, 1.5)));
        assert!(!rigs.set_target(RigId(1), BoneId(0), Vector3::zeros()));
        assert!(!rigs.set_target(RigId(9), tip, Vector3::zeros()));

        rigs.set_enabled(RigId(1), false);
        assert!(!rigs.get(RigId(1)).unwrap().enabled);
    }

    #[test]
    fn remove_returns_skeleton() {
        let (skel, subtree, _) = arm();
        let mut rigs = IkRigs::default();
        rigs.build_and_insert(RigId(2), skel, &subtree, AlgorithmConfig::default())
            .unwrap();

        let skel = rigs.remove(RigId(2)).unwrap();
        assert_eq!(skel.len(), 3);
        assert!(rigs.get(RigId(2)).is_none());
        assert!(rigs.remove(RigId(2)).is_none());
    }

    #[test]
    fn system_solves_enabled_rigs() {
        let mut app = App::new();
        app.add_plugins(ArborIkPlugin);
        app.finish();
        app.cleanup();

        let (skel, subtree, tip) = arm();
        let (idle, idle_subtree, _) = arm();
        {
            let mut rigs = app.world_mut().resource_mut::<IkRigs>();
            rigs.build_and_insert(RigId(0), skel, &subtree, AlgorithmConfig::default())
                .unwrap();
            rigs.build_and_insert(RigId(1), idle, &idle_subtree, AlgorithmConfig::default())
                .unwrap();
            rigs.set_enabled(RigId(1), false);
        }

        app.update();

        let rigs = app.world().resource::<IkRigs>();
        let active = rigs.get(RigId(0)).unwrap();
        assert!(active.last_result.unwrap().converged);
        assert!(tip_distance(&active.skeleton, tip) < 1e-3);

        let idle = rigs.get(RigId(1)).unwrap();
        assert!(idle.last_result.is_none());
        assert!(tip_distance(&idle.skeleton, tip) > 1.0);
    }
}
