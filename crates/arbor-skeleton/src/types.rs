//! Core data types for the in-memory bone tree.
//!
//! A [`Skeleton`] is a flat arena of [`Bone`]s addressed by [`BoneId`].
//! Each bone stores its offset and orientation relative to its parent,
//! plus optional [`Effector`] and [`Pole`] attachments consumed by solvers.

use std::collections::HashMap;
use std::fmt;

use nalgebra::{UnitQuaternion, Vector3};

use crate::error::SkeletonError;

// ---------------------------------------------------------------------------
// BoneId
// ---------------------------------------------------------------------------

/// Index of a bone inside its [`Skeleton`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoneId(pub usize);

impl BoneId {
    /// Raw arena index.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Effector
// ---------------------------------------------------------------------------

/// Optional behaviours of an [`Effector`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectorFeatures {
    /// Blend the distance to the target around the effector chain's base
    /// bone instead of lerping the position directly.
    pub weight_nlerp: bool,
}

/// A target the tail of a bone should reach.
#[derive(Debug, Clone, PartialEq)]
pub struct Effector {
    /// Target position in skeleton space (the space of the root bones'
    /// parent).
    pub target_position: Vector3<f64>,
    /// Blend between the current tip position (0) and the target (1).
    pub weight: f64,
    pub features: EffectorFeatures,
}

impl Effector {
    /// Full-weight effector aiming at `target_position`.
    pub fn new(target_position: Vector3<f64>) -> Self {
        Self {
            target_position,
            weight: 1.0,
            features: EffectorFeatures::default(),
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    #[must_use]
    pub fn with_weight_nlerp(mut self, enabled: bool) -> Self {
        self.features.weight_nlerp = enabled;
        self
    }
}

// ---------------------------------------------------------------------------
// Pole
// ---------------------------------------------------------------------------

/// Pole target constraint. Only meaningful on the tip bone of a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Pole {
    /// Twist angle around the chain axis (radians).
    pub angle: f64,
    /// Pole target position in skeleton space.
    pub target_position: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// Bone
// ---------------------------------------------------------------------------

/// A single bone.
///
/// The bone's head sits at `position`, measured from the parent's tail in
/// the parent's frame. The bone extends `length` along its local +Z axis.
#[derive(Debug, Clone)]
pub struct Bone {
    name: String,
    parent: Option<BoneId>,
    children: Vec<BoneId>,
    /// Head offset from the parent's tail, in parent space.
    pub position: Vector3<f64>,
    /// Orientation relative to the parent.
    pub rotation: UnitQuaternion<f64>,
    /// Distance from head to tail along local +Z.
    pub length: f64,
    pub effector: Option<Effector>,
    pub pole: Option<Pole>,
}

impl Bone {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn parent(&self) -> Option<BoneId> {
        self.parent
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[BoneId] {
        &self.children
    }

    /// Tail position in the bone's own frame.
    pub fn tail(&self) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, self.length)
    }
}

// ---------------------------------------------------------------------------
// Skeleton
// ---------------------------------------------------------------------------

/// Arena of bones forming one or more trees.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    bones: Vec<Bone>,
    names: HashMap<String, BoneId>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bone below `parent` (or as a new root) and return its id.
    ///
    /// The bone starts with zero offset and identity rotation.
    pub fn add_bone(
        &mut self,
        name: impl Into<String>,
        parent: Option<BoneId>,
        length: f64,
    ) -> Result<BoneId, SkeletonError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(SkeletonError::DuplicateBone(name));
        }
        if !length.is_finite() || length < 0.0 {
            return Err(SkeletonError::InvalidLength { bone: name, length });
        }
        if let Some(parent) = parent {
            if parent.0 >= self.bones.len() {
                return Err(SkeletonError::BoneOutOfRange(parent));
            }
        }

        let id = BoneId(self.bones.len());
        if let Some(parent) = parent {
            self.bones[parent.0].children.push(id);
        }
        self.names.insert(name.clone(), id);
        self.bones.push(Bone {
            name,
            parent,
            children: Vec::new(),
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            length,
            effector: None,
            pole: None,
        });
        Ok(id)
    }

    /// Number of bones.
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Access a bone.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this skeleton.
    pub fn bone(&self, id: BoneId) -> &Bone {
        &self.bones[id.0]
    }

    /// Mutable access to a bone's pose and attachments.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this skeleton.
    pub fn bone_mut(&mut self, id: BoneId) -> &mut Bone {
        &mut self.bones[id.0]
    }

    pub fn try_bone(&self, id: BoneId) -> Result<&Bone, SkeletonError> {
        self.bones.get(id.0).ok_or(SkeletonError::BoneOutOfRange(id))
    }

    /// Look up a bone by name.
    pub fn find(&self, name: &str) -> Option<BoneId> {
        self.names.get(name).copied()
    }

    /// Look up a bone by name, failing if it does not exist.
    pub fn bone_id(&self, name: &str) -> Result<BoneId, SkeletonError> {
        self.find(name)
            .ok_or_else(|| SkeletonError::UnknownBone(name.to_string()))
    }

    /// All bones with their ids, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (BoneId, &Bone)> {
        self.bones.iter().enumerate().map(|(i, b)| (BoneId(i), b))
    }

    /// Bones without a parent.
    pub fn roots(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.iter()
            .filter(|(_, b)| b.parent.is_none())
            .map(|(id, _)| id)
    }

    /// Whether `ancestor` is `bone` or lies on its path to the root.
    pub fn is_ancestor_or_self(&self, ancestor: BoneId, bone: BoneId) -> bool {
        let mut current = Some(bone);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.bones[id.0].parent;
        }
        false
    }

    /// Attach an effector, validating its weight.
    pub fn attach_effector(
        &mut self,
        id: BoneId,
        effector: Effector,
    ) -> Result<(), SkeletonError> {
        let bone = self
            .bones
            .get_mut(id.0)
            .ok_or(SkeletonError::BoneOutOfRange(id))?;
        if !(0.0..=1.0).contains(&effector.weight) {
            return Err(SkeletonError::InvalidWeight {
                bone: bone.name.clone(),
                weight: effector.weight,
            });
        }
        ensure_finite(&bone.name, "effector target", &effector.target_position)?;
        bone.effector = Some(effector);
        Ok(())
    }

    pub fn attach_pole(&mut self, id: BoneId, pole: Pole) -> Result<(), SkeletonError> {
        let bone = self
            .bones
            .get_mut(id.0)
            .ok_or(SkeletonError::BoneOutOfRange(id))?;
        ensure_finite(&bone.name, "pole target", &pole.target_position)?;
        if !pole.angle.is_finite() {
            return Err(SkeletonError::NonFinite {
                bone: bone.name.clone(),
                field: "pole angle",
            });
        }
        bone.pole = Some(pole);
        Ok(())
    }

    /// Move the target of the effector attached to `id`.
    ///
    /// Returns `false` if the bone carries no effector.
    pub fn set_effector_target(
        &mut self,
        id: BoneId,
        target: Vector3<f64>,
    ) -> Result<bool, SkeletonError> {
        let bone = self
            .bones
            .get_mut(id.0)
            .ok_or(SkeletonError::BoneOutOfRange(id))?;
        let Some(effector) = bone.effector.as_mut() else {
            return Ok(false);
        };
        ensure_finite(&bone.name, "effector target", &target)?;
        effector.target_position = target;
        Ok(true)
    }
}

/// Reject vectors with NaN or infinite coordinates.
pub(crate) fn ensure_finite(
    bone: &str,
    field: &'static str,
    v: &Vector3<f64>,
) -> Result<(), SkeletonError> {
    if v.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(SkeletonError::NonFinite {
            bone: bone.to_string(),
            field,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_skeleton() -> Skeleton {
        let mut skel = Skeleton::new();
        let hip = skel.add_bone("hip", None, 1.0).unwrap();
        let spine = skel.add_bone("spine", Some(hip), 1.0).unwrap();
        skel.add_bone("left_arm", Some(spine), 0.5).unwrap();
        skel.add_bone("right_arm", Some(spine), 0.5).unwrap();
        skel
    }

    #[test]
    fn add_bone_links_parent_and_children() {
        let skel = sample_skeleton();
        assert_eq!(skel.len(), 4);
        let spine = skel.find("spine").unwrap();
        assert_eq!(skel.bone(spine).parent(), Some(BoneId(0)));
        assert_eq!(skel.bone(spine).children(), &[BoneId(2), BoneId(3)]);
    }

    #[test]
    fn new_bone_has_identity_pose() {
        let skel = sample_skeleton();
        let bone = skel.bone(BoneId(1));
        assert_eq!(bone.position, Vector3::zeros());
        assert_eq!(bone.rotation, UnitQuaternion::identity());
        assert_eq!(bone.tail(), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut skel = sample_skeleton();
        let err = skel.add_bone("spine", None, 1.0).unwrap_err();
        assert!(matches!(err, SkeletonError::DuplicateBone(_)));
    }

    #[test]
    fn invalid_length_rejected() {
        let mut skel = Skeleton::new();
        assert!(matches!(
            skel.add_bone("a", None, -1.0),
            Err(SkeletonError::InvalidLength { .. })
        ));
        assert!(matches!(
            skel.add_bone("b", None, f64::INFINITY),
            Err(SkeletonError::InvalidLength { .. })
        ));
    }

    #[test]
    fn unknown_parent_rejected() {
        let mut skel = Skeleton::new();
        let err = skel.add_bone("a", Some(BoneId(3)), 1.0).unwrap_err();
        assert!(matches!(err, SkeletonError::BoneOutOfRange(BoneId(3))));
    }

    #[test]
    fn lookup_by_name() {
        let skel = sample_skeleton();
        assert_eq!(skel.find("left_arm"), Some(BoneId(2)));
        assert!(skel.find("tail").is_none());
        assert!(matches!(
            skel.bone_id("tail"),
            Err(SkeletonError::UnknownBone(_))
        ));
    }

    #[test]
    fn roots_and_ancestry() {
        let mut skel = sample_skeleton();
        skel.add_bone("prop", None, 0.2).unwrap();
        let roots: Vec<_> = skel.roots().collect();
        assert_eq!(roots, vec![BoneId(0), BoneId(4)]);

        assert!(skel.is_ancestor_or_self(BoneId(0), BoneId(3)));
        assert!(skel.is_ancestor_or_self(BoneId(3), BoneId(3)));
        assert!(!skel.is_ancestor_or_self(BoneId(2), BoneId(3)));
        assert!(!skel.is_ancestor_or_self(BoneId(4), BoneId(1)));
    }

    #[test]
    fn attach_effector_validates_weight() {
        let mut skel = sample_skeleton();
        let arm = skel.find("left_arm").unwrap();
        let eff = Effector::new(Vector3::new(1.0, 0.0, 0.0)).with_weight(1.5);
        assert!(matches!(
            skel.attach_effector(arm, eff),
            Err(SkeletonError::InvalidWeight { .. })
        ));

        let eff = Effector::new(Vector3::new(1.0, 0.0, 0.0)).with_weight(0.5);
        skel.attach_effector(arm, eff).unwrap();
        assert!(skel.bone(arm).effector.is_some());
    }

    #[test]
    fn set_effector_target() {
        let mut skel = sample_skeleton();
        let arm = skel.find("left_arm").unwrap();
        assert!(!skel.set_effector_target(arm, Vector3::x()).unwrap());

        skel.attach_effector(arm, Effector::new(Vector3::zeros()))
            .unwrap();
        assert!(skel.set_effector_target(arm, Vector3::x()).unwrap());
        assert_eq!(
            skel.bone(arm).effector.as_ref().unwrap().target_position,
            Vector3::x()
        );
        assert!(skel.set_effector_target(BoneId(42), Vector3::x()).is_err());
    }

    #[test]
    fn non_finite_targets_rejected() {
        let mut skel = sample_skeleton();
        let arm = skel.find("left_arm").unwrap();
        let err = skel
            .attach_effector(arm, Effector::new(Vector3::new(f64::NAN, 0.0, 0.0)))
            .unwrap_err();
        assert!(matches!(
            err,
            SkeletonError::NonFinite { field: "effector target", .. }
        ));
        assert!(skel.bone(arm).effector.is_none());

        skel.attach_effector(arm, Effector::new(Vector3::x())).unwrap();
        assert!(
            skel.set_effector_target(arm, Vector3::new(0.0, f64::INFINITY, 0.0))
                .is_err()
        );
        assert_eq!(
            skel.bone(arm).effector.as_ref().unwrap().target_position,
            Vector3::x()
        );

        let pole = Pole {
            angle: 0.0,
            target_position: Vector3::new(0.0, 0.0, f64::NEG_INFINITY),
        };
        assert!(matches!(
            skel.attach_pole(arm, pole),
            Err(SkeletonError::NonFinite { field: "pole target", .. })
        ));
    }

    #[test]
    fn effector_builder() {
        let eff = Effector::new(Vector3::new(0.0, 1.0, 0.0))
            .with_weight(0.25)
            .with_weight_nlerp(true);
        assert!((eff.weight - 0.25).abs() < f64::EPSILON);
        assert!(eff.features.weight_nlerp);
    }

    #[test]
    fn bone_id_display() {
        assert_eq!(BoneId(7).to_string(), "#7");
        assert_eq!(BoneId(7).index(), 7);
    }
}
