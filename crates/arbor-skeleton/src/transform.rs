//! Position transforms between bone frames.
//!
//! The frame of a bone has its origin at the bone's head and is oriented by
//! the accumulated rotation of the bone and all of its ancestors. The
//! "parent space" of a root bone is skeleton space. Mapping a point from a
//! bone's frame into its parent's frame is
//!
//! ```text
//! p' = rotation * p + position + (0, 0, parent.length)
//! ```
//!
//! because `position` is measured from the parent's tail.
//!
//! Frames are named by `Option<BoneId>`; `None` is skeleton space.

use std::f64::consts::PI;

use nalgebra::{UnitQuaternion, Vector3};

use crate::types::{BoneId, Skeleton};

/// Minimal rotation taking local +Z onto `direction`.
///
/// A zero vector yields the identity. A direction exactly opposite +Z
/// yields a half turn about X.
pub fn face(direction: &Vector3<f64>) -> UnitQuaternion<f64> {
    let Some(direction) = direction.try_normalize(0.0) else {
        return UnitQuaternion::identity();
    };
    UnitQuaternion::rotation_between(&Vector3::z(), &direction)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI))
}

impl Skeleton {
    fn parent_length(&self, id: BoneId) -> f64 {
        self.bone(id)
            .parent()
            .map_or(0.0, |parent| self.bone(parent).length)
    }

    /// Map a point from the frame of `id` into the frame of its parent.
    pub fn to_parent_space(&self, id: BoneId, pos: Vector3<f64>) -> Vector3<f64> {
        let bone = self.bone(id);
        bone.rotation * pos + bone.position + Vector3::z() * self.parent_length(id)
    }

    /// Map a point from the frame of the parent of `id` into the frame of `id`.
    pub fn from_parent_space(&self, id: BoneId, pos: Vector3<f64>) -> Vector3<f64> {
        let bone = self.bone(id);
        bone.rotation
            .inverse_transform_vector(&(pos - bone.position - Vector3::z() * self.parent_length(id)))
    }

    /// Map `pos` from the frame of `from` up into the frame of its ancestor `to`.
    ///
    /// `to` must be `from`, an ancestor of `from`, or `None`.
    pub fn pos_local_to_global(
        &self,
        pos: Vector3<f64>,
        from: Option<BoneId>,
        to: Option<BoneId>,
    ) -> Vector3<f64> {
        let mut pos = pos;
        let mut current = from;
        while current != to {
            let Some(id) = current else {
                break;
            };
            pos = self.to_parent_space(id, pos);
            current = self.bone(id).parent();
        }
        debug_assert_eq!(current, to, "{to:?} is not an ancestor of {from:?}");
        pos
    }

    /// Map `pos` from the frame of `from` down into the frame of its
    /// descendant `to`.
    ///
    /// `from` must be `to`, an ancestor of `to`, or `None`.
    pub fn pos_global_to_local(
        &self,
        pos: Vector3<f64>,
        from: Option<BoneId>,
        to: Option<BoneId>,
    ) -> Vector3<f64> {
        match to {
            Some(id) if to != from => {
                let pos = self.pos_global_to_local(pos, from, self.bone(id).parent());
                self.from_parent_space(id, pos)
            }
            _ => {
                debug_assert_eq!(to, from, "{from:?} is not an ancestor of {to:?}");
                pos
            }
        }
    }

    /// Accumulated rotation of `id` in skeleton space.
    pub fn global_rotation(&self, id: BoneId) -> UnitQuaternion<f64> {
        let bone = self.bone(id);
        bone.parent().map_or(bone.rotation, |parent| {
            self.global_rotation(parent) * bone.rotation
        })
    }

    /// Head of `id` in skeleton space.
    pub fn global_head(&self, id: BoneId) -> Vector3<f64> {
        self.pos_local_to_global(Vector3::zeros(), Some(id), None)
    }

    /// Tail of `id` in skeleton space.
    pub fn global_tail(&self, id: BoneId) -> Vector3<f64> {
        self.pos_local_to_global(self.bone(id).tail(), Some(id), None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
