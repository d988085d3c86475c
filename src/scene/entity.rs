//! Entities: positioned instances of models in the world.

use bitflags::bitflags;
use glam::{Mat4, Quat, Vec3};

use super::registry::{MaterialHandle, ModelHandle};

bitflags! {
    /// Per-entity state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntityFlags: u32 {
        /// Invisible entities are skipped by the culler.
        const VISIBLE = 1 << 0;
    }
}

/// Local transform of one bone: scale first, then rotate, then translate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonePose {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl BonePose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// The pose as a matrix, composed as translate · rotate · scale.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for BonePose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A positioned, possibly posed, instance of a model.
///
/// Created and destroyed by the caller; the renderer reads entities during a
/// frame and never keeps references past it.
#[derive(Debug, Clone)]
pub struct Entity {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub model: Option<ModelHandle>,
    /// Overrides every mesh material of the model when set.
    pub material: Option<MaterialHandle>,
    pub flags: EntityFlags,
    /// Per-bone local poses, indexed like the model's bone array. Missing
    /// entries fall back to the bone's rest pose. Bounded by
    /// [`MAX_BONES`](super::model::MAX_BONES) via model validation.
    pub pose: Vec<BonePose>,
}

impl Entity {
    #[must_use]
    pub fn new(model: ModelHandle) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            model: Some(model),
            material: None,
            flags: EntityFlags::VISIBLE,
            pose: Vec::new(),
        }
    }

    #[must_use]
    pub fn at(model: ModelHandle, position: Vec3) -> Self {
        Self {
            position,
            ..Self::new(model)
        }
    }

    /// World transform: scale first, then rotate, then translate
    /// (`world = T · R · S`).
    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.flags.contains(EntityFlags::VISIBLE)
    }
}
