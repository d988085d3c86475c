//! Models, meshes and bone hierarchies.

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use super::entity::BonePose;
use super::registry::{MaterialHandle, MeshHandle};
use crate::errors::{RenderError, Result};
use crate::gpu::BufferId;

/// Fixed capacity of the shared bone buffer. A model declaring more bones is
/// rejected at construction; bone data cannot be truncated safely.
pub const MAX_BONES: usize = 64;

/// Number of discrete LOD bands. Band 0 is the finest, band 15 the coarsest.
pub const LOD_BANDS: usize = 16;

// ============================================================================
// Bounding volume
// ============================================================================

/// Axis-aligned bounding box in mesh-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An inverted-extent box. Degenerate boxes are never frustum-culled.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// True when any extent is inverted.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// The eight corner points.
    #[must_use]
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }
}

// ============================================================================
// LOD mask
// ============================================================================

/// Per-mesh bitmask over the 16 LOD bands: a mesh renders only in bands
/// whose bit is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LodMask(pub u16);

impl LodMask {
    /// Renders in every band.
    pub const ALL: Self = Self(u16::MAX);

    /// Mask enabling a single band. Out-of-range bands yield an empty mask.
    #[must_use]
    pub fn band(band: u8) -> Self {
        if band < 16 { Self(1 << band) } else { Self(0) }
    }

    /// Mask enabling an inclusive band range.
    #[must_use]
    pub fn bands(first: u8, last: u8) -> Self {
        let mut mask = 0u16;
        for band in first..=last.min(15) {
            mask |= 1 << band;
        }
        Self(mask)
    }

    #[must_use]
    pub fn contains(self, band: u8) -> bool {
        band < 16 && self.0 & (1 << band) != 0
    }
}

impl Default for LodMask {
    fn default() -> Self {
        Self::ALL
    }
}

// ============================================================================
// Bones
// ============================================================================

/// One bone of a model's hierarchy.
///
/// Bone 0 is the root. Every other bone's parent index must be smaller than
/// its own index, so a single forward pass evaluates the hierarchy.
#[derive(Debug, Clone)]
pub struct Bone {
    /// Parent index; `None` only for the root.
    pub parent: Option<u16>,
    /// Maps the bone's rest-pose space into skin space.
    pub bind_to_bone: Mat4,
    /// Static pose used on the instanced (non-animated) draw path.
    pub rest_pose: BonePose,
}

impl Bone {
    /// A root bone with identity bind and rest transforms.
    #[must_use]
    pub fn root() -> Self {
        Self {
            parent: None,
            bind_to_bone: Mat4::IDENTITY,
            rest_pose: BonePose::IDENTITY,
        }
    }

    /// A child of `parent` with identity bind and rest transforms.
    #[must_use]
    pub fn child_of(parent: u16) -> Self {
        Self {
            parent: Some(parent),
            ..Self::root()
        }
    }
}

// ============================================================================
// Mesh & model
// ============================================================================

/// Immutable render geometry: buffer references plus draw metadata.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub index_count: u32,
    pub lod_mask: LodMask,
    pub double_sided: bool,
    /// Animated meshes are skinned per entity and never instanced.
    pub animated: bool,
    pub bounds: BoundingBox,
    pub material: Option<MaterialHandle>,
}

impl Mesh {
    #[must_use]
    pub fn new(vertex_buffer: BufferId, index_buffer: BufferId, index_count: u32) -> Self {
        Self {
            vertex_buffer,
            index_buffer,
            index_count,
            lod_mask: LodMask::ALL,
            double_sided: false,
            animated: false,
            bounds: BoundingBox::empty(),
            material: None,
        }
    }
}

/// An ordered sequence of meshes plus a validated bone hierarchy.
#[derive(Debug, Clone)]
pub struct Model {
    pub meshes: SmallVec<[MeshHandle; 4]>,
    bones: Vec<Bone>,
    /// Coarsest band this model accepts as its floor: an entity whose
    /// selected band is finer than this is skipped, never refined.
    pub min_lod: u8,
    pub bounds: BoundingBox,
}

impl Model {
    /// Builds a model, validating the bone hierarchy: at most [`MAX_BONES`]
    /// bones, and `parent(i) < i` for every non-root bone.
    pub fn new(meshes: impl IntoIterator<Item = MeshHandle>, bones: Vec<Bone>) -> Result<Self> {
        if bones.len() > MAX_BONES {
            return Err(RenderError::BoneCapacity {
                count: bones.len(),
                limit: MAX_BONES,
            });
        }
        for (index, bone) in bones.iter().enumerate() {
            match bone.parent {
                None if index == 0 => {}
                None => {
                    return Err(RenderError::BoneHierarchy {
                        index,
                        parent: index,
                    });
                }
                Some(parent) if (parent as usize) < index => {}
                Some(parent) => {
                    return Err(RenderError::BoneHierarchy {
                        index,
                        parent: parent as usize,
                    });
                }
            }
        }
        Ok(Self {
            meshes: meshes.into_iter().collect(),
            bones,
            min_lod: 0,
            bounds: BoundingBox::empty(),
        })
    }

    /// Model without bones.
    pub fn with_meshes(meshes: impl IntoIterator<Item = MeshHandle>) -> Self {
        Self {
            meshes: meshes.into_iter().collect(),
            bones: Vec::new(),
            min_lod: 0,
            bounds: BoundingBox::empty(),
        }
    }

    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }
}
