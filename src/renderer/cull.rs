//! Scene culling and batching.
//!
//! Walks the entity registry once per pass, selects a LOD band per entity
//! from camera distance, emits one [`Drawcall`] per LOD-eligible mesh, and
//! groups the drawcalls by (material, mesh, model, sidedness) into
//! insertion-ordered [`DrawGroup`]s. Groups are the unit the draw executor
//! consumes; a group whose shader allows it becomes a single instanced draw.

use glam::{Mat4, Vec4};
use rustc_hash::FxHashMap;

use crate::renderer::settings::RenderSettings;
use crate::scene::model::LOD_BANDS;
use crate::scene::{
    Assets, BoundingBox, Camera, EntityHandle, MaterialHandle, MeshHandle, ModelHandle, Scene,
};

/// One resolved, frame-transient draw request.
#[derive(Debug, Clone, Copy)]
pub struct Drawcall {
    pub entity: EntityHandle,
    pub model: ModelHandle,
    pub mesh: MeshHandle,
    /// Resolved material: override > entity > mesh. `None` defers to the
    /// default shader at draw time.
    pub material: Option<MaterialHandle>,
    pub world: Mat4,
    pub double_sided: bool,
}

/// Structural grouping key. Equality and hash are defined purely on stable
/// arena handles plus the sidedness flag, never on transient addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub material: Option<MaterialHandle>,
    pub mesh: MeshHandle,
    pub model: ModelHandle,
    pub double_sided: bool,
}

/// Per-entity record inside a group.
#[derive(Debug, Clone, Copy)]
pub struct DrawInstance {
    pub world: Mat4,
    pub entity: EntityHandle,
}

/// All instances sharing one [`GroupKey`] this frame.
#[derive(Debug, Clone)]
pub struct DrawGroup {
    pub key: GroupKey,
    pub instances: Vec<DrawInstance>,
}

/// Output of one culling pass: groups in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct FrameBatches {
    pub groups: Vec<DrawGroup>,
}

impl FrameBatches {
    /// Total drawcalls across all groups.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.groups.iter().map(|g| g.instances.len()).sum()
    }
}

/// Selects the LOD band for a camera distance, or `None` when the distance
/// exceeds every threshold.
///
/// Scans from the coarsest band downward and keeps the smallest index whose
/// threshold still exceeds the distance, so the result is non-decreasing in
/// distance.
#[must_use]
pub fn select_lod(distance: f32, table: &[f32; LOD_BANDS]) -> Option<u8> {
    let mut selected = None;
    for band in (0..LOD_BANDS).rev() {
        if distance < table[band] {
            selected = Some(band as u8);
        } else {
            break;
        }
    }
    selected
}

/// True when the box lies entirely outside one clip-space plane of the
/// combined world-view-projection transform.
///
/// The test is conservative: it rejects only when all eight transformed
/// corners fall outside the same plane in post-divide clip coordinates.
/// Degenerate (inverted-extent) boxes are never culled.
#[must_use]
pub fn box_outside_frustum(bounds: &BoundingBox, wvp: &Mat4) -> bool {
    if bounds.is_degenerate() {
        return false;
    }
    // all_outside[plane]: x<-1, x>1, y<-1, y>1, z<-1, z>1
    let mut all_outside = [true; 6];
    for corner in bounds.corners() {
        let clip = *wvp * Vec4::new(corner.x, corner.y, corner.z, 1.0);
        let ndc = clip.truncate() / clip.w;
        all_outside[0] &= ndc.x < -1.0;
        all_outside[1] &= ndc.x > 1.0;
        all_outside[2] &= ndc.y < -1.0;
        all_outside[3] &= ndc.y > 1.0;
        all_outside[4] &= ndc.z < -1.0;
        all_outside[5] &= ndc.z > 1.0;
    }
    all_outside.iter().any(|&out| out)
}

/// Walks all entities visible to `camera` and produces the frame's draw
/// groups.
///
/// A `None` camera produces empty output and is not an error. Stale mesh or
/// model handles are reported and skipped. `material_override`, when given,
/// wins over entity- and mesh-level materials for every drawcall.
#[must_use]
pub fn cull_scene(
    scene: &Scene,
    assets: &Assets,
    camera: Option<&Camera>,
    material_override: Option<MaterialHandle>,
    settings: &RenderSettings,
) -> FrameBatches {
    let Some(camera) = camera else {
        return FrameBatches::default();
    };

    let view_proj = camera.projection_matrix() * camera.view_matrix();

    let mut groups: Vec<DrawGroup> = Vec::new();
    let mut index: FxHashMap<GroupKey, usize> = FxHashMap::default();

    for (handle, entity) in scene.entities() {
        let Some(model_handle) = entity.model else {
            continue;
        };
        if !entity.is_visible() {
            continue;
        }
        let Some(model) = assets.models.get(model_handle) else {
            log::error!("entity has a stale model handle, skipping");
            continue;
        };

        let distance = camera.position.distance(entity.position);
        let Some(band) = select_lod(distance, &settings.lod_distances) else {
            continue;
        };
        // The model floor only coarsens; a finer selection skips the entity.
        if band < model.min_lod {
            continue;
        }

        let world = entity.world_matrix();

        for &mesh_handle in &model.meshes {
            let Some(mesh) = assets.meshes.get(mesh_handle) else {
                log::error!("model references a stale mesh handle, skipping");
                continue;
            };
            if !mesh.lod_mask.contains(band) {
                continue;
            }
            if settings.frustum_culling {
                let wvp = view_proj * world;
                if box_outside_frustum(&mesh.bounds, &wvp) {
                    continue;
                }
            }

            let call = Drawcall {
                entity: handle,
                model: model_handle,
                mesh: mesh_handle,
                material: material_override.or(entity.material).or(mesh.material),
                world,
                double_sided: mesh.double_sided,
            };

            let key = GroupKey {
                material: call.material,
                mesh: call.mesh,
                model: call.model,
                double_sided: call.double_sided,
            };
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(DrawGroup {
                    key,
                    instances: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].instances.push(DrawInstance {
                world: call.world,
                entity: call.entity,
            });
        }
    }

    FrameBatches { groups }
}
