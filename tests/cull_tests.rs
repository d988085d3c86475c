//! Scene culling and batching tests
//!
//! Tests for:
//! - LOD band selection (monotonicity, cutoff, model floor, per-mesh mask)
//! - Drawcall emission (one per visible entity/mesh pair)
//! - Material resolution order (override > entity > mesh)
//! - Frustum culling toggle and degenerate boxes
//! - Group partitioning

use ashfall::gpu::trace::TraceDevice;
use ashfall::gpu::{BufferKind, GpuDevice};
use ashfall::renderer::cull::{box_outside_frustum, cull_scene, select_lod};
use ashfall::renderer::settings::RenderSettings;
use ashfall::scene::model::LOD_BANDS;
use ashfall::scene::{
    Assets, BoundingBox, Camera, Entity, EntityFlags, LodMask, Material, MaterialHandle, Mesh,
    MeshHandle, Model, Scene,
};
use glam::Vec3;

// ============================================================================
// Helpers
// ============================================================================

fn make_mesh(device: &mut TraceDevice, assets: &mut Assets) -> MeshHandle {
    let vertices = device.create_buffer(BufferKind::Vertex, "vertices");
    device.buffer_reserve(vertices, 1024).unwrap();
    let indices = device.create_buffer(BufferKind::Index, "indices");
    device.buffer_reserve(indices, 36 * 4).unwrap();
    assets.add_mesh(Mesh::new(vertices, indices, 36))
}

fn make_material(assets: &mut Assets) -> MaterialHandle {
    assets.add_material(Material::default())
}

fn ascending_table() -> [f32; LOD_BANDS] {
    RenderSettings::default().lod_distances
}

// ============================================================================
// LOD band selection
// ============================================================================

#[test]
fn lod_selection_is_monotonic_in_distance() {
    let table = ascending_table();
    let mut last_band = 0u8;
    let mut distance = 0.0f32;
    while distance < table[LOD_BANDS - 1] {
        let band = select_lod(distance, &table).expect("within range");
        assert!(band >= last_band, "band decreased at distance {distance}");
        last_band = band;
        distance += 1.0;
    }
}

#[test]
fn lod_zero_distance_selects_finest_band() {
    let table = ascending_table();
    assert_eq!(select_lod(0.0, &table), Some(0));
}

#[test]
fn lod_band_boundaries() {
    let table = ascending_table();
    // Just below a threshold stays in that band, at the threshold moves up.
    assert_eq!(select_lod(table[0] - 0.01, &table), Some(0));
    assert_eq!(select_lod(table[0], &table), Some(1));
    assert_eq!(select_lod(table[7] - 0.01, &table), Some(7));
}

#[test]
fn lod_beyond_last_threshold_skips_entity() {
    let table = ascending_table();
    assert_eq!(select_lod(table[LOD_BANDS - 1], &table), None);
    assert_eq!(select_lod(table[LOD_BANDS - 1] + 1000.0, &table), None);
}

// ============================================================================
// Drawcall emission
// ============================================================================

#[test]
fn one_drawcall_per_visible_entity_mesh_pair() {
    let mut device = TraceDevice::new();
    let mut assets = Assets::new();
    let mesh_a = make_mesh(&mut device, &mut assets);
    let mesh_b = make_mesh(&mut device, &mut assets);
    let model = assets.add_model(Model::with_meshes([mesh_a, mesh_b]));

    let mut scene = Scene::new();
    for i in 0..3 {
        scene.spawn(Entity::at(model, Vec3::new(i as f32, 0.0, -2.0)));
    }

    let camera = Camera::at(Vec3::ZERO);
    let batches = cull_scene(&scene, &assets, Some(&camera), None, &RenderSettings::default());

    // 3 entities x 2 meshes = 6 drawcalls, partitioned into 2 groups.
    assert_eq!(batches.instance_count(), 6);
    assert_eq!(batches.groups.len(), 2);
    for group in &batches.groups {
        assert_eq!(group.instances.len(), 3);
    }
}

#[test]
fn invisible_and_modelless_entities_are_skipped() {
    let mut device = TraceDevice::new();
    let mut assets = Assets::new();
    let mesh = make_mesh(&mut device, &mut assets);
    let model = assets.add_model(Model::with_meshes([mesh]));

    let mut scene = Scene::new();
    let mut hidden = Entity::new(model);
    hidden.flags.remove(EntityFlags::VISIBLE);
    scene.spawn(hidden);
    let mut bare = Entity::new(model);
    bare.model = None;
    scene.spawn(bare);

    let camera = Camera::at(Vec3::ZERO);
    let batches = cull_scene(&scene, &assets, Some(&camera), None, &RenderSettings::default());
    assert_eq!(batches.instance_count(), 0);
}

#[test]
fn model_lod_floor_skips_finer_bands() {
    let mut device = TraceDevice::new();
    let mut assets = Assets::new();
    let mesh = make_mesh(&mut device, &mut assets);
    let mut model = Model::with_meshes([mesh]);
    model.min_lod = 4;
    let model = assets.add_model(model);

    let settings = RenderSettings::default();
    let mut scene = Scene::new();
    // Selected band 0, finer than the floor: skipped.
    scene.spawn(Entity::at(model, Vec3::new(0.0, 0.0, -1.0)));
    let camera = Camera::at(Vec3::ZERO);
    let batches = cull_scene(&scene, &assets, Some(&camera), None, &settings);
    assert_eq!(batches.instance_count(), 0);

    // Far enough for band >= 4: rendered.
    let mut scene = Scene::new();
    let far = settings.lod_distances[4] + 1.0;
    scene.spawn(Entity::at(model, Vec3::new(0.0, 0.0, -far)));
    let batches = cull_scene(&scene, &assets, Some(&camera), None, &settings);
    assert_eq!(batches.instance_count(), 1);
}

#[test]
fn coarse_only_lod_mask_skips_close_entity() {
    // Camera at distance 0 selects band 0; a mesh whose mask only enables
    // band 15 must not produce a drawcall.
    let mut device = TraceDevice::new();
    let mut assets = Assets::new();
    let mesh = make_mesh(&mut device, &mut assets);
    assets.meshes[mesh].lod_mask = LodMask::band(15);
    let model = assets.add_model(Model::with_meshes([mesh]));

    let mut scene = Scene::new();
    scene.spawn(Entity::at(model, Vec3::ZERO));

    let camera = Camera::at(Vec3::ZERO);
    let batches = cull_scene(&scene, &assets, Some(&camera), None, &RenderSettings::default());
    assert_eq!(batches.instance_count(), 0);
}

#[test]
fn lod_mask_band_out_of_range_is_empty() {
    assert!(LodMask::band(4).contains(4));
    assert!(!LodMask::band(4).contains(5));
    let oversized = LodMask::band(16);
    for band in 0..16 {
        assert!(!oversized.contains(band));
    }
}

#[test]
fn null_camera_produces_empty_output() {
    let mut device = TraceDevice::new();
    let mut assets = Assets::new();
    let mesh = make_mesh(&mut device, &mut assets);
    let model = assets.add_model(Model::with_meshes([mesh]));
    let mut scene = Scene::new();
    scene.spawn(Entity::new(model));

    let batches = cull_scene(&scene, &assets, None, None, &RenderSettings::default());
    assert!(batches.groups.is_empty());
}

// ============================================================================
// Material resolution
// ============================================================================

#[test]
fn material_resolution_prefers_override_then_entity_then_mesh() {
    let mut device = TraceDevice::new();
    let mut assets = Assets::new();
    let mesh = make_mesh(&mut device, &mut assets);
    let mesh_material = make_material(&mut assets);
    let entity_material = make_material(&mut assets);
    let override_material = make_material(&mut assets);
    assets.meshes[mesh].material = Some(mesh_material);
    let model = assets.add_model(Model::with_meshes([mesh]));

    let camera = Camera::at(Vec3::ZERO);
    let settings = RenderSettings::default();

    // Mesh-level only.
    let mut scene = Scene::new();
    scene.spawn(Entity::at(model, Vec3::new(0.0, 0.0, -2.0)));
    let batches = cull_scene(&scene, &assets, Some(&camera), None, &settings);
    assert_eq!(batches.groups[0].key.material, Some(mesh_material));

    // Entity-level wins over mesh-level.
    let mut scene = Scene::new();
    let mut entity = Entity::at(model, Vec3::new(0.0, 0.0, -2.0));
    entity.material = Some(entity_material);
    scene.spawn(entity);
    let batches = cull_scene(&scene, &assets, Some(&camera), None, &settings);
    assert_eq!(batches.groups[0].key.material, Some(entity_material));

    // Override wins over both.
    let batches = cull_scene(&scene, &assets, Some(&camera), Some(override_material), &settings);
    assert_eq!(batches.groups[0].key.material, Some(override_material));
}

// ============================================================================
// Frustum culling
// ============================================================================

fn unit_bounds() -> BoundingBox {
    BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0))
}

#[test]
fn frustum_culling_defaults_off() {
    let mut device = TraceDevice::new();
    let mut assets = Assets::new();
    let mesh = make_mesh(&mut device, &mut assets);
    assets.meshes[mesh].bounds = unit_bounds();
    let model = assets.add_model(Model::with_meshes([mesh]));

    let mut scene = Scene::new();
    // Behind the camera (default orientation looks down -Z).
    scene.spawn(Entity::at(model, Vec3::new(0.0, 0.0, 10.0)));

    let camera = Camera::at(Vec3::ZERO);
    let settings = RenderSettings::default();
    assert!(!settings.frustum_culling);
    let batches = cull_scene(&scene, &assets, Some(&camera), None, &settings);
    assert_eq!(batches.instance_count(), 1);
}

#[test]
fn frustum_culling_rejects_box_behind_camera() {
    let mut device = TraceDevice::new();
    let mut assets = Assets::new();
    let mesh = make_mesh(&mut device, &mut assets);
    assets.meshes[mesh].bounds = unit_bounds();
    let model = assets.add_model(Model::with_meshes([mesh]));

    let camera = Camera::at(Vec3::ZERO);
    let mut settings = RenderSettings::default();
    settings.frustum_culling = true;

    let mut scene = Scene::new();
    scene.spawn(Entity::at(model, Vec3::new(0.0, 0.0, 10.0)));
    let batches = cull_scene(&scene, &assets, Some(&camera), None, &settings);
    assert_eq!(batches.instance_count(), 0);

    // The same entity in front of the camera survives.
    let mut scene = Scene::new();
    scene.spawn(Entity::at(model, Vec3::new(0.0, 0.0, -10.0)));
    let batches = cull_scene(&scene, &assets, Some(&camera), None, &settings);
    assert_eq!(batches.instance_count(), 1);
}

#[test]
fn degenerate_bounds_are_never_culled() {
    let mut device = TraceDevice::new();
    let mut assets = Assets::new();
    let mesh = make_mesh(&mut device, &mut assets);
    // Meshes default to an inverted-extent box when bounds are unknown.
    assert!(assets.meshes[mesh].bounds.is_degenerate());
    let model = assets.add_model(Model::with_meshes([mesh]));

    let camera = Camera::at(Vec3::ZERO);
    let mut settings = RenderSettings::default();
    settings.frustum_culling = true;

    let mut scene = Scene::new();
    scene.spawn(Entity::at(model, Vec3::new(0.0, 0.0, 10.0)));
    let batches = cull_scene(&scene, &assets, Some(&camera), None, &settings);
    assert_eq!(batches.instance_count(), 1);
}

#[test]
fn box_outside_frustum_direct() {
    let camera = Camera::at(Vec3::ZERO);
    let view_proj = camera.projection_matrix() * camera.view_matrix();

    let behind = view_proj * glam::Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0));
    assert!(box_outside_frustum(&unit_bounds(), &behind));

    let in_front = view_proj * glam::Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0));
    assert!(!box_outside_frustum(&unit_bounds(), &in_front));

    assert!(!box_outside_frustum(&BoundingBox::empty(), &behind));
}

// ============================================================================
// Grouping
// ============================================================================

#[test]
fn grouping_is_a_partition_of_all_drawcalls() {
    let mut device = TraceDevice::new();
    let mut assets = Assets::new();
    let mesh_a = make_mesh(&mut device, &mut assets);
    let mesh_b = make_mesh(&mut device, &mut assets);
    let material = make_material(&mut assets);
    let model_a = assets.add_model(Model::with_meshes([mesh_a]));
    let model_b = assets.add_model(Model::with_meshes([mesh_a, mesh_b]));

    let mut scene = Scene::new();
    scene.spawn(Entity::at(model_a, Vec3::new(0.0, 0.0, -2.0)));
    scene.spawn(Entity::at(model_a, Vec3::new(1.0, 0.0, -2.0)));
    let mut overridden = Entity::at(model_a, Vec3::new(2.0, 0.0, -2.0));
    overridden.material = Some(material);
    scene.spawn(overridden);
    scene.spawn(Entity::at(model_b, Vec3::new(3.0, 0.0, -2.0)));

    let camera = Camera::at(Vec3::ZERO);
    let batches = cull_scene(&scene, &assets, Some(&camera), None, &RenderSettings::default());

    // 3 model_a drawcalls + 2 model_b drawcalls.
    assert_eq!(batches.instance_count(), 5);

    // Every group key is distinct, so each drawcall lands in exactly one.
    for (i, group) in batches.groups.iter().enumerate() {
        assert!(!group.instances.is_empty());
        for other in &batches.groups[i + 1..] {
            assert_ne!(group.key, other.key);
        }
    }

    // Two plain model_a entities share a group; the override splits off.
    let plain = batches
        .groups
        .iter()
        .find(|g| g.key.model == model_a && g.key.material.is_none())
        .expect("plain group");
    assert_eq!(plain.instances.len(), 2);
}

#[test]
fn grouping_is_deterministic_for_a_fixed_scene() {
    let mut device = TraceDevice::new();
    let mut assets = Assets::new();
    let mesh_a = make_mesh(&mut device, &mut assets);
    let mesh_b = make_mesh(&mut device, &mut assets);
    let model = assets.add_model(Model::with_meshes([mesh_a, mesh_b]));

    let mut scene = Scene::new();
    for i in 0..4 {
        scene.spawn(Entity::at(model, Vec3::new(i as f32, 0.0, -2.0)));
    }

    let camera = Camera::at(Vec3::ZERO);
    let settings = RenderSettings::default();
    let first = cull_scene(&scene, &assets, Some(&camera), None, &settings);
    let second = cull_scene(&scene, &assets, Some(&camera), None, &settings);

    assert_eq!(first.groups.len(), second.groups.len());
    for (a, b) in first.groups.iter().zip(&second.groups) {
        assert_eq!(a.key, b.key);
        assert_eq!(a.instances.len(), b.instances.len());
    }
}
