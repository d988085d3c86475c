//! Draw execution.
//!
//! Consumes the culler's draw groups and issues the minimal state-change and
//! draw sequence per group: material, camera, lights, then either one
//! instanced draw (static batches) or one skinned draw per entity. Draw-time
//! failures are reported on the log channel and abort only the offending
//! draw; the frame always runs to completion.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::gpu::{CullMode, GpuDevice, MapAccess, Primitive, RenderState, ShaderId, UniformValue};
use crate::renderer::context::RenderContext;
use crate::renderer::cull::{DrawGroup, FrameBatches};
use crate::renderer::settings::RenderSettings;
use crate::renderer::skeleton;
use crate::scene::{Assets, Camera, LIGHT_LIMIT, Material, Model, Scene, Shader, ShaderCaps};

/// One light as laid out in the shared light uniform block (std140).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightData {
    pub kind: i32,
    pub intensity: f32,
    /// Cosine of the half cone angle.
    pub cos_half_arc: f32,
    pub _pad0: f32,
    pub position: [f32; 3],
    pub _pad1: f32,
    pub direction: [f32; 3],
    pub _pad2: f32,
    pub color: [f32; 4],
}

/// Whether a group may be drawn instanced: the shader must accept the
/// per-instance stream and the mesh must not be skinned per entity.
#[must_use]
pub fn instancing_eligible(caps: ShaderCaps, mesh_animated: bool) -> bool {
    caps.contains(ShaderCaps::INSTANCING) && !mesh_animated
}

/// Fills the shared light buffer from the scene's lights, up to
/// [`LIGHT_LIMIT`] entries in iteration order, and returns the count
/// written. Directions are normalized and cone angles converted to cosines
/// on the way in.
fn populate_lights(device: &mut dyn GpuDevice, ctx: &RenderContext, scene: &Scene) -> i32 {
    let mapped = match device.map_buffer(ctx.lights_buffer(), MapAccess::WriteOnly) {
        Ok(mapped) => mapped,
        Err(err) => {
            log::error!("failed to map light buffer: {err}");
            return 0;
        }
    };

    // The mapped range carries no alignment guarantee, so each entry is
    // written as bytes.
    let stride = size_of::<LightData>();
    let mut count = 0usize;
    for light in scene.lights() {
        if count >= LIGHT_LIMIT {
            // Documented drop policy: excess lights are silently ignored.
            break;
        }
        let slot = LightData {
            kind: light.kind as i32,
            intensity: light.intensity,
            cos_half_arc: (0.5 * light.arc.to_radians()).cos(),
            _pad0: 0.0,
            position: light.position.to_array(),
            _pad1: 0.0,
            direction: light.direction.normalize_or_zero().to_array(),
            _pad2: 0.0,
            color: light.color.to_array(),
        };
        mapped[count * stride..(count + 1) * stride].copy_from_slice(bytemuck::bytes_of(&slot));
        count += 1;
    }

    if let Err(err) = device.unmap_buffer(ctx.lights_buffer()) {
        log::error!("failed to unmap light buffer: {err}");
    }
    count as i32
}

fn bind_material(
    device: &mut dyn GpuDevice,
    ctx: &RenderContext,
    assets: &Assets,
    group: &DrawGroup,
) -> Shader {
    let fallback = Material::default();
    let material = match group.key.material {
        Some(handle) => assets.materials.get(handle).unwrap_or_else(|| {
            log::error!("draw group references a stale material handle, using defaults");
            &fallback
        }),
        None => &fallback,
    };

    let shader = material
        .shader
        .and_then(|handle| assets.shaders.get(handle))
        .unwrap_or_else(|| ctx.default_shader())
        .clone();

    let program = shader.program;
    device.bind_shader(program);
    device.set_uniform(program, "vecColor", UniformValue::Vec4(material.color));
    device.set_uniform(
        program,
        "vecAttributes",
        UniformValue::Vec3(Vec3::new(
            material.roughness,
            material.metallic,
            material.fresnel,
        )),
    );
    device.set_uniform(program, "vecEmission", UniformValue::Vec3(material.emission));

    let white = ctx.white_texture();
    device.bind_texture(0, material.albedo_texture.unwrap_or(white));
    device.bind_texture(1, material.attributes_texture.unwrap_or(white));
    device.bind_texture(2, material.emission_texture.unwrap_or(white));
    device.bind_texture(
        3,
        material.normal_texture.unwrap_or_else(|| ctx.flat_normal_texture()),
    );

    shader
}

/// Executes every draw group of a frame. See module docs for the per-group
/// ordering contract.
pub fn draw_groups(
    device: &mut dyn GpuDevice,
    ctx: &mut RenderContext,
    scene: &Scene,
    assets: &Assets,
    camera: &Camera,
    batches: &FrameBatches,
    settings: &RenderSettings,
) {
    let view = camera.view_matrix();
    let proj = camera.projection_matrix();

    let mut bone_scratch: Vec<Mat4> = Vec::new();
    let mut instance_scratch: Vec<Mat4> = Vec::new();

    for group in &batches.groups {
        // 1. Material state, with default-shader fallback.
        let shader = bind_material(device, ctx, assets, group);
        let program = shader.program;

        // 2. Camera state.
        device.set_uniform(program, "matView", UniformValue::Mat4(view));
        device.set_uniform(program, "matProj", UniformValue::Mat4(proj));
        device.set_uniform(program, "vecViewPos", UniformValue::Vec3(camera.position));
        device.set_uniform(program, "vecFogColor", UniformValue::Vec4(settings.fog_color));
        device.set_uniform(program, "fFovScale", UniformValue::Float(camera.fov_scale()));
        device.set_uniform(program, "fGamma", UniformValue::Float(settings.gamma));

        // 3. Lights. A shader without the block records zero lights and the
        //    buffer is left untouched.
        let light_count = if device.shader_has_block(program, "LightBlock") {
            let count = populate_lights(device, ctx, scene);
            if let Err(err) = device.bind_uniform_block(program, "LightBlock", ctx.lights_buffer())
            {
                log::error!("failed to bind light block: {err}");
            }
            count
        } else {
            0
        };
        device.set_uniform(program, "iLightCount", UniformValue::Int(light_count));

        let Some(mesh) = assets.meshes.get(group.key.mesh) else {
            log::error!("draw group references a stale mesh handle, skipping group");
            continue;
        };
        let Some(model) = assets.models.get(group.key.model) else {
            log::error!("draw group references a stale model handle, skipping group");
            continue;
        };

        // 4. Geometry streams and sidedness.
        if let Err(err) = device
            .bind_index_buffer(mesh.index_buffer)
            .and_then(|()| device.bind_vertex_buffer(mesh.vertex_buffer))
        {
            log::error!("failed to bind mesh buffers: {err}");
            continue;
        }
        let cull = if group.key.double_sided {
            CullMode::None
        } else {
            CullMode::Back
        };
        device.set_state(RenderState::scene(cull));

        // 5. Instancing eligibility decides the draw path.
        if instancing_eligible(shader.caps, mesh.animated) {
            draw_instanced(device, ctx, model, mesh.index_count, program, group, &mut bone_scratch, &mut instance_scratch);
        } else {
            draw_skinned(device, ctx, scene, model, mesh.index_count, program, group, &mut bone_scratch);
        }
    }
}

/// Skinned path: one draw per entity, each preceded by that entity's bone
/// matrix upload.
fn draw_skinned(
    device: &mut dyn GpuDevice,
    ctx: &RenderContext,
    scene: &Scene,
    model: &Model,
    index_count: u32,
    program: ShaderId,
    group: &DrawGroup,
    bone_scratch: &mut Vec<Mat4>,
) {
    device.set_uniform(program, "iInstanced", UniformValue::Int(0));

    for instance in &group.instances {
        if model.bone_count() > 0 {
            let empty = Vec::new();
            let pose = scene
                .entities
                .get(instance.entity)
                .map_or(&empty, |entity| &entity.pose);
            skeleton::evaluate_pose(model, pose, bone_scratch);
            if let Err(err) = skeleton::upload_bones(device, ctx.bones_buffer(), bone_scratch) {
                log::error!("bone upload failed: {err}");
                continue;
            }
            if let Err(err) = device.bind_uniform_block(program, "BoneBlock", ctx.bones_buffer()) {
                log::error!("failed to bind bone block: {err}");
                continue;
            }
        }
        device.set_uniform(program, "matWorld", UniformValue::Mat4(instance.world));
        if let Err(err) = device.draw_indexed(Primitive::Triangles, 0, index_count) {
            log::error!("draw failed: {err}");
        }
    }
}

/// Instanced path: static rest-pose bones once, then a single draw covering
/// every instance in the group.
fn draw_instanced(
    device: &mut dyn GpuDevice,
    ctx: &mut RenderContext,
    model: &Model,
    index_count: u32,
    program: ShaderId,
    group: &DrawGroup,
    bone_scratch: &mut Vec<Mat4>,
    instance_scratch: &mut Vec<Mat4>,
) {
    if model.bone_count() > 0 {
        skeleton::evaluate_rest_pose(model, bone_scratch);
        if let Err(err) = skeleton::upload_bones(device, ctx.bones_buffer(), bone_scratch) {
            log::error!("bone upload failed: {err}");
            return;
        }
        if let Err(err) = device.bind_uniform_block(program, "BoneBlock", ctx.bones_buffer()) {
            log::error!("failed to bind bone block: {err}");
            return;
        }
    }

    device.set_uniform(program, "iInstanced", UniformValue::Int(1));

    instance_scratch.clear();
    instance_scratch.extend(group.instances.iter().map(|instance| instance.world));
    let bytes: &[u8] = bytemuck::cast_slice(instance_scratch);

    let upload = ctx
        .ensure_instance_capacity(device, bytes.len())
        .and_then(|()| device.buffer_update(ctx.instance_buffer(), 0, bytes))
        .and_then(|()| device.bind_instance_buffer(Some(ctx.instance_buffer())));
    if let Err(err) = upload {
        log::error!("instance stream upload failed: {err}");
        device.set_uniform(program, "iInstanced", UniformValue::Int(0));
        return;
    }

    if let Err(err) = device.draw_indexed_instanced(
        Primitive::Triangles,
        0,
        index_count,
        group.instances.len() as u32,
    ) {
        log::error!("instanced draw failed: {err}");
    }

    if let Err(err) = device.bind_instance_buffer(None) {
        log::error!("failed to unbind instance stream: {err}");
    }
    device.set_uniform(program, "iInstanced", UniformValue::Int(0));
}
