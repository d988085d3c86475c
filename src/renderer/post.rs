//! Post-process pipeline.
//!
//! Chains the scene-lit image through bloom-blur, bloom-combine and tonemap
//! passes over ping-ponged offscreen targets:
//!
//! 1. scene pass → stage-1 target (full resolution, float color + depth)
//! 2. bloom blur: stage-1 → stage-2 (half resolution)
//! 3. combine: stage-1 + stage-2 → stage-3 (full resolution)
//! 4. tonemap: stage-3 → caller-provided output
//!
//! Targets are created lazily on first use and resized in place; they are
//! never recreated per frame. Fullscreen passes disable culling, blending
//! and depth testing.

use crate::errors::Result;
use crate::gpu::{
    FramebufferDesc, FramebufferId, GpuDevice, Primitive, RenderState, ShaderId, TextureFormat,
    UniformValue,
};
use crate::renderer::context::RenderContext;
use crate::renderer::settings::RenderSettings;

/// The three intermediate targets of the chain, persisted across frames.
#[derive(Debug, Default)]
pub struct PostTargets {
    scene: Option<FramebufferId>,
    bloom: Option<FramebufferId>,
    combine: Option<FramebufferId>,
    size: (u32, u32),
}

fn half_extent(extent: u32) -> u32 {
    (extent / 2).max(1)
}

impl PostTargets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stage-1 framebuffer the scene pass renders into. Valid after
    /// [`ensure_targets`].
    #[must_use]
    pub fn scene_target(&self) -> Option<FramebufferId> {
        self.scene
    }
}

/// Creates the chain's targets on first use, or resizes them in place when
/// the view size changed.
pub fn ensure_targets(
    device: &mut dyn GpuDevice,
    targets: &mut PostTargets,
    width: u32,
    height: u32,
) -> Result<()> {
    let desc = |w, h| FramebufferDesc {
        width: w,
        height: h,
        color_count: 1,
        format: TextureFormat::Rgba16Float,
        depth: true,
    };

    match (targets.scene, targets.bloom, targets.combine) {
        (Some(scene), Some(bloom), Some(combine)) => {
            if targets.size != (width, height) {
                device.resize_framebuffer(scene, width, height)?;
                device.resize_framebuffer(bloom, half_extent(width), half_extent(height))?;
                device.resize_framebuffer(combine, width, height)?;
            }
        }
        _ => {
            targets.scene = Some(device.create_framebuffer(&desc(width, height))?);
            targets.bloom = Some(
                device.create_framebuffer(&desc(half_extent(width), half_extent(height)))?,
            );
            targets.combine = Some(device.create_framebuffer(&desc(width, height))?);
        }
    }
    targets.size = (width, height);
    Ok(())
}

/// Binds the stage-1 target and clears it for the scene pass.
pub fn begin_scene_stage(
    device: &mut dyn GpuDevice,
    targets: &PostTargets,
    settings: &RenderSettings,
) {
    device.bind_framebuffer(targets.scene);
    let (width, height) = targets.size;
    device.set_viewport(width, height);
    device.clear(Some(settings.sky_color), Some(1.0));
}

fn fullscreen_pass(
    device: &mut dyn GpuDevice,
    ctx: &RenderContext,
    target: Option<FramebufferId>,
    width: u32,
    height: u32,
    shader: ShaderId,
    inputs: &[FramebufferId],
) -> Result<()> {
    device.bind_framebuffer(target);
    device.set_viewport(width, height);
    device.set_state(RenderState::fullscreen());
    device.bind_shader(shader);
    for (slot, &input) in inputs.iter().enumerate() {
        if let Some(texture) = device.framebuffer_color(input, 0) {
            device.bind_texture(slot as u32, texture);
        }
    }
    let (vertices, indices) = ctx.quad_buffers();
    device.bind_vertex_buffer(vertices)?;
    device.bind_index_buffer(indices)?;
    device.draw_indexed(Primitive::Triangles, 0, 6)
}

/// Runs the remaining chain after the scene pass: blur, combine, tonemap.
/// `output` is the final target; `None` is the swapchain.
pub fn resolve(
    device: &mut dyn GpuDevice,
    ctx: &RenderContext,
    output: Option<FramebufferId>,
    settings: &RenderSettings,
) -> Result<()> {
    let targets = &ctx.post;
    let (width, height) = targets.size;
    let (Some(scene), Some(bloom), Some(combine)) =
        (targets.scene, targets.bloom, targets.combine)
    else {
        // ensure_targets was not called this frame; nothing to resolve.
        return Ok(());
    };

    // Bloom extraction + blur at half resolution.
    fullscreen_pass(
        device,
        ctx,
        Some(bloom),
        half_extent(width),
        half_extent(height),
        ctx.blur_shader,
        &[scene],
    )?;

    // Combine scene and bloom at full resolution.
    fullscreen_pass(
        device,
        ctx,
        Some(combine),
        width,
        height,
        ctx.combine_shader,
        &[scene, bloom],
    )?;

    // Exposure tonemap into the caller's target.
    device.bind_framebuffer(output);
    device.set_viewport(width, height);
    device.set_state(RenderState::fullscreen());
    device.bind_shader(ctx.tonemap_shader);
    device.set_uniform(
        ctx.tonemap_shader,
        "fExposure",
        UniformValue::Float(settings.exposure),
    );
    device.set_uniform(
        ctx.tonemap_shader,
        "fGamma",
        UniformValue::Float(settings.gamma),
    );
    if let Some(texture) = device.framebuffer_color(combine, 0) {
        device.bind_texture(0, texture);
    }
    let (vertices, indices) = ctx.quad_buffers();
    device.bind_vertex_buffer(vertices)?;
    device.bind_index_buffer(indices)?;
    device.draw_indexed(Primitive::Triangles, 0, 6)
}
