//! Post-process chain tests
//!
//! Verifies target lifetime (lazy creation, reuse, in-place resize) and the
//! per-frame pass sequence: scene target, bloom blur, combine, tonemap,
//! swapchain.

use ashfall::gpu::trace::{Command, TraceDevice};
use ashfall::gpu::{FramebufferDesc, FramebufferId, RenderState, TextureFormat};
use ashfall::renderer::{Renderer, View};
use ashfall::scene::{Assets, Camera, Scene};

// ============================================================================
// Helpers
// ============================================================================

fn rig(width: u32, height: u32) -> (TraceDevice, Renderer, Scene, Assets) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut device = TraceDevice::new();
    let mut renderer = Renderer::new(&mut device, width, height).unwrap();
    let mut scene = Scene::new();
    let camera = scene.add_camera(Camera::default());
    renderer.add_view(View::new(camera));
    (device, renderer, scene, Assets::new())
}

fn framebuffer_binds(commands: &[Command]) -> Vec<Option<FramebufferId>> {
    commands
        .iter()
        .filter_map(|c| match c {
            Command::BindFramebuffer(fb) => Some(*fb),
            _ => None,
        })
        .collect()
}

fn created_framebuffers(commands: &[Command]) -> Vec<FramebufferDesc> {
    commands
        .iter()
        .filter_map(|c| match c {
            Command::CreateFramebuffer(_, desc) => Some(*desc),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Pass sequence
// ============================================================================

#[test]
fn frame_walks_scene_bloom_combine_swapchain() {
    let (mut device, mut renderer, scene, assets) = rig(800, 600);
    renderer.render_frame(&mut device, &scene, &assets);

    let binds = framebuffer_binds(device.commands());
    assert_eq!(binds.len(), 5);
    // Screen clear first, swapchain output last.
    assert_eq!(binds[0], None);
    assert_eq!(binds[4], None);
    // Three distinct offscreen stages in between.
    let stages: Vec<FramebufferId> = binds[1..4]
        .iter()
        .map(|fb| fb.expect("offscreen stage"))
        .collect();
    assert_ne!(stages[0], stages[1]);
    assert_ne!(stages[1], stages[2]);
    assert_ne!(stages[0], stages[2]);

    assert!(matches!(device.commands().last(), Some(Command::Present)));
}

#[test]
fn fullscreen_passes_disable_depth_and_culling() {
    let (mut device, mut renderer, scene, assets) = rig(800, 600);
    renderer.render_frame(&mut device, &scene, &assets);

    let fullscreen_states = device
        .commands()
        .iter()
        .filter(|c| matches!(c, Command::SetState(state) if *state == RenderState::fullscreen()))
        .count();
    // Blur, combine, tonemap.
    assert_eq!(fullscreen_states, 3);
}

// ============================================================================
// Target lifetime
// ============================================================================

#[test]
fn targets_are_created_once_and_reused_across_frames() {
    let (mut device, mut renderer, scene, assets) = rig(800, 600);
    renderer.render_frame(&mut device, &scene, &assets);

    let created = created_framebuffers(device.commands());
    assert_eq!(created.len(), 3);
    for desc in &created {
        assert_eq!(desc.format, TextureFormat::Rgba16Float);
        assert!(desc.depth);
    }
    // Scene and combine at full resolution, bloom at half.
    let mut sizes: Vec<(u32, u32)> = created.iter().map(|d| (d.width, d.height)).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![(400, 300), (800, 600), (800, 600)]);

    let first_binds = framebuffer_binds(device.commands());
    let mark = device.commands().len();
    renderer.render_frame(&mut device, &scene, &assets);

    let second = &device.commands()[mark..];
    assert!(created_framebuffers(second).is_empty());
    assert_eq!(framebuffer_binds(second), first_binds);
}

#[test]
fn resize_adjusts_targets_in_place() {
    let (mut device, mut renderer, scene, assets) = rig(800, 600);
    renderer.render_frame(&mut device, &scene, &assets);

    renderer.resize(400, 300);
    let mark = device.commands().len();
    renderer.render_frame(&mut device, &scene, &assets);

    let second = &device.commands()[mark..];
    assert!(created_framebuffers(second).is_empty());
    let mut resizes: Vec<(u32, u32)> = second
        .iter()
        .filter_map(|c| match c {
            Command::ResizeFramebuffer { width, height, .. } => Some((*width, *height)),
            _ => None,
        })
        .collect();
    resizes.sort_unstable();
    assert_eq!(resizes, vec![(200, 150), (400, 300), (400, 300)]);
}

#[test]
fn disabled_bloom_renders_directly_to_the_output() {
    let (mut device, mut renderer, scene, assets) = rig(800, 600);
    renderer.settings.bloom = false;
    renderer.render_frame(&mut device, &scene, &assets);

    assert!(created_framebuffers(device.commands()).is_empty());
    // Only the screen clear and the direct view target, both the swapchain.
    assert_eq!(framebuffer_binds(device.commands()), vec![None, None]);
    assert!(matches!(device.commands().last(), Some(Command::Present)));
}

#[test]
fn tonemap_receives_exposure_and_gamma() {
    let (mut device, mut renderer, scene, assets) = rig(800, 600);
    renderer.settings.exposure = 1.5;
    renderer.settings.gamma = 2.4;
    renderer.render_frame(&mut device, &scene, &assets);

    let has_uniform = |name: &str, expected: f32| {
        device.commands().iter().any(|c| {
            matches!(c, Command::SetUniform { name: n, value: ashfall::gpu::UniformValue::Float(v), .. }
                if n == name && (*v - expected).abs() < 1e-6)
        })
    };
    assert!(has_uniform("fExposure", 1.5));
    assert!(has_uniform("fGamma", 2.4));
}
