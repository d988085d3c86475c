//! The frame renderer.
//!
//! Single-threaded and frame-synchronous: [`Renderer::render_frame`] walks
//! the layer-sorted view list, culls and batches the scene for each view's
//! camera, executes the draw groups into the post chain's scene target, and
//! resolves bloom and tonemap into the swapchain. Once a frame starts it
//! runs to completion; failures are reported and the frame continues.

pub mod context;
pub mod cull;
pub mod draw;
pub mod post;
pub mod settings;
pub mod skeleton;

pub use context::RenderContext;
pub use cull::{DrawGroup, Drawcall, FrameBatches, GroupKey, cull_scene, select_lod};
pub use draw::{LightData, draw_groups, instancing_eligible};
pub use settings::RenderSettings;

use crate::errors::Result;
use crate::gpu::{FramebufferId, GpuDevice};
use crate::scene::{Assets, Camera, CameraHandle, MaterialHandle, Scene};

/// One draw target: a camera rendered at a layer depth. Views render in
/// ascending layer order.
#[derive(Debug, Clone)]
pub struct View {
    pub layer: i32,
    pub camera: Option<CameraHandle>,
    /// Forces every drawcall of this view to one material (depth-only or
    /// debug passes).
    pub material_override: Option<MaterialHandle>,
}

impl View {
    #[must_use]
    pub fn new(camera: CameraHandle) -> Self {
        Self {
            layer: 0,
            camera: Some(camera),
            material_override: None,
        }
    }

    #[must_use]
    pub fn with_layer(camera: CameraHandle, layer: i32) -> Self {
        Self {
            layer,
            ..Self::new(camera)
        }
    }
}

/// The render core's top-level object. Owns the [`RenderContext`] and the
/// view list; drives one whole frame per [`Renderer::render_frame`] call.
#[derive(Debug)]
pub struct Renderer {
    ctx: RenderContext,
    pub settings: RenderSettings,
    pub views: Vec<View>,
    width: u32,
    height: u32,
}

impl Renderer {
    /// Initializes the shared render resources. Fatal on shader compile
    /// failure; everything afterwards degrades per draw instead.
    pub fn new(device: &mut dyn GpuDevice, width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            ctx: RenderContext::new(device)?,
            settings: RenderSettings::default(),
            views: Vec::new(),
            width,
            height,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    pub fn add_view(&mut self, view: View) {
        self.views.push(view);
    }

    #[must_use]
    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    /// Renders one frame: clear, per-view scene + post chain, present.
    ///
    /// Views without a resolvable camera produce no output; this is not an
    /// error. Nothing propagates out of this method — every failure is
    /// reported on the log channel and the frame completes.
    pub fn render_frame(&mut self, device: &mut dyn GpuDevice, scene: &Scene, assets: &Assets) {
        // Stable sort: equal layers keep insertion order.
        self.views.sort_by_key(|view| view.layer);

        device.bind_framebuffer(None);
        device.set_viewport(self.width, self.height);
        device.clear(Some(self.settings.screen_color), None);

        let views = std::mem::take(&mut self.views);
        for view in &views {
            let camera = view.camera.and_then(|handle| scene.cameras.get(handle));
            self.render_view(device, scene, assets, camera, view.material_override, None);
        }
        self.views = views;

        device.present();
    }

    /// Renders one camera into `output` (`None` = swapchain), through the
    /// post chain when bloom is enabled.
    pub fn render_view(
        &mut self,
        device: &mut dyn GpuDevice,
        scene: &Scene,
        assets: &Assets,
        camera: Option<&Camera>,
        material_override: Option<MaterialHandle>,
        output: Option<FramebufferId>,
    ) {
        let batches = cull::cull_scene(scene, assets, camera, material_override, &self.settings);
        let Some(camera) = camera else {
            return;
        };

        if self.settings.bloom {
            if let Err(err) = post::ensure_targets(device, &mut self.ctx.post, self.width, self.height)
            {
                log::error!("post targets unavailable: {err}");
                return;
            }
            post::begin_scene_stage(device, &self.ctx.post, &self.settings);
            draw::draw_groups(
                device,
                &mut self.ctx,
                scene,
                assets,
                camera,
                &batches,
                &self.settings,
            );
            if let Err(err) = post::resolve(device, &self.ctx, output, &self.settings) {
                log::error!("post chain failed: {err}");
            }
        } else {
            device.bind_framebuffer(output);
            device.set_viewport(self.width, self.height);
            device.clear(Some(self.settings.sky_color), Some(1.0));
            draw::draw_groups(
                device,
                &mut self.ctx,
                scene,
                assets,
                camera,
                &batches,
                &self.settings,
            );
        }
    }
}
