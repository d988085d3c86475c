//! Renderer configuration.

use glam::Vec4;

use crate::scene::model::LOD_BANDS;

/// Tunables read by the render core each frame.
///
/// The LOD table is ascending: band `i` is selected for the smallest `i`
/// with `distance < lod_distances[i]`; beyond the last entry the entity is
/// not rendered at all.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Ascending LOD band thresholds, world units.
    pub lod_distances: [f32; LOD_BANDS],
    /// Clip-space AABB rejection. Off by default; the scene pass is cheap
    /// enough without it for small scenes.
    pub frustum_culling: bool,
    /// Run the bloom + tonemap chain. When off, the scene pass renders
    /// straight to the output target.
    pub bloom: bool,
    /// Scene clear color.
    pub sky_color: Vec4,
    /// Screen clear color, visible where no view draws.
    pub screen_color: Vec4,
    /// Fog color constant handed to scene shaders.
    pub fog_color: Vec4,
    /// Exposure for the tonemap pass.
    pub exposure: f32,
    /// Display gamma, consumed by the tonemap pass.
    pub gamma: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            lod_distances: [
                16.0, 24.0, 32.0, 48.0, 64.0, 96.0, 128.0, 192.0, 256.0, 384.0, 512.0, 768.0,
                1024.0, 1536.0, 2048.0, 3072.0,
            ],
            frustum_culling: false,
            bloom: true,
            sky_color: Vec4::new(0.3, 0.7, 1.0, 1.0),
            screen_color: Vec4::new(0.0, 0.0, 0.5, 1.0),
            fog_color: Vec4::new(0.8, 0.85, 0.9, 1.0),
            exposure: 1.0,
            gamma: 2.2,
        }
    }
}
