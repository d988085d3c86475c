//! Materials and shader assets.

use bitflags::bitflags;
use glam::{Vec3, Vec4};

use super::registry::ShaderHandle;
use crate::gpu::{ShaderId, TextureId};

bitflags! {
    /// Capabilities a linked shader program declares.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShaderCaps: u32 {
        /// Accepts a per-instance world-matrix vertex stream; only shaders
        /// with this capability are eligible for instanced draws.
        const INSTANCING = 1 << 0;
    }
}

/// A compiled program plus its declared capabilities.
#[derive(Debug, Clone)]
pub struct Shader {
    pub program: ShaderId,
    pub caps: ShaderCaps,
}

impl Shader {
    #[must_use]
    pub fn new(program: ShaderId, caps: ShaderCaps) -> Self {
        Self { program, caps }
    }
}

/// Surface description: shader reference plus PBR-ish scalar attributes and
/// up to four texture slots. A `None` shader falls back to the context's
/// default shader at draw time; unset color slots bind the white pixel, an
/// unset normal slot binds the flat normal.
#[derive(Debug, Clone)]
pub struct Material {
    pub shader: Option<ShaderHandle>,
    pub color: Vec4,
    pub roughness: f32,
    pub metallic: f32,
    pub fresnel: f32,
    pub emission: Vec3,
    pub albedo_texture: Option<TextureId>,
    pub attributes_texture: Option<TextureId>,
    pub emission_texture: Option<TextureId>,
    pub normal_texture: Option<TextureId>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            shader: None,
            color: Vec4::ONE,
            roughness: 1.0,
            metallic: 0.0,
            fresnel: 0.04,
            emission: Vec3::ZERO,
            albedo_texture: None,
            attributes_texture: None,
            emission_texture: None,
            normal_texture: None,
        }
    }
}

impl Material {
    #[must_use]
    pub fn with_shader(shader: ShaderHandle) -> Self {
        Self {
            shader: Some(shader),
            ..Self::default()
        }
    }
}
