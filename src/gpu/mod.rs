//! GPU resource abstraction.
//!
//! The render core never talks to a graphics API directly. It drives an
//! implementation of [`GpuDevice`]: opaque typed handles plus a small
//! operation set (create / map / unmap / update / bind / draw). The real
//! backend lives outside this crate; [`trace::TraceDevice`] is an in-memory
//! implementation used by the test suite.

pub mod trace;

use glam::{Mat4, Vec3, Vec4};

use crate::errors::Result;

// ============================================================================
// Opaque handles
// ============================================================================

macro_rules! gpu_handle {
    ($(#[$doc:meta] $name:ident),+ $(,)?) => {
        $(
            #[$doc]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(pub(crate) u32);

            impl $name {
                /// Raw backend id, for diagnostics only.
                #[must_use]
                pub fn raw(self) -> u32 {
                    self.0
                }
            }
        )+
    };
}

gpu_handle! {
    /// Opaque handle to a device buffer.
    BufferId,
    /// Opaque handle to a compiled and linked shader program.
    ShaderId,
    /// Opaque handle to a device texture.
    TextureId,
    /// Opaque handle to an offscreen framebuffer.
    FramebufferId,
}

// ============================================================================
// Descriptors
// ============================================================================

/// What a buffer stores. Binding a buffer as the wrong kind is an
/// invalid-argument error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
    /// Per-instance vertex stream (world matrices for instanced draws).
    Instance,
}

/// Access mode for a mapped buffer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapAccess {
    Read,
    ReadWrite,
    WriteOnly,
}

/// Shader pipeline stage a source fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    TessControl,
    TessEval,
    Fragment,
}

/// One named source fragment. A program links one or more fragments per
/// stage (the default object shader links several fragment-stage pieces).
#[derive(Debug, Clone, Copy)]
pub struct ShaderSource<'a> {
    pub stage: ShaderStage,
    pub name: &'a str,
    pub source: &'a str,
}

/// A uniform value, tagged by semantic type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

/// Color target format for offscreen framebuffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    /// Floating-point color, required by the HDR post chain.
    Rgba16Float,
}

/// Offscreen framebuffer description: N color targets plus optional depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferDesc {
    pub width: u32,
    pub height: u32,
    pub color_count: u32,
    pub format: TextureFormat,
    pub depth: bool,
}

/// Face culling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Back,
}

/// Fixed-function state for subsequent draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    pub depth_test: bool,
    pub blend: bool,
    pub cull: CullMode,
}

impl RenderState {
    /// State for opaque scene geometry; culling is set per draw group.
    #[must_use]
    pub fn scene(cull: CullMode) -> Self {
        Self {
            depth_test: true,
            blend: false,
            cull,
        }
    }

    /// State for fullscreen post passes: nothing occludes, nothing blends.
    #[must_use]
    pub fn fullscreen() -> Self {
        Self {
            depth_test: false,
            blend: false,
            cull: CullMode::None,
        }
    }
}

/// Primitive topology for indexed draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Triangles,
    Lines,
    Points,
}

// ============================================================================
// Device trait
// ============================================================================

/// The abstract GPU device the render core drives.
///
/// Command submission is asynchronous on real backends, but the core issues
/// commands in a fixed deterministic order from a single thread. Mapped
/// ranges are scoped critical sections: map, write, unmap, with the unmap
/// issued before any draw that reads the buffer.
pub trait GpuDevice {
    // --- Buffers ---------------------------------------------------------

    /// Creates an empty buffer of the given kind.
    fn create_buffer(&mut self, kind: BufferKind, label: &str) -> BufferId;

    /// Allocates (or reallocates) backing storage. Existing contents are
    /// discarded on reallocation.
    fn buffer_reserve(&mut self, buffer: BufferId, size: usize) -> Result<()>;

    /// Current storage size in bytes.
    fn buffer_len(&self, buffer: BufferId) -> usize;

    /// Writes a sub-range without mapping.
    fn buffer_update(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<()>;

    /// Maps the whole buffer. The returned slice is valid until
    /// [`GpuDevice::unmap_buffer`]; mapping an already-mapped buffer is an
    /// error.
    fn map_buffer(&mut self, buffer: BufferId, access: MapAccess) -> Result<&mut [u8]>;

    /// Ends a map scope.
    fn unmap_buffer(&mut self, buffer: BufferId) -> Result<()>;

    fn destroy_buffer(&mut self, buffer: BufferId);

    // --- Shaders ---------------------------------------------------------

    /// Compiles and links a program from named source fragments.
    fn create_shader(&mut self, sources: &[ShaderSource<'_>]) -> Result<ShaderId>;

    fn bind_shader(&mut self, shader: ShaderId);

    /// Sets a named uniform on a program. Unknown names are ignored, as
    /// uniforms may be optimized out of a linked program.
    fn set_uniform(&mut self, shader: ShaderId, name: &str, value: UniformValue);

    /// Whether the linked program declares the named uniform block.
    fn shader_has_block(&self, shader: ShaderId, block: &str) -> bool;

    /// Binds a uniform buffer to the named block of a program.
    fn bind_uniform_block(&mut self, shader: ShaderId, block: &str, buffer: BufferId)
    -> Result<()>;

    // --- Textures --------------------------------------------------------

    /// Creates a 1x1 texture of the given color (fallback textures).
    fn create_pixel_texture(&mut self, rgba: [f32; 4], label: &str) -> TextureId;

    fn bind_texture(&mut self, slot: u32, texture: TextureId);

    // --- Framebuffers ----------------------------------------------------

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<FramebufferId>;

    /// Resizes attachments in place, keeping formats.
    fn resize_framebuffer(&mut self, fb: FramebufferId, width: u32, height: u32) -> Result<()>;

    /// The texture backing a color attachment, for sampling in later passes.
    fn framebuffer_color(&self, fb: FramebufferId, index: u32) -> Option<TextureId>;

    /// Binds a framebuffer as the draw target; `None` is the swapchain.
    fn bind_framebuffer(&mut self, fb: Option<FramebufferId>);

    // --- Geometry streams ------------------------------------------------

    fn bind_vertex_buffer(&mut self, buffer: BufferId) -> Result<()>;

    fn bind_index_buffer(&mut self, buffer: BufferId) -> Result<()>;

    /// Binds (or unbinds) the per-instance transform stream.
    fn bind_instance_buffer(&mut self, buffer: Option<BufferId>) -> Result<()>;

    // --- State & draws ---------------------------------------------------

    fn set_state(&mut self, state: RenderState);

    fn set_viewport(&mut self, width: u32, height: u32);

    fn clear(&mut self, color: Option<Vec4>, depth: Option<f32>);

    /// One indexed draw over the bound vertex/index buffers.
    fn draw_indexed(&mut self, primitive: Primitive, offset: u32, count: u32) -> Result<()>;

    /// One instanced indexed draw covering `instances` copies.
    fn draw_indexed_instanced(
        &mut self,
        primitive: Primitive,
        offset: u32,
        count: u32,
        instances: u32,
    ) -> Result<()>;

    /// Swaps the frame to screen.
    fn present(&mut self);
}
