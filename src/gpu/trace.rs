//! Command-recording GPU device.
//!
//! [`TraceDevice`] implements [`GpuDevice`] entirely in memory: buffers are
//! byte vectors, shaders keep their concatenated source for block
//! reflection, and every operation is appended to a command log. The test
//! suite drives the render core against it and asserts on the recorded
//! sequence.
//!
//! It also enforces the contracts the core promises to uphold: buffer-kind
//! checks at bind time, index-range checks at draw time, map/unmap pairing,
//! and "no buffer is mapped while a draw is issued".

use glam::Vec4;
use rustc_hash::FxHashMap;

use super::{
    BufferId, BufferKind, CullMode, FramebufferDesc, FramebufferId, GpuDevice, MapAccess,
    Primitive, RenderState, ShaderId, ShaderSource, TextureId, UniformValue,
};
use crate::errors::{RenderError, Result};

/// One recorded device operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateBuffer(BufferId, BufferKind),
    ReserveBuffer { buffer: BufferId, size: usize },
    UpdateBuffer { buffer: BufferId, offset: usize, len: usize },
    Map { buffer: BufferId, access: MapAccess },
    Unmap { buffer: BufferId },
    DestroyBuffer(BufferId),
    CreateShader(ShaderId),
    BindShader(ShaderId),
    SetUniform { shader: ShaderId, name: String, value: UniformValue },
    BindBlock { shader: ShaderId, block: String, buffer: BufferId },
    CreateTexture(TextureId),
    BindTexture { slot: u32, texture: TextureId },
    CreateFramebuffer(FramebufferId, FramebufferDesc),
    ResizeFramebuffer { fb: FramebufferId, width: u32, height: u32 },
    BindFramebuffer(Option<FramebufferId>),
    BindVertex(BufferId),
    BindIndex(BufferId),
    BindInstance(Option<BufferId>),
    SetState(RenderState),
    Viewport(u32, u32),
    Clear { color: Option<Vec4>, depth: Option<f32> },
    DrawIndexed { primitive: Primitive, offset: u32, count: u32 },
    DrawInstanced { primitive: Primitive, offset: u32, count: u32, instances: u32 },
    Present,
}

#[derive(Debug)]
struct TraceBuffer {
    kind: BufferKind,
    data: Vec<u8>,
    mapped: bool,
}

#[derive(Debug)]
struct TraceShader {
    source: String,
}

#[derive(Debug)]
struct TraceFramebuffer {
    desc: FramebufferDesc,
    colors: Vec<TextureId>,
}

/// In-memory recording device. See module docs.
#[derive(Debug, Default)]
pub struct TraceDevice {
    buffers: FxHashMap<u32, TraceBuffer>,
    shaders: FxHashMap<u32, TraceShader>,
    framebuffers: FxHashMap<u32, TraceFramebuffer>,
    textures: u32,
    next_id: u32,

    bound_vertex: Option<BufferId>,
    bound_index: Option<BufferId>,

    commands: Vec<Command>,
}

impl TraceDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Full command log, in issue order.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Current contents of a buffer.
    #[must_use]
    pub fn buffer_bytes(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer.0).map(|b| b.data.as_slice())
    }

    /// Number of draw commands (instanced or not) recorded so far.
    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawIndexed { .. } | Command::DrawInstanced { .. }))
            .count()
    }

    fn fresh_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn buffer(&self, id: BufferId) -> Result<&TraceBuffer> {
        self.buffers
            .get(&id.0)
            .ok_or(RenderError::InvalidHandle { kind: "buffer" })
    }

    fn expect_kind(&self, id: BufferId, kind: BufferKind) -> Result<()> {
        let buf = self.buffer(id)?;
        if buf.kind == kind {
            Ok(())
        } else {
            Err(RenderError::InvalidArgument(format!(
                "buffer {} is {:?}, expected {:?}",
                id.0, buf.kind, kind
            )))
        }
    }

    fn check_drawable(&self, offset: u32, count: u32) -> Result<()> {
        if self.buffers.values().any(|b| b.mapped) {
            return Err(RenderError::InvalidOperation(
                "draw issued while a buffer is mapped".into(),
            ));
        }
        let (Some(_vertex), Some(index)) = (self.bound_vertex, self.bound_index) else {
            return Err(RenderError::InvalidOperation(
                "either index, vertex or both buffers are not set".into(),
            ));
        };
        let index_count = self.buffer(index)?.data.len() / size_of::<u32>();
        if (offset + count) as usize > index_count {
            return Err(RenderError::InvalidOperation(format!(
                "index range {}..{} exceeds buffer length {index_count}",
                offset,
                offset + count
            )));
        }
        Ok(())
    }
}

impl GpuDevice for TraceDevice {
    fn create_buffer(&mut self, kind: BufferKind, _label: &str) -> BufferId {
        let id = BufferId(self.fresh_id());
        self.buffers.insert(
            id.0,
            TraceBuffer {
                kind,
                data: Vec::new(),
                mapped: false,
            },
        );
        self.commands.push(Command::CreateBuffer(id, kind));
        id
    }

    fn buffer_reserve(&mut self, buffer: BufferId, size: usize) -> Result<()> {
        self.buffer(buffer)?;
        let buf = self.buffers.get_mut(&buffer.0).expect("checked above");
        buf.data.clear();
        buf.data.resize(size, 0);
        self.commands.push(Command::ReserveBuffer { buffer, size });
        Ok(())
    }

    fn buffer_len(&self, buffer: BufferId) -> usize {
        self.buffers.get(&buffer.0).map_or(0, |b| b.data.len())
    }

    fn buffer_update(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<()> {
        let len = self.buffer(buffer)?.data.len();
        if offset + data.len() > len {
            return Err(RenderError::InvalidOperation(format!(
                "update range {}..{} exceeds buffer size {len}",
                offset,
                offset + data.len()
            )));
        }
        let buf = self.buffers.get_mut(&buffer.0).expect("checked above");
        buf.data[offset..offset + data.len()].copy_from_slice(data);
        self.commands.push(Command::UpdateBuffer {
            buffer,
            offset,
            len: data.len(),
        });
        Ok(())
    }

    fn map_buffer(&mut self, buffer: BufferId, access: MapAccess) -> Result<&mut [u8]> {
        self.buffer(buffer)?;
        let buf = self.buffers.get_mut(&buffer.0).expect("checked above");
        if buf.mapped {
            return Err(RenderError::BufferMap(format!(
                "buffer {} is already mapped",
                buffer.0
            )));
        }
        buf.mapped = true;
        self.commands.push(Command::Map { buffer, access });
        Ok(self
            .buffers
            .get_mut(&buffer.0)
            .expect("checked above")
            .data
            .as_mut_slice())
    }

    fn unmap_buffer(&mut self, buffer: BufferId) -> Result<()> {
        self.buffer(buffer)?;
        let buf = self.buffers.get_mut(&buffer.0).expect("checked above");
        if !buf.mapped {
            return Err(RenderError::BufferMap(format!(
                "buffer {} is not mapped",
                buffer.0
            )));
        }
        buf.mapped = false;
        self.commands.push(Command::Unmap { buffer });
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer.0);
        self.commands.push(Command::DestroyBuffer(buffer));
    }

    fn create_shader(&mut self, sources: &[ShaderSource<'_>]) -> Result<ShaderId> {
        if sources.is_empty() {
            return Err(RenderError::ShaderCompile(
                "no source fragments given".into(),
            ));
        }
        let id = ShaderId(self.fresh_id());
        let mut source = String::new();
        for fragment in sources {
            source.push_str(fragment.source);
            source.push('\n');
        }
        self.shaders.insert(id.0, TraceShader { source });
        self.commands.push(Command::CreateShader(id));
        Ok(id)
    }

    fn bind_shader(&mut self, shader: ShaderId) {
        self.commands.push(Command::BindShader(shader));
    }

    fn set_uniform(&mut self, shader: ShaderId, name: &str, value: UniformValue) {
        self.commands.push(Command::SetUniform {
            shader,
            name: name.to_string(),
            value,
        });
    }

    fn shader_has_block(&self, shader: ShaderId, block: &str) -> bool {
        self.shaders
            .get(&shader.0)
            .is_some_and(|s| s.source.contains(block))
    }

    fn bind_uniform_block(
        &mut self,
        shader: ShaderId,
        block: &str,
        buffer: BufferId,
    ) -> Result<()> {
        self.expect_kind(buffer, BufferKind::Uniform)?;
        self.commands.push(Command::BindBlock {
            shader,
            block: block.to_string(),
            buffer,
        });
        Ok(())
    }

    fn create_pixel_texture(&mut self, _rgba: [f32; 4], _label: &str) -> TextureId {
        self.textures += 1;
        let id = TextureId(self.fresh_id());
        self.commands.push(Command::CreateTexture(id));
        id
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureId) {
        self.commands.push(Command::BindTexture { slot, texture });
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<FramebufferId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(RenderError::InvalidArgument(
                "framebuffer extent must be non-zero".into(),
            ));
        }
        let id = FramebufferId(self.fresh_id());
        let colors = (0..desc.color_count)
            .map(|_| {
                self.textures += 1;
                TextureId(self.textures + 0x8000_0000)
            })
            .collect();
        self.framebuffers.insert(
            id.0,
            TraceFramebuffer {
                desc: *desc,
                colors,
            },
        );
        self.commands.push(Command::CreateFramebuffer(id, *desc));
        Ok(id)
    }

    fn resize_framebuffer(&mut self, fb: FramebufferId, width: u32, height: u32) -> Result<()> {
        let entry = self
            .framebuffers
            .get_mut(&fb.0)
            .ok_or(RenderError::InvalidHandle { kind: "framebuffer" })?;
        entry.desc.width = width;
        entry.desc.height = height;
        self.commands.push(Command::ResizeFramebuffer { fb, width, height });
        Ok(())
    }

    fn framebuffer_color(&self, fb: FramebufferId, index: u32) -> Option<TextureId> {
        self.framebuffers
            .get(&fb.0)
            .and_then(|f| f.colors.get(index as usize).copied())
    }

    fn bind_framebuffer(&mut self, fb: Option<FramebufferId>) {
        self.commands.push(Command::BindFramebuffer(fb));
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferId) -> Result<()> {
        self.expect_kind(buffer, BufferKind::Vertex)?;
        self.bound_vertex = Some(buffer);
        self.commands.push(Command::BindVertex(buffer));
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) -> Result<()> {
        self.expect_kind(buffer, BufferKind::Index)?;
        self.bound_index = Some(buffer);
        self.commands.push(Command::BindIndex(buffer));
        Ok(())
    }

    fn bind_instance_buffer(&mut self, buffer: Option<BufferId>) -> Result<()> {
        if let Some(id) = buffer {
            self.expect_kind(id, BufferKind::Instance)?;
        }
        self.commands.push(Command::BindInstance(buffer));
        Ok(())
    }

    fn set_state(&mut self, state: RenderState) {
        self.commands.push(Command::SetState(state));
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.commands.push(Command::Viewport(width, height));
    }

    fn clear(&mut self, color: Option<Vec4>, depth: Option<f32>) {
        self.commands.push(Command::Clear { color, depth });
    }

    fn draw_indexed(&mut self, primitive: Primitive, offset: u32, count: u32) -> Result<()> {
        self.check_drawable(offset, count)?;
        self.commands.push(Command::DrawIndexed {
            primitive,
            offset,
            count,
        });
        Ok(())
    }

    fn draw_indexed_instanced(
        &mut self,
        primitive: Primitive,
        offset: u32,
        count: u32,
        instances: u32,
    ) -> Result<()> {
        self.check_drawable(offset, count)?;
        self.commands.push(Command::DrawInstanced {
            primitive,
            offset,
            count,
            instances,
        });
        Ok(())
    }

    fn present(&mut self) {
        self.commands.push(Command::Present);
    }
}

/// Cull-state helper used in assertions.
impl Command {
    /// Whether this command sets a state with back-face culling enabled.
    #[must_use]
    pub fn enables_backface_cull(&self) -> bool {
        matches!(
            self,
            Command::SetState(RenderState {
                cull: CullMode::Back,
                ..
            })
        )
    }
}
