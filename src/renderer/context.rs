//! The render context.
//!
//! Owns everything the core shares across frames: the default shader, the
//! fallback textures, the lights/bones/instance buffers, the fullscreen
//! quad, and the post-process targets and shaders. Created once at render
//! system initialization with explicit construction order; destroyed at
//! shutdown. One writer per frame, single thread.

use crate::errors::Result;
use crate::gpu::{BufferId, BufferKind, GpuDevice, ShaderId, ShaderSource, ShaderStage, TextureId};
use crate::renderer::draw::LightData;
use crate::renderer::post::PostTargets;
use crate::scene::model::MAX_BONES;
use crate::scene::{LIGHT_LIMIT, Shader, ShaderCaps};

// ============================================================================
// Built-in shader sources
// ============================================================================

const OBJECT_VERT: &str = r"
layout(location = 0) in vec3 inPosition;
layout(location = 1) in vec3 inNormal;
layout(location = 4) in vec2 inTexCoord;
layout(location = 6) in uvec4 inBones;
layout(location = 7) in vec4 inBoneWeights;
layout(location = 8) in mat4 inInstanceWorld;
uniform mat4 matWorld;
uniform mat4 matView;
uniform mat4 matProj;
uniform int iInstanced;
layout(std140) uniform BoneBlock { mat4 bones[64]; };
out vec3 worldPos;
out vec3 worldNormal;
out vec2 uv;
void main() {
    mat4 skin = inBoneWeights.x * bones[inBones.x] + inBoneWeights.y * bones[inBones.y]
              + inBoneWeights.z * bones[inBones.z] + inBoneWeights.w * bones[inBones.w];
    mat4 world = (iInstanced != 0) ? inInstanceWorld : matWorld * skin;
    vec4 pos = world * vec4(inPosition, 1.0);
    worldPos = pos.xyz;
    worldNormal = mat3(world) * inNormal;
    uv = inTexCoord;
    gl_Position = matProj * matView * pos;
}
";

const OBJECT_FRAG: &str = r"
uniform vec4 vecColor;
uniform vec3 vecAttributes;
uniform vec3 vecEmission;
uniform sampler2D texAlbedo;
uniform sampler2D texAttributes;
uniform sampler2D texEmission;
uniform sampler2D texNormalMap;
in vec3 worldPos;
in vec3 worldNormal;
in vec2 uv;
out vec4 fragColor;
void main() {
    vec4 albedo = vecColor * texture(texAlbedo, uv);
    vec3 attribs = vecAttributes * texture(texAttributes, uv).rgb;
    vec3 emission = vecEmission * texture(texEmission, uv).rgb;
    vec3 bump = texture(texNormalMap, uv).xyz * 2.0 - 1.0;
    vec3 n = normalize(normalize(worldNormal) + vec3(bump.xy, 0.0));
    vec3 lit = shadeSurface(worldPos, n, albedo.rgb, attribs);
    fragColor = applyFog(vec4(lit + emission, albedo.a), worldPos);
}
";

const LIGHTING_FRAG: &str = r"
struct LightSource {
    int type_;
    float intensity;
    float cosHalfArc;
    vec3 position;
    vec3 direction;
    vec4 color;
};
layout(std140) uniform LightBlock { LightSource lights[16]; };
uniform int iLightCount;
uniform vec3 vecViewPos;
vec3 shadeSurface(vec3 p, vec3 n, vec3 albedo, vec3 attribs) {
    vec3 total = vec3(0.0);
    for (int i = 0; i < iLightCount; i++) {
        total += evalLight(lights[i], p, n, albedo, attribs, vecViewPos);
    }
    return total;
}
";

const FOG_FRAG: &str = r"
uniform vec4 vecFogColor;
uniform float fFovScale;
vec4 applyFog(vec4 color, vec3 worldPos) {
    float density = clamp(length(worldPos - vecViewPos) * 0.0005, 0.0, 1.0);
    return mix(color, vecFogColor, density);
}
";

const GAMMA_FRAG: &str = r"
uniform float fGamma;
vec3 toDisplay(vec3 linearColor) {
    return pow(linearColor, vec3(1.0 / fGamma));
}
";

const QUAD_VERT: &str = r"
layout(location = 0) in vec2 inPosition;
layout(location = 1) in vec2 inTexCoord;
out vec2 uv;
void main() {
    uv = inTexCoord;
    gl_Position = vec4(inPosition, 0.0, 1.0);
}
";

const BLUR_FRAG: &str = r"
uniform sampler2D texScene;
in vec2 uv;
out vec4 fragColor;
void main() {
    vec3 sum = vec3(0.0);
    for (int x = -2; x <= 2; x++)
    for (int y = -2; y <= 2; y++) {
        vec3 s = textureOffset(texScene, uv, ivec2(x, y)).rgb;
        sum += max(s - vec3(1.0), vec3(0.0));
    }
    fragColor = vec4(sum / 25.0, 1.0);
}
";

const COMBINE_FRAG: &str = r"
uniform sampler2D texScene;
uniform sampler2D texBloom;
in vec2 uv;
out vec4 fragColor;
void main() {
    fragColor = texture(texScene, uv) + vec4(texture(texBloom, uv).rgb, 0.0);
}
";

const TONEMAP_FRAG: &str = r"
uniform sampler2D texScene;
uniform float fExposure;
uniform float fGamma;
in vec2 uv;
out vec4 fragColor;
void main() {
    vec3 hdr = texture(texScene, uv).rgb * fExposure;
    vec3 mapped = hdr / (hdr + vec3(1.0));
    fragColor = vec4(pow(mapped, vec3(1.0 / fGamma)), 1.0);
}
";

// ============================================================================
// Context
// ============================================================================

/// Shared render resources with explicit lifetime. See module docs.
#[derive(Debug)]
pub struct RenderContext {
    default_shader: Shader,
    white_texture: TextureId,
    flat_normal_texture: TextureId,

    lights_buffer: BufferId,
    bones_buffer: BufferId,
    instance_buffer: BufferId,
    /// Bytes currently reserved for the instance stream. Grows to the
    /// largest batch seen, never shrinks within a session.
    instance_capacity: usize,

    quad_vertex_buffer: BufferId,
    quad_index_buffer: BufferId,

    pub(crate) blur_shader: ShaderId,
    pub(crate) combine_shader: ShaderId,
    pub(crate) tonemap_shader: ShaderId,

    pub(crate) post: PostTargets,
}

impl RenderContext {
    /// Compiles the built-in shaders and allocates the shared buffers.
    /// Shader failure here is fatal; there is no fallback for the fallback.
    pub fn new(device: &mut dyn GpuDevice) -> Result<Self> {
        let object_program = device.create_shader(&[
            ShaderSource {
                stage: ShaderStage::Vertex,
                name: "object.vert",
                source: OBJECT_VERT,
            },
            ShaderSource {
                stage: ShaderStage::Fragment,
                name: "object.frag",
                source: OBJECT_FRAG,
            },
            ShaderSource {
                stage: ShaderStage::Fragment,
                name: "lighting.glsl",
                source: LIGHTING_FRAG,
            },
            ShaderSource {
                stage: ShaderStage::Fragment,
                name: "fog.glsl",
                source: FOG_FRAG,
            },
            ShaderSource {
                stage: ShaderStage::Fragment,
                name: "gamma.glsl",
                source: GAMMA_FRAG,
            },
        ])?;

        let blur_shader = Self::fullscreen_shader(device, "bloom_blur.frag", BLUR_FRAG)?;
        let combine_shader = Self::fullscreen_shader(device, "bloom_combine.frag", COMBINE_FRAG)?;
        let tonemap_shader = Self::fullscreen_shader(device, "tonemap.frag", TONEMAP_FRAG)?;

        let white_texture = device.create_pixel_texture([1.0, 1.0, 1.0, 1.0], "white");
        let flat_normal_texture = device.create_pixel_texture([0.5, 0.5, 1.0, 1.0], "flat_normal");

        let lights_buffer = device.create_buffer(BufferKind::Uniform, "lights");
        device.buffer_reserve(lights_buffer, LIGHT_LIMIT * size_of::<LightData>())?;

        let bones_buffer = device.create_buffer(BufferKind::Uniform, "bones");
        device.buffer_reserve(bones_buffer, MAX_BONES * size_of::<glam::Mat4>())?;

        let instance_buffer = device.create_buffer(BufferKind::Instance, "instances");

        // Fullscreen quad: two triangles, position + uv.
        let quad_vertices: [f32; 16] = [
            -1.0, -1.0, 0.0, 0.0, //
            1.0, -1.0, 1.0, 0.0, //
            -1.0, 1.0, 0.0, 1.0, //
            1.0, 1.0, 1.0, 1.0, //
        ];
        let quad_indices: [u32; 6] = [0, 1, 2, 2, 1, 3];
        let quad_vertex_buffer = device.create_buffer(BufferKind::Vertex, "quad_vertices");
        device.buffer_reserve(quad_vertex_buffer, size_of_val(&quad_vertices))?;
        device.buffer_update(quad_vertex_buffer, 0, bytemuck::cast_slice(&quad_vertices))?;
        let quad_index_buffer = device.create_buffer(BufferKind::Index, "quad_indices");
        device.buffer_reserve(quad_index_buffer, size_of_val(&quad_indices))?;
        device.buffer_update(quad_index_buffer, 0, bytemuck::cast_slice(&quad_indices))?;

        Ok(Self {
            default_shader: Shader::new(object_program, ShaderCaps::INSTANCING),
            white_texture,
            flat_normal_texture,
            lights_buffer,
            bones_buffer,
            instance_buffer,
            instance_capacity: 0,
            quad_vertex_buffer,
            quad_index_buffer,
            blur_shader,
            combine_shader,
            tonemap_shader,
            post: PostTargets::new(),
        })
    }

    fn fullscreen_shader(
        device: &mut dyn GpuDevice,
        name: &'static str,
        fragment: &'static str,
    ) -> Result<ShaderId> {
        device.create_shader(&[
            ShaderSource {
                stage: ShaderStage::Vertex,
                name: "quad.vert",
                source: QUAD_VERT,
            },
            ShaderSource {
                stage: ShaderStage::Fragment,
                name,
                source: fragment,
            },
        ])
    }

    /// The process-wide fallback shader for materials without one.
    #[must_use]
    pub fn default_shader(&self) -> &Shader {
        &self.default_shader
    }

    /// 1x1 white texture bound to unset material texture slots.
    #[must_use]
    pub fn white_texture(&self) -> TextureId {
        self.white_texture
    }

    /// 1x1 flat normal map.
    #[must_use]
    pub fn flat_normal_texture(&self) -> TextureId {
        self.flat_normal_texture
    }

    /// Shared light uniform buffer, fixed at [`LIGHT_LIMIT`] entries.
    #[must_use]
    pub fn lights_buffer(&self) -> BufferId {
        self.lights_buffer
    }

    /// Shared bone uniform buffer, fixed at [`MAX_BONES`] matrices.
    #[must_use]
    pub fn bones_buffer(&self) -> BufferId {
        self.bones_buffer
    }

    /// Shared per-instance transform stream.
    #[must_use]
    pub fn instance_buffer(&self) -> BufferId {
        self.instance_buffer
    }

    pub(crate) fn quad_buffers(&self) -> (BufferId, BufferId) {
        (self.quad_vertex_buffer, self.quad_index_buffer)
    }

    /// Grows the instance stream to hold at least `bytes`; existing capacity
    /// is reused in place.
    pub(crate) fn ensure_instance_capacity(
        &mut self,
        device: &mut dyn GpuDevice,
        bytes: usize,
    ) -> Result<()> {
        if bytes > self.instance_capacity {
            let new_capacity = bytes.next_power_of_two();
            device.buffer_reserve(self.instance_buffer, new_capacity)?;
            self.instance_capacity = new_capacity;
        }
        Ok(())
    }
}
