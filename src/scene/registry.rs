//! Arena storage for scene objects and assets.
//!
//! Every resource kind gets its own typed handle, so a handle of the wrong
//! kind is unrepresentable at the API boundary. A stale handle (its slot was
//! freed) is an invalid argument and is reported and skipped by the
//! renderer.

use slotmap::{SlotMap, new_key_type};

use super::{Camera, Entity, Light, Material, Mesh, Model, Shader};

new_key_type! {
    /// Handle to an [`Entity`] in a [`Scene`].
    pub struct EntityHandle;
    /// Handle to a [`Light`] in a [`Scene`].
    pub struct LightHandle;
    /// Handle to a [`Camera`] in a [`Scene`].
    pub struct CameraHandle;
    /// Handle to a [`Model`] in [`Assets`].
    pub struct ModelHandle;
    /// Handle to a [`Mesh`] in [`Assets`].
    pub struct MeshHandle;
    /// Handle to a [`Material`] in [`Assets`].
    pub struct MaterialHandle;
    /// Handle to a [`Shader`] in [`Assets`].
    pub struct ShaderHandle;
}

/// Read-only (to the renderer) registry of everything placed in the world.
#[derive(Debug, Default)]
pub struct Scene {
    pub entities: SlotMap<EntityHandle, Entity>,
    pub lights: SlotMap<LightHandle, Light>,
    pub cameras: SlotMap<CameraHandle, Camera>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, entity: Entity) -> EntityHandle {
        self.entities.insert(entity)
    }

    pub fn add_light(&mut self, light: Light) -> LightHandle {
        self.lights.insert(light)
    }

    pub fn add_camera(&mut self, camera: Camera) -> CameraHandle {
        self.cameras.insert(camera)
    }

    /// Entities in arena order. The renderer treats this as the cursor
    /// traversal order; it is stable within a frame.
    pub fn entities(&self) -> impl Iterator<Item = (EntityHandle, &Entity)> {
        self.entities.iter()
    }

    /// Lights in arena order. Light capacity overflow drops the lights
    /// iterated last.
    pub fn lights(&self) -> impl Iterator<Item = &Light> {
        self.lights.values()
    }
}

/// Asset storage: models, meshes, materials, shaders.
///
/// Owned by the caller; immutable while a frame is rendered.
#[derive(Debug, Default)]
pub struct Assets {
    pub models: SlotMap<ModelHandle, Model>,
    pub meshes: SlotMap<MeshHandle, Mesh>,
    pub materials: SlotMap<MaterialHandle, Material>,
    pub shaders: SlotMap<ShaderHandle, Shader>,
}

impl Assets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_model(&mut self, model: Model) -> ModelHandle {
        self.models.insert(model)
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshHandle {
        self.meshes.insert(mesh)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        self.materials.insert(material)
    }

    pub fn add_shader(&mut self, shader: Shader) -> ShaderHandle {
        self.shaders.insert(shader)
    }
}
