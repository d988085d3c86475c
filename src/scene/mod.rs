//! Scene data model.
//!
//! Entities, models, meshes, materials, lights and cameras, stored in
//! slotmap arenas with typed handles. The renderer only reads these during
//! a frame; creation and destruction belong to the caller.

pub mod camera;
pub mod entity;
pub mod light;
pub mod material;
pub mod model;
pub mod registry;

pub use camera::Camera;
pub use entity::{BonePose, Entity, EntityFlags};
pub use light::{LIGHT_LIMIT, Light, LightKind};
pub use material::{Material, Shader, ShaderCaps};
pub use model::{Bone, BoundingBox, LodMask, MAX_BONES, Mesh, Model};
pub use registry::{
    Assets, CameraHandle, EntityHandle, LightHandle, MaterialHandle, MeshHandle, ModelHandle,
    Scene, ShaderHandle,
};
