#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod gpu;
pub mod renderer;
pub mod scene;

pub use errors::{RenderError, Result};
pub use gpu::GpuDevice;
pub use renderer::{RenderSettings, Renderer, View};
pub use scene::{
    Assets, Camera, Entity, Light, Material, Mesh, Model, Scene, Shader, ShaderCaps,
};
