//! Light sources.

use glam::{Vec3, Vec4};

/// Maximum lights written to the shared light buffer per draw. Excess lights
/// are silently dropped, first-iterated-first-included.
pub const LIGHT_LIMIT: usize = 16;

/// Kind of light source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Point = 0,
    Spot = 1,
    Directional = 2,
}

/// One light. `direction` may be un-normalized on input; the draw executor
/// normalizes it when populating the light buffer. `arc` is the full cone
/// angle in degrees.
#[derive(Debug, Clone)]
pub struct Light {
    pub kind: LightKind,
    pub intensity: f32,
    pub arc: f32,
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec4,
}

impl Light {
    #[must_use]
    pub fn point(position: Vec3, color: Vec4, intensity: f32) -> Self {
        Self {
            kind: LightKind::Point,
            intensity,
            arc: 360.0,
            position,
            direction: Vec3::NEG_Z,
            color,
        }
    }

    #[must_use]
    pub fn spot(position: Vec3, direction: Vec3, arc: f32, color: Vec4, intensity: f32) -> Self {
        Self {
            kind: LightKind::Spot,
            intensity,
            arc,
            position,
            direction,
            color,
        }
    }

    #[must_use]
    pub fn directional(direction: Vec3, color: Vec4, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            intensity,
            arc: 0.0,
            position: Vec3::ZERO,
            direction,
            color,
        }
    }
}
