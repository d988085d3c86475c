//! Cameras.

use glam::{Mat4, Quat, Vec3};

/// Perspective camera; one current camera drives a render pass.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
    /// Vertical field of view, degrees.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov_y: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 10_000.0,
        }
    }
}

impl Camera {
    #[must_use]
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y.to_radians(), self.aspect, self.near, self.far)
    }

    /// Field-of-view-derived scalar handed to shaders.
    #[must_use]
    pub fn fov_scale(&self) -> f32 {
        (0.5 * self.fov_y.to_radians()).tan()
    }

    /// Orients the camera toward `target`.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = target - self.position;
        if forward.cross(up).length_squared() < 1e-8 {
            return;
        }
        self.rotation = Quat::from_mat4(&Mat4::look_at_rh(self.position, target, up).inverse());
    }
}
