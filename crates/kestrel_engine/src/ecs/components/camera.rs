//! Camera component
//!
//! Perspective parameters only; the view comes from the camera entity's
//! [`TransformComponent`].

use super::{RenderFlags, TransformComponent};
use crate::ecs::Component;
use crate::foundation::math::{utils, Mat4, Mat4Ext};
use crate::spatial::Frustum;

/// Perspective camera
#[derive(Debug, Clone, PartialEq)]
pub struct CameraComponent {
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Width over height
    pub aspect: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
    /// Models sharing a bit with these flags are drawn
    pub render_flags: RenderFlags,
    /// Inactive cameras get no draw lists
    pub active: bool,
}

impl Component for CameraComponent {}

impl Default for CameraComponent {
    fn default() -> Self {
        Self::perspective(60.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}

impl CameraComponent {
    /// Perspective camera, field of view in degrees
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y: utils::deg_to_rad(fov_y_degrees),
            aspect,
            near,
            far,
            render_flags: RenderFlags::ALL,
            active: true,
        }
    }

    /// Builder pattern: Set render flags
    pub fn with_render_flags(mut self, flags: RenderFlags) -> Self {
        self.render_flags = flags;
        self
    }

    /// Builder pattern: Set active state
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Projection matrix
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective(self.fov_y, self.aspect, self.near, self.far)
    }

    /// View matrix for a camera placed at `transform`
    pub fn view(&self, transform: &TransformComponent) -> Mat4 {
        Mat4::view_from(&transform.position, &transform.rotation)
    }

    /// Projection times view
    pub fn view_projection(&self, transform: &TransformComponent) -> Mat4 {
        self.projection() * self.view(transform)
    }

    /// World-space frustum
    pub fn frustum(&self, transform: &TransformComponent) -> Frustum {
        Frustum::from_matrix(&self.view_projection(transform))
    }

    /// Update the aspect ratio from a viewport size
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}
