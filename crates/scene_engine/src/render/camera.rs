//! # Perspective Camera
//!
//! The session camera. It is created once per viewer session and persists across
//! submissions; scripts and the auto-framer mutate its placement, the viewport
//! resize listener mutates its aspect ratio.
//!
//! ## Conventions
//! - Right-handed, Y-up world space
//! - The camera looks from `position` towards `target`
//! - Field of view is vertical and stored in radians

use crate::config::CameraConfig;
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};

/// Perspective camera with an explicit look-at target
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking at the origin
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Viewport width / height
    /// * `near` - Near clipping distance (> 0)
    /// * `far` - Far clipping distance (> near)
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::y(),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Create the session camera from configuration and the initial viewport size
    pub fn from_config(config: &CameraConfig, width: u32, height: u32) -> Self {
        Self::perspective(
            Vec3::from(config.position),
            config.fov_degrees,
            aspect_of(width, height),
            config.near,
            config.far,
        )
    }

    /// Move the camera, keeping its target
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Point the camera at a world-space location
    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
        log::trace!("Camera target updated to: {:?}", target);
    }

    /// Vertical field of view in degrees
    pub fn fov_degrees(&self) -> f32 {
        utils::rad_to_deg(self.fov)
    }

    /// Set the vertical field of view in degrees, clamped to (1, 179)
    pub fn set_fov_degrees(&mut self, degrees: f32) {
        self.fov = utils::deg_to_rad(degrees.clamp(1.0, 179.0));
    }

    /// Update the aspect ratio after a viewport change
    ///
    /// Only logs when the change is larger than 0.01 so resize drags stay quiet.
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// Ensure the far plane reaches at least `distance`
    pub fn widen_far_plane(&mut self, distance: f32) {
        if distance > self.far {
            log::debug!("Camera far plane widened: {} -> {}", self.far, distance);
            self.far = distance;
        }
    }

    /// Distance from the camera to its target
    pub fn distance_to_target(&self) -> f32 {
        (self.position - self.target).magnitude()
    }

    /// World-to-view transform
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// View-to-clip transform (OpenGL depth range)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }

    /// Combined view-projection matrix: `P × V`
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default(), 800, 600)
    }
}

/// Width / height, guarding a zero height
pub fn aspect_of(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Point3;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_config_uses_degrees() {
        let camera = Camera::from_config(&CameraConfig::default(), 800, 600);

        assert_relative_eq!(camera.fov_degrees(), 75.0, epsilon = 1e-4);
        assert_relative_eq!(camera.aspect, 800.0 / 600.0, epsilon = 1e-6);
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let mut camera = Camera::default();
        camera.set_position(Vec3::new(3.0, 2.0, 4.0));
        camera.look_at(Vec3::new(1.0, 1.0, 1.0));

        let clip = camera.view_projection_matrix().transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(clip.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_widen_far_plane_never_shrinks() {
        let mut camera = Camera::default();
        camera.widen_far_plane(10.0);
        assert_relative_eq!(camera.far, 1000.0);
        camera.widen_far_plane(5000.0);
        assert_relative_eq!(camera.far, 5000.0);
    }
}
