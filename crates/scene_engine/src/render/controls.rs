//! Orbit camera controls
//!
//! The camera orbits a target point. Input (rotate, zoom, pan) accumulates as
//! pending deltas; [`OrbitControls::update`] applies them to the camera once per
//! frame. With damping enabled only a fraction of the pending motion is applied
//! per update and the remainder decays geometrically, which is what gives the
//! viewer its inertial feel.

use std::f32::consts::PI;

use crate::config::ControlsConfig;
use crate::foundation::math::Vec3;
use crate::render::camera::Camera;

const MIN_POLAR: f32 = 1e-4;
const MOTION_EPSILON: f32 = 1e-6;

/// Orbit controls bound to the session camera
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    /// Point the camera orbits and looks at
    pub target: Vec3,
    /// Apply pending motion gradually
    pub enable_damping: bool,
    /// Fraction of pending motion applied per update (0..=1)
    pub damping_factor: f32,
    /// Multiplier on rotate input
    pub rotate_speed: f32,
    /// Exponent on zoom input
    pub zoom_speed: f32,
    /// Closest allowed orbit radius
    pub min_distance: f32,
    /// Farthest allowed orbit radius
    pub max_distance: f32,
    /// Azimuth speed in radians per second; zero disables auto-rotation
    pub auto_rotate_speed: f32,

    pending_azimuth: f32,
    pending_polar: f32,
    pending_scale: f32,
    pending_pan: Vec3,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::from_config(&ControlsConfig::default())
    }
}

impl OrbitControls {
    /// Create controls targeting the origin
    pub fn from_config(config: &ControlsConfig) -> Self {
        Self {
            target: Vec3::zeros(),
            enable_damping: config.enable_damping,
            damping_factor: config.damping_factor.clamp(0.0, 1.0),
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            auto_rotate_speed: 0.0,
            pending_azimuth: 0.0,
            pending_polar: 0.0,
            pending_scale: 1.0,
            pending_pan: Vec3::zeros(),
        }
    }

    /// Move the orbit target; the camera follows on the next update
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        log::trace!("Controls target updated to: {:?}", target);
    }

    /// Set the damping factor; zero disables damping
    pub fn set_damping(&mut self, factor: f32) {
        self.damping_factor = factor.clamp(0.0, 1.0);
        self.enable_damping = self.damping_factor > 0.0;
    }

    /// Queue an orbit rotation in radians (azimuth around Y, polar from +Y)
    pub fn rotate(&mut self, azimuth: f32, polar: f32) {
        self.pending_azimuth += azimuth * self.rotate_speed;
        self.pending_polar += polar * self.rotate_speed;
    }

    /// Queue a zoom; factors above one move away from the target
    pub fn zoom(&mut self, factor: f32) {
        if factor > 0.0 {
            self.pending_scale *= factor.powf(self.zoom_speed);
        }
    }

    /// Queue a pan in screen-aligned units, scaled by the orbit distance
    pub fn pan(&mut self, camera: &Camera, dx: f32, dy: f32) {
        let forward = (self.target - camera.position)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| -Vec3::z());
        let right = forward.cross(&camera.up).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::x);
        let up = right.cross(&forward);
        let distance = camera.distance_to_target().max(self.min_distance);
        self.pending_pan += (right * dx + up * dy) * distance;
    }

    /// True while damped motion is still being applied
    pub fn is_moving(&self) -> bool {
        self.pending_azimuth.abs() > MOTION_EPSILON
            || self.pending_polar.abs() > MOTION_EPSILON
            || (self.pending_scale - 1.0).abs() > MOTION_EPSILON
            || self.pending_pan.magnitude() > MOTION_EPSILON
    }

    /// Apply pending motion to the camera; returns whether the camera moved
    pub fn update(&mut self, camera: &mut Camera, dt: f32) -> bool {
        if self.auto_rotate_speed != 0.0 {
            self.pending_azimuth += self.auto_rotate_speed * dt;
        }

        let step = if self.enable_damping { self.damping_factor } else { 1.0 };

        let offset = camera.position - self.target;
        let mut radius = offset.magnitude();
        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = if radius > 0.0 { (offset.y / radius).clamp(-1.0, 1.0).acos() } else { PI / 2.0 };

        azimuth += self.pending_azimuth * step;
        polar = (polar + self.pending_polar * step).clamp(MIN_POLAR, PI - MIN_POLAR);
        radius = (radius.max(MOTION_EPSILON) * self.pending_scale.powf(step))
            .clamp(self.min_distance, self.max_distance);
        self.target += self.pending_pan * step;

        let new_offset = Vec3::new(
            radius * polar.sin() * azimuth.sin(),
            radius * polar.cos(),
            radius * polar.sin() * azimuth.cos(),
        );
        let new_position = self.target + new_offset;
        let moved = (new_position - camera.position).magnitude() > MOTION_EPSILON
            || (camera.target - self.target).magnitude() > MOTION_EPSILON;

        camera.position = new_position;
        camera.look_at(self.target);

        if self.enable_damping {
            let keep = 1.0 - step;
            self.pending_azimuth *= keep;
            self.pending_polar *= keep;
            self.pending_scale = self.pending_scale.powf(keep);
            self.pending_pan *= keep;
        } else {
            self.pending_azimuth = 0.0;
            self.pending_polar = 0.0;
            self.pending_scale = 1.0;
            self.pending_pan = Vec3::zeros();
        }

        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera_at(z: f32) -> Camera {
        let mut camera = Camera::default();
        camera.set_position(Vec3::new(0.0, 0.0, z));
        camera
    }

    #[test]
    fn test_update_without_input_keeps_camera() {
        let mut controls = OrbitControls::default();
        let mut camera = camera_at(5.0);

        let moved = controls.update(&mut camera, 0.016);

        assert!(!moved);
        assert_relative_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0), epsilon = 1e-5);
    }

    #[test]
    fn test_damped_rotation_converges() {
        let mut controls = OrbitControls::default();
        let mut camera = camera_at(5.0);
        controls.rotate(1.0, 0.0);

        controls.update(&mut camera, 0.016);
        let first_azimuth = camera.position.x.atan2(camera.position.z);
        assert_relative_eq!(first_azimuth, 0.05, epsilon = 1e-4);

        for _ in 0..500 {
            controls.update(&mut camera, 0.016);
        }
        let azimuth = camera.position.x.atan2(camera.position.z);
        assert_relative_eq!(azimuth, 1.0, epsilon = 1e-3);
        assert_relative_eq!(camera.distance_to_target(), 5.0, epsilon = 1e-3);
        assert!(!controls.is_moving());
    }

    #[test]
    fn test_undamped_zoom_applies_at_once() {
        let mut controls = OrbitControls::default();
        controls.set_damping(0.0);
        let mut camera = camera_at(4.0);

        controls.zoom(2.0);
        controls.update(&mut camera, 0.016);

        assert_relative_eq!(camera.distance_to_target(), 8.0, epsilon = 1e-4);
        assert!(!controls.is_moving());
    }

    #[test]
    fn test_target_change_reorients_camera() {
        let mut controls = OrbitControls::default();
        let mut camera = camera_at(5.0);

        controls.set_target(Vec3::new(0.0, 1.0, 0.0));
        controls.update(&mut camera, 0.016);

        assert_eq!(camera.target, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_zoom_respects_distance_limits() {
        let mut controls = OrbitControls::default();
        controls.set_damping(0.0);
        controls.max_distance = 10.0;
        let mut camera = camera_at(5.0);

        controls.zoom(100.0);
        controls.update(&mut camera, 0.016);

        assert_relative_eq!(camera.distance_to_target(), 10.0, epsilon = 1e-4);
    }
}
