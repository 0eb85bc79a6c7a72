//! Camera auto-framing
//!
//! After a file import the camera is moved back along +Z until the whole scene
//! fits the vertical field of view, with a 2x margin.

use crate::foundation::math::Vec3;
use crate::render::{Camera, OrbitControls};
use crate::scene::Scene;

/// Distance that fits an object of `max_dimension` into `fov` (radians), doubled
pub fn framing_distance(max_dimension: f32, fov: f32) -> f32 {
    let fit = (max_dimension / 2.0) / (fov / 2.0).tan();
    fit * 2.0
}

/// Frame every attached mesh; returns the camera distance, or `None` for an empty scene
pub fn frame_scene(scene: &Scene, camera: &mut Camera, controls: &mut OrbitControls) -> Option<f32> {
    let bounds = scene.bounding_box()?;
    let center = bounds.center();
    let max_dimension = bounds.max_dimension();
    if !max_dimension.is_finite() || max_dimension <= 0.0 {
        log::debug!("Scene bounds are degenerate, camera left in place");
        return None;
    }

    let distance = framing_distance(max_dimension, camera.fov);
    camera.set_position(center + Vec3::new(0.0, 0.0, distance));
    camera.look_at(center);
    camera.widen_far_plane(distance * 4.0);
    controls.set_target(center);

    log::info!("Framed scene: center {:?}, size {:.3}, distance {:.3}", center, max_dimension, distance);
    Some(distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Color, Geometry, Material};
    use crate::scene::Node;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn camera() -> Camera {
        Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 75.0, 1.0, 0.1, 10.0)
    }

    #[test]
    fn test_unit_cube_distance() {
        let mut scene = Scene::new();
        scene.add(Node::mesh(Arc::new(Geometry::cuboid(2.0, 2.0, 2.0)), Material::standard(Color::WHITE)));
        let mut camera = camera();
        let mut controls = OrbitControls::default();

        let distance = frame_scene(&scene, &mut camera, &mut controls).unwrap();

        let expected = 2.0 * (1.0 / 37.5_f32.to_radians().tan());
        assert_relative_eq!(distance, expected, epsilon = 1e-4);
        assert_relative_eq!(camera.position.z, expected, epsilon = 1e-4);
        assert_relative_eq!(camera.target, Vec3::zeros());
        assert_relative_eq!(controls.target, Vec3::zeros());
        assert!(camera.far >= distance * 4.0);
    }

    #[test]
    fn test_offset_scene_is_centered() {
        let mut scene = Scene::new();
        let mesh = Node::mesh(Arc::new(Geometry::cuboid(1.0, 4.0, 1.0)), Material::basic(Color::WHITE))
            .with_position(Vec3::new(3.0, 1.0, 0.0));
        scene.add(mesh);
        let mut camera = camera();
        let mut controls = OrbitControls::default();

        let distance = frame_scene(&scene, &mut camera, &mut controls).unwrap();

        assert_relative_eq!(controls.target, Vec3::new(3.0, 1.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(camera.position, Vec3::new(3.0, 1.0, distance), epsilon = 1e-4);
    }

    #[test]
    fn test_empty_scene_leaves_camera() {
        let scene = Scene::new();
        let mut camera = camera();
        let before = camera.clone();

        assert!(frame_scene(&scene, &mut camera, &mut OrbitControls::default()).is_none());
        assert_eq!(camera, before);
    }
}
