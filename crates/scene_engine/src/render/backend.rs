//! # Render Backend Abstraction
//!
//! The render loop talks to the renderer only through [`RenderBackend`]. The
//! session owns exactly one backend for its lifetime; viewport resizes change
//! its size, submissions never replace it.
//!
//! ## Contract
//!
//! - `render` reads the scene and camera and never mutates them
//! - A failed frame is reported as an error and the next frame starts clean
//! - `set_size` takes effect on the next `render`

use crate::foundation::math::Vec3;
use crate::render::camera::Camera;
use crate::render::material::Color;
use crate::scene::Scene;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Rendering errors
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// The requested surface has a zero dimension
    #[error("invalid surface size {width}x{height}")]
    InvalidSize {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Encoding or writing the framebuffer failed
    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),
}

/// Per-frame statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Index of the rendered frame, starting at zero
    pub frame_index: u64,
    /// Mesh nodes submitted
    pub meshes_drawn: usize,
    /// Triangles that produced at least one fragment test
    pub triangles_drawn: usize,
    /// Triangles culled by facing or the near plane
    pub triangles_culled: usize,
}

/// Renderer interface used by the render loop
pub trait RenderBackend {
    /// Current surface size as (width, height) in pixels
    fn size(&self) -> (u32, u32);

    /// Resize the output surface
    fn set_size(&mut self, width: u32, height: u32) -> BackendResult<()>;

    /// Color used where nothing is drawn and no background is set
    fn clear_color(&self) -> Color;

    /// Change the clear color
    fn set_clear_color(&mut self, color: Color);

    /// Draw the attached, visible contents of `scene` as seen by `camera`
    fn render(&mut self, scene: &Scene, camera: &Camera) -> BackendResult<FrameStats>;
}

/// Light contributions gathered from the scene for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameLights {
    /// Direction towards each light (unit), paired with linear radiance
    pub directional: Vec<(Vec3, [f32; 3])>,
    /// Sum of ambient radiance
    pub ambient: [f32; 3],
    /// Sky and ground radiance of hemisphere lights
    pub hemisphere: Vec<([f32; 3], [f32; 3])>,
    /// Environment irradiance, when an environment map is set
    pub environment: Option<[f32; 3]>,
}

impl FrameLights {
    /// Collect world-space lights from attached, visible light nodes
    pub fn gather(scene: &Scene) -> Self {
        use crate::scene::LightKind;

        let mut lights = Self::default();
        scene.visit_attached(|visited| {
            if !visited.visible {
                return;
            }
            let Some(light) = visited.node.as_light() else {
                return;
            };
            let color = light.color.to_linear_array();
            let radiance = color.map(|c| c * light.intensity);
            match light.kind {
                LightKind::Directional { target } => {
                    let position = Vec3::new(visited.world.m14, visited.world.m24, visited.world.m34);
                    if let Some(direction) = (position - target).try_normalize(f32::EPSILON) {
                        lights.directional.push((direction, radiance));
                    }
                }
                LightKind::Ambient => {
                    for (sum, c) in lights.ambient.iter_mut().zip(radiance) {
                        *sum += c;
                    }
                }
                LightKind::Hemisphere { ground } => {
                    let ground = ground.to_linear_array().map(|c| c * light.intensity);
                    lights.hemisphere.push((radiance, ground));
                }
            }
        });
        lights.environment = scene.environment.as_ref().map(|env| env.irradiance());
        lights
    }

    /// Diffuse irradiance arriving at a surface with normal `n`
    pub fn diffuse(&self, n: Vec3) -> [f32; 3] {
        let mut total = self.ambient;
        for (sky, ground) in &self.hemisphere {
            let t = n.y * 0.5 + 0.5;
            for i in 0..3 {
                total[i] += ground[i] + (sky[i] - ground[i]) * t;
            }
        }
        if let Some(env) = self.environment {
            for i in 0..3 {
                total[i] += env[i];
            }
        }
        for (direction, radiance) in &self.directional {
            let lambert = n.dot(direction).max(0.0);
            for i in 0..3 {
                total[i] += radiance[i] * lambert;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LightingConfig;
    use crate::scene::reset_lights;
    use approx::assert_relative_eq;

    #[test]
    fn test_gather_default_light_set() {
        let mut scene = Scene::new();
        reset_lights(&mut scene, &LightingConfig::default());

        let lights = FrameLights::gather(&scene);

        assert_eq!(lights.directional.len(), 1);
        assert_eq!(lights.hemisphere.len(), 1);
        assert_relative_eq!(lights.ambient[0], 0.4, epsilon = 1e-6);
        let expected = Vec3::new(5.0, 10.0, 7.5).normalize();
        assert_relative_eq!(lights.directional[0].0, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_diffuse_is_brighter_facing_the_light() {
        let mut scene = Scene::new();
        reset_lights(&mut scene, &LightingConfig::default());
        let lights = FrameLights::gather(&scene);

        let lit = lights.diffuse(Vec3::y());
        let unlit = lights.diffuse(-Vec3::y());
        assert!(lit[0] > unlit[0]);
        assert!(unlit[0] > 0.0);
    }
}
