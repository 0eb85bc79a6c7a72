//! Lighting
//!
//! The light set is not addressable by name and is never reused: every scene
//! reset removes all light nodes and adds a fresh directional, ambient and
//! hemisphere light built from [`LightingConfig`].

use crate::config::LightingConfig;
use crate::foundation::collections::NodeId;
use crate::foundation::math::Vec3;
use crate::render::material::Color;
use crate::scene::{Node, Scene};

/// Light types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Parallel rays shining from the node position towards `target`
    Directional {
        /// World-space point the light aims at
        target: Vec3,
    },
    /// Uniform light from every direction
    Ambient,
    /// Sky color from above blending to ground color from below
    Hemisphere {
        /// Color seen by downward-facing surfaces
        ground: Color,
    },
}

/// Light source payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// Light type
    pub kind: LightKind,
    /// Light color (sky color for hemisphere lights)
    pub color: Color,
    /// Light intensity
    pub intensity: f32,
}

impl Light {
    /// Create a directional light aimed at `target`
    pub fn directional(color: Color, intensity: f32, target: Vec3) -> Self {
        Self {
            kind: LightKind::Directional { target },
            color,
            intensity,
        }
    }

    /// Create an ambient light
    pub fn ambient(color: Color, intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient,
            color,
            intensity,
        }
    }

    /// Create a hemisphere light
    pub fn hemisphere(sky: Color, ground: Color, intensity: f32) -> Self {
        Self {
            kind: LightKind::Hemisphere { ground },
            color: sky,
            intensity,
        }
    }

    /// Light type name
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            LightKind::Directional { .. } => "DirectionalLight",
            LightKind::Ambient => "AmbientLight",
            LightKind::Hemisphere { .. } => "HemisphereLight",
        }
    }
}

/// Ids of the lights added by [`reset_lights`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightSet {
    /// Directional light
    pub directional: NodeId,
    /// Ambient light
    pub ambient: NodeId,
    /// Hemisphere light
    pub hemisphere: NodeId,
}

/// Remove every light from the scene and add the standard light set
pub fn reset_lights(scene: &mut Scene, config: &LightingConfig) -> LightSet {
    let removed = scene.remove_lights();

    let directional = scene.add(
        Node::light(Light::directional(Color::WHITE, config.directional_intensity, Vec3::zeros()))
            .with_position(Vec3::from(config.directional_position)),
    );
    let ambient = scene.add(Node::light(Light::ambient(Color::WHITE, config.ambient_intensity)));
    let hemisphere = scene.add(Node::light(Light::hemisphere(
        Color::from_hex(config.hemisphere_sky),
        Color::from_hex(config.hemisphere_ground),
        config.hemisphere_intensity,
    )));

    log::debug!("Light set reset ({} old lights removed)", removed);
    LightSet { directional, ambient, hemisphere }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::geometry::Geometry;
    use crate::render::material::Material;
    use std::sync::Arc;

    fn light_count(scene: &Scene) -> usize {
        scene.attached_ids().into_iter().filter(|&id| scene.get(id).is_some_and(Node::is_light)).count()
    }

    #[test]
    fn test_reset_replaces_lights_not_reuses() {
        let mut scene = Scene::new();
        let config = LightingConfig::default();

        let first = reset_lights(&mut scene, &config);
        let second = reset_lights(&mut scene, &config);

        assert_eq!(light_count(&scene), 3);
        assert!(!scene.contains(first.directional));
        assert!(scene.contains(second.directional));
    }

    #[test]
    fn test_reset_keeps_meshes() {
        let mut scene = Scene::new();
        let mesh = scene.add(
            Node::mesh(Arc::new(Geometry::cuboid(1.0, 1.0, 1.0)), Material::standard(Color::WHITE))
                .with_name("cube"),
        );

        let lights = reset_lights(&mut scene, &LightingConfig::default());

        assert!(scene.is_attached(mesh));
        let directional = scene.get(lights.directional).unwrap();
        assert_eq!(directional.transform.position, Vec3::new(5.0, 10.0, 7.5));
        let ambient = scene.get(lights.ambient).and_then(Node::as_light).unwrap();
        assert_eq!(ambient.intensity, 0.4);
    }
}
