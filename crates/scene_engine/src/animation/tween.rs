//! Property tweens
//!
//! A tween drives one node property from its value at start time towards a
//! target over a duration. The start value is captured when the tween's delay
//! has elapsed, not when it is created, so chained tweens compose.

use thiserror::Error;

use crate::foundation::collections::NodeId;
use crate::foundation::math::{utils, Vec3};
use crate::scene::Scene;

/// Tween errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TweenError {
    /// No tweenable property with this name
    #[error("Unknown tween property: {0}")]
    UnknownProperty(String),

    /// No easing curve with this name
    #[error("Unknown easing: {0}")]
    UnknownEasing(String),

    /// Target value does not fit the property
    #[error("Property {property} expects a {expected} target")]
    ValueMismatch {
        /// Property name
        property: &'static str,
        /// Expected value kind
        expected: &'static str,
    },

    /// Duration is negative or not finite
    #[error("Invalid tween duration: {0}")]
    InvalidDuration(f32),
}

/// Tweenable node property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TweenProperty {
    /// Local position
    Position,
    /// Local Euler rotation in radians
    Rotation,
    /// Local scale
    Scale,
    /// Mesh material opacity
    Opacity,
}

impl TweenProperty {
    /// Look a property up by its script name
    pub fn from_name(name: &str) -> Result<Self, TweenError> {
        match name {
            "position" => Ok(Self::Position),
            "rotation" => Ok(Self::Rotation),
            "scale" => Ok(Self::Scale),
            "opacity" => Ok(Self::Opacity),
            other => Err(TweenError::UnknownProperty(other.to_string())),
        }
    }

    /// Script name
    pub fn name(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Rotation => "rotation",
            Self::Scale => "scale",
            Self::Opacity => "opacity",
        }
    }

    fn is_scalar(self) -> bool {
        matches!(self, Self::Opacity)
    }

    fn read(self, scene: &Scene, node: NodeId) -> Option<TweenValue> {
        let node = scene.get(node)?;
        match self {
            Self::Position => Some(TweenValue::Vec3(node.transform.position)),
            Self::Rotation => Some(TweenValue::Vec3(node.transform.rotation)),
            Self::Scale => Some(TweenValue::Vec3(node.transform.scale)),
            Self::Opacity => node.as_mesh().map(|mesh| TweenValue::Scalar(mesh.material.opacity())),
        }
    }

    fn write(self, scene: &mut Scene, node: NodeId, value: TweenValue) -> bool {
        let Some(node) = scene.get_mut(node) else {
            return false;
        };
        match (self, value) {
            (Self::Position, TweenValue::Vec3(v)) => node.transform.position = v,
            (Self::Rotation, TweenValue::Vec3(v)) => node.transform.rotation = v,
            (Self::Scale, TweenValue::Vec3(v)) => node.transform.scale = v,
            (Self::Opacity, TweenValue::Scalar(s)) => match node.as_mesh_mut() {
                Some(mesh) => mesh.material.set_opacity(s),
                None => return false,
            },
            _ => return false,
        }
        true
    }
}

/// Value a tween interpolates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TweenValue {
    /// Single float
    Scalar(f32),
    /// Vector
    Vec3(Vec3),
}

impl TweenValue {
    fn lerp(self, to: TweenValue, t: f32) -> TweenValue {
        match (self, to) {
            (Self::Scalar(a), Self::Scalar(b)) => Self::Scalar(utils::lerp(a, b, t)),
            (Self::Vec3(a), Self::Vec3(b)) => Self::Vec3(a.lerp(&b, t)),
            (_, to) => to,
        }
    }
}

/// Easing curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// Constant speed
    Linear,
    /// Accelerate from zero
    QuadIn,
    /// Decelerate to zero
    QuadOut,
    /// Accelerate then decelerate
    #[default]
    QuadInOut,
    /// Cubic accelerate then decelerate
    CubicInOut,
    /// Sinusoidal accelerate then decelerate
    SineInOut,
}

impl Easing {
    /// Look an easing up by its script name
    pub fn from_name(name: &str) -> Result<Self, TweenError> {
        match name {
            "linear" => Ok(Self::Linear),
            "quad_in" => Ok(Self::QuadIn),
            "quad_out" => Ok(Self::QuadOut),
            "quad_in_out" => Ok(Self::QuadInOut),
            "cubic_in_out" => Ok(Self::CubicInOut),
            "sine_in_out" => Ok(Self::SineInOut),
            other => Err(TweenError::UnknownEasing(other.to_string())),
        }
    }

    /// Map linear progress `t` in 0..=1 onto the curve
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::QuadIn => t * t,
            Self::QuadOut => t * (2.0 - t),
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let f = 2.0 * t - 2.0;
                    0.5 * f * f * f + 1.0
                }
            }
            Self::SineInOut => 0.5 * (1.0 - (std::f32::consts::PI * t).cos()),
        }
    }
}

/// Optional tween behaviour
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TweenOptions {
    /// Easing curve
    pub easing: Easing,
    /// Seconds to wait before starting
    pub delay: f32,
    /// Extra cycles after the first
    pub repeat: u32,
    /// Reverse direction on every other cycle
    pub yoyo: bool,
}

/// Handle to a running tween
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenId(pub u64);

#[derive(Debug, Clone)]
struct Tween {
    id: TweenId,
    node: NodeId,
    property: TweenProperty,
    from: Option<TweenValue>,
    to: TweenValue,
    duration: f32,
    elapsed: f32,
    options: TweenOptions,
}

enum Step {
    Waiting,
    Running,
    Finished,
    Dropped,
}

impl Tween {
    fn step(&mut self, scene: &mut Scene, dt: f32) -> Step {
        self.elapsed += dt;
        let active = self.elapsed - self.options.delay;
        if active < 0.0 {
            return Step::Waiting;
        }

        let from = match self.from {
            Some(from) => from,
            None => match self.property.read(scene, self.node) {
                Some(value) => *self.from.insert(value),
                None => return Step::Dropped,
            },
        };

        let cycles = self.options.repeat.saturating_add(1);
        let cycle = if self.duration > 0.0 {
            (active / self.duration).floor() as u32
        } else {
            cycles
        };
        let finished = cycle >= cycles;
        let (cycle, t) = if finished {
            (cycles - 1, 1.0)
        } else {
            (cycle, (active - cycle as f32 * self.duration) / self.duration)
        };
        let t = if self.options.yoyo && cycle % 2 == 1 { 1.0 - t } else { t };

        let value = from.lerp(self.to, self.options.easing.apply(t));
        if !self.property.write(scene, self.node, value) {
            return Step::Dropped;
        }
        if finished {
            Step::Finished
        } else {
            Step::Running
        }
    }
}

/// Owns and advances all running tweens of a session
#[derive(Debug, Clone, Default)]
pub struct TweenManager {
    tweens: Vec<Tween>,
    next_id: u64,
}

impl TweenManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a tween of `property` on `node` towards `target` over `duration` seconds
    pub fn add(
        &mut self,
        node: NodeId,
        property: TweenProperty,
        target: TweenValue,
        duration: f32,
        options: TweenOptions,
    ) -> Result<TweenId, TweenError> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(TweenError::InvalidDuration(duration));
        }
        let scalar = matches!(target, TweenValue::Scalar(_));
        if scalar != property.is_scalar() {
            return Err(TweenError::ValueMismatch {
                property: property.name(),
                expected: if property.is_scalar() { "number" } else { "vec3" },
            });
        }

        let id = TweenId(self.next_id);
        self.next_id += 1;
        self.tweens.push(Tween {
            id,
            node,
            property,
            from: None,
            to: target,
            duration,
            elapsed: 0.0,
            options,
        });
        log::trace!("Tween {:?} on {:?}.{} over {}s", id, node, property.name(), duration);
        Ok(id)
    }

    /// Stop a tween, leaving the property where it is
    pub fn cancel(&mut self, id: TweenId) -> bool {
        let before = self.tweens.len();
        self.tweens.retain(|tween| tween.id != id);
        before != self.tweens.len()
    }

    /// Stop every tween on `node`
    pub fn cancel_node(&mut self, node: NodeId) -> usize {
        let before = self.tweens.len();
        self.tweens.retain(|tween| tween.node != node);
        before - self.tweens.len()
    }

    /// Stop all tweens
    pub fn clear(&mut self) {
        self.tweens.clear();
    }

    /// Number of running tweens
    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    /// True when no tween is running
    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    /// Advance every tween by `dt` seconds; returns how many completed
    ///
    /// Tweens whose node disappeared, or whose property the node no longer has,
    /// are dropped.
    pub fn update(&mut self, dt: f32, scene: &mut Scene) -> usize {
        let mut completed = 0;
        self.tweens.retain_mut(|tween| match tween.step(scene, dt) {
            Step::Waiting | Step::Running => true,
            Step::Finished => {
                completed += 1;
                false
            }
            Step::Dropped => {
                log::debug!("Dropping tween {:?}: node {:?} is gone", tween.id, tween.node);
                false
            }
        });
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::geometry::Geometry;
    use crate::render::material::{Color, Material};
    use crate::scene::Node;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn cube(scene: &mut Scene) -> NodeId {
        scene.add(Node::mesh(
            Arc::new(Geometry::cuboid(1.0, 1.0, 1.0)),
            Material::standard(Color::WHITE),
        ))
    }

    #[test]
    fn test_tween_reaches_target() {
        let mut scene = Scene::new();
        let node = cube(&mut scene);
        let mut tweens = TweenManager::new();
        tweens
            .add(node, TweenProperty::Position, TweenValue::Vec3(Vec3::new(2.0, 0.0, 0.0)), 1.0, TweenOptions::default())
            .unwrap();

        let mut completed = 0;
        for _ in 0..70 {
            completed += tweens.update(1.0 / 60.0, &mut scene);
        }

        assert_eq!(completed, 1);
        assert!(tweens.is_empty());
        assert_relative_eq!(scene.get(node).unwrap().transform.position.x, 2.0);
    }

    #[test]
    fn test_linear_midpoint() {
        let mut scene = Scene::new();
        let node = cube(&mut scene);
        let mut tweens = TweenManager::new();
        let options = TweenOptions { easing: Easing::Linear, ..TweenOptions::default() };
        tweens.add(node, TweenProperty::Opacity, TweenValue::Scalar(0.0), 2.0, options).unwrap();

        tweens.update(1.0, &mut scene);

        let opacity = scene.get(node).unwrap().as_mesh().unwrap().material.opacity();
        assert_relative_eq!(opacity, 0.5);
    }

    #[test]
    fn test_delay_captures_start_late() {
        let mut scene = Scene::new();
        let node = cube(&mut scene);
        let mut tweens = TweenManager::new();
        let options = TweenOptions { easing: Easing::Linear, delay: 1.0, ..TweenOptions::default() };
        tweens
            .add(node, TweenProperty::Scale, TweenValue::Vec3(Vec3::new(3.0, 3.0, 3.0)), 1.0, options)
            .unwrap();

        tweens.update(0.5, &mut scene);
        assert_relative_eq!(scene.get(node).unwrap().transform.scale.x, 1.0);

        scene.get_mut(node).unwrap().transform.scale = Vec3::new(2.0, 2.0, 2.0);
        tweens.update(1.0, &mut scene);
        assert_relative_eq!(scene.get(node).unwrap().transform.scale.x, 2.5);
    }

    #[test]
    fn test_yoyo_returns_to_start() {
        let mut scene = Scene::new();
        let node = cube(&mut scene);
        let mut tweens = TweenManager::new();
        let options = TweenOptions { easing: Easing::Linear, repeat: 1, yoyo: true, ..TweenOptions::default() };
        tweens
            .add(node, TweenProperty::Position, TweenValue::Vec3(Vec3::new(0.0, 4.0, 0.0)), 1.0, options)
            .unwrap();

        tweens.update(1.5, &mut scene);
        assert_relative_eq!(scene.get(node).unwrap().transform.position.y, 2.0);
        assert_eq!(tweens.len(), 1);

        tweens.update(1.0, &mut scene);
        assert_relative_eq!(scene.get(node).unwrap().transform.position.y, 0.0);
        assert!(tweens.is_empty());
    }

    #[test]
    fn test_removed_node_drops_tween() {
        let mut scene = Scene::new();
        let node = cube(&mut scene);
        let mut tweens = TweenManager::new();
        tweens
            .add(node, TweenProperty::Rotation, TweenValue::Vec3(Vec3::new(0.0, 1.0, 0.0)), 1.0, TweenOptions::default())
            .unwrap();

        scene.remove(node);

        assert_eq!(tweens.update(0.1, &mut scene), 0);
        assert!(tweens.is_empty());
    }

    #[test]
    fn test_rejects_mismatched_target() {
        let mut scene = Scene::new();
        let node = cube(&mut scene);
        let mut tweens = TweenManager::new();

        let result = tweens.add(node, TweenProperty::Opacity, TweenValue::Vec3(Vec3::zeros()), 1.0, TweenOptions::default());
        assert!(matches!(result, Err(TweenError::ValueMismatch { property: "opacity", .. })));
        assert!(matches!(
            tweens.add(node, TweenProperty::Scale, TweenValue::Vec3(Vec3::zeros()), -1.0, TweenOptions::default()),
            Err(TweenError::InvalidDuration(_))
        ));
        assert!(TweenProperty::from_name("color").is_err());
    }

    #[test]
    fn test_easing_endpoints() {
        for easing in [Easing::Linear, Easing::QuadIn, Easing::QuadOut, Easing::QuadInOut, Easing::CubicInOut, Easing::SineInOut] {
            assert_relative_eq!(easing.apply(0.0), 0.0, epsilon = 1e-6);
            assert_relative_eq!(easing.apply(1.0), 1.0, epsilon = 1e-6);
        }
        assert_relative_eq!(Easing::QuadInOut.apply(0.5), 0.5);
    }
}
