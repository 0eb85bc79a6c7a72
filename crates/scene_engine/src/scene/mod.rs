//! Retained scene
//!
//! The scene graph arena, its nodes, the light set, environment maps and the
//! object registry that keys create-or-update by name.

pub mod environment;
pub mod lighting;
mod node;
pub mod registry;
mod scene_graph;

pub use environment::{EnvironmentError, EnvironmentLoad, EnvironmentMap};
pub use lighting::{reset_lights, Light, LightKind, LightSet};
pub use node::{Mesh, Node, NodeKind};
pub use registry::{ObjectRegistry, RegistryError, Resolution};
pub use scene_graph::{Background, Scene, SceneError, VisitedNode, AABB};
