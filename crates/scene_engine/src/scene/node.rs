//! Scene nodes
//!
//! A node is a transform plus a payload: nothing (a group), a mesh, or a light.
//! Parent/child links are owned by the [`Scene`](super::Scene) arena and only
//! readable from here.

use std::sync::Arc;

use crate::foundation::collections::NodeId;
use crate::foundation::math::{Transform, Vec3};
use crate::render::geometry::Geometry;
use crate::render::material::Material;
use crate::scene::lighting::Light;

/// Renderable triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Shared geometry; cloning a mesh does not copy vertex data
    pub geometry: Arc<Geometry>,
    /// Surface material
    pub material: Material,
}

/// Node payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Pure transform node
    Group,
    /// Triangle mesh
    Mesh(Mesh),
    /// Light source
    Light(Light),
}

/// Scene graph node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Identity used by create-or-update; unique among attached nodes when set
    pub name: Option<String>,
    /// Local transform relative to the parent
    pub transform: Transform,
    /// Hidden nodes hide their whole subtree
    pub visible: bool,
    /// Payload
    pub kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    fn with_kind(kind: NodeKind) -> Self {
        Self {
            name: None,
            transform: Transform::identity(),
            visible: true,
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Empty group
    pub fn group() -> Self {
        Self::with_kind(NodeKind::Group)
    }

    /// Mesh node
    pub fn mesh(geometry: Arc<Geometry>, material: Material) -> Self {
        Self::with_kind(NodeKind::Mesh(Mesh { geometry, material }))
    }

    /// Light node
    pub fn light(light: Light) -> Self {
        Self::with_kind(NodeKind::Light(light))
    }

    /// Builder: set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder: set the local position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    /// Builder: set the full local transform
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Parent node, `None` for root-level or detached nodes
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Ordered children
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Name as a string slice
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// True for light nodes
    pub fn is_light(&self) -> bool {
        matches!(self.kind, NodeKind::Light(_))
    }

    /// Mesh payload
    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Mutable mesh payload
    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Light payload
    pub fn as_light(&self) -> Option<&Light> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }

    /// Short payload description for logs and script `type_of`-style queries
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Group => "Group",
            NodeKind::Mesh(_) => "Mesh",
            NodeKind::Light(light) => light.kind_name(),
        }
    }
}
