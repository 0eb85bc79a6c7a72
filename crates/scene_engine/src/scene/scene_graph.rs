//! Scene graph arena
//!
//! Nodes live in a slot map keyed by [`NodeId`]. The scene root is implicit: its
//! children are the root-level nodes. A node created with [`Scene::create`] sits
//! in the arena but is not part of the visible scene until it is attached,
//! directly or through an attached ancestor. Only attached nodes are rendered,
//! found by name or counted.

use std::sync::Arc;

use crate::foundation::collections::{NodeId, NodeMap};
use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::render::material::Color;
use crate::scene::environment::EnvironmentMap;
use crate::scene::node::Node;

/// Axis-Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing all points, `None` when there are none
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |aabb, p| aabb.expanded_to(p)))
    }

    /// Grow to include a point
    pub fn expanded_to(self, point: Vec3) -> Self {
        Self {
            min: self.min.inf(&point),
            max: self.max.sup(&point),
        }
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &AABB) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Full size along each axis
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Largest full size along any axis
    pub fn max_dimension(&self) -> f32 {
        self.size().max()
    }

    /// Bounds of the eight corners after a transform
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let corners = (0..8).map(|i| {
            let corner = Point3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            matrix.transform_point(&corner).coords
        });
        // Eight corners are always present.
        Self::from_points(corners).unwrap_or(*self)
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }
}

/// What the renderer draws behind the scene
#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    /// Solid color
    Color(Color),
    /// Base level of an environment map
    Environment(Arc<EnvironmentMap>),
}

/// Scene graph errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Node id does not exist in the arena
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    /// Attaching would make a node its own ancestor
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle {
        /// Node being attached
        child: NodeId,
        /// Requested parent
        parent: NodeId,
    },
}

/// Attached node visited by [`Scene::visit_attached`]
#[derive(Debug, Clone, Copy)]
pub struct VisitedNode<'a> {
    /// Node id
    pub id: NodeId,
    /// Node data
    pub node: &'a Node,
    /// Local-to-world transform
    pub world: Mat4,
    /// Visible along the whole ancestor chain
    pub visible: bool,
}

/// Retained scene graph
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: NodeMap<Node>,
    roots: Vec<NodeId>,
    /// Environment used for image-based ambient lighting
    pub environment: Option<Arc<EnvironmentMap>>,
    /// Background drawn behind geometry
    pub background: Option<Background>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node into the arena without attaching it
    pub fn create(&mut self, mut node: Node) -> NodeId {
        node.parent = None;
        node.children.clear();
        self.nodes.insert(node)
    }

    /// Insert a node and attach it at root level
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = self.create(node);
        self.roots.push(id);
        id
    }

    /// Insert a node as the last child of `parent`
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> Result<NodeId, SceneError> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::UnknownNode(parent));
        }
        let id = self.create(node);
        self.attach(id, Some(parent))?;
        Ok(id)
    }

    /// Node by id
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable node by id
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// True if the id is in the arena (attached or not)
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Root-level nodes in insertion order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Attach `child` under `parent`, or at root level when `parent` is `None`
    ///
    /// The child is first detached from wherever it currently is.
    pub fn attach(&mut self, child: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        if !self.nodes.contains_key(child) {
            return Err(SceneError::UnknownNode(child));
        }
        if let Some(parent) = parent {
            if !self.nodes.contains_key(parent) {
                return Err(SceneError::UnknownNode(parent));
            }
            if self.is_ancestor_or_self(child, parent) {
                return Err(SceneError::Cycle { child, parent });
            }
        }

        self.detach(child);
        match parent {
            Some(parent) => {
                if let Some(parent_node) = self.nodes.get_mut(parent) {
                    parent_node.children.push(child);
                }
                if let Some(child_node) = self.nodes.get_mut(child) {
                    child_node.parent = Some(parent);
                }
            }
            None => self.roots.push(child),
        }
        Ok(())
    }

    /// Unlink a node from its parent (or the root), keeping it in the arena
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get(id).map(|node| node.parent) else {
            return;
        };
        match parent {
            Some(parent) => {
                if let Some(parent_node) = self.nodes.get_mut(parent) {
                    parent_node.children.retain(|&c| c != id);
                }
            }
            None => self.roots.retain(|&r| r != id),
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
        }
    }

    /// Remove a node and its subtree from the arena; returns how many were removed
    pub fn remove(&mut self, id: NodeId) -> usize {
        if !self.nodes.contains_key(id) {
            return 0;
        }
        self.detach(id);
        let mut stack = vec![id];
        let mut removed = 0;
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children);
                removed += 1;
            }
        }
        removed
    }

    /// Remove every node and the environment
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
        self.environment = None;
        self.background = None;
    }

    /// True when the node is reachable from the scene root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        // Bounded by arena size so a corrupted parent chain cannot loop forever.
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(current) {
                Some(node) => match node.parent {
                    Some(parent) => current = parent,
                    None => return self.roots.contains(&current),
                },
                None => return false,
            }
        }
        false
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
            current = self.nodes.get(cur).and_then(|node| node.parent);
        }
        false
    }

    /// Depth-first walk over attached nodes, parents before children
    pub fn visit_attached<'s>(&'s self, mut visit: impl FnMut(VisitedNode<'s>)) {
        let mut stack: Vec<(NodeId, Mat4, bool)> = self
            .roots
            .iter()
            .rev()
            .map(|&id| (id, Mat4::identity(), true))
            .collect();
        while let Some((id, parent_world, parent_visible)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            let world = parent_world * node.transform.to_matrix();
            let visible = parent_visible && node.visible;
            visit(VisitedNode { id, node, world, visible });
            stack.extend(node.children.iter().rev().map(|&child| (child, world, visible)));
        }
    }

    /// Ids of all attached nodes in depth-first order
    pub fn attached_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.visit_attached(|visited| ids.push(visited.id));
        ids
    }

    /// Number of attached nodes
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.visit_attached(|_| count += 1);
        count
    }

    /// Number of nodes in the arena, attached or not
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// First attached node with the given name, depth-first
    pub fn get_object_by_name(&self, name: &str) -> Option<NodeId> {
        let mut found = None;
        self.visit_attached(|visited| {
            if found.is_none() && visited.node.name() == Some(name) {
                found = Some(visited.id);
            }
        });
        found
    }

    /// World-space bounds of every attached mesh
    pub fn bounding_box(&self) -> Option<AABB> {
        let mut bounds: Option<AABB> = None;
        self.visit_attached(|visited| {
            if let Some(local) = visited.node.as_mesh().and_then(|mesh| mesh.geometry.bounding_box()) {
                let world_box = local.transformed(&visited.world);
                bounds = Some(bounds.map_or(world_box, |b| b.union(&world_box)));
            }
        });
        bounds
    }

    /// Remove every light node; returns how many nodes were removed
    pub fn remove_lights(&mut self) -> usize {
        let lights: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.is_light())
            .map(|(id, _)| id)
            .collect();
        lights.into_iter().map(|id| self.remove(id)).sum()
    }

    /// Drop arena nodes that are not reachable from the root
    pub fn prune_detached(&mut self) -> usize {
        let attached: std::collections::HashSet<NodeId> = self.attached_ids().into_iter().collect();
        let before = self.nodes.len();
        self.nodes.retain(|id, _| attached.contains(&id));
        let pruned = before - self.nodes.len();
        if pruned > 0 {
            log::debug!("Pruned {} detached nodes", pruned);
        }
        pruned
    }

    /// Set environment and background from a prefiltered map
    pub fn set_environment(&mut self, map: Arc<EnvironmentMap>) {
        self.background = Some(Background::Environment(Arc::clone(&map)));
        self.environment = Some(map);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;
    use crate::render::geometry::Geometry;
    use crate::render::material::Material;
    use approx::assert_relative_eq;

    fn cube(size: f32) -> Node {
        Node::mesh(Arc::new(Geometry::cuboid(size, size, size)), Material::standard(Color::WHITE))
    }

    #[test]
    fn test_created_nodes_are_not_attached() {
        let mut scene = Scene::new();
        let loose = scene.create(cube(1.0).with_name("loose"));
        let added = scene.add(cube(1.0).with_name("added"));

        assert!(!scene.is_attached(loose));
        assert!(scene.is_attached(added));
        assert_eq!(scene.node_count(), 1);
        assert_eq!(scene.get_object_by_name("loose"), None);
        assert_eq!(scene.get_object_by_name("added"), Some(added));
    }

    #[test]
    fn test_attach_reparents_and_rejects_cycles() {
        let mut scene = Scene::new();
        let parent = scene.add(Node::group());
        let child = scene.add(Node::group());

        scene.attach(child, Some(parent)).unwrap();
        assert_eq!(scene.roots(), &[parent]);
        assert_eq!(scene.get(parent).unwrap().children(), &[child]);
        assert_eq!(
            scene.attach(parent, Some(child)),
            Err(SceneError::Cycle { child: parent, parent: child })
        );
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut scene = Scene::new();
        let parent = scene.add(Node::group());
        let child = scene.create(cube(1.0));
        scene.attach(child, Some(parent)).unwrap();

        assert_eq!(scene.remove(parent), 2);
        assert!(!scene.contains(child));
        assert_eq!(scene.arena_len(), 0);
    }

    #[test]
    fn test_bounds_follow_parent_transforms() {
        let mut scene = Scene::new();
        let parent = scene.add(Node::group().with_transform(Transform {
            position: Vec3::new(10.0, 0.0, 0.0),
            scale: Vec3::new(2.0, 2.0, 2.0),
            ..Transform::default()
        }));
        let child = scene.create(cube(1.0).with_position(Vec3::new(0.0, 1.0, 0.0)));
        scene.attach(child, Some(parent)).unwrap();

        let bounds = scene.bounding_box().unwrap();
        assert_relative_eq!(bounds.center(), Vec3::new(10.0, 2.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(bounds.max_dimension(), 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_prune_detached_keeps_attached() {
        let mut scene = Scene::new();
        let kept = scene.add(cube(1.0));
        scene.create(cube(1.0));
        let orphan_parent = scene.create(Node::group());
        let orphan_child = scene.create(cube(1.0));
        scene.attach(orphan_child, Some(orphan_parent)).unwrap();

        assert_eq!(scene.prune_detached(), 3);
        assert!(scene.contains(kept));
        assert_eq!(scene.arena_len(), 1);
    }

    #[test]
    fn test_hidden_parent_hides_children() {
        let mut scene = Scene::new();
        let parent = scene.add(Node::group());
        let child = scene.create(cube(1.0));
        scene.attach(child, Some(parent)).unwrap();
        scene.get_mut(parent).unwrap().visible = false;

        let mut visible = Vec::new();
        scene.visit_attached(|v| visible.push((v.id, v.visible)));
        assert_eq!(visible, vec![(parent, false), (child, false)]);
    }
}
