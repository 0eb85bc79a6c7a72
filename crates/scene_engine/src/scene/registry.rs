//! Object registry
//!
//! Name to node map that decides create-versus-update. The registry is consulted
//! before the scene graph; an entry whose node is no longer attached, or no
//! longer carries the entry's name, is stale and treated as absent. Resolution
//! then falls back to a scene lookup by name and re-registers what it finds.
//!
//! Every attach of a caller-created node goes through [`ObjectRegistry::adopt`],
//! which refuses nodes that already belong to the scene or to another name.

use std::collections::HashMap;

use crate::foundation::collections::NodeId;
use crate::scene::{Node, Scene};

/// Registry errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The create callback produced nothing attachable
    #[error("create function for '{0}' did not return a valid object")]
    CreateFnInvalid(String),
    /// The node id is not in the scene arena
    #[error("node for '{0}' does not exist in the scene")]
    UnknownNode(String),
    /// The node is already attached or registered under another name
    #[error("node for '{0}' is already part of the scene")]
    NodeInUse(String),
}

/// Outcome of [`ObjectRegistry::create_or_update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// An existing node was updated in place
    Updated(NodeId),
    /// A new node was created and attached
    Created(NodeId),
}

impl Resolution {
    /// Node id regardless of outcome
    pub fn id(self) -> NodeId {
        match self {
            Self::Updated(id) | Self::Created(id) => id,
        }
    }
}

/// Name to node map owned by a viewer session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectRegistry {
    entries: HashMap<String, NodeId>,
}

impl ObjectRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn is_live(scene: &Scene, name: &str, id: NodeId) -> bool {
        scene.is_attached(id) && scene.get(id).and_then(Node::name) == Some(name)
    }

    /// Find the live node for `name`: registry first, then the scene
    pub fn resolve(&mut self, scene: &Scene, name: &str) -> Option<NodeId> {
        if let Some(&id) = self.entries.get(name) {
            if Self::is_live(scene, name, id) {
                return Some(id);
            }
            log::debug!("Registry entry '{}' is stale", name);
            self.entries.remove(name);
        }
        let id = scene.get_object_by_name(name)?;
        self.entries.insert(name.to_string(), id);
        Some(id)
    }

    fn check_unowned(&self, scene: &Scene, name: &str, id: NodeId) -> Result<(), RegistryError> {
        if !scene.contains(id) {
            return Err(RegistryError::UnknownNode(name.to_string()));
        }
        if scene.is_attached(id) || self.entries.values().any(|&entry| entry == id) {
            log::warn!("Refusing to register '{}': {:?} is already part of the scene", name, id);
            return Err(RegistryError::NodeInUse(name.to_string()));
        }
        Ok(())
    }

    /// Name, attach at root level and register a freshly created node
    ///
    /// The node must not be attached or registered yet; otherwise
    /// [`RegistryError::NodeInUse`] is returned and nothing changes.
    pub fn adopt(&mut self, scene: &mut Scene, name: &str, id: NodeId) -> Result<NodeId, RegistryError> {
        self.check_unowned(scene, name, id)?;
        scene
            .attach(id, None)
            .map_err(|_| RegistryError::UnknownNode(name.to_string()))?;
        if let Some(node) = scene.get_mut(id) {
            node.name = Some(name.to_string());
        }
        self.entries.insert(name.to_string(), id);
        log::debug!("Registered '{}' -> {:?}", name, id);
        Ok(id)
    }

    /// Register a freshly created node as `name`, removing whatever held the name
    ///
    /// Returns the removed node, if any.
    pub fn replace(&mut self, scene: &mut Scene, name: &str, id: NodeId) -> Result<Option<NodeId>, RegistryError> {
        self.check_unowned(scene, name, id)?;
        let previous = self.resolve(scene, name);
        if let Some(previous) = previous {
            scene.remove(previous);
            self.entries.remove(name);
        }
        self.adopt(scene, name, id)?;
        Ok(previous)
    }

    /// Update the node named `name`, or create, attach and register a new one
    ///
    /// `create` runs only when nothing resolves; a `None` from it is reported as
    /// [`RegistryError::CreateFnInvalid`] and nothing is attached.
    pub fn create_or_update<C, U>(
        &mut self,
        scene: &mut Scene,
        name: &str,
        create: C,
        update: U,
    ) -> Result<Resolution, RegistryError>
    where
        C: FnOnce() -> Option<Node>,
        U: FnOnce(&mut Node),
    {
        if let Some(id) = self.resolve(scene, name) {
            if let Some(node) = scene.get_mut(id) {
                update(node);
            }
            return Ok(Resolution::Updated(id));
        }

        let Some(node) = create() else {
            log::warn!("create function for '{}' returned nothing; nothing attached", name);
            return Err(RegistryError::CreateFnInvalid(name.to_string()));
        };
        let id = scene.create(node);
        self.adopt(scene, name, id).map(Resolution::Created)
    }

    /// Registered id without validation
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.entries.get(name).copied()
    }

    /// Remove entries whose node is no longer attached; returns how many were removed
    pub fn prune_stale(&mut self, scene: &Scene) -> usize {
        let before = self.entries.len();
        self.entries.retain(|name, id| Self::is_live(scene, name, *id));
        before - self.entries.len()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, id)` entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.entries.iter().map(|(name, &id)| (name.as_str(), id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::geometry::Geometry;
    use crate::render::material::{Color, Material};
    use std::sync::Arc;

    fn cube() -> Node {
        Node::mesh(Arc::new(Geometry::cuboid(1.0, 1.0, 1.0)), Material::standard(Color::WHITE))
    }

    fn assert_consistent(registry: &ObjectRegistry, scene: &Scene) {
        for (name, id) in registry.iter() {
            assert_eq!(scene.get_object_by_name(name), Some(id), "entry '{name}' disagrees with scene");
        }
    }

    #[test]
    fn test_create_once_then_update() {
        let mut scene = Scene::new();
        let mut registry = ObjectRegistry::new();
        let mut creates = 0;
        let mut updates = 0;

        let first = registry
            .create_or_update(&mut scene, "cube", || { creates += 1; Some(cube()) }, |_| updates += 1)
            .unwrap();
        let second = registry
            .create_or_update(&mut scene, "cube", || { creates += 1; Some(cube()) }, |node| {
                updates += 1;
                node.transform.position = Vec3::new(1.0, 0.0, 0.0);
            })
            .unwrap();

        assert_eq!((creates, updates), (1, 1));
        assert!(matches!(first, Resolution::Created(_)));
        assert_eq!(second, Resolution::Updated(first.id()));
        assert_eq!(scene.node_count(), 1);
        assert_eq!(scene.get(first.id()).unwrap().transform.position.x, 1.0);
        assert_consistent(&registry, &scene);
    }

    #[test]
    fn test_invalid_create_attaches_nothing() {
        let mut scene = Scene::new();
        let mut registry = ObjectRegistry::new();

        let result = registry.create_or_update(&mut scene, "ghost", || None, |_| {});

        assert_eq!(result, Err(RegistryError::CreateFnInvalid("ghost".to_string())));
        assert_eq!(scene.arena_len(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stale_entry_falls_back_to_scene() {
        let mut scene = Scene::new();
        let mut registry = ObjectRegistry::new();
        let old = registry
            .create_or_update(&mut scene, "ship", || Some(cube()), |_| {})
            .unwrap()
            .id();

        scene.detach(old);
        let replacement = scene.add(cube().with_name("ship"));

        assert_eq!(registry.resolve(&scene, "ship"), Some(replacement));
        assert_eq!(registry.get("ship"), Some(replacement));
        assert_consistent(&registry, &scene);
    }

    #[test]
    fn test_scene_lookup_used_when_unregistered() {
        let mut scene = Scene::new();
        let mut registry = ObjectRegistry::new();
        let existing = scene.add(cube().with_name("rock"));
        let mut created = false;

        let resolution = registry
            .create_or_update(&mut scene, "rock", || { created = true; Some(cube()) }, |_| {})
            .unwrap();

        assert!(!created);
        assert_eq!(resolution, Resolution::Updated(existing));
    }

    #[test]
    fn test_adopt_refuses_owned_nodes() {
        let mut scene = Scene::new();
        let mut registry = ObjectRegistry::new();
        let a = registry.create_or_update(&mut scene, "a", || Some(cube()), |_| {}).unwrap().id();
        let loose = scene.add(cube());

        assert_eq!(registry.adopt(&mut scene, "b", a), Err(RegistryError::NodeInUse("b".to_string())));
        assert_eq!(registry.adopt(&mut scene, "c", loose), Err(RegistryError::NodeInUse("c".to_string())));
        assert_eq!(scene.get(a).unwrap().name(), Some("a"));
        assert_eq!(registry.len(), 1);
        assert_consistent(&registry, &scene);
    }

    #[test]
    fn test_renamed_node_is_stale() {
        let mut scene = Scene::new();
        let mut registry = ObjectRegistry::new();
        let id = registry.create_or_update(&mut scene, "old", || Some(cube()), |_| {}).unwrap().id();

        scene.get_mut(id).unwrap().name = Some("new".to_string());

        assert_eq!(registry.resolve(&scene, "old"), None);
        assert_eq!(registry.prune_stale(&scene), 0);
        assert_eq!(registry.resolve(&scene, "new"), Some(id));
        assert_consistent(&registry, &scene);
    }

    #[test]
    fn test_replace_removes_previous_holder() {
        let mut scene = Scene::new();
        let mut registry = ObjectRegistry::new();
        let old = registry.create_or_update(&mut scene, "model", || Some(cube()), |_| {}).unwrap().id();
        let fresh = scene.create(cube());

        assert_eq!(registry.replace(&mut scene, "model", fresh), Ok(Some(old)));
        assert!(!scene.contains(old));
        assert_eq!(registry.get("model"), Some(fresh));
        assert_eq!(registry.replace(&mut scene, "model", fresh), Err(RegistryError::NodeInUse("model".to_string())));
        assert_consistent(&registry, &scene);
    }

    #[test]
    fn test_prune_stale_after_removal() {
        let mut scene = Scene::new();
        let mut registry = ObjectRegistry::new();
        for name in ["a", "b", "c"] {
            registry.create_or_update(&mut scene, name, || Some(cube()), |_| {}).unwrap();
        }
        let b = registry.get("b").unwrap();
        scene.remove(b);

        assert_eq!(registry.prune_stale(&scene), 1);
        assert_eq!(registry.len(), 2);
        assert_consistent(&registry, &scene);
    }
}
