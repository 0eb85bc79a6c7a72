//! Asset import
//!
//! Two mesh formats are supported, chosen by declared extension and never by
//! sniffing the bytes: Wavefront OBJ (text) and binary glTF (GLB). Parsing
//! produces an [`ImportedModel`], a scene-independent node tree that can cross
//! threads; [`ImportedModel::instantiate`] turns it into scene nodes on the
//! session thread.

pub mod glb_loader;
pub mod loader;
pub mod materials;
pub mod obj_loader;

use std::fmt;

use thiserror::Error;

use crate::foundation::collections::NodeId;
use crate::foundation::math::Transform;
use crate::scene::{Node, NodeKind, Scene, SceneError};

pub use glb_loader::{parse_glb, GlbError};
pub use loader::{AssetLoader, LoadCompletion, LoadRequest, LoadSource, LoadTicket};
pub use materials::{normalize_subtree, NormalizeReport};
pub use obj_loader::{parse_obj, ObjError};

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// The declared extension is not a supported mesh format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The bytes could not be parsed as the declared format
    #[error("Failed to parse {format} data: {reason}")]
    ParseFailure {
        /// Declared format
        format: MeshFormat,
        /// Parser diagnostic
        reason: String,
    },

    /// Asset not found in any search path
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// IO error during asset loading
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The loader worker ended without reporting a result
    #[error("Loader worker disconnected")]
    Disconnected,
}

impl From<ObjError> for AssetError {
    fn from(error: ObjError) -> Self {
        Self::ParseFailure {
            format: MeshFormat::Obj,
            reason: error.to_string(),
        }
    }
}

impl From<GlbError> for AssetError {
    fn from(error: GlbError) -> Self {
        Self::ParseFailure {
            format: MeshFormat::Glb,
            reason: error.to_string(),
        }
    }
}

/// Supported mesh formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    /// Wavefront OBJ, UTF-8 text
    Obj,
    /// Binary glTF 2.0 container
    Glb,
}

impl MeshFormat {
    /// Match a declared extension, case-insensitive, with or without a leading dot
    pub fn from_extension(extension: &str) -> Result<Self, AssetError> {
        let trimmed = extension.trim();
        let normalized = trimmed.strip_prefix('.').unwrap_or(trimmed).to_ascii_lowercase();
        match normalized.as_str() {
            "obj" => Ok(Self::Obj),
            "glb" => Ok(Self::Glb),
            _ => Err(AssetError::UnsupportedFormat(trimmed.to_string())),
        }
    }

    /// Format from the extension of a file name or path
    pub fn from_path(path: &str) -> Result<Self, AssetError> {
        let extension = std::path::Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        Self::from_extension(extension)
    }

    /// Canonical lowercase extension
    pub fn extension(self) -> &'static str {
        match self {
            Self::Obj => "obj",
            Self::Glb => "glb",
        }
    }

    /// True when imported materials go through the normalizer
    pub fn requires_normalization(self) -> bool {
        matches!(self, Self::Glb)
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Node of an imported model, not yet part of any scene
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedNode {
    /// Name from the source file
    pub name: Option<String>,
    /// Local transform
    pub transform: Transform,
    /// Payload
    pub kind: NodeKind,
    /// Children in source order
    pub children: Vec<ImportedNode>,
}

impl ImportedNode {
    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ImportedNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Parsed model ready to be instantiated into a scene
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedModel {
    /// Source format
    pub format: MeshFormat,
    /// Root group
    pub root: ImportedNode,
}

impl ImportedModel {
    /// Number of mesh nodes
    pub fn mesh_count(&self) -> usize {
        let mut count = 0;
        self.root.walk(&mut |node| {
            if matches!(node.kind, NodeKind::Mesh(_)) {
                count += 1;
            }
        });
        count
    }

    /// Number of triangles across all meshes
    pub fn triangle_count(&self) -> usize {
        let mut count = 0;
        self.root.walk(&mut |node| {
            if let NodeKind::Mesh(mesh) = &node.kind {
                count += mesh.geometry.triangle_count();
            }
        });
        count
    }

    /// Create scene nodes for the model; the returned root is not attached
    pub fn instantiate(self, scene: &mut Scene) -> Result<NodeId, SceneError> {
        fn build(scene: &mut Scene, imported: ImportedNode, parent: Option<NodeId>) -> Result<NodeId, SceneError> {
            let node = Node {
                name: imported.name,
                transform: imported.transform,
                visible: true,
                kind: imported.kind,
                parent: None,
                children: Vec::new(),
            };
            let id = match parent {
                Some(parent) => scene.add_child(parent, node)?,
                None => scene.create(node),
            };
            for child in imported.children {
                build(scene, child, Some(id))?;
            }
            Ok(id)
        }
        build(scene, self.root, None)
    }
}

/// Parse bytes in the given format on the calling thread
pub fn parse_model(bytes: &[u8], format: MeshFormat) -> Result<ImportedModel, AssetError> {
    match format {
        MeshFormat::Obj => {
            let text = std::str::from_utf8(bytes).map_err(|e| AssetError::ParseFailure {
                format,
                reason: format!("not valid UTF-8: {e}"),
            })?;
            Ok(parse_obj(text)?)
        }
        MeshFormat::Glb => Ok(parse_glb(bytes)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_matching() {
        assert_eq!(MeshFormat::from_extension("OBJ").unwrap(), MeshFormat::Obj);
        assert_eq!(MeshFormat::from_extension(".glb").unwrap(), MeshFormat::Glb);
        assert_eq!(MeshFormat::from_path("models/Ship.GLB").unwrap(), MeshFormat::Glb);
        assert!(matches!(
            MeshFormat::from_extension(".gltf"),
            Err(AssetError::UnsupportedFormat(ext)) if ext == ".gltf"
        ));
        assert!(matches!(MeshFormat::from_path("README"), Err(AssetError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_formats_are_not_sniffed() {
        let glb = glb_loader::tests::unlit_triangle();
        let result = parse_model(&glb, MeshFormat::Obj);
        assert!(matches!(result, Err(AssetError::ParseFailure { format: MeshFormat::Obj, .. })));

        let obj = b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let result = parse_model(obj, MeshFormat::Glb);
        assert!(matches!(result, Err(AssetError::ParseFailure { format: MeshFormat::Glb, .. })));
    }

    #[test]
    fn test_instantiate_keeps_hierarchy_detached() {
        let model = parse_model(b"v 0 0 0\nv 1 0 0\nv 0 1 0\no a\nf 1 2 3\no b\nf 3 2 1\n", MeshFormat::Obj).unwrap();
        let mut scene = Scene::new();

        let root = model.instantiate(&mut scene).unwrap();

        assert_eq!(scene.arena_len(), 3);
        assert!(!scene.is_attached(root));
        assert_eq!(scene.get(root).unwrap().children().len(), 2);
        scene.attach(root, None).unwrap();
        assert!(scene.get_object_by_name("b").is_some());
    }
}
