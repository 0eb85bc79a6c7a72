//! Material normalization for imported subtrees
//!
//! Imported models arrive with whatever material kinds their authoring tool
//! exported. The normalizer coerces every mesh in a subtree onto the canonical
//! [`StandardMaterial`] with consistent shading:
//!
//! 1. Non-standard materials are replaced, keeping color and base map
//! 2. Double-sided rendering, `needs_update`, metalness 0.1, roughness 0.8
//! 3. sRGB-tagged colors and maps are converted to linear
//!
//! Step 3 only touches sRGB-tagged values, so a second pass changes nothing.

use crate::foundation::collections::NodeId;
use crate::render::material::{ColorEncoding, Material, Side, StandardMaterial};
use crate::scene::Scene;

/// Metalness assigned to normalized materials
pub const NORMALIZED_METALNESS: f32 = 0.1;

/// Roughness assigned to normalized materials
pub const NORMALIZED_ROUGHNESS: f32 = 0.8;

/// What a normalization pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Mesh nodes visited
    pub meshes: usize,
    /// Materials replaced by a standard material
    pub replaced: usize,
    /// Colors and maps converted from sRGB to linear
    pub converted: usize,
}

/// Normalize a single material in place
pub fn normalize_material(material: &mut Material, report: &mut NormalizeReport) {
    if !material.is_standard() {
        let replacement = StandardMaterial {
            color: material.color(),
            map: material.map().cloned(),
            opacity: material.opacity(),
            ..StandardMaterial::default()
        };
        log::trace!("Replacing {} material with Standard", material.kind_name());
        *material = Material::Standard(replacement);
        report.replaced += 1;
    }

    let Material::Standard(standard) = material else {
        return;
    };
    standard.side = Side::Double;
    standard.needs_update = true;
    standard.metalness = NORMALIZED_METALNESS;
    standard.roughness = NORMALIZED_ROUGHNESS;

    if standard.color.encoding == ColorEncoding::Srgb {
        standard.color = standard.color.to_linear();
        report.converted += 1;
    }
    if let Some(map) = standard.map.as_mut() {
        if map.encoding == ColorEncoding::Srgb {
            *map = map.to_linear();
            report.converted += 1;
        }
    }
}

/// Normalize every mesh in the subtree rooted at `root`
pub fn normalize_subtree(scene: &mut Scene, root: NodeId) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let Some(node) = scene.get_mut(id) else {
            continue;
        };
        stack.extend_from_slice(node.children());
        if let Some(mesh) = node.as_mesh_mut() {
            report.meshes += 1;
            normalize_material(&mut mesh.material, &mut report);
        }
    }
    log::debug!(
        "Normalized {} meshes ({} replaced, {} converted)",
        report.meshes,
        report.replaced,
        report.converted
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::geometry::Geometry;
    use crate::render::material::{Color, PhongMaterial, Texture};
    use crate::scene::Node;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn textured_phong() -> Material {
        let texture = Texture::from_rgba8(1, 1, vec![128, 128, 128, 255], ColorEncoding::Srgb).unwrap();
        Material::Phong(PhongMaterial {
            color: Color::from_hex(0x808080),
            map: Some(texture),
            ..PhongMaterial::default()
        })
    }

    fn model(scene: &mut Scene) -> NodeId {
        let root = scene.add(Node::group());
        let geometry = Arc::new(Geometry::cuboid(1.0, 1.0, 1.0));
        scene.add_child(root, Node::mesh(Arc::clone(&geometry), textured_phong())).unwrap();
        scene.add_child(root, Node::mesh(geometry, Material::basic(Color::linear(0.2, 0.4, 0.6)))).unwrap();
        root
    }

    #[test]
    fn test_replaces_and_converts() {
        let mut scene = Scene::new();
        let root = model(&mut scene);

        let report = normalize_subtree(&mut scene, root);

        assert_eq!(report, NormalizeReport { meshes: 2, replaced: 2, converted: 2 });
        let first = scene.get(root).unwrap().children()[0];
        let Some(Material::Standard(standard)) = scene.get(first).and_then(|n| n.as_mesh()).map(|m| &m.material) else {
            panic!("material was not replaced");
        };
        assert_eq!(standard.side, Side::Double);
        assert!(standard.needs_update);
        assert_relative_eq!(standard.metalness, 0.1);
        assert_relative_eq!(standard.roughness, 0.8);
        assert_eq!(standard.color.encoding, ColorEncoding::Linear);
        assert_relative_eq!(standard.color.r, 0.2158605, epsilon = 1e-5);
        let map = standard.map.as_ref().unwrap();
        assert_eq!(map.encoding, ColorEncoding::Linear);
        assert_eq!(map.pixels[0], 55);
    }

    #[test]
    fn test_second_pass_changes_nothing() {
        let mut scene = Scene::new();
        let root = model(&mut scene);

        normalize_subtree(&mut scene, root);
        let once = scene.clone();
        let report = normalize_subtree(&mut scene, root);

        assert_eq!(report, NormalizeReport { meshes: 2, replaced: 0, converted: 0 });
        for id in once.attached_ids() {
            assert_eq!(once.get(id), scene.get(id));
        }
    }

    #[test]
    fn test_linear_color_is_kept() {
        let mut material = Material::basic(Color::linear(0.2, 0.4, 0.6));
        let mut report = NormalizeReport::default();

        normalize_material(&mut material, &mut report);

        assert_eq!(material.color(), Color::linear(0.2, 0.4, 0.6));
        assert_eq!(report.converted, 0);
    }
}
