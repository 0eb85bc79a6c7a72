//! Binary glTF (GLB) importer
//!
//! Reads the default scene of a GLB container with the `gltf` crate. Node
//! hierarchy and transforms are preserved; a mesh with one primitive becomes a
//! mesh node, a mesh with several becomes a group of mesh children. Materials
//! map onto the engine's three kinds:
//!
//! - `KHR_materials_unlit` → Basic
//! - `KHR_materials_pbrSpecularGlossiness` → Phong
//! - metallic-roughness → Standard
//!
//! Factors in glTF are linear; base color textures are sRGB.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::assets::{ImportedModel, ImportedNode, MeshFormat};
use crate::foundation::math::{Mat4, Transform};
use crate::render::geometry::{Geometry, GeometryError};
use crate::render::material::{
    BasicMaterial, Color, ColorEncoding, Material, PhongMaterial, Side, StandardMaterial, Texture,
};
use crate::scene::{Mesh, NodeKind};

/// Node nesting deeper than this is rejected
const MAX_DEPTH: usize = 256;

/// GLB import errors
#[derive(Error, Debug)]
pub enum GlbError {
    /// The container or document is invalid
    #[error("invalid glTF: {0}")]
    Gltf(#[from] gltf::Error),
    /// A primitive has no POSITION attribute
    #[error("mesh '{0}' has a primitive without positions")]
    MissingPositions(String),
    /// A primitive failed validation
    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
    /// The document contains no drawable nodes
    #[error("no meshes found")]
    NoGeometry,
    /// The node hierarchy is deeper than supported
    #[error("node hierarchy deeper than 256 levels")]
    TooDeep,
}

struct ImportContext {
    buffers: Vec<gltf::buffer::Data>,
    images: Vec<gltf::image::Data>,
}

impl ImportContext {
    fn texture(&self, texture: &gltf::Texture<'_>) -> Option<Texture> {
        let source = texture.source();
        let image = self.images.get(source.index())?;
        let pixels = to_rgba8(image)?;
        let mut texture = Texture::from_rgba8(image.width, image.height, pixels, ColorEncoding::Srgb)?;
        texture.name = source.name().map(str::to_string);
        Some(texture)
    }

    fn material(&self, material: &gltf::Material<'_>) -> Material {
        let side = if material.double_sided() { Side::Double } else { Side::Front };
        let blended = material.alpha_mode() == gltf::material::AlphaMode::Blend;
        let pbr = material.pbr_metallic_roughness();
        let [r, g, b, a] = pbr.base_color_factor();
        let opacity = if blended { a } else { 1.0 };

        if material.unlit() {
            return Material::Basic(BasicMaterial {
                color: Color::linear(r, g, b),
                map: pbr.base_color_texture().and_then(|info| self.texture(&info.texture())),
                opacity,
                side,
            });
        }

        if let Some(spec_gloss) = material.pbr_specular_glossiness() {
            let [dr, dg, db, da] = spec_gloss.diffuse_factor();
            let [sr, sg, sb] = spec_gloss.specular_factor();
            return Material::Phong(PhongMaterial {
                color: Color::linear(dr, dg, db),
                map: spec_gloss.diffuse_texture().and_then(|info| self.texture(&info.texture())),
                specular: Color::linear(sr, sg, sb),
                shininess: (spec_gloss.glossiness_factor() * 100.0).max(1.0),
                opacity: if blended { da } else { 1.0 },
                side,
            });
        }

        let [er, eg, eb] = material.emissive_factor();
        Material::Standard(StandardMaterial {
            color: Color::linear(r, g, b),
            map: pbr.base_color_texture().and_then(|info| self.texture(&info.texture())),
            metalness: pbr.metallic_factor(),
            roughness: pbr.roughness_factor(),
            emissive: Color::linear(er, eg, eb),
            opacity,
            side,
            needs_update: false,
        })
    }

    fn primitive(&self, mesh_name: &str, primitive: &gltf::Primitive<'_>) -> Result<Option<Mesh>, GlbError> {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!("Skipping {:?} primitive in mesh '{}'", primitive.mode(), mesh_name);
            return Ok(None);
        }
        let reader = primitive.reader(|buffer| self.buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| GlbError::MissingPositions(mesh_name.to_string()))?
            .collect();
        let normals = reader.read_normals().map(Iterator::collect);
        let uvs = reader.read_tex_coords(0).map(|coords| coords.into_f32().collect());
        let indices = reader
            .read_indices()
            .map_or_else(|| (0..positions.len() as u32).collect(), |indices| indices.into_u32().collect());

        let geometry = Geometry::new(positions, normals, uvs, indices)?;
        Ok(Some(Mesh {
            geometry: Arc::new(geometry),
            material: self.material(&primitive.material()),
        }))
    }

    fn node(&self, node: &gltf::Node<'_>, depth: usize) -> Result<ImportedNode, GlbError> {
        if depth > MAX_DEPTH {
            return Err(GlbError::TooDeep);
        }
        let matrix = Mat4::from(node.transform().matrix());
        let mut imported = ImportedNode {
            name: node.name().map(str::to_string),
            transform: Transform::from_matrix(&matrix),
            kind: NodeKind::Group,
            children: Vec::new(),
        };

        if let Some(mesh) = node.mesh() {
            let mesh_name = mesh.name().unwrap_or("unnamed").to_string();
            let mut parts = Vec::new();
            for primitive in mesh.primitives() {
                if let Some(part) = self.primitive(&mesh_name, &primitive)? {
                    parts.push(part);
                }
            }
            if parts.len() == 1 {
                if let Some(part) = parts.pop() {
                    imported.kind = NodeKind::Mesh(part);
                }
            } else {
                imported.children.extend(parts.into_iter().map(|part| ImportedNode {
                    name: None,
                    transform: Transform::identity(),
                    kind: NodeKind::Mesh(part),
                    children: Vec::new(),
                }));
            }
        }

        for child in node.children() {
            imported.children.push(self.node(&child, depth + 1)?);
        }
        Ok(imported)
    }
}

fn to_rgba8(image: &gltf::image::Data) -> Option<Vec<u8>> {
    use gltf::image::Format;
    match image.format {
        Format::R8G8B8A8 => Some(image.pixels.clone()),
        Format::R8G8B8 => Some(image.pixels.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 255]).collect()),
        Format::R8G8 => Some(image.pixels.chunks_exact(2).flat_map(|p| [p[0], p[0], p[0], p[1]]).collect()),
        Format::R8 => Some(image.pixels.iter().flat_map(|&v| [v, v, v, 255]).collect()),
        other => {
            log::warn!("Unsupported glTF image format {:?}; texture dropped", other);
            None
        }
    }
}

/// Parse a GLB container
pub fn parse_glb(bytes: &[u8]) -> Result<ImportedModel, GlbError> {
    let (document, buffers, images) = gltf::import_slice(bytes)?;
    let context = ImportContext { buffers, images };

    let roots: Vec<gltf::Node<'_>> = match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => scene.nodes().collect(),
        None => {
            let children: HashSet<usize> = document
                .nodes()
                .flat_map(|node| node.children().map(|child| child.index()).collect::<Vec<_>>())
                .collect();
            document.nodes().filter(|node| !children.contains(&node.index())).collect()
        }
    };

    let children = roots
        .iter()
        .map(|node| context.node(node, 0))
        .collect::<Result<Vec<_>, _>>()?;
    let model = ImportedModel {
        format: MeshFormat::Glb,
        root: ImportedNode {
            name: None,
            transform: Transform::identity(),
            kind: NodeKind::Group,
            children,
        },
    };
    if model.mesh_count() == 0 {
        return Err(GlbError::NoGeometry);
    }
    log::debug!("Parsed GLB: {} meshes, {} triangles", model.mesh_count(), model.triangle_count());
    Ok(model)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Assemble a GLB container holding one triangle with the given material JSON
    pub(crate) fn triangle_glb(material: &str, extensions_used: &str) -> Vec<u8> {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let bin: Vec<u8> = bytemuck::cast_slice::<f32, u8>(&positions[..]).to_vec();
        let json = format!(
            r#"{{"asset":{{"version":"2.0"}},{extensions_used}"scene":0,"scenes":[{{"nodes":[0]}}],
"nodes":[{{"name":"tri","mesh":0,"translation":[1.0,2.0,3.0]}}],
"meshes":[{{"name":"triangle","primitives":[{{"attributes":{{"POSITION":0}},"material":0}}]}}],
"materials":[{material}],
"buffers":[{{"byteLength":{len}}}],
"bufferViews":[{{"buffer":0,"byteOffset":0,"byteLength":{len}}}],
"accessors":[{{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0.0,0.0,0.0],"max":[1.0,1.0,0.0]}}]}}"#,
            len = bin.len(),
        );

        let mut json = json.into_bytes();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = bin;
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(&bin);
        glb
    }

    pub(crate) fn unlit_triangle() -> Vec<u8> {
        triangle_glb(
            r#"{"pbrMetallicRoughness":{"baseColorFactor":[1.0,0.0,0.0,1.0]},"extensions":{"KHR_materials_unlit":{}}}"#,
            r#""extensionsUsed":["KHR_materials_unlit"],"#,
        )
    }

    fn first_mesh(model: &ImportedModel) -> (&ImportedNode, &Mesh) {
        let node = &model.root.children[0];
        match &node.kind {
            NodeKind::Mesh(mesh) => (node, mesh),
            other => panic!("expected mesh, got {other:?}"),
        }
    }

    #[test]
    fn test_unlit_triangle_becomes_basic() {
        let model = parse_glb(&unlit_triangle()).unwrap();
        let (node, mesh) = first_mesh(&model);

        assert_eq!(node.name.as_deref(), Some("tri"));
        assert_relative_eq!(node.transform.position.z, 3.0);
        assert_eq!(mesh.geometry.triangle_count(), 1);
        assert_eq!(mesh.geometry.normals[0], [0.0, 0.0, 1.0]);
        match &mesh.material {
            Material::Basic(basic) => assert_eq!(basic.color, Color::linear(1.0, 0.0, 0.0)),
            other => panic!("expected basic material, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_metallic_roughness_becomes_standard() {
        let bytes = triangle_glb(
            r#"{"pbrMetallicRoughness":{"baseColorFactor":[0.5,0.5,0.5,1.0],"metallicFactor":0.7,"roughnessFactor":0.2},"doubleSided":true}"#,
            "",
        );
        let model = parse_glb(&bytes).unwrap();
        let (_, mesh) = first_mesh(&model);

        match &mesh.material {
            Material::Standard(standard) => {
                assert_relative_eq!(standard.metalness, 0.7);
                assert_relative_eq!(standard.roughness, 0.2);
                assert_eq!(standard.side, Side::Double);
                assert_eq!(standard.color.encoding, ColorEncoding::Linear);
            }
            other => panic!("expected standard material, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_truncated_container_is_rejected() {
        let bytes = unlit_triangle();
        assert!(matches!(parse_glb(&bytes[..bytes.len() / 2]), Err(GlbError::Gltf(_))));
        assert!(matches!(parse_glb(b"not a glb at all"), Err(GlbError::Gltf(_))));
    }
}
