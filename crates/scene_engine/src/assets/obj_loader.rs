//! Wavefront OBJ importer
//!
//! Parses OBJ text into an [`ImportedModel`]: a group whose children are one
//! mesh per `o`/`g` section. Faces are fan-triangulated, negative (relative)
//! indices are supported and vertices are deduplicated per mesh. Meshes without
//! normals get smooth normals generated. Material libraries are not read; every
//! mesh gets a default Phong material.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::assets::{ImportedModel, ImportedNode, MeshFormat};
use crate::foundation::math::Transform;
use crate::render::geometry::{Geometry, GeometryError};
use crate::render::material::{Material, PhongMaterial};
use crate::scene::{Mesh, NodeKind};

/// OBJ parsing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObjError {
    /// A statement could not be parsed
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What was wrong
        message: String,
    },
    /// A face references a vertex that does not exist
    #[error("line {line}: {kind} index {index} out of range")]
    IndexOutOfRange {
        /// 1-based line number
        line: usize,
        /// `position`, `texture coordinate` or `normal`
        kind: &'static str,
        /// Index as written in the file
        index: i64,
    },
    /// The file has no faces
    #[error("no faces found")]
    NoGeometry,
    /// A mesh failed validation
    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
}

type VertexKey = (usize, Option<usize>, Option<usize>);

#[derive(Default)]
struct MeshBuilder {
    name: Option<String>,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    indices: Vec<u32>,
    missing_normals: bool,
    lookup: HashMap<VertexKey, u32>,
}

impl MeshBuilder {
    fn named(name: Option<String>) -> Self {
        Self { name, ..Self::default() }
    }

    fn vertex(&mut self, key: VertexKey, data: &ObjData) -> u32 {
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }
        let (p, t, n) = key;
        let index = self.positions.len() as u32;
        self.positions.push(data.positions[p]);
        self.uvs.push(t.map_or([0.0, 0.0], |t| data.uvs[t]));
        match n {
            Some(n) => self.normals.push(data.normals[n]),
            None => {
                self.normals.push([0.0, 0.0, 0.0]);
                self.missing_normals = true;
            }
        }
        self.lookup.insert(key, index);
        index
    }

    fn finish(self) -> Result<Option<ImportedNode>, ObjError> {
        if self.indices.is_empty() {
            return Ok(None);
        }
        let normals = (!self.missing_normals).then_some(self.normals);
        let geometry = Geometry::new(self.positions, normals, Some(self.uvs), self.indices)?;
        Ok(Some(ImportedNode {
            name: self.name,
            transform: Transform::identity(),
            kind: NodeKind::Mesh(Mesh {
                geometry: Arc::new(geometry),
                material: Material::Phong(PhongMaterial::default()),
            }),
            children: Vec::new(),
        }))
    }
}

#[derive(Default)]
struct ObjData {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
}

fn parse_floats<const N: usize>(parts: &[&str], line: usize, what: &str) -> Result<[f32; N], ObjError> {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        let part = parts.get(i).ok_or_else(|| ObjError::Parse {
            line,
            message: format!("{} needs {} components", what, N),
        })?;
        *slot = part.parse().map_err(|_| ObjError::Parse {
            line,
            message: format!("invalid {what} component '{part}'"),
        })?;
    }
    Ok(out)
}

/// Resolve a 1-based or negative OBJ index against the current element count
fn resolve_index(raw: &str, count: usize, line: usize, kind: &'static str) -> Result<usize, ObjError> {
    let index: i64 = raw.parse().map_err(|_| ObjError::Parse {
        line,
        message: format!("invalid {kind} index '{raw}'"),
    })?;
    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => count as i64 + i,
        _ => -1,
    };
    if resolved < 0 || resolved >= count as i64 {
        return Err(ObjError::IndexOutOfRange { line, kind, index });
    }
    Ok(resolved as usize)
}

fn parse_face_vertex(token: &str, data: &ObjData, line: usize) -> Result<VertexKey, ObjError> {
    let mut parts = token.split('/');
    let position = resolve_index(parts.next().unwrap_or_default(), data.positions.len(), line, "position")?;
    let uv = match parts.next() {
        Some(t) if !t.is_empty() => Some(resolve_index(t, data.uvs.len(), line, "texture coordinate")?),
        _ => None,
    };
    let normal = match parts.next() {
        Some(n) if !n.is_empty() => Some(resolve_index(n, data.normals.len(), line, "normal")?),
        _ => None,
    };
    Ok((position, uv, normal))
}

/// Parse OBJ text
pub fn parse_obj(text: &str) -> Result<ImportedModel, ObjError> {
    let mut data = ObjData::default();
    let mut current = MeshBuilder::named(None);
    let mut meshes = Vec::new();

    for (number, raw_line) in text.lines().enumerate() {
        let line = number + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let args = &parts[1..];

        match parts[0] {
            "v" => data.positions.push(parse_floats::<3>(args, line, "vertex")?),
            "vn" => data.normals.push(parse_floats::<3>(args, line, "normal")?),
            "vt" => data.uvs.push(parse_floats::<2>(args, line, "texture coordinate")?),
            "o" | "g" => {
                let name = (!args.is_empty()).then(|| args.join(" "));
                let finished = std::mem::replace(&mut current, MeshBuilder::named(name));
                if let Some(mesh) = finished.finish()? {
                    meshes.push(mesh);
                }
            }
            "f" => {
                if args.len() < 3 {
                    return Err(ObjError::Parse {
                        line,
                        message: format!("face needs at least 3 vertices, got {}", args.len()),
                    });
                }
                let keys = args
                    .iter()
                    .map(|token| parse_face_vertex(token, &data, line))
                    .collect::<Result<Vec<_>, _>>()?;
                let face: Vec<u32> = keys.into_iter().map(|key| current.vertex(key, &data)).collect();
                for i in 1..face.len() - 1 {
                    current.indices.extend_from_slice(&[face[0], face[i], face[i + 1]]);
                }
            }
            other => log::trace!("OBJ line {}: ignoring '{}'", line, other),
        }
    }
    if let Some(mesh) = current.finish()? {
        meshes.push(mesh);
    }

    if meshes.is_empty() {
        return Err(ObjError::NoGeometry);
    }
    log::debug!("Parsed OBJ: {} vertices, {} meshes", data.positions.len(), meshes.len());
    Ok(ImportedModel {
        format: MeshFormat::Obj,
        root: ImportedNode {
            name: None,
            transform: Transform::identity(),
            kind: NodeKind::Group,
            children: meshes,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
# unit quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    fn only_mesh(model: &ImportedModel) -> &Mesh {
        match &model.root.children[0].kind {
            NodeKind::Mesh(mesh) => mesh,
            other => panic!("expected mesh, got {other:?}"),
        }
    }

    #[test]
    fn test_quad_is_fan_triangulated() {
        let model = parse_obj(QUAD).unwrap();
        let mesh = only_mesh(&model);

        assert_eq!(model.root.children.len(), 1);
        assert_eq!(mesh.geometry.triangle_count(), 2);
        assert_eq!(mesh.geometry.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.geometry.uvs[2], [1.0, 1.0]);
        assert!(matches!(mesh.material, Material::Phong(_)));
    }

    #[test]
    fn test_negative_indices_and_generated_normals() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let model = parse_obj(text).unwrap();
        let mesh = only_mesh(&model);

        assert_eq!(mesh.geometry.positions[1], [1.0, 0.0, 0.0]);
        assert_eq!(mesh.geometry.normals[0], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_groups_become_child_meshes() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
o first
f 1 2 3
g second part
f 1 3 4
";
        let model = parse_obj(text).unwrap();

        let names: Vec<_> = model.root.children.iter().map(|c| c.name.as_deref()).collect();
        assert_eq!(names, vec![Some("first"), Some("second part")]);
        assert_eq!(model.mesh_count(), 2);
        assert_eq!(model.triangle_count(), 2);
    }

    #[test]
    fn test_shared_vertices_are_deduplicated() {
        let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3\nf 1 3 4\n";
        let model = parse_obj(text).unwrap();
        assert_eq!(only_mesh(&model).geometry.positions.len(), 4);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert_eq!(
            parse_obj("v 0 0 0\nv 1 0 0\nf 1 2 9\n").unwrap_err(),
            ObjError::IndexOutOfRange { line: 3, kind: "position", index: 9 }
        );
        assert!(matches!(parse_obj("v 0 zero 0\n"), Err(ObjError::Parse { line: 1, .. })));
        assert!(matches!(parse_obj("v 0 0 0\nf 1 1\n"), Err(ObjError::Parse { line: 2, .. })));
        assert_eq!(parse_obj("# only a comment\nv 0 0 0\n").unwrap_err(), ObjError::NoGeometry);
    }
}
