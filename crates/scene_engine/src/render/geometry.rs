//! Mesh geometry and primitive generators
//!
//! Geometry is stored as indexed triangle lists with per-vertex normals and
//! texture coordinates, the layout the OBJ and glTF importers produce and the
//! software rasterizer consumes. Primitives are centered on the origin and use
//! a right-handed Y-up frame.

use std::f32::consts::{PI, TAU};

use crate::foundation::math::Vec3;
use crate::scene::AABB;

/// Indexed triangle geometry
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals (same length as positions)
    pub normals: Vec<[f32; 3]>,
    /// Texture coordinates (same length as positions)
    pub uvs: Vec<[f32; 2]>,
    /// Triangle list indices
    pub indices: Vec<u32>,
}

/// Geometry validation failures
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// No triangles
    #[error("geometry has no triangles")]
    Empty,
    /// Attribute arrays disagree on vertex count
    #[error("attribute length mismatch: {positions} positions, {normals} normals, {uvs} uvs")]
    AttributeMismatch {
        /// Position count
        positions: usize,
        /// Normal count
        normals: usize,
        /// Texture coordinate count
        uvs: usize,
    },
    /// Index list is not a multiple of three
    #[error("index count {0} is not a multiple of 3")]
    PartialTriangle(usize),
    /// An index points past the vertex arrays
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending index
        index: u32,
        /// Vertex count
        vertex_count: usize,
    },
    /// A position component is NaN or infinite
    #[error("non-finite vertex position")]
    NonFinite,
}

impl Geometry {
    /// Build geometry, generating smooth normals and zero UVs when absent
    pub fn new(
        positions: Vec<[f32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
        uvs: Option<Vec<[f32; 2]>>,
        indices: Vec<u32>,
    ) -> Result<Self, GeometryError> {
        let vertex_count = positions.len();
        let uvs = uvs.unwrap_or_else(|| vec![[0.0, 0.0]; vertex_count]);
        let generate_normals = normals.is_none();
        let mut geometry = Self {
            normals: normals.unwrap_or_else(|| vec![[0.0, 0.0, 0.0]; vertex_count]),
            positions,
            uvs,
            indices,
        };
        geometry.validate()?;
        if generate_normals {
            geometry.compute_vertex_normals();
        }
        Ok(geometry)
    }

    /// Check attribute lengths, index ranges and finiteness
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.indices.is_empty() {
            return Err(GeometryError::Empty);
        }
        if self.normals.len() != self.positions.len() || self.uvs.len() != self.positions.len() {
            return Err(GeometryError::AttributeMismatch {
                positions: self.positions.len(),
                normals: self.normals.len(),
                uvs: self.uvs.len(),
            });
        }
        if self.indices.len() % 3 != 0 {
            return Err(GeometryError::PartialTriangle(self.indices.len()));
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= self.positions.len()) {
            return Err(GeometryError::IndexOutOfRange {
                index,
                vertex_count: self.positions.len(),
            });
        }
        if self.positions.iter().flatten().any(|c| !c.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        Ok(())
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Local-space bounding box
    pub fn bounding_box(&self) -> Option<AABB> {
        AABB::from_points(self.positions.iter().map(|p| Vec3::new(p[0], p[1], p[2])))
    }

    /// Recompute smooth normals by area-weighted face normal accumulation
    pub fn compute_vertex_normals(&mut self) {
        let mut accumulated = vec![Vec3::zeros(); self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let pa = Vec3::from(self.positions[a]);
            let pb = Vec3::from(self.positions[b]);
            let pc = Vec3::from(self.positions[c]);
            let face = (pb - pa).cross(&(pc - pa));
            accumulated[a] += face;
            accumulated[b] += face;
            accumulated[c] += face;
        }
        self.normals = accumulated
            .into_iter()
            .map(|n| {
                let n = n.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y);
                [n.x, n.y, n.z]
            })
            .collect();
    }

    /// Axis-aligned box with the given full extents
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let (hx, hy, hz) = (width * 0.5, height * 0.5, depth * 0.5);
        // (normal, u axis, v axis) per face; corners are generated from them
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        let half = Vec3::new(hx, hy, hz);
        let mut geometry = Self::default();
        for (normal, u_axis, v_axis) in faces {
            let n = Vec3::from(normal);
            let u = Vec3::from(u_axis);
            let v = Vec3::from(v_axis);
            let base = geometry.positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let p = (n + u * su + v * sv).component_mul(&half);
                geometry.positions.push([p.x, p.y, p.z]);
                geometry.normals.push(normal);
                geometry.uvs.push([(su + 1.0) * 0.5, (sv + 1.0) * 0.5]);
            }
            geometry.indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        geometry
    }

    /// UV sphere
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let mut geometry = Self::default();
        for y in 0..=height_segments {
            let v = y as f32 / height_segments as f32;
            let theta = v * PI;
            for x in 0..=width_segments {
                let u = x as f32 / width_segments as f32;
                let phi = u * TAU;
                let n = Vec3::new(-phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin());
                geometry.positions.push([n.x * radius, n.y * radius, n.z * radius]);
                geometry.normals.push([n.x, n.y, n.z]);
                geometry.uvs.push([u, 1.0 - v]);
            }
        }
        let stride = width_segments + 1;
        for y in 0..height_segments {
            for x in 0..width_segments {
                let a = y * stride + x + 1;
                let b = y * stride + x;
                let c = (y + 1) * stride + x;
                let d = (y + 1) * stride + x + 1;
                if y != 0 {
                    geometry.indices.extend_from_slice(&[a, b, d]);
                }
                if y != height_segments - 1 {
                    geometry.indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
        geometry
    }

    /// Plane in the XY plane facing +Z
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        Self {
            positions: vec![[-hw, -hh, 0.0], [hw, -hh, 0.0], [hw, hh, 0.0], [-hw, hh, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }

    /// Capped cylinder along Y; a zero top radius makes a cone
    pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, radial_segments: u32) -> Self {
        let segments = radial_segments.max(3);
        let half = height * 0.5;
        let slope = (radius_bottom - radius_top) / height.max(f32::EPSILON);
        let mut geometry = Self::default();

        // Side wall
        for y in 0..=1u32 {
            let t = y as f32;
            let radius = radius_bottom + (radius_top - radius_bottom) * t;
            for x in 0..=segments {
                let u = x as f32 / segments as f32;
                let angle = u * TAU;
                let (sin, cos) = angle.sin_cos();
                let n = Vec3::new(sin, slope, cos).normalize();
                geometry.positions.push([radius * sin, -half + height * t, radius * cos]);
                geometry.normals.push([n.x, n.y, n.z]);
                geometry.uvs.push([u, t]);
            }
        }
        let stride = segments + 1;
        for x in 0..segments {
            let (a, b) = (x, x + 1);
            let (c, d) = (stride + x, stride + x + 1);
            geometry.indices.extend_from_slice(&[a, b, d, d, c, a]);
        }

        // Caps
        for (radius, y, normal_y) in [(radius_top, half, 1.0f32), (radius_bottom, -half, -1.0)] {
            if radius <= 0.0 {
                continue;
            }
            let center = geometry.positions.len() as u32;
            geometry.positions.push([0.0, y, 0.0]);
            geometry.normals.push([0.0, normal_y, 0.0]);
            geometry.uvs.push([0.5, 0.5]);
            for x in 0..=segments {
                let angle = x as f32 / segments as f32 * TAU;
                let (sin, cos) = angle.sin_cos();
                geometry.positions.push([radius * sin, y, radius * cos]);
                geometry.normals.push([0.0, normal_y, 0.0]);
                geometry.uvs.push([0.5 + 0.5 * sin, 0.5 + 0.5 * cos]);
            }
            for x in 0..segments {
                let (a, b) = (center + 1 + x, center + 2 + x);
                if normal_y > 0.0 {
                    geometry.indices.extend_from_slice(&[center, a, b]);
                } else {
                    geometry.indices.extend_from_slice(&[center, b, a]);
                }
            }
        }
        geometry
    }

    /// Cone along Y with its apex at +height/2
    pub fn cone(radius: f32, height: f32, radial_segments: u32) -> Self {
        Self::cylinder(0.0, radius, height, radial_segments)
    }

    /// Torus in the XY plane
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let radial = radial_segments.max(3);
        let tubular = tubular_segments.max(3);
        let mut geometry = Self::default();
        for j in 0..=radial {
            let v = j as f32 / radial as f32 * TAU;
            for i in 0..=tubular {
                let u = i as f32 / tubular as f32 * TAU;
                let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
                let p = Vec3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                );
                let n = (p - center).normalize();
                geometry.positions.push([p.x, p.y, p.z]);
                geometry.normals.push([n.x, n.y, n.z]);
                geometry.uvs.push([i as f32 / tubular as f32, j as f32 / radial as f32]);
            }
        }
        let stride = tubular + 1;
        for j in 1..=radial {
            for i in 1..=tubular {
                let a = stride * j + i - 1;
                let b = stride * (j - 1) + i - 1;
                let c = stride * (j - 1) + i;
                let d = stride * j + i;
                geometry.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_primitives_are_valid() {
        let primitives = [
            Geometry::cuboid(1.0, 2.0, 3.0),
            Geometry::sphere(1.0, 16, 8),
            Geometry::plane(2.0, 2.0),
            Geometry::cylinder(1.0, 1.0, 2.0, 12),
            Geometry::cone(1.0, 2.0, 12),
            Geometry::torus(1.0, 0.25, 8, 16),
        ];
        for geometry in &primitives {
            assert_eq!(geometry.validate(), Ok(()));
        }
    }

    #[test]
    fn test_cuboid_bounds_match_extents() {
        let bounds = Geometry::cuboid(1.0, 2.0, 3.0).bounding_box().unwrap();
        assert_relative_eq!(bounds.size(), Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-6);
        assert_relative_eq!(bounds.center(), Vec3::zeros(), epsilon = 1e-6);
        assert_eq!(Geometry::cuboid(1.0, 1.0, 1.0).triangle_count(), 12);
    }

    #[test]
    fn test_cuboid_winding_faces_outward() {
        let geometry = Geometry::cuboid(2.0, 2.0, 2.0);
        for tri in geometry.indices.chunks_exact(3) {
            let p: Vec<Vec3> = tri.iter().map(|&i| Vec3::from(geometry.positions[i as usize])).collect();
            let face = (p[1] - p[0]).cross(&(p[2] - p[0]));
            let centroid = (p[0] + p[1] + p[2]) / 3.0;
            assert!(face.dot(&centroid) > 0.0);
        }
    }

    #[test]
    fn test_new_generates_normals() {
        let geometry = Geometry::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            None,
            None,
            vec![0, 1, 2],
        )
        .unwrap();
        assert_eq!(geometry.normals[0], [0.0, 0.0, 1.0]);
        assert_eq!(geometry.uvs.len(), 3);
    }

    #[test]
    fn test_validate_catches_bad_index() {
        let result = Geometry::new(vec![[0.0; 3]; 3], None, None, vec![0, 1, 3]);
        assert_eq!(result, Err(GeometryError::IndexOutOfRange { index: 3, vertex_count: 3 }));
        assert_eq!(Geometry::new(vec![], None, None, vec![]), Err(GeometryError::Empty));
    }
}
