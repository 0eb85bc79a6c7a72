//! CPU software rasterizer
//!
//! Edge-function rasterization with a depth buffer, perspective-correct
//! attribute interpolation and per-pixel shading. Shading happens in linear
//! space and is encoded to sRGB when the frame is resolved into RGBA8.

use std::path::Path;

use crate::foundation::math::{Mat4, Matrix3, Vec3, Vec4};
use crate::render::backend::{BackendResult, FrameLights, FrameStats, RenderBackend, RenderError};
use crate::render::camera::Camera;
use crate::render::material::{linear_to_srgb, Color, Material, Side};
use crate::scene::{Background, Mesh, Scene};

/// Minimum clip-space w; triangles with a vertex closer than this are skipped
const MIN_CLIP_W: f32 = 1e-5;

/// Transformed vertex ready for rasterization
#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f32,
    y: f32,
    z: f32,
    inv_w: f32,
    world: Vec3,
    normal: Vec3,
    uv: [f32; 2],
}

/// Software renderer with an RGBA8 framebuffer
#[derive(Debug, Clone)]
pub struct SoftwareRenderer {
    width: u32,
    height: u32,
    radiance: Vec<[f32; 3]>,
    depth: Vec<f32>,
    pixels: Vec<u8>,
    clear_color: Color,
    frame_index: u64,
}

impl SoftwareRenderer {
    /// Create a renderer with a black clear color
    pub fn new(width: u32, height: u32) -> BackendResult<Self> {
        let mut renderer = Self {
            width: 0,
            height: 0,
            radiance: Vec::new(),
            depth: Vec::new(),
            pixels: Vec::new(),
            clear_color: Color::BLACK,
            frame_index: 0,
        };
        renderer.set_size(width, height)?;
        Ok(renderer)
    }

    /// Resolved RGBA8 pixels of the last frame, row-major from the top
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA8 value of a single pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        let px = &self.pixels[offset..offset + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// NDC depth at a pixel; infinity where nothing was drawn
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        (x < self.width && y < self.height).then(|| self.depth[(y * self.width + x) as usize])
    }

    /// Copy of the last frame as an image buffer
    pub fn to_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// Write the last frame as PNG
    pub fn save_png(&self, path: &Path) -> BackendResult<()> {
        let image = self.to_image().ok_or(RenderError::InvalidSize {
            width: self.width,
            height: self.height,
        })?;
        image.save_with_format(path, image::ImageFormat::Png)?;
        log::info!("Frame {} written to {}", self.frame_index.saturating_sub(1), path.display());
        Ok(())
    }

    fn clear(&mut self, scene: &Scene, camera: &Camera) {
        self.depth.fill(f32::INFINITY);
        match &scene.background {
            Some(Background::Color(color)) => self.radiance.fill(color.to_linear_array()),
            Some(Background::Environment(env)) => {
                let Some(inverse) = camera.view_projection_matrix().try_inverse() else {
                    self.radiance.fill(self.clear_color.to_linear_array());
                    return;
                };
                for y in 0..self.height {
                    for x in 0..self.width {
                        let ndc_x = (x as f32 + 0.5) / self.width as f32 * 2.0 - 1.0;
                        let ndc_y = 1.0 - (y as f32 + 0.5) / self.height as f32 * 2.0;
                        let near = inverse * Vec4::new(ndc_x, ndc_y, -1.0, 1.0);
                        let far = inverse * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
                        let direction = far.xyz() / far.w - near.xyz() / near.w;
                        self.radiance[(y * self.width + x) as usize] = env.sample(direction, 0);
                    }
                }
            }
            None => self.radiance.fill(self.clear_color.to_linear_array()),
        }
    }

    fn resolve(&mut self) {
        for (rgb, out) in self.radiance.iter().zip(self.pixels.chunks_exact_mut(4)) {
            for i in 0..3 {
                out[i] = (linear_to_srgb(rgb[i].clamp(0.0, 1.0)) * 255.0).round() as u8;
            }
            out[3] = 255;
        }
    }

    fn draw_mesh(
        &mut self,
        mesh: &Mesh,
        world: &Mat4,
        view_projection: &Mat4,
        eye: Vec3,
        lights: &FrameLights,
        stats: &mut FrameStats,
    ) {
        let geometry = &mesh.geometry;
        let mvp = view_projection * world;
        let linear: Matrix3<f32> = world.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear.try_inverse().map_or(linear, |inv| inv.transpose());

        let vertices: Vec<Option<ScreenVertex>> = geometry
            .positions
            .iter()
            .zip(&geometry.normals)
            .zip(&geometry.uvs)
            .map(|((p, n), uv)| {
                let local = Vec4::new(p[0], p[1], p[2], 1.0);
                let clip = mvp * local;
                if clip.w <= MIN_CLIP_W {
                    return None;
                }
                let inv_w = 1.0 / clip.w;
                Some(ScreenVertex {
                    x: (clip.x * inv_w * 0.5 + 0.5) * self.width as f32,
                    y: (0.5 - clip.y * inv_w * 0.5) * self.height as f32,
                    z: clip.z * inv_w,
                    inv_w,
                    world: (world * local).xyz(),
                    normal: normal_matrix * Vec3::from(*n),
                    uv: *uv,
                })
            })
            .collect();

        let side = mesh.material.side();
        for tri in geometry.indices.chunks_exact(3) {
            let corners = [
                vertices[tri[0] as usize],
                vertices[tri[1] as usize],
                vertices[tri[2] as usize],
            ];
            let [Some(a), Some(b), Some(c)] = corners else {
                stats.triangles_culled += 1;
                continue;
            };
            // Screen y points down, so counter-clockwise triangles have negative area.
            let area = edge(&a, &b, c.x, c.y);
            let front_facing = area < 0.0;
            let culled = area == 0.0
                || match side {
                    Side::Front => !front_facing,
                    Side::Back => front_facing,
                    Side::Double => false,
                };
            if culled {
                stats.triangles_culled += 1;
                continue;
            }
            let flip = if front_facing { 1.0 } else { -1.0 };
            self.raster_triangle([a, b, c], area, flip, &mesh.material, eye, lights);
            stats.triangles_drawn += 1;
        }
    }

    fn raster_triangle(
        &mut self,
        [a, b, c]: [ScreenVertex; 3],
        area: f32,
        normal_sign: f32,
        material: &Material,
        eye: Vec3,
        lights: &FrameLights,
    ) {
        let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as u32;
        let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as u32;
        let max_x = (a.x.max(b.x).max(c.x).ceil().max(0.0) as u32).min(self.width);
        let max_y = (a.y.max(b.y).max(c.y).ceil().max(0.0) as u32).min(self.height);
        let opacity = material.opacity();

        for y in min_y..max_y {
            for x in min_x..max_x {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(&b, &c, px, py) / area;
                let w1 = edge(&c, &a, px, py) / area;
                let w2 = edge(&a, &b, px, py) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let z = w0 * a.z + w1 * b.z + w2 * c.z;
                let index = (y * self.width + x) as usize;
                if !(-1.0..=1.0).contains(&z) || z >= self.depth[index] {
                    continue;
                }

                // Perspective-correct weights
                let (p0, p1, p2) = (w0 * a.inv_w, w1 * b.inv_w, w2 * c.inv_w);
                let sum = p0 + p1 + p2;
                let (p0, p1, p2) = (p0 / sum, p1 / sum, p2 / sum);
                let normal = (a.normal * p0 + b.normal * p1 + c.normal * p2) * normal_sign;
                let normal = normal.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z);
                let position = a.world * p0 + b.world * p1 + c.world * p2;
                let uv = [
                    a.uv[0] * p0 + b.uv[0] * p1 + c.uv[0] * p2,
                    a.uv[1] * p0 + b.uv[1] * p1 + c.uv[1] * p2,
                ];
                let view = (eye - position).try_normalize(f32::EPSILON).unwrap_or(normal);
                let shaded = shade(material, normal, view, uv, lights);

                if opacity < 1.0 {
                    let dst = &mut self.radiance[index];
                    for i in 0..3 {
                        dst[i] = dst[i] * (1.0 - opacity) + shaded[i] * opacity;
                    }
                } else {
                    self.radiance[index] = shaded;
                    self.depth[index] = z;
                }
            }
        }
    }
}

fn edge(a: &ScreenVertex, b: &ScreenVertex, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

fn shade(material: &Material, normal: Vec3, view: Vec3, uv: [f32; 2], lights: &FrameLights) -> [f32; 3] {
    let mut base = material.color().to_linear_array();
    if let Some(map) = material.map() {
        let texel = map.sample_linear(uv[0], uv[1]);
        for i in 0..3 {
            base[i] *= texel[i];
        }
    }

    match material {
        Material::Basic(_) => base,
        Material::Phong(phong) => {
            let diffuse = lights.diffuse(normal);
            let specular = phong.specular.to_linear_array();
            let mut out = [0.0; 3];
            for i in 0..3 {
                out[i] = base[i] * diffuse[i];
            }
            for (direction, radiance) in &lights.directional {
                let n_dot_l = normal.dot(direction);
                if n_dot_l <= 0.0 {
                    continue;
                }
                let half = (direction + view).normalize();
                let highlight = normal.dot(&half).max(0.0).powf(phong.shininess.max(1.0));
                for i in 0..3 {
                    out[i] += specular[i] * radiance[i] * highlight;
                }
            }
            out
        }
        Material::Standard(standard) => {
            let diffuse = lights.diffuse(normal);
            let emissive = standard.emissive.to_linear_array();
            let metalness = standard.metalness.clamp(0.0, 1.0);
            let roughness = standard.roughness.clamp(0.04, 1.0);
            let shininess = 2.0 / (roughness * roughness * roughness * roughness) - 2.0;
            let mut out = [0.0; 3];
            for i in 0..3 {
                out[i] = base[i] * diffuse[i] * (1.0 - metalness) + emissive[i];
            }
            for (direction, radiance) in &lights.directional {
                let n_dot_l = normal.dot(direction);
                if n_dot_l <= 0.0 {
                    continue;
                }
                let half = (direction + view).normalize();
                let highlight = normal.dot(&half).max(0.0).powf(shininess.max(1.0))
                    * (shininess + 8.0)
                    / (8.0 * std::f32::consts::PI);
                for i in 0..3 {
                    let f0 = 0.04 + (base[i] - 0.04) * metalness;
                    out[i] += f0 * radiance[i] * highlight * n_dot_l;
                }
            }
            out
        }
    }
}

impl RenderBackend for SoftwareRenderer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_size(&mut self, width: u32, height: u32) -> BackendResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize { width, height });
        }
        if (width, height) != (self.width, self.height) {
            log::debug!("Software renderer resized: {}x{} -> {}x{}", self.width, self.height, width, height);
        }
        let count = (width as usize) * (height as usize);
        self.width = width;
        self.height = height;
        self.radiance = vec![[0.0; 3]; count];
        self.depth = vec![f32::INFINITY; count];
        self.pixels = vec![0; count * 4];
        Ok(())
    }

    fn clear_color(&self) -> Color {
        self.clear_color
    }

    fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> BackendResult<FrameStats> {
        let mut stats = FrameStats {
            frame_index: self.frame_index,
            ..FrameStats::default()
        };
        self.clear(scene, camera);

        let lights = FrameLights::gather(scene);
        let view_projection = camera.view_projection_matrix();
        let mut meshes = Vec::new();
        scene.visit_attached(|visited| {
            if let (true, Some(mesh)) = (visited.visible, visited.node.as_mesh()) {
                meshes.push((mesh, visited.world));
            }
        });
        for (mesh, world) in meshes {
            self.draw_mesh(mesh, &world, &view_projection, camera.position, &lights, &mut stats);
            stats.meshes_drawn += 1;
        }

        self.resolve();
        self.frame_index += 1;
        log::trace!(
            "Frame {}: {} meshes, {} triangles ({} culled)",
            stats.frame_index,
            stats.meshes_drawn,
            stats.triangles_drawn,
            stats.triangles_culled
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::geometry::Geometry;
    use crate::scene::Node;
    use std::sync::Arc;

    fn camera(width: u32, height: u32) -> Camera {
        let mut camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 75.0, width as f32 / height as f32, 0.1, 100.0);
        camera.look_at(Vec3::zeros());
        camera
    }

    fn quad(color: u32, z: f32) -> Node {
        Node::mesh(Arc::new(Geometry::plane(2.0, 2.0)), Material::basic(Color::from_hex(color)))
            .with_position(Vec3::new(0.0, 0.0, z))
    }

    #[test]
    fn test_empty_scene_is_clear_color() {
        let mut renderer = SoftwareRenderer::new(16, 16).unwrap();
        renderer.set_clear_color(Color::from_hex(0x336699));

        let stats = renderer.render(&Scene::new(), &camera(16, 16)).unwrap();

        assert_eq!(stats.meshes_drawn, 0);
        assert_eq!(renderer.pixel(3, 3), Some([0x33, 0x66, 0x99, 255]));
    }

    #[test]
    fn test_unlit_quad_covers_center() {
        let mut renderer = SoftwareRenderer::new(32, 32).unwrap();
        let mut scene = Scene::new();
        scene.add(quad(0xff0000, 0.0));

        let stats = renderer.render(&scene, &camera(32, 32)).unwrap();

        assert_eq!(stats.meshes_drawn, 1);
        assert_eq!(stats.triangles_drawn, 2);
        assert_eq!(renderer.pixel(16, 16), Some([255, 0, 0, 255]));
        assert_eq!(renderer.pixel(0, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_depth_test_keeps_nearest() {
        let mut renderer = SoftwareRenderer::new(32, 32).unwrap();
        let mut scene = Scene::new();
        scene.add(quad(0x00ff00, 1.0));
        scene.add(quad(0xff0000, 0.0));

        renderer.render(&scene, &camera(32, 32)).unwrap();

        assert_eq!(renderer.pixel(16, 16), Some([0, 255, 0, 255]));
        assert!(renderer.depth_at(16, 16).unwrap() < 1.0);
    }

    #[test]
    fn test_back_faces_respect_side() {
        let mut renderer = SoftwareRenderer::new(32, 32).unwrap();
        let mut scene = Scene::new();
        let id = scene.add(quad(0xffffff, 0.0));
        scene.get_mut(id).unwrap().transform.rotation.y = std::f32::consts::PI;

        let stats = renderer.render(&scene, &camera(32, 32)).unwrap();
        assert_eq!(stats.triangles_drawn, 0);
        assert_eq!(stats.triangles_culled, 2);

        if let Some(mesh) = scene.get_mut(id).unwrap().as_mesh_mut() {
            if let Material::Basic(basic) = &mut mesh.material {
                basic.side = Side::Double;
            }
        }
        let stats = renderer.render(&scene, &camera(32, 32)).unwrap();
        assert_eq!(stats.triangles_drawn, 2);
        assert_eq!(stats.frame_index, 1);
    }

    #[test]
    fn test_hidden_nodes_are_skipped() {
        let mut renderer = SoftwareRenderer::new(8, 8).unwrap();
        let mut scene = Scene::new();
        let id = scene.add(quad(0xff0000, 0.0));
        scene.get_mut(id).unwrap().visible = false;

        let stats = renderer.render(&scene, &camera(8, 8)).unwrap();
        assert_eq!(stats.meshes_drawn, 0);
    }

    #[test]
    fn test_lit_cube_is_shaded() {
        let mut renderer = SoftwareRenderer::new(32, 32).unwrap();
        let mut scene = Scene::new();
        crate::scene::reset_lights(&mut scene, &crate::config::LightingConfig::default());
        scene.add(Node::mesh(
            Arc::new(Geometry::cuboid(2.0, 2.0, 2.0)),
            Material::standard(Color::from_hex(0xff0000)),
        ));

        renderer.render(&scene, &camera(32, 32)).unwrap();

        let [r, g, b, _] = renderer.pixel(16, 16).unwrap();
        assert!(r > 0);
        assert!(r > g && r > b);
    }

    #[test]
    fn test_resize_and_invalid_size() {
        let mut renderer = SoftwareRenderer::new(8, 8).unwrap();
        renderer.set_size(20, 10).unwrap();

        assert_eq!(renderer.size(), (20, 10));
        assert_eq!(renderer.pixels().len(), 20 * 10 * 4);
        assert!(matches!(renderer.set_size(0, 10), Err(RenderError::InvalidSize { .. })));
        assert!(SoftwareRenderer::new(0, 0).is_err());
    }

    #[test]
    fn test_save_png_roundtrip() {
        let mut renderer = SoftwareRenderer::new(8, 4).unwrap();
        renderer.render(&Scene::new(), &camera(8, 4)).unwrap();
        let path = std::env::temp_dir().join("scene_engine_frame_test.png");

        renderer.save_png(&path).unwrap();
        let loaded = image::open(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!((loaded.width(), loaded.height()), (8, 4));
    }
}
