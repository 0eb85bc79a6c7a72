//! Material type definitions
//!
//! This module defines the material families a mesh can carry and the color
//! representation shared by all of them. `Standard` is the canonical
//! physically-based family that imported meshes are normalized to; `Phong` and
//! `Basic` exist because importers and scripts produce them.
//!
//! Colors and textures carry a [`ColorEncoding`] tag. Values authored as hex or
//! decoded from 8-bit images start out sRGB-encoded; the renderer works in
//! linear space and decodes on use.

use std::sync::Arc;

/// How stored color values are encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorEncoding {
    /// Gamma/display encoding (sRGB transfer curve)
    #[default]
    Srgb,
    /// Linear working space
    Linear,
}

/// Convert one sRGB-encoded channel to linear
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert one linear channel to sRGB encoding
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// RGB color tagged with its encoding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
    /// Encoding of the three channels
    pub encoding: ColorEncoding,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    /// Opaque white (identical in both encodings)
    pub const WHITE: Self = Self { r: 1.0, g: 1.0, b: 1.0, encoding: ColorEncoding::Srgb };

    /// Black
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0, encoding: ColorEncoding::Srgb };

    /// sRGB color from channel values
    pub fn srgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, encoding: ColorEncoding::Srgb }
    }

    /// Linear color from channel values
    pub fn linear(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, encoding: ColorEncoding::Linear }
    }

    /// sRGB color from a `0xRRGGBB` value
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self::srgb(channel(16), channel(8), channel(0))
    }

    /// `0xRRGGBB` value of the sRGB-encoded color
    pub fn to_hex(&self) -> u32 {
        let [r, g, b] = self.to_srgb_array();
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
        (quantize(r) << 16) | (quantize(g) << 8) | quantize(b)
    }

    /// Re-encode into linear space; linear colors are returned unchanged
    pub fn to_linear(self) -> Self {
        match self.encoding {
            ColorEncoding::Linear => self,
            ColorEncoding::Srgb => Self::linear(
                srgb_to_linear(self.r),
                srgb_to_linear(self.g),
                srgb_to_linear(self.b),
            ),
        }
    }

    /// Linear channel values regardless of stored encoding
    pub fn to_linear_array(&self) -> [f32; 3] {
        let linear = self.to_linear();
        [linear.r, linear.g, linear.b]
    }

    /// sRGB channel values regardless of stored encoding
    pub fn to_srgb_array(&self) -> [f32; 3] {
        match self.encoding {
            ColorEncoding::Srgb => [self.r, self.g, self.b],
            ColorEncoding::Linear => [
                linear_to_srgb(self.r),
                linear_to_srgb(self.g),
                linear_to_srgb(self.b),
            ],
        }
    }
}

/// RGBA8 texture image
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// Optional source name for debugging
    pub name: Option<String>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major RGBA8 pixel data
    pub pixels: Arc<Vec<u8>>,
    /// Encoding of the color channels (alpha is always linear)
    pub encoding: ColorEncoding,
}

impl Texture {
    /// Create a texture from RGBA8 pixels
    ///
    /// Returns `None` when the pixel buffer does not match the dimensions.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>, encoding: ColorEncoding) -> Option<Self> {
        if pixels.len() != (width as usize) * (height as usize) * 4 || width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            name: None,
            width,
            height,
            pixels: Arc::new(pixels),
            encoding,
        })
    }

    /// Re-encode the color channels into linear space
    pub fn to_linear(&self) -> Self {
        match self.encoding {
            ColorEncoding::Linear => self.clone(),
            ColorEncoding::Srgb => {
                let lut: Vec<u8> = (0..=255u8)
                    .map(|v| (srgb_to_linear(f32::from(v) / 255.0) * 255.0).round() as u8)
                    .collect();
                let pixels = self
                    .pixels
                    .chunks_exact(4)
                    .flat_map(|px| [lut[px[0] as usize], lut[px[1] as usize], lut[px[2] as usize], px[3]])
                    .collect();
                Self {
                    name: self.name.clone(),
                    width: self.width,
                    height: self.height,
                    pixels: Arc::new(pixels),
                    encoding: ColorEncoding::Linear,
                }
            }
        }
    }

    /// Nearest-neighbour sample returning linear RGB
    pub fn sample_linear(&self, u: f32, v: f32) -> [f32; 3] {
        let wrap = |t: f32| t - t.floor();
        let x = ((wrap(u) * self.width as f32) as u32).min(self.width - 1);
        // Texture space has v pointing up, image rows run down.
        let y = (((1.0 - wrap(v)) * self.height as f32) as u32).min(self.height - 1);
        let offset = ((y * self.width + x) * 4) as usize;
        let channel = |i: usize| f32::from(self.pixels[offset + i]) / 255.0;
        match self.encoding {
            ColorEncoding::Linear => [channel(0), channel(1), channel(2)],
            ColorEncoding::Srgb => [
                srgb_to_linear(channel(0)),
                srgb_to_linear(channel(1)),
                srgb_to_linear(channel(2)),
            ],
        }
    }
}

/// Which triangle faces are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    /// Counter-clockwise faces only
    #[default]
    Front,
    /// Clockwise faces only
    Back,
    /// Both faces
    Double,
}

/// Canonical physically-based material (metalness/roughness workflow)
#[derive(Debug, Clone, PartialEq)]
pub struct StandardMaterial {
    /// Base color
    pub color: Color,
    /// Base color texture
    pub map: Option<Texture>,
    /// Metalness in `[0, 1]`
    pub metalness: f32,
    /// Roughness in `[0, 1]`
    pub roughness: f32,
    /// Emitted color
    pub emissive: Color,
    /// Opacity in `[0, 1]`
    pub opacity: f32,
    /// Rendered faces
    pub side: Side,
    /// Set when parameters changed and derived state must be recomputed
    pub needs_update: bool,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            map: None,
            metalness: 0.0,
            roughness: 1.0,
            emissive: Color::BLACK,
            opacity: 1.0,
            side: Side::Front,
            needs_update: false,
        }
    }
}

/// Blinn-Phong material, produced by the OBJ importer and specular-glossiness glTF
#[derive(Debug, Clone, PartialEq)]
pub struct PhongMaterial {
    /// Diffuse color
    pub color: Color,
    /// Diffuse texture
    pub map: Option<Texture>,
    /// Specular color
    pub specular: Color,
    /// Specular exponent
    pub shininess: f32,
    /// Opacity in `[0, 1]`
    pub opacity: f32,
    /// Rendered faces
    pub side: Side,
}

impl Default for PhongMaterial {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            map: None,
            specular: Color::from_hex(0x111111),
            shininess: 30.0,
            opacity: 1.0,
            side: Side::Front,
        }
    }
}

/// Unlit material
#[derive(Debug, Clone, PartialEq)]
pub struct BasicMaterial {
    /// Flat color
    pub color: Color,
    /// Color texture
    pub map: Option<Texture>,
    /// Opacity in `[0, 1]`
    pub opacity: f32,
    /// Rendered faces
    pub side: Side,
}

impl Default for BasicMaterial {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            map: None,
            opacity: 1.0,
            side: Side::Front,
        }
    }
}

/// Material attached to a mesh node
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    /// Canonical PBR material
    Standard(StandardMaterial),
    /// Blinn-Phong material
    Phong(PhongMaterial),
    /// Unlit material
    Basic(BasicMaterial),
}

impl Default for Material {
    fn default() -> Self {
        Self::Standard(StandardMaterial::default())
    }
}

impl Material {
    /// Standard material with the given base color
    pub fn standard(color: Color) -> Self {
        Self::Standard(StandardMaterial { color, ..Default::default() })
    }

    /// Phong material with the given diffuse color
    pub fn phong(color: Color) -> Self {
        Self::Phong(PhongMaterial { color, ..Default::default() })
    }

    /// Unlit material with the given color
    pub fn basic(color: Color) -> Self {
        Self::Basic(BasicMaterial { color, ..Default::default() })
    }

    /// Short family name used in logs and script errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Standard(_) => "standard",
            Self::Phong(_) => "phong",
            Self::Basic(_) => "basic",
        }
    }

    /// Whether this is the canonical physically-based family
    pub fn is_standard(&self) -> bool {
        matches!(self, Self::Standard(_))
    }

    /// Base/diffuse color
    pub fn color(&self) -> Color {
        match self {
            Self::Standard(m) => m.color,
            Self::Phong(m) => m.color,
            Self::Basic(m) => m.color,
        }
    }

    /// Replace the base/diffuse color
    pub fn set_color(&mut self, color: Color) {
        match self {
            Self::Standard(m) => {
                m.color = color;
                m.needs_update = true;
            }
            Self::Phong(m) => m.color = color,
            Self::Basic(m) => m.color = color,
        }
    }

    /// Base color texture
    pub fn map(&self) -> Option<&Texture> {
        match self {
            Self::Standard(m) => m.map.as_ref(),
            Self::Phong(m) => m.map.as_ref(),
            Self::Basic(m) => m.map.as_ref(),
        }
    }

    /// Opacity
    pub fn opacity(&self) -> f32 {
        match self {
            Self::Standard(m) => m.opacity,
            Self::Phong(m) => m.opacity,
            Self::Basic(m) => m.opacity,
        }
    }

    /// Set opacity, clamped to `[0, 1]`
    pub fn set_opacity(&mut self, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        match self {
            Self::Standard(m) => {
                m.opacity = opacity;
                m.needs_update = true;
            }
            Self::Phong(m) => m.opacity = opacity,
            Self::Basic(m) => m.opacity = opacity,
        }
    }

    /// Rendered faces
    pub fn side(&self) -> Side {
        match self {
            Self::Standard(m) => m.side,
            Self::Phong(m) => m.side,
            Self::Basic(m) => m.side,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hex_roundtrip() {
        let color = Color::from_hex(0x3366cc);
        assert_eq!(color.encoding, ColorEncoding::Srgb);
        assert_eq!(color.to_hex(), 0x3366cc);
        assert_eq!(color.to_linear().to_hex(), 0x3366cc);
    }

    #[test]
    fn test_to_linear_is_idempotent() {
        let once = Color::from_hex(0x808080).to_linear();
        let twice = once.to_linear();

        assert_eq!(once, twice);
        assert_relative_eq!(once.r, 0.215_860_5, epsilon = 1e-4);
    }

    #[test]
    fn test_texture_rejects_mismatched_buffer() {
        assert!(Texture::from_rgba8(2, 2, vec![0; 15], ColorEncoding::Srgb).is_none());
        assert!(Texture::from_rgba8(2, 2, vec![0; 16], ColorEncoding::Srgb).is_some());
    }

    #[test]
    fn test_texture_linearization_keeps_alpha() {
        let texture = Texture::from_rgba8(1, 1, vec![128, 255, 0, 77], ColorEncoding::Srgb).unwrap();
        let linear = texture.to_linear();

        assert_eq!(linear.encoding, ColorEncoding::Linear);
        assert_eq!(linear.pixels[1], 255);
        assert_eq!(linear.pixels[3], 77);
        assert!(linear.pixels[0] < 128);
        assert_eq!(linear.to_linear(), linear);
    }
}
