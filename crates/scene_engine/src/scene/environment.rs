//! Environment maps
//!
//! An equirectangular radiance image is converted into a prefiltered map: a
//! box-filtered mip chain in linear space. The renderer samples the base level
//! for the background and uses the average of the smallest level as diffuse
//! ambient light. Loading runs on a worker thread and may finish after the first
//! frame has been drawn.

use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{bounded, Receiver, TryRecvError};
use image::{ColorType, DynamicImage};

use crate::foundation::math::Vec3;
use crate::render::material::srgb_to_linear;

/// Environment loading errors
#[derive(thiserror::Error, Debug)]
pub enum EnvironmentError {
    /// The image could not be opened or decoded
    #[error("failed to decode environment image: {0}")]
    Image(#[from] image::ImageError),
    /// The image has no pixels
    #[error("environment image is empty")]
    Empty,
    /// The loader thread ended without a result
    #[error("environment loader stopped before finishing")]
    Disconnected,
}

/// One level of the mip chain
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentLevel {
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Row-major linear RGB radiance
    pub texels: Vec<[f32; 3]>,
}

impl EnvironmentLevel {
    fn texel(&self, x: u32, y: u32) -> [f32; 3] {
        self.texels[(y.min(self.height - 1) * self.width + x.min(self.width - 1)) as usize]
    }

    fn downsample(&self) -> Self {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let mut sum = [0.0f32; 3];
                for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let t = self.texel(x * 2 + dx, y * 2 + dy);
                    sum[0] += t[0];
                    sum[1] += t[1];
                    sum[2] += t[2];
                }
                texels.push([sum[0] * 0.25, sum[1] * 0.25, sum[2] * 0.25]);
            }
        }
        Self { width, height, texels }
    }

    fn average(&self) -> [f32; 3] {
        let n = self.texels.len().max(1) as f32;
        let sum = self.texels.iter().fold([0.0f32; 3], |acc, t| [acc[0] + t[0], acc[1] + t[1], acc[2] + t[2]]);
        [sum[0] / n, sum[1] / n, sum[2] / n]
    }
}

/// Prefiltered equirectangular environment
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentMap {
    levels: Vec<EnvironmentLevel>,
    irradiance: [f32; 3],
}

impl EnvironmentMap {
    /// Build the mip chain from linear equirectangular texels
    pub fn from_equirect(width: u32, height: u32, texels: Vec<[f32; 3]>) -> Result<Self, EnvironmentError> {
        if width == 0 || height == 0 || texels.len() != (width * height) as usize {
            return Err(EnvironmentError::Empty);
        }
        let mut levels = vec![EnvironmentLevel { width, height, texels }];
        while let Some(last) = levels.last() {
            if last.width == 1 && last.height == 1 {
                break;
            }
            let next = last.downsample();
            levels.push(next);
        }
        let irradiance = levels.last().map_or([0.0; 3], EnvironmentLevel::average);
        Ok(Self { levels, irradiance })
    }

    /// Convert a decoded image; 8-bit sources are treated as sRGB, float sources as linear
    pub fn from_image(image: &DynamicImage) -> Result<Self, EnvironmentError> {
        let is_float = matches!(image.color(), ColorType::Rgb32F | ColorType::Rgba32F);
        let rgb = image.to_rgb32f();
        let (width, height) = rgb.dimensions();
        let texels = rgb
            .pixels()
            .map(|p| {
                if is_float {
                    [p.0[0], p.0[1], p.0[2]]
                } else {
                    [srgb_to_linear(p.0[0]), srgb_to_linear(p.0[1]), srgb_to_linear(p.0[2])]
                }
            })
            .collect();
        Self::from_equirect(width, height, texels)
    }

    /// Decode and prefilter an image file
    pub fn load(path: &Path) -> Result<Self, EnvironmentError> {
        let image = image::open(path)?;
        Self::from_image(&image)
    }

    /// Number of mip levels
    pub fn mip_count(&self) -> usize {
        self.levels.len()
    }

    /// Mip level by index, clamped to the smallest level
    pub fn level(&self, index: usize) -> &EnvironmentLevel {
        &self.levels[index.min(self.levels.len() - 1)]
    }

    /// Average radiance, used as diffuse image-based light
    pub fn irradiance(&self) -> [f32; 3] {
        self.irradiance
    }

    /// Sample radiance seen along a world-space direction
    pub fn sample(&self, direction: Vec3, level: usize) -> [f32; 3] {
        let level = self.level(level);
        let d = direction.try_normalize(f32::EPSILON).unwrap_or_else(|| -Vec3::z());
        let u = 0.5 + d.x.atan2(-d.z) / std::f32::consts::TAU;
        let v = d.y.clamp(-1.0, 1.0).acos() / std::f32::consts::PI;
        let x = ((u * level.width as f32) as u32).min(level.width - 1);
        let y = ((v * level.height as f32) as u32).min(level.height - 1);
        level.texel(x, y)
    }
}

/// Environment map being decoded on a worker thread
#[derive(Debug)]
pub struct EnvironmentLoad {
    path: PathBuf,
    receiver: Receiver<Result<EnvironmentMap, EnvironmentError>>,
}

impl EnvironmentLoad {
    /// Start decoding `path` in the background
    pub fn spawn(path: PathBuf) -> Self {
        let (sender, receiver) = bounded(1);
        let worker_path = path.clone();
        thread::spawn(move || {
            let result = EnvironmentMap::load(&worker_path);
            // The session may have been torn down; nobody is waiting then.
            let _ = sender.send(result);
        });
        log::info!("Loading environment map {}", path.display());
        Self { path, receiver }
    }

    /// Source path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Non-blocking poll; `None` while still decoding
    pub fn poll(&self) -> Option<Result<EnvironmentMap, EnvironmentError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(EnvironmentError::Disconnected)),
        }
    }

    /// Block until the result arrives or the timeout expires
    pub fn wait(&self, timeout: std::time::Duration) -> Option<Result<EnvironmentMap, EnvironmentError>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => None,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Some(Err(EnvironmentError::Disconnected)),
        }
    }
}
