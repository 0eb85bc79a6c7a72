//! # Viewer Configuration
//!
//! Every tunable of a viewer session lives here: viewport size, camera
//! projection, orbit controls, the light set, asset search paths and the
//! script engine limits. All sections carry defaults so a partial TOML/RON
//! file is enough.

use serde::{Serialize, Deserialize};

use super::{Config, ConfigError};

/// What a Scene reset removes at the start of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SceneResetPolicy {
    /// Remove only lights; named geometry survives for create-or-update
    #[default]
    LightsOnly,
    /// Remove every node and clear the registry
    Full,
}

/// Top-level viewer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Output surface size
    pub viewport: ViewportConfig,
    /// Camera projection and default placement
    pub camera: CameraConfig,
    /// Orbit controls behaviour
    pub controls: ControlsConfig,
    /// Light set and environment map
    pub lighting: LightingConfig,
    /// Asset search paths
    pub assets: AssetConfig,
    /// Script engine limits
    pub script: ScriptConfig,
    /// Scene reset behaviour between submissions
    pub reset_policy: SceneResetPolicy,
}

impl Config for ViewerConfig {}

impl ViewerConfig {
    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(ConfigError::Invalid {
                field: "viewport",
                reason: format!("{}x{} has a zero dimension", self.viewport.width, self.viewport.height),
            });
        }
        if !(1.0..179.0).contains(&self.camera.fov_degrees) {
            return Err(ConfigError::Invalid {
                field: "camera.fov_degrees",
                reason: format!("{} is outside 1..179", self.camera.fov_degrees),
            });
        }
        if self.camera.near <= 0.0 || self.camera.far <= self.camera.near {
            return Err(ConfigError::Invalid {
                field: "camera.near/far",
                reason: format!("near {} far {}", self.camera.near, self.camera.far),
            });
        }
        if !(0.0..=1.0).contains(&self.controls.damping_factor) {
            return Err(ConfigError::Invalid {
                field: "controls.damping_factor",
                reason: format!("{} is outside 0..=1", self.controls.damping_factor),
            });
        }
        Ok(())
    }
}

/// Output surface size in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self { width: 800, height: 600 }
    }
}

/// Camera projection and default placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Initial camera position
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 0.0, 5.0],
        }
    }
}

/// Orbit controls behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Smooth rotation/zoom over several frames
    pub enable_damping: bool,
    /// Fraction of the pending motion applied per update
    pub damping_factor: f32,
    /// Radians per unit of rotate input
    pub rotate_speed: f32,
    /// Zoom multiplier per unit of zoom input
    pub zoom_speed: f32,
    /// Closest allowed orbit distance
    pub min_distance: f32,
    /// Farthest allowed orbit distance
    pub max_distance: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.01,
            max_distance: 10_000.0,
        }
    }
}

/// Light set and environment map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Directional light intensity
    pub directional_intensity: f32,
    /// Directional light position; it points at the origin
    pub directional_position: [f32; 3],
    /// Ambient light intensity
    pub ambient_intensity: f32,
    /// Hemisphere light intensity
    pub hemisphere_intensity: f32,
    /// Hemisphere sky color (0xRRGGBB)
    pub hemisphere_sky: u32,
    /// Hemisphere ground color (0xRRGGBB)
    pub hemisphere_ground: u32,
    /// Equirectangular environment image (HDR or PNG)
    pub environment_map: Option<String>,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            directional_intensity: 1.0,
            directional_position: [5.0, 10.0, 7.5],
            ambient_intensity: 0.4,
            hemisphere_intensity: 0.4,
            hemisphere_sky: 0xffffff,
            hemisphere_ground: 0x444444,
            environment_map: None,
        }
    }
}

/// Asset lookup configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directories searched for relative model paths
    pub search_paths: Vec<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            search_paths: vec!["resources".to_string(), "resources/models".to_string()],
        }
    }
}

/// Script engine limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Maximum operations per execution (0 = unlimited)
    pub max_operations: u64,
    /// Maximum expression nesting depth
    pub max_expr_depth: usize,
    /// Maximum function call depth
    pub max_call_levels: usize,
    /// Maximum string length
    pub max_string_size: usize,
    /// Maximum array length
    pub max_array_size: usize,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            max_operations: 1_000_000,
            max_expr_depth: 64,
            max_call_levels: 64,
            max_string_size: 100_000,
            max_array_size: 100_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_roundtrip() {
        let mut config = ViewerConfig::default();
        config.viewport.width = 320;
        config.reset_policy = SceneResetPolicy::Full;
        config.lighting.environment_map = Some("env/studio.hdr".to_string());

        let path = std::env::temp_dir().join("scene_engine_config_roundtrip.toml");
        let path = path.to_string_lossy().to_string();
        config.save_to_file(&path).unwrap();
        let loaded = ViewerConfig::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let loaded: ViewerConfig = ron::from_str("(viewport: (width: 64, height: 48))").unwrap();

        assert_eq!(loaded.viewport.width, 64);
        assert_eq!(loaded.camera, CameraConfig::default());
        assert_eq!(loaded.reset_policy, SceneResetPolicy::LightsOnly);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = ViewerConfig::load_from_file("viewer.json");
        assert!(matches!(result, Err(ConfigError::Io(_)) | Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_validate_rejects_zero_viewport() {
        let mut config = ViewerConfig::default();
        config.viewport.height = 0;
        assert!(config.validate().is_err());
        assert!(ViewerConfig::default().validate().is_ok());
    }
}
