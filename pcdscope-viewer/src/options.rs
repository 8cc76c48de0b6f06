//! Viewer options with TOML file support.
//!
//! Every section uses `#[serde(default)]`, so a file that only overrides
//! `[material]` keeps the defaults for everything else.

use std::path::Path;

use pcdscope_core::{Color, DEFAULT_POINT_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::ViewerError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraOptions {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Initial camera position; the camera looks at the origin
    pub position: [f32; 3],
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 0.0, 2.0],
        }
    }
}

/// Orbit controller tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlOptions {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    /// Radians from +Y
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for ControlOptions {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_polar_angle: 0.0,
            max_polar_angle: std::f32::consts::PI,
            min_distance: 0.0,
            max_distance: f32::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialOptions {
    pub point_size: f32,
    pub size_attenuation: bool,
}

impl Default for MaterialOptions {
    fn default() -> Self {
        Self {
            point_size: DEFAULT_POINT_SIZE,
            size_attenuation: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererOptions {
    pub antialias: bool,
    pub background: Color,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            antialias: true,
            background: Color::BLACK,
        }
    }
}

/// Host panel behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostOptions {
    /// Delay before the one-off resize that follows mounting
    pub settle_delay_ms: u64,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            settle_delay_ms: 50,
        }
    }
}

/// Top-level options container
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerOptions {
    pub camera: CameraOptions,
    pub controls: ControlOptions,
    pub material: MaterialOptions,
    pub renderer: RendererOptions,
    pub host: HostOptions,
    /// Frame locations shown by the catalog, in order
    pub frames: Vec<String>,
}

impl ViewerOptions {
    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, ViewerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ViewerError::Core(pcdscope_core::Error::Io(e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ViewerError> {
        toml::from_str(content).map_err(|e| ViewerError::Options(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ViewerOptions::default();
        assert_eq!(options.camera.fov, 75.0);
        assert_eq!(options.camera.position, [0.0, 0.0, 2.0]);
        assert_eq!(options.controls.damping_factor, 0.05);
        assert_eq!(options.controls.max_polar_angle, std::f32::consts::PI);
        assert_eq!(options.material.point_size, 0.025);
        assert!(options.renderer.antialias);
        assert_eq!(options.host.settle_delay_ms, 50);
        assert!(options.frames.is_empty());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let options = ViewerOptions::from_toml_str(
            r#"
frames = ["/models/frame1.pcd", "/models/frame2.pcd"]

[material]
point_size = 0.05
"#,
        )
        .unwrap();
        assert_eq!(options.material.point_size, 0.05);
        assert!(options.material.size_attenuation);
        assert_eq!(options.frames.len(), 2);
        assert_eq!(options.camera, CameraOptions::default());
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let options = ViewerOptions {
            frames: vec!["a.pcd".to_string()],
            ..ViewerOptions::default()
        };
        let text = toml::to_string_pretty(&options).unwrap();
        assert_eq!(ViewerOptions::from_toml_str(&text).unwrap(), options);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("pcdscope_options_{}.toml", std::process::id()));
        std::fs::write(&path, "[host]\nsettle_delay_ms = 120\n").unwrap();
        let options = ViewerOptions::load(&path).unwrap();
        assert_eq!(options.host.settle_delay_ms, 120);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_malformed_toml_is_an_options_error() {
        assert!(matches!(
            ViewerOptions::from_toml_str("camera = 3"),
            Err(ViewerError::Options(_))
        ));
    }
}
