//! Point rendering material

use serde::{Deserialize, Serialize};

use crate::geometry::PointGeometry;
use crate::point::Color;

/// World-space point size used for decoded frames
pub const DEFAULT_POINT_SIZE: f32 = 0.025;

/// How a point set is shaded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointsMaterial {
    /// Point size; world units when `size_attenuation` is on, pixels otherwise
    pub size: f32,
    /// Points get smaller with distance
    pub size_attenuation: bool,
    /// Use the geometry's per-point color attribute
    pub vertex_colors: bool,
    /// Uniform color, only set when `vertex_colors` is off
    pub color: Option<Color>,
}

impl PointsMaterial {
    /// Material for a decoded frame: vertex colors if the geometry has a
    /// color attribute, uniform white otherwise.
    pub fn for_geometry(geometry: &PointGeometry, size: f32) -> Self {
        let vertex_colors = geometry.has_colors();
        Self {
            size,
            size_attenuation: true,
            vertex_colors,
            color: if vertex_colors { None } else { Some(Color::WHITE) },
        }
    }

    /// Color the shader should use when vertex colors are off
    pub fn uniform_color(&self) -> Color {
        self.color.unwrap_or(Color::WHITE)
    }
}

impl Default for PointsMaterial {
    fn default() -> Self {
        Self {
            size: DEFAULT_POINT_SIZE,
            size_attenuation: true,
            vertex_colors: false,
            color: Some(Color::WHITE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Point3f;

    #[test]
    fn test_material_without_color_attribute_is_white() {
        let geometry = PointGeometry::from_positions(vec![Point3f::origin()]);
        let material = PointsMaterial::for_geometry(&geometry, DEFAULT_POINT_SIZE);
        assert!(!material.vertex_colors);
        assert_eq!(material.color, Some(Color::WHITE));
        assert!(material.size_attenuation);
        assert_eq!(material.size, 0.025);
    }

    #[test]
    fn test_material_with_color_attribute_uses_vertex_colors() {
        let geometry =
            PointGeometry::with_colors(vec![Point3f::origin()], vec![Color::BLACK]).unwrap();
        let material = PointsMaterial::for_geometry(&geometry, DEFAULT_POINT_SIZE);
        assert!(material.vertex_colors);
        assert_eq!(material.color, None);
    }
}
