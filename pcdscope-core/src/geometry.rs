//! Decoded point geometry: positions plus an optional parallel color attribute

use crate::error::{Error, Result};
use crate::point::{Color, Point3f, Vector3f};

/// Axis-aligned bounds of a point geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3f,
    pub max: Point3f,
}

impl BoundingBox {
    pub fn size(&self) -> Vector3f {
        self.max - self.min
    }
}

/// Positions of every decoded point and, when the source carries one, a
/// color per point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointGeometry {
    positions: Vec<Point3f>,
    colors: Option<Vec<Color>>,
}

impl PointGeometry {
    /// Create a geometry without a color attribute
    pub fn from_positions(positions: Vec<Point3f>) -> Self {
        Self {
            positions,
            colors: None,
        }
    }

    /// Create a geometry with a color per point
    pub fn with_colors(positions: Vec<Point3f>, colors: Vec<Color>) -> Result<Self> {
        if positions.len() != colors.len() {
            return Err(Error::InvalidData(format!(
                "color attribute has {} entries for {} positions",
                colors.len(),
                positions.len()
            )));
        }
        Ok(Self {
            positions,
            colors: Some(colors),
        })
    }

    /// Get the number of points
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Point3f] {
        &self.positions
    }

    pub fn colors(&self) -> Option<&[Color]> {
        self.colors.as_deref()
    }

    /// Whether the geometry carries a per-point color attribute
    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// Arithmetic mean of all positions, `None` for an empty geometry
    pub fn centroid(&self) -> Option<Point3f> {
        if self.positions.is_empty() {
            return None;
        }
        let sum = self
            .positions
            .iter()
            .fold(Vector3f::zeros(), |acc, p| acc + p.coords);
        Some(Point3f::from(sum / self.positions.len() as f32))
    }

    /// Compute the axis-aligned bounds, `None` for an empty geometry
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;

        for p in &self.positions[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some(BoundingBox { min, max })
    }

    /// Translate every position so the centroid sits at the origin.
    ///
    /// Returns the offset that was subtracted.
    pub fn center(&mut self) -> Vector3f {
        let Some(centroid) = self.centroid() else {
            return Vector3f::zeros();
        };
        let offset = centroid.coords;
        for p in &mut self.positions {
            *p -= offset;
        }
        offset
    }
}
