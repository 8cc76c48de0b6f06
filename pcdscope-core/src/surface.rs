//! Seams between the viewer core and the outside world: the rendering
//! backend that owns device memory, and the host mount it draws into.

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::PointGeometry;
use crate::material::PointsMaterial;
use crate::point::Point3f;
use crate::scene::Scene;

/// Width and height of a mount or drawable, in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Zero width or zero height
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Identifies the drawable a surface attaches to its mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputId(pub u64);

/// Device-side vertex data for one point geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub u64);

/// Device-side state for one material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u64);

/// Parameters a surface is created with
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceDescriptor {
    pub antialias: bool,
    pub pixel_ratio: f32,
    pub size: Extent,
}

/// Camera state handed to the backend for one draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub position: Point3f,
}

/// A drawable owned by the viewer that holds device resources.
///
/// Geometry and material handles are released explicitly; a surface never
/// frees them on its own before `dispose`.
pub trait RenderSurface {
    /// The drawable this surface presents into
    fn output(&self) -> OutputId;

    fn size(&self) -> Extent;

    fn pixel_ratio(&self) -> f32;

    fn set_pixel_ratio(&mut self, ratio: f32);

    /// Resize the drawable; zero-area sizes are ignored
    fn set_size(&mut self, size: Extent);

    /// Upload positions (and colors, if any) to the device
    fn upload_geometry(&mut self, geometry: &PointGeometry) -> Result<GeometryHandle>;

    fn create_material(&mut self, material: &PointsMaterial) -> Result<MaterialHandle>;

    fn release_geometry(&mut self, handle: GeometryHandle) -> Result<()>;

    fn release_material(&mut self, handle: MaterialHandle) -> Result<()>;

    /// Draw every object in `scene` as seen from `camera`
    fn render(&mut self, scene: &Scene, camera: &CameraView) -> Result<()>;

    /// Release all remaining device resources
    fn dispose(&mut self);
}

/// Creates the surface a viewer renders to
pub trait SurfaceFactory {
    type Surface: RenderSurface;

    fn create_surface(&mut self, descriptor: &SurfaceDescriptor) -> Result<Self::Surface>;
}

/// The host-side rectangle a viewer is mounted into
pub trait Mount {
    /// Current content-box size
    fn client_size(&self) -> Extent;

    fn device_pixel_ratio(&self) -> f32;

    /// Attach a drawable as a child of the mount
    fn append_output(&self, output: OutputId);

    /// Detach a drawable; returns `false` if it was not attached
    fn remove_output(&self, output: OutputId) -> bool;
}
