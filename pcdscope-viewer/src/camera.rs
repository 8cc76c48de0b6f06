//! Perspective camera for the viewer

use nalgebra::{Matrix4, Perspective3, Point3, Vector3};
use pcdscope_core::CameraView;

use crate::options::CameraOptions;

/// A perspective camera with a cached projection matrix.
///
/// Changing `fov`, `aspect`, `near` or `far` has no effect on rendering
/// until [`PerspectiveCamera::update_projection_matrix`] is called.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    projection: Matrix4<f32>,
}

impl PerspectiveCamera {
    /// Create a camera at the origin looking down -Z
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Point3::origin(),
            target: Point3::new(0.0, 0.0, -1.0),
            up: Vector3::y(),
            fov,
            aspect,
            near,
            far,
            projection: Matrix4::identity(),
        };
        camera.update_projection_matrix();
        camera
    }

    /// Create a camera from options, looking at the origin
    pub fn from_options(options: &CameraOptions, aspect: f32) -> Self {
        let mut camera = Self::new(options.fov, aspect, options.near, options.far);
        let [x, y, z] = options.position;
        camera.position = Point3::new(x, y, z);
        camera.look_at(Point3::origin());
        camera
    }

    /// Recompute the projection after a change to fov, aspect or clip planes
    pub fn update_projection_matrix(&mut self) {
        self.projection =
            Perspective3::new(self.aspect, self.fov.to_radians(), self.near, self.far)
                .into_inner();
    }

    pub fn look_at(&mut self, target: Point3<f32>) {
        self.target = target;
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Camera basis in world space: (right, up, backward)
    pub fn basis(&self) -> (Vector3<f32>, Vector3<f32>, Vector3<f32>) {
        let backward = (self.position - self.target)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::z);
        let right = self
            .up
            .cross(&backward)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::x);
        let up = backward.cross(&right);
        (right, up, backward)
    }

    /// Snapshot handed to a render surface
    pub fn view(&self) -> CameraView {
        CameraView {
            view: self.view_matrix(),
            projection: self.projection,
            position: self.position,
        }
    }
}
