//! Damped orbit navigation around a target point
//!
//! The camera offset from the target is kept in spherical coordinates
//! (radius, polar angle from +Y, azimuth about +Y). Input accumulates
//! deltas; [`OrbitControls::update`] applies a fraction of them each tick
//! when damping is on, so motion eases out over several frames.

use std::f32::consts::PI;

use nalgebra::{Point3, Vector3};
use pcdscope_core::Extent;

use crate::camera::PerspectiveCamera;
use crate::options::ControlOptions;

const EPS: f32 = 1e-6;
/// Dolly factor for one wheel step at zoom speed 1
const DOLLY_SCALE: f32 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: &Vector3<f32>) -> Self {
        let radius = offset.norm();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            theta: offset.x.atan2(offset.z),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }

    /// Keep phi away from the poles so the basis stays defined
    fn make_safe(&mut self) {
        self.phi = self.phi.clamp(EPS, PI - EPS);
    }
}

/// Which gesture a pointer drag performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Orbit
    Primary,
    /// Pan
    Secondary,
    /// Dolly
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drag {
    None,
    Rotate { x: f32, y: f32 },
    Pan { x: f32, y: f32 },
    Dolly { y: f32 },
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub enabled: bool,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Size of the element receiving input, in logical pixels
    viewport: Extent,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_offset: Vector3<f32>,
    drag: Drag,
}

impl OrbitControls {
    pub fn new(options: &ControlOptions, viewport: Extent) -> Self {
        Self {
            target: Point3::origin(),
            enabled: true,
            enable_damping: options.enable_damping,
            damping_factor: options.damping_factor,
            rotate_speed: options.rotate_speed,
            zoom_speed: options.zoom_speed,
            pan_speed: options.pan_speed,
            min_polar_angle: options.min_polar_angle,
            max_polar_angle: options.max_polar_angle,
            min_distance: options.min_distance,
            max_distance: options.max_distance,
            viewport,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vector3::zeros(),
            drag: Drag::None,
        }
    }

    pub fn viewport(&self) -> Extent {
        self.viewport
    }

    /// Track the input element's size; degenerate sizes are ignored
    pub fn set_viewport(&mut self, viewport: Extent) {
        if !viewport.is_degenerate() {
            self.viewport = viewport;
        }
    }

    /// Rotate about the vertical axis by `angle` radians
    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    /// Tilt towards the top pole by `angle` radians
    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// Move towards the target; `scale` < 1 zooms in
    pub fn dolly(&mut self, scale: f32) {
        if scale > 0.0 {
            self.scale *= scale;
        }
    }

    /// Pan by a pixel delta, scaled so the target plane tracks the pointer
    pub fn pan(&mut self, camera: &PerspectiveCamera, delta_x: f32, delta_y: f32) {
        let height = self.viewport.height.max(1) as f32;
        let target_distance =
            (camera.position - self.target).norm() * (camera.fov.to_radians() * 0.5).tan();
        let (right, up, _) = camera.basis();

        let left = right * (-2.0 * delta_x * target_distance / height);
        let upward = up * (2.0 * delta_y * target_distance / height);
        self.pan_offset += left + upward;
    }

    pub fn pointer_down(&mut self, button: PointerButton, x: f32, y: f32) {
        if !self.enabled {
            return;
        }
        self.drag = match button {
            PointerButton::Primary => Drag::Rotate { x, y },
            PointerButton::Secondary => Drag::Pan { x, y },
            PointerButton::Middle => Drag::Dolly { y },
        };
    }

    pub fn pointer_move(&mut self, camera: &PerspectiveCamera, x: f32, y: f32) {
        if !self.enabled {
            return;
        }
        let height = self.viewport.height.max(1) as f32;
        match self.drag {
            Drag::None => {}
            Drag::Rotate { x: x0, y: y0 } => {
                self.rotate_left(2.0 * PI * (x - x0) * self.rotate_speed / height);
                self.rotate_up(2.0 * PI * (y - y0) * self.rotate_speed / height);
                self.drag = Drag::Rotate { x, y };
            }
            Drag::Pan { x: x0, y: y0 } => {
                self.pan(
                    camera,
                    (x - x0) * self.pan_speed,
                    (y - y0) * self.pan_speed,
                );
                self.drag = Drag::Pan { x, y };
            }
            Drag::Dolly { y: y0 } => {
                if y > y0 {
                    self.dolly(self.zoom_scale());
                } else if y < y0 {
                    self.dolly(1.0 / self.zoom_scale());
                }
                self.drag = Drag::Dolly { y };
            }
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag = Drag::None;
    }

    /// Scroll input; negative `delta_y` (wheel up) zooms in
    pub fn wheel(&mut self, delta_y: f32) {
        if !self.enabled {
            return;
        }
        if delta_y < 0.0 {
            self.dolly(self.zoom_scale());
        } else if delta_y > 0.0 {
            self.dolly(1.0 / self.zoom_scale());
        }
    }

    fn zoom_scale(&self) -> f32 {
        DOLLY_SCALE.powf(self.zoom_speed)
    }

    /// Whether any input is still waiting to be applied
    pub fn is_settled(&self) -> bool {
        self.delta_theta.abs() < EPS
            && self.delta_phi.abs() < EPS
            && self.scale == 1.0
            && self.pan_offset.norm() < EPS
    }

    /// Advance one step and move `camera`; returns whether it moved.
    ///
    /// Must run every tick when damping is on.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_offset(&offset);

        if self.enable_damping {
            spherical.theta += self.delta_theta * self.damping_factor;
            spherical.phi += self.delta_phi * self.damping_factor;
        } else {
            spherical.theta += self.delta_theta;
            spherical.phi += self.delta_phi;
        }

        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle);
        spherical.make_safe();

        spherical.radius = (spherical.radius * self.scale)
            .clamp(self.min_distance, self.max_distance)
            .max(EPS);

        if self.enable_damping {
            self.target += self.pan_offset * self.damping_factor;
        } else {
            self.target += self.pan_offset;
        }

        let previous = camera.position;
        camera.position = self.target + spherical.to_offset();
        camera.look_at(self.target);

        if self.enable_damping {
            let decay = 1.0 - self.damping_factor;
            self.delta_theta *= decay;
            self.delta_phi *= decay;
            self.pan_offset *= decay;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vector3::zeros();
        }
        self.scale = 1.0;

        (camera.position - previous).norm_squared() > EPS * EPS
    }
}
