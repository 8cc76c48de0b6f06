//! Core data structures and traits for pcdscope
//!
//! This crate provides the types shared by the decoder, the renderer and the
//! viewer lifecycle manager:
//! - points, colors and decoded point geometry
//! - transforms and point materials
//! - the scene container and the point sets it holds
//! - the seams a rendering backend and a host mount implement

pub mod point;
pub mod geometry;
pub mod transform;
pub mod material;
pub mod scene;
pub mod surface;
pub mod error;

pub use point::*;
pub use geometry::*;
pub use transform::*;
pub use material::*;
pub use scene::*;
pub use surface::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix4, UnitQuaternion};
