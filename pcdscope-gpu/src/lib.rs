//! # pcdscope GPU
//!
//! wgpu backend for the pcdscope viewer.
//!
//! [`WgpuPointSurface`] implements the [`pcdscope_core::RenderSurface`] seam:
//! every uploaded geometry becomes an instance buffer of point sprites and
//! every material a small uniform buffer, both released explicitly through
//! their handles.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pcdscope_core::{Extent, SurfaceDescriptor, SurfaceFactory};
//! use pcdscope_gpu::WgpuSurfaceFactory;
//!
//! fn example(window: Arc<winit::window::Window>) -> pcdscope_core::Result<()> {
//!     let mut factory = WgpuSurfaceFactory::new(window);
//!     let _surface = factory.create_surface(&SurfaceDescriptor {
//!         antialias: true,
//!         pixel_ratio: 1.0,
//!         size: Extent::new(800, 600),
//!     })?;
//!     Ok(())
//! }
//! ```

pub mod device;
pub mod renderer;

pub use device::GpuContext;
pub use renderer::{
    instances_from_geometry, FrameUniform, MaterialUniform, PointInstance, WgpuPointSurface,
    WgpuSurfaceFactory, OPENGL_TO_WGPU_MATRIX,
};
