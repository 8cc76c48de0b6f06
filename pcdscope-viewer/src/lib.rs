//! Point cloud frame viewer
//!
//! This crate provides the parts of the viewer that do not touch a GPU or a
//! window directly:
//! - [`SceneLifecycleManager`]: scene, camera, orbit controls, render loop
//!   and the displayed point set, with deterministic resource release
//! - [`ViewerHostPanel`]: mounts one viewer, forwards frame selections,
//!   tears down on unmount
//! - [`FrameCatalog`]: clamped prev/next navigation over frame locations
//! - [`ViewerOptions`]: TOML-loadable configuration
//!
//! Rendering happens through any [`pcdscope_core::RenderSurface`]; frame
//! ticks come from a [`FrameScheduler`] and loads run on a [`LoadExecutor`].

pub mod camera;
pub mod catalog;
pub mod controls;
pub mod error;
pub mod events;
pub mod host;
pub mod loader;
pub mod manager;
pub mod options;
pub mod scheduler;

pub use camera::PerspectiveCamera;
pub use catalog::FrameCatalog;
pub use controls::{OrbitControls, PointerButton};
pub use error::{Result, ViewerError};
pub use events::{ListenerId, ViewportEvent, ViewportEvents};
pub use host::{HostPhase, ViewerHostPanel};
pub use loader::{
    LoadCompletion, LoadExecutor, LoadJob, ManualExecutor, PointCloudLoader, TokioLoadExecutor,
};
pub use manager::{SceneLifecycleManager, ViewerBuilder, ViewerState};
pub use options::{
    CameraOptions, ControlOptions, HostOptions, MaterialOptions, RendererOptions, ViewerOptions,
};
pub use scheduler::{FrameHandle, FrameQueue, FrameScheduler};
