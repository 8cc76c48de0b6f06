//! Scene lifecycle manager
//!
//! Owns the scene, camera, orbit controls, render surface, the displayed
//! point set and the render loop of one viewer instance. All scene
//! mutation happens on the thread that owns the manager: load results
//! arrive over a channel and are applied on the next tick.

use std::f32::consts::FRAC_PI_2;
use std::rc::Rc;

use pcdscope_core::{
    Error, MaterialSlot, Mount, ObjectId, PointGeometry, PointSet, PointsMaterial, RenderSurface,
    Scene, SurfaceDescriptor, SurfaceFactory, Transform3D,
};
use pcdscope_io::{AssetFetcher, DecoderRegistry};

use crate::camera::PerspectiveCamera;
use crate::controls::OrbitControls;
use crate::error::{Result, ViewerError};
use crate::events::{ListenerId, ViewportEvent, ViewportEvents};
use crate::loader::{LoadCompletion, LoadExecutor, PointCloudLoader, TokioLoadExecutor};
use crate::options::{MaterialOptions, ViewerOptions};
use crate::scheduler::{FrameHandle, FrameScheduler};

/// Lifecycle of a [`SceneLifecycleManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    Constructed,
    Running,
    TornDown,
}

/// Configures and builds a [`SceneLifecycleManager`].
///
/// Only the frame scheduler is required; the viewport events, asset
/// fetcher, decoder registry and load executor have defaults.
pub struct ViewerBuilder {
    options: ViewerOptions,
    scheduler: Box<dyn FrameScheduler>,
    events: Option<ViewportEvents>,
    fetcher: Option<AssetFetcher>,
    decoders: Option<DecoderRegistry>,
    executor: Option<Box<dyn LoadExecutor>>,
}

impl ViewerBuilder {
    pub fn new(scheduler: Box<dyn FrameScheduler>) -> Self {
        Self {
            options: ViewerOptions::default(),
            scheduler,
            events: None,
            fetcher: None,
            decoders: None,
            executor: None,
        }
    }

    pub fn options(mut self, options: ViewerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn viewport_events(mut self, events: ViewportEvents) -> Self {
        self.events = Some(events);
        self
    }

    pub fn fetcher(mut self, fetcher: AssetFetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn decoders(mut self, decoders: DecoderRegistry) -> Self {
        self.decoders = Some(decoders);
        self
    }

    pub fn executor(mut self, executor: Box<dyn LoadExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn settle_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.options.host.settle_delay_ms)
    }

    /// Build the viewer into `mount` and start its render loop
    pub fn build<F: SurfaceFactory>(
        self,
        mount: Rc<dyn Mount>,
        factory: &mut F,
    ) -> Result<SceneLifecycleManager<F::Surface>> {
        self.try_build(mount, factory).map_err(|(e, _)| e)
    }

    /// Like [`build`](Self::build), but hands the builder back on failure
    /// so the caller can retry.
    pub fn try_build<F: SurfaceFactory>(
        mut self,
        mount: Rc<dyn Mount>,
        factory: &mut F,
    ) -> std::result::Result<SceneLifecycleManager<F::Surface>, (ViewerError, Self)> {
        let size = mount.client_size();
        if size.is_degenerate() {
            let error = ViewerError::DegenerateMount {
                width: size.width,
                height: size.height,
            };
            return Err((error, self));
        }

        let executor: Box<dyn LoadExecutor> = match self.executor.take() {
            Some(executor) => executor,
            None => match TokioLoadExecutor::new() {
                Ok(executor) => Box::new(executor),
                Err(e) => return Err((e.into(), self)),
            },
        };

        let pixel_ratio = mount.device_pixel_ratio();
        let surface = match factory.create_surface(&SurfaceDescriptor {
            antialias: self.options.renderer.antialias,
            pixel_ratio,
            size,
        }) {
            Ok(surface) => surface,
            Err(e) => {
                self.executor = Some(executor);
                return Err((e.into(), self));
            }
        };

        let loader = PointCloudLoader::new(
            self.fetcher.unwrap_or_default(),
            self.decoders.unwrap_or_default(),
            executor,
        );
        let events = self.events.unwrap_or_default();

        let mut scene = Scene::new();
        scene.background = self.options.renderer.background;

        let camera = PerspectiveCamera::from_options(&self.options.camera, size.aspect_ratio());
        let controls = OrbitControls::new(&self.options.controls, size);

        mount.append_output(surface.output());
        let resize_listener = events.register();

        log::debug!(
            "Constructed viewer {}x{} at pixel ratio {}",
            size.width,
            size.height,
            pixel_ratio
        );

        let mut manager = SceneLifecycleManager {
            state: ViewerState::Constructed,
            mount,
            scene,
            camera,
            controls,
            surface,
            material: self.options.material,
            current: None,
            scheduler: self.scheduler,
            pending_frame: None,
            events,
            resize_listener: Some(resize_listener),
            loader,
            next_seq: 0,
            latest_request: None,
            applied_request: None,
            settled_request: None,
            last_load_error: None,
        };
        manager.start();
        Ok(manager)
    }
}

/// Owns everything one viewer instance renders with.
///
/// Dropping a manager that was not torn down tears it down.
pub struct SceneLifecycleManager<S: RenderSurface> {
    state: ViewerState,
    mount: Rc<dyn Mount>,
    scene: Scene,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    surface: S,
    material: MaterialOptions,
    /// The displayed point set, if any
    current: Option<ObjectId>,
    scheduler: Box<dyn FrameScheduler>,
    pending_frame: Option<FrameHandle>,
    events: ViewportEvents,
    resize_listener: Option<(ListenerId, flume::Receiver<ViewportEvent>)>,
    loader: PointCloudLoader,
    next_seq: u64,
    latest_request: Option<u64>,
    applied_request: Option<u64>,
    /// Newest request that finished, successfully or not
    settled_request: Option<u64>,
    last_load_error: Option<Error>,
}

impl<S: RenderSurface> SceneLifecycleManager<S> {
    fn start(&mut self) {
        debug_assert_eq!(self.state, ViewerState::Constructed);
        self.state = ViewerState::Running;
        self.pending_frame = Some(self.scheduler.request_frame());
    }

    fn ensure_running(&self, operation: &'static str) -> Result<()> {
        if self.state == ViewerState::Running {
            return Ok(());
        }
        log::warn!("Rejected {} on a viewer that is {:?}", operation, self.state);
        debug_assert!(
            false,
            "{} called on a viewer that is {:?}",
            operation, self.state
        );
        Err(ViewerError::InvalidState {
            operation,
            state: self.state,
        })
    }

    /// Request a frame load; returns the request's sequence number.
    ///
    /// The asset cache is switched off so the location is always fetched
    /// again. The result is applied on a later tick, and only if no newer
    /// request has finished first.
    pub fn load_point_cloud(&mut self, location: &str) -> Result<u64> {
        self.ensure_running("load_point_cloud")?;

        self.loader.fetcher().cache().set_enabled(false);
        self.next_seq += 1;
        let seq = self.next_seq;
        self.latest_request = Some(seq);

        log::info!("Loading point cloud {} (request {})", location, seq);
        self.loader.request(seq, location);
        Ok(seq)
    }

    /// Match the camera and surface to the mount's current size
    pub fn resize(&mut self) -> Result<()> {
        self.ensure_running("resize")?;
        self.apply_resize();
        Ok(())
    }

    fn apply_resize(&mut self) {
        let size = self.mount.client_size();
        if size.is_degenerate() {
            log::debug!("Ignoring resize to {}x{}", size.width, size.height);
            return;
        }
        self.camera.aspect = size.aspect_ratio();
        self.camera.update_projection_matrix();
        self.surface.set_size(size);
        self.controls.set_viewport(size);
    }

    /// Apply queued resize notifications and finished loads.
    ///
    /// Runs at the start of every tick; returns how many items were handled.
    pub fn process_pending(&mut self) -> Result<usize> {
        self.ensure_running("process_pending")?;
        Ok(self.pump_events())
    }

    fn pump_events(&mut self) -> usize {
        let mut handled = 0;

        let resized = self
            .resize_listener
            .as_ref()
            .map(|(_, receiver)| receiver.drain().count())
            .unwrap_or(0);
        if resized > 0 {
            self.apply_resize();
            handled += resized;
        }

        while let Some(completion) = self.loader.try_completion() {
            self.apply_completion(completion);
            handled += 1;
        }
        handled
    }

    fn apply_completion(&mut self, completion: LoadCompletion) {
        let LoadCompletion {
            seq,
            location,
            result,
        } = completion;

        if self.settled_request.is_some_and(|settled| seq <= settled) {
            log::debug!("Discarding stale load {} of {}", seq, location);
            return;
        }
        self.settled_request = Some(seq);

        let geometry = match result {
            Ok(geometry) => geometry,
            Err(e) => {
                log::warn!("Failed to load point cloud {}: {}", location, e);
                self.last_load_error = Some(e);
                return;
            }
        };

        match self.swap_point_set(geometry, &location) {
            Ok(()) => {
                self.applied_request = Some(seq);
                self.last_load_error = None;
            }
            Err(e) => {
                log::warn!("Failed to display point cloud {}: {}", location, e);
                self.last_load_error = Some(e);
            }
        }
    }

    /// Upload `geometry`, then replace the displayed point set with it
    fn swap_point_set(&mut self, mut geometry: PointGeometry, location: &str) -> pcdscope_core::Result<()> {
        let material = PointsMaterial {
            size_attenuation: self.material.size_attenuation,
            ..PointsMaterial::for_geometry(&geometry, self.material.point_size)
        };
        if let Some(bounds) = geometry.bounding_box() {
            let size = bounds.size();
            log::debug!(
                "Frame {} spans {:.3} x {:.3} x {:.3}",
                location,
                size.x,
                size.y,
                size.z
            );
        }
        geometry.center();

        let geometry_handle = self.surface.upload_geometry(&geometry)?;
        let material_handle = match self.surface.create_material(&material) {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(release) = self.surface.release_geometry(geometry_handle) {
                    log::warn!("Failed to release geometry after upload error: {}", release);
                }
                return Err(e);
            }
        };

        self.dispose_current();

        let point_set = PointSet {
            geometry: geometry_handle,
            materials: MaterialSlot::Single(material_handle),
            transform: Transform3D::rotation_x(-FRAC_PI_2),
            point_count: geometry.len(),
            source: location.to_string(),
        };
        self.current = Some(self.scene.add(point_set));

        log::info!(
            "Displaying {} points from {} ({})",
            geometry.len(),
            location,
            if material.vertex_colors { "vertex colors" } else { "white" }
        );
        Ok(())
    }

    fn dispose_current(&mut self) {
        let Some(point_set) = self.current.take().and_then(|id| self.scene.remove(id)) else {
            return;
        };
        let source = point_set.source.clone();
        if let Err(e) = point_set.dispose(&mut self.surface) {
            log::warn!("Failed to release point set {}: {}", source, e);
        }
    }

    /// Run one render tick for `handle`; returns whether it ran.
    ///
    /// Handles that are not the pending one, and any tick after teardown,
    /// are ignored.
    pub fn run_frame(&mut self, handle: FrameHandle) -> bool {
        if self.state != ViewerState::Running || self.pending_frame != Some(handle) {
            log::trace!("Ignoring frame {:?} in state {:?}", handle, self.state);
            return false;
        }
        self.pending_frame = None;

        self.pump_events();
        self.controls.update(&mut self.camera);
        if let Err(e) = self.surface.render(&self.scene, &self.camera.view()) {
            log::warn!("Render failed: {}", e);
        }

        self.pending_frame = Some(self.scheduler.request_frame());
        true
    }

    /// Release everything the viewer owns. Later calls are no-ops.
    pub fn teardown(&mut self) {
        if self.state == ViewerState::TornDown {
            log::debug!("Viewer already torn down");
            return;
        }

        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
        if let Some((id, _)) = self.resize_listener.take() {
            self.events.unregister(id);
        }
        self.dispose_current();
        self.surface.dispose();
        if !self.mount.remove_output(self.surface.output()) {
            log::warn!("Surface output was not attached to the mount");
        }

        self.state = ViewerState::TornDown;
        log::debug!("Viewer torn down");
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    /// Controls and camera, for feeding pointer input
    pub fn controls_mut(&mut self) -> (&mut OrbitControls, &PerspectiveCamera) {
        (&mut self.controls, &self.camera)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The displayed point set
    pub fn current_point_set(&self) -> Option<&PointSet> {
        self.current.and_then(|id| self.scene.get(id))
    }

    /// Sequence number of the newest load request
    pub fn latest_request(&self) -> Option<u64> {
        self.latest_request
    }

    /// Sequence number of the displayed point set's request
    pub fn applied_request(&self) -> Option<u64> {
        self.applied_request
    }

    pub fn last_load_error(&self) -> Option<&Error> {
        self.last_load_error.as_ref()
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending_frame
    }

    pub fn fetcher(&self) -> &AssetFetcher {
        self.loader.fetcher()
    }
}

impl<S: RenderSurface> Drop for SceneLifecycleManager<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
