//! Host panel that owns one viewer per mount lifetime

use std::rc::Rc;
use std::time::{Duration, Instant};

use pcdscope_core::{Mount, SurfaceFactory};

use crate::error::{Result, ViewerError};
use crate::manager::{SceneLifecycleManager, ViewerBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    /// Waiting for `mount`
    Detached,
    Mounted,
    /// Unmounted for good; the viewer is torn down
    Unmounted,
}

/// Creates the viewer once, forwards selection changes to it and tears it
/// down on unmount.
pub struct ViewerHostPanel<F: SurfaceFactory> {
    mount: Rc<dyn Mount>,
    factory: F,
    builder: Option<ViewerBuilder>,
    viewer: Option<SceneLifecycleManager<F::Surface>>,
    phase: HostPhase,
    selection: Option<String>,
    settle_delay: Duration,
    settle_at: Option<Instant>,
}

impl<F: SurfaceFactory> ViewerHostPanel<F> {
    pub fn new(mount: Rc<dyn Mount>, factory: F, builder: ViewerBuilder) -> Self {
        let settle_delay = builder.settle_delay();
        Self {
            mount,
            factory,
            builder: Some(builder),
            viewer: None,
            phase: HostPhase::Detached,
            selection: None,
            settle_delay,
            settle_at: None,
        }
    }

    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    /// Build the viewer; mounting again returns the existing one
    pub fn mount(&mut self, now: Instant) -> Result<&mut SceneLifecycleManager<F::Surface>> {
        match self.phase {
            HostPhase::Unmounted => return Err(ViewerError::Unmounted),
            HostPhase::Mounted => {
                log::debug!("Host panel already mounted");
            }
            HostPhase::Detached => {
                let size = self.mount.client_size();
                if size.is_degenerate() {
                    return Err(ViewerError::DegenerateMount {
                        width: size.width,
                        height: size.height,
                    });
                }
                let builder = self.builder.take().ok_or(ViewerError::Unmounted)?;
                let mut viewer = match builder.try_build(self.mount.clone(), &mut self.factory) {
                    Ok(viewer) => viewer,
                    Err((e, builder)) => {
                        log::warn!("Failed to build viewer: {}", e);
                        self.builder = Some(builder);
                        return Err(e);
                    }
                };
                if let Some(location) = &self.selection {
                    viewer.load_point_cloud(location)?;
                }
                self.viewer = Some(viewer);
                self.phase = HostPhase::Mounted;
                self.settle_at = Some(now + self.settle_delay);
            }
        }
        self.viewer.as_mut().ok_or(ViewerError::Unmounted)
    }

    /// Record the selected frame; forwards it to the viewer only when it
    /// differs from the previous selection. Returns whether it was forwarded.
    pub fn set_selection(&mut self, location: &str) -> Result<bool> {
        if self.phase == HostPhase::Unmounted {
            return Err(ViewerError::Unmounted);
        }
        if self.selection.as_deref() == Some(location) {
            return Ok(false);
        }
        self.selection = Some(location.to_string());

        match self.viewer.as_mut() {
            Some(viewer) => {
                viewer.load_point_cloud(location)?;
                Ok(true)
            }
            // Forwarded on mount
            None => Ok(false),
        }
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    /// Perform the post-mount settle resize once it is due
    pub fn update(&mut self, now: Instant) -> Result<()> {
        let Some(due) = self.settle_at else {
            return Ok(());
        };
        if now < due {
            return Ok(());
        }
        self.settle_at = None;
        if let Some(viewer) = self.viewer.as_mut() {
            log::debug!("Settle resize after mount");
            viewer.resize()?;
        }
        Ok(())
    }

    pub fn settle_pending(&self) -> bool {
        self.settle_at.is_some()
    }

    /// Tear the viewer down; later calls do nothing
    pub fn unmount(&mut self) {
        if self.phase == HostPhase::Unmounted {
            return;
        }
        if let Some(mut viewer) = self.viewer.take() {
            viewer.teardown();
        }
        self.builder = None;
        self.settle_at = None;
        self.phase = HostPhase::Unmounted;
    }

    pub fn viewer(&self) -> Option<&SceneLifecycleManager<F::Surface>> {
        self.viewer.as_ref()
    }

    pub fn viewer_mut(&mut self) -> Option<&mut SceneLifecycleManager<F::Surface>> {
        self.viewer.as_mut()
    }
}

impl<F: SurfaceFactory> Drop for ViewerHostPanel<F> {
    fn drop(&mut self) {
        self.unmount();
    }
}
