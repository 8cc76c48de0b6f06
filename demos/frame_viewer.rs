//! Sequential point cloud frame viewer
//!
//! Opens a window on the first frame and steps through the rest with the
//! left and right arrow keys. Drag with the left button to orbit, with the
//! right button to pan, scroll to zoom.
//!
//! ```text
//! frame_viewer /models/frame1.pcd /models/frame2.pcd /models/frame3.pcd
//! frame_viewer --config viewer.toml
//! ```

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use pcdscope_core::{Extent, Mount, OutputId};
use pcdscope_gpu::WgpuSurfaceFactory;
use pcdscope_viewer::{
    FrameCatalog, FrameQueue, PointerButton, ViewerBuilder, ViewerHostPanel, ViewerOptions,
    ViewportEvents,
};
use winit::{
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowBuilder},
};

#[derive(Parser, Debug)]
#[command(name = "frame_viewer")]
#[command(about = "Step through point cloud frames in an orbit viewer", long_about = None)]
struct Args {
    /// TOML options file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frame locations (paths or URLs); override `frames` from the config
    frames: Vec<String>,
}

/// The window's client area as a viewer mount
struct WindowMount {
    window: Arc<Window>,
    outputs: RefCell<Vec<OutputId>>,
}

impl Mount for WindowMount {
    fn client_size(&self) -> Extent {
        let size = self
            .window
            .inner_size()
            .to_logical::<u32>(self.window.scale_factor());
        Extent::new(size.width, size.height)
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.window.scale_factor() as f32
    }

    fn append_output(&self, output: OutputId) {
        self.outputs.borrow_mut().push(output);
    }

    fn remove_output(&self, output: OutputId) -> bool {
        let mut outputs = self.outputs.borrow_mut();
        let before = outputs.len();
        outputs.retain(|o| *o != output);
        outputs.len() != before
    }
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut options = match &args.config {
        Some(path) => ViewerOptions::load(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => ViewerOptions::default(),
    };
    if !args.frames.is_empty() {
        options.frames = args.frames;
    }
    let mut catalog =
        FrameCatalog::new(options.frames.clone()).context("No frame locations given")?;

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("pcdscope")
            .with_inner_size(winit::dpi::LogicalSize::new(1200.0, 800.0))
            .build(&event_loop)
            .context("Failed to create window")?,
    );

    let mount = Rc::new(WindowMount {
        window: window.clone(),
        outputs: RefCell::new(Vec::new()),
    });
    let frames = FrameQueue::new();
    let events = ViewportEvents::new();
    let builder = ViewerBuilder::new(Box::new(frames.clone()))
        .options(options)
        .viewport_events(events.clone());

    let mut host = ViewerHostPanel::new(mount, WgpuSurfaceFactory::new(window.clone()), builder);
    host.set_selection(catalog.current())?;
    host.mount(Instant::now())?;
    log::info!("Showing frame 1/{}: {}", catalog.len(), catalog.current());

    let mut cursor = (0.0f32, 0.0f32);

    event_loop.run(move |event, target| {
        target.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    host.unmount();
                    target.exit();
                }
                WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                    events.notify_resize();
                }
                WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                    let moved = match event.logical_key {
                        Key::Named(NamedKey::ArrowLeft) => catalog.previous(),
                        Key::Named(NamedKey::ArrowRight) => catalog.next(),
                        _ => false,
                    };
                    if moved {
                        log::info!(
                            "Showing frame {}/{}: {}",
                            catalog.index() + 1,
                            catalog.len(),
                            catalog.current()
                        );
                        if let Err(e) = host.set_selection(catalog.current()) {
                            log::warn!("Failed to select frame: {}", e);
                        }
                    }
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    if let Some(viewer) = host.viewer_mut() {
                        let (controls, _) = viewer.controls_mut();
                        match (state, pointer_button(button)) {
                            (ElementState::Pressed, Some(button)) => {
                                controls.pointer_down(button, cursor.0, cursor.1)
                            }
                            (ElementState::Released, _) => controls.pointer_up(),
                            _ => {}
                        }
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let logical = position.to_logical::<f32>(window.scale_factor());
                    cursor = (logical.x, logical.y);
                    if let Some(viewer) = host.viewer_mut() {
                        let (controls, camera) = viewer.controls_mut();
                        controls.pointer_move(camera, cursor.0, cursor.1);
                    }
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    // Wheel up zooms in
                    let delta_y = match delta {
                        MouseScrollDelta::LineDelta(_, y) => -y,
                        MouseScrollDelta::PixelDelta(pos) => -(pos.y as f32),
                    };
                    if let Some(viewer) = host.viewer_mut() {
                        viewer.controls_mut().0.wheel(delta_y);
                    }
                }
                WindowEvent::RedrawRequested => {
                    if let Some(viewer) = host.viewer_mut() {
                        for handle in frames.take_due() {
                            viewer.run_frame(handle);
                        }
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                if let Err(e) = host.update(Instant::now()) {
                    log::warn!("Host update failed: {}", e);
                }
                if frames.has_pending() {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    })?;

    Ok(())
}
