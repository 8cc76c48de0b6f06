//! wgpu implementation of the point-set render surface

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use nalgebra::Matrix4;
use pcdscope_core::{
    CameraView, Color, Error, Extent, GeometryHandle, MaterialHandle, OutputId, PointGeometry,
    PointsMaterial, RenderSurface, Result, Scene, SurfaceDescriptor, SurfaceFactory,
};
use winit::window::Window;

use crate::device::GpuContext;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const MSAA_SAMPLES: u32 = 4;
/// Vertices per point sprite (two triangles)
const QUAD_VERTICES: u32 = 6;

/// Maps a right-handed GL projection (z in [-1, 1]) to wgpu's [0, 1] depth range
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Per-point instance data
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PointInstance {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl PointInstance {
    /// Instance buffer layout descriptor
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Build instances for a geometry; points without a color attribute are white
pub fn instances_from_geometry(geometry: &PointGeometry) -> Vec<PointInstance> {
    let white = Color::WHITE.to_array();
    match geometry.colors() {
        Some(colors) => geometry
            .positions()
            .iter()
            .zip(colors)
            .map(|(p, c)| PointInstance {
                position: [p.x, p.y, p.z],
                color: c.to_array(),
            })
            .collect(),
        None => geometry
            .positions()
            .iter()
            .map(|p| PointInstance {
                position: [p.x, p.y, p.z],
                color: white,
            })
            .collect(),
    }
}

/// Per-frame uniform data
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct FrameUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// Physical drawable size in pixels
    pub viewport: [f32; 2],
    pub pixel_ratio: f32,
    pub _padding: f32,
}

impl FrameUniform {
    pub fn new(camera: &CameraView, viewport: [f32; 2], pixel_ratio: f32) -> Self {
        let projection = OPENGL_TO_WGPU_MATRIX * camera.projection;
        Self {
            view: camera.view.into(),
            projection: projection.into(),
            viewport,
            pixel_ratio,
            _padding: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ModelUniform {
    matrix: [[f32; 4]; 4],
}

/// Material uniform data, laid out for WGSL's 16-byte alignment
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
    pub size: f32,
    pub size_attenuation: u32,
    pub vertex_colors: u32,
    pub _padding: u32,
}

impl From<&PointsMaterial> for MaterialUniform {
    fn from(material: &PointsMaterial) -> Self {
        let [r, g, b] = if material.vertex_colors {
            Color::WHITE.to_array()
        } else {
            material.uniform_color().to_array()
        };
        Self {
            color: [r, g, b, 1.0],
            size: material.size,
            size_attenuation: material.size_attenuation as u32,
            vertex_colors: material.vertex_colors as u32,
            _padding: 0,
        }
    }
}

struct GpuGeometry {
    instances: wgpu::Buffer,
    count: u32,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
}

struct GpuMaterial {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct RenderTargets {
    depth: wgpu::TextureView,
    /// Multisampled color target, present when MSAA is on
    msaa: Option<wgpu::TextureView>,
}

/// Render surface presenting into a winit window
pub struct WgpuPointSurface {
    context: GpuContext,
    surface: Option<wgpu::Surface<'static>>,
    surface_config: wgpu::SurfaceConfiguration,
    output: OutputId,
    size: Extent,
    pixel_ratio: f32,
    sample_count: u32,
    pipeline: wgpu::RenderPipeline,
    targets: RenderTargets,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    model_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    geometries: HashMap<u64, GpuGeometry>,
    materials: HashMap<u64, GpuMaterial>,
    next_handle: u64,
}

impl WgpuPointSurface {
    /// Create a surface for `window`
    pub async fn new(window: Arc<Window>, descriptor: &SurfaceDescriptor) -> Result<Self> {
        let instance = GpuContext::create_instance();
        let output = OutputId(u64::from(window.id()));
        let surface = instance
            .create_surface(window)
            .map_err(|e| Error::Gpu(format!("Failed to create surface: {:?}", e)))?;
        let context = GpuContext::for_surface(instance, &surface).await?;

        let surface_caps = surface.get_capabilities(&context.adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| Error::Gpu("Surface reports no supported formats".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let physical = physical_size(descriptor.size, descriptor.pixel_ratio);
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: physical.width,
            height: physical.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&context.device, &surface_config);

        let sample_count = if descriptor.antialias
            && context
                .adapter
                .get_texture_format_features(surface_format)
                .flags
                .sample_count_supported(MSAA_SAMPLES)
        {
            MSAA_SAMPLES
        } else {
            if descriptor.antialias {
                log::warn!("{:?} does not support {}x MSAA, antialiasing disabled", surface_format, MSAA_SAMPLES);
            }
            1
        };

        let frame_layout = context.create_uniform_layout(
            "frame_bind_group_layout",
            wgpu::ShaderStages::VERTEX,
        );
        let model_layout = context.create_uniform_layout(
            "model_bind_group_layout",
            wgpu::ShaderStages::VERTEX,
        );
        let material_layout = context.create_uniform_layout(
            "material_bind_group_layout",
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        );

        let frame_buffer = context.create_buffer_init(
            "Frame Uniform Buffer",
            &[FrameUniform::new(
                &CameraView {
                    view: Matrix4::identity(),
                    projection: Matrix4::identity(),
                    position: pcdscope_core::Point3f::origin(),
                },
                [physical.width as f32, physical.height as f32],
                descriptor.pixel_ratio,
            )],
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );
        let frame_bind_group =
            context.create_uniform_bind_group("frame_bind_group", &frame_layout, &frame_buffer);

        let shader =
            context.create_shader_module("Point Sprite Shader", include_str!("shaders/points.wgsl"));
        let pipeline_layout =
            context
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("Point Sprite Pipeline Layout"),
                    bind_group_layouts: &[&frame_layout, &model_layout, &material_layout],
                    push_constant_ranges: &[],
                });

        let pipeline = context
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Point Sprite Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    buffers: &[PointInstance::desc()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: sample_count,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
            });

        let targets = create_targets(&context.device, &surface_config, sample_count);

        log::debug!(
            "Created wgpu point surface {}x{} (ratio {}, {}x samples, {:?})",
            physical.width,
            physical.height,
            descriptor.pixel_ratio,
            sample_count,
            surface_format
        );

        Ok(Self {
            context,
            surface: Some(surface),
            surface_config,
            output,
            size: descriptor.size,
            pixel_ratio: descriptor.pixel_ratio,
            sample_count,
            pipeline,
            targets,
            frame_buffer,
            frame_bind_group,
            model_layout,
            material_layout,
            geometries: HashMap::new(),
            materials: HashMap::new(),
            next_handle: 1,
        })
    }

    fn issue_handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn reconfigure(&mut self) {
        let physical = physical_size(self.size, self.pixel_ratio);
        self.surface_config.width = physical.width;
        self.surface_config.height = physical.height;
        if let Some(surface) = &self.surface {
            surface.configure(&self.context.device, &self.surface_config);
            self.targets =
                create_targets(&self.context.device, &self.surface_config, self.sample_count);
        }
    }
}

impl RenderSurface for WgpuPointSurface {
    fn output(&self) -> OutputId {
        self.output
    }

    fn size(&self) -> Extent {
        self.size
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        if ratio <= 0.0 || ratio == self.pixel_ratio {
            return;
        }
        self.pixel_ratio = ratio;
        self.reconfigure();
    }

    fn set_size(&mut self, size: Extent) {
        if size.is_degenerate() || size == self.size {
            return;
        }
        self.size = size;
        self.reconfigure();
    }

    fn upload_geometry(&mut self, geometry: &PointGeometry) -> Result<GeometryHandle> {
        let mut instances = instances_from_geometry(geometry);
        let count = instances.len() as u32;
        if instances.is_empty() {
            // wgpu rejects zero-sized vertex buffers
            instances.push(PointInstance::zeroed());
        }

        let instance_buffer = self.context.create_buffer_init(
            "Point Instance Buffer",
            &instances,
            wgpu::BufferUsages::VERTEX,
        );
        let model_buffer = self.context.create_buffer_init(
            "Model Uniform Buffer",
            &[ModelUniform {
                matrix: Matrix4::<f32>::identity().into(),
            }],
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );
        let model_bind_group = self.context.create_uniform_bind_group(
            "model_bind_group",
            &self.model_layout,
            &model_buffer,
        );

        let handle = self.issue_handle();
        self.geometries.insert(
            handle,
            GpuGeometry {
                instances: instance_buffer,
                count,
                model_buffer,
                model_bind_group,
            },
        );
        log::debug!("Uploaded geometry {} with {} points", handle, count);
        Ok(GeometryHandle(handle))
    }

    fn create_material(&mut self, material: &PointsMaterial) -> Result<MaterialHandle> {
        let buffer = self.context.create_buffer_init(
            "Material Uniform Buffer",
            &[MaterialUniform::from(material)],
            wgpu::BufferUsages::UNIFORM,
        );
        let bind_group = self.context.create_uniform_bind_group(
            "material_bind_group",
            &self.material_layout,
            &buffer,
        );
        let handle = self.issue_handle();
        self.materials.insert(handle, GpuMaterial { buffer, bind_group });
        Ok(MaterialHandle(handle))
    }

    fn release_geometry(&mut self, handle: GeometryHandle) -> Result<()> {
        let geometry = self
            .geometries
            .remove(&handle.0)
            .ok_or_else(|| Error::UnknownHandle(format!("geometry {}", handle.0)))?;
        geometry.instances.destroy();
        geometry.model_buffer.destroy();
        Ok(())
    }

    fn release_material(&mut self, handle: MaterialHandle) -> Result<()> {
        let material = self
            .materials
            .remove(&handle.0)
            .ok_or_else(|| Error::UnknownHandle(format!("material {}", handle.0)))?;
        material.buffer.destroy();
        Ok(())
    }

    fn render(&mut self, scene: &Scene, camera: &CameraView) -> Result<()> {
        let surface = self
            .surface
            .as_ref()
            .ok_or_else(|| Error::Gpu("Render on a disposed surface".to_string()))?;

        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                surface.configure(&self.context.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out acquiring the next surface texture");
                return Ok(());
            }
            Err(e) => return Err(Error::Gpu(format!("Failed to get surface texture: {:?}", e))),
        };

        let viewport = [
            self.surface_config.width as f32,
            self.surface_config.height as f32,
        ];
        self.context.queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::bytes_of(&FrameUniform::new(camera, viewport, self.pixel_ratio)),
        );

        let mut draws = Vec::with_capacity(scene.len());
        for (_, point_set) in scene.iter() {
            let geometry = self.geometries.get(&point_set.geometry.0).ok_or_else(|| {
                Error::UnknownHandle(format!("geometry {}", point_set.geometry.0))
            })?;
            let Some(material_handle) = point_set.materials.handles().first() else {
                continue;
            };
            let material = self.materials.get(&material_handle.0).ok_or_else(|| {
                Error::UnknownHandle(format!("material {}", material_handle.0))
            })?;
            self.context.queue.write_buffer(
                &geometry.model_buffer,
                0,
                bytemuck::bytes_of(&ModelUniform {
                    matrix: point_set.transform.to_cols_array(),
                }),
            );
            if geometry.count > 0 {
                draws.push((geometry, material));
            }
        }

        let frame_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let (color_view, resolve_target, store) = match &self.targets.msaa {
            Some(msaa) => (msaa, Some(&frame_view), wgpu::StoreOp::Discard),
            None => (&frame_view, None, wgpu::StoreOp::Store),
        };

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Point Sprite Encoder"),
                });
        {
            let background = scene.background;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Point Sprite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: background.r as f64,
                            g: background.g as f64,
                            b: background.b as f64,
                            a: 1.0,
                        }),
                        store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for (geometry, material) in draws {
                render_pass.set_bind_group(1, &geometry.model_bind_group, &[]);
                render_pass.set_bind_group(2, &material.bind_group, &[]);
                render_pass.set_vertex_buffer(0, geometry.instances.slice(..));
                render_pass.draw(0..QUAD_VERTICES, 0..geometry.count);
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn dispose(&mut self) {
        for (_, geometry) in self.geometries.drain() {
            geometry.instances.destroy();
            geometry.model_buffer.destroy();
        }
        for (_, material) in self.materials.drain() {
            material.buffer.destroy();
        }
        self.frame_buffer.destroy();
        if self.surface.take().is_some() {
            log::debug!("Disposed wgpu point surface");
        }
    }
}

fn physical_size(size: Extent, pixel_ratio: f32) -> Extent {
    let scale = |v: u32| ((v as f32 * pixel_ratio).round() as u32).max(1);
    Extent::new(scale(size.width), scale(size.height))
}

fn create_targets(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
) -> RenderTargets {
    let size = wgpu::Extent3d {
        width: config.width,
        height: config.height,
        depth_or_array_layers: 1,
    };
    let texture = |label: &str, format: wgpu::TextureFormat| {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    };

    RenderTargets {
        depth: texture("Depth Texture", DEPTH_FORMAT),
        msaa: (sample_count > 1).then(|| texture("MSAA Color Texture", config.format)),
    }
}

/// Creates [`WgpuPointSurface`]s for one window
pub struct WgpuSurfaceFactory {
    window: Arc<Window>,
}

impl WgpuSurfaceFactory {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window }
    }
}

impl SurfaceFactory for WgpuSurfaceFactory {
    type Surface = WgpuPointSurface;

    fn create_surface(&mut self, descriptor: &SurfaceDescriptor) -> Result<WgpuPointSurface> {
        pollster::block_on(WgpuPointSurface::new(self.window.clone(), descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Perspective3, Vector4};
    use pcdscope_core::Point3f;

    #[test]
    fn test_instance_layout() {
        assert_eq!(std::mem::size_of::<PointInstance>(), 24);
        assert_eq!(PointInstance::desc().array_stride, 24);
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 32);
        assert_eq!(std::mem::size_of::<FrameUniform>() % 16, 0);
    }

    #[test]
    fn test_instances_default_to_white() {
        let geometry = PointGeometry::from_positions(vec![
            Point3f::new(1.0, 2.0, 3.0),
            Point3f::new(-1.0, 0.0, 0.5),
        ]);
        let instances = instances_from_geometry(&geometry);
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].position, [1.0, 2.0, 3.0]);
        assert!(instances.iter().all(|i| i.color == [1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_instances_carry_vertex_colors() {
        let geometry = PointGeometry::with_colors(
            vec![Point3f::origin()],
            vec![Color::new(0.2, 0.4, 0.6)],
        )
        .unwrap();
        assert_eq!(instances_from_geometry(&geometry)[0].color, [0.2, 0.4, 0.6]);
    }

    #[test]
    fn test_material_uniform_flags() {
        let white = MaterialUniform::from(&PointsMaterial::default());
        assert_eq!(white.color, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(white.size, 0.025);
        assert_eq!(white.size_attenuation, 1);
        assert_eq!(white.vertex_colors, 0);

        let colored = PointsMaterial {
            vertex_colors: true,
            color: None,
            ..PointsMaterial::default()
        };
        assert_eq!(MaterialUniform::from(&colored).vertex_colors, 1);
    }

    #[test]
    fn test_projection_maps_near_far_to_wgpu_depth_range() {
        let (near, far) = (0.1, 1000.0);
        let projection = Perspective3::new(4.0 / 3.0, 75f32.to_radians(), near, far);
        let m = OPENGL_TO_WGPU_MATRIX * projection.to_homogeneous();

        let clip_near = m * Vector4::new(0.0, 0.0, -near, 1.0);
        assert_relative_eq!(clip_near.z / clip_near.w, 0.0, epsilon = 1e-4);

        let clip_far = m * Vector4::new(0.0, 0.0, -far, 1.0);
        assert_relative_eq!(clip_far.z / clip_far.w, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_physical_size_never_zero() {
        assert_eq!(physical_size(Extent::new(800, 600), 2.0), Extent::new(1600, 1200));
        assert_eq!(physical_size(Extent::new(1, 1), 0.25), Extent::new(1, 1));
    }
}
