use web_sys::HtmlCanvasElement;
use wgpu::util::DeviceExt;

use crate::layers::{FeatureLayerConfig, Layer, LayerKind};
use crate::tessellate::{ColorVertex, FeatureMesh, PointInstance, PointStyleUniform, build_feature_mesh};
use crate::viewport::Viewport;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Corner {
    position: [f32; 2],
}

const QUAD_CORNERS: &[Corner] = &[
    Corner { position: [-1.0, -1.0] },
    Corner { position: [1.0, -1.0] },
    Corner { position: [-1.0, 1.0] },
    Corner { position: [1.0, 1.0] },
];

const QUAD_INDICES: &[u16] = &[0, 1, 2, 2, 1, 3];

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ViewUniform {
    center: [f32; 2],
    resolution: f32,
    _pad0: f32,
    size: [f32; 2],
    _pad1: [f32; 2],
}

/// Uploaded buffers of one feature layer generation.
struct GpuMesh {
    generation: u64,
    origin: [f64; 2],
    fill_vertices: Option<wgpu::Buffer>,
    fill_indices: Option<wgpu::Buffer>,
    fill_index_count: u32,
    stroke_vertices: Option<wgpu::Buffer>,
    stroke_vertex_count: u32,
    points: Option<wgpu::Buffer>,
    point_count: u32,
}

/// wgpu renderer for the accelerated feature layer.
pub struct GpuRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,

    view_buffer: wgpu::Buffer,
    view_bind_group: wgpu::BindGroup,

    fill_pipeline: wgpu::RenderPipeline,
    stroke_pipeline: wgpu::RenderPipeline,
    point_pipeline: wgpu::RenderPipeline,

    corner_buffer: wgpu::Buffer,
    corner_index_buffer: wgpu::Buffer,
    point_style_buffer: wgpu::Buffer,
    point_style_bind_group: wgpu::BindGroup,

    mesh: Option<GpuMesh>,

    width: u32,
    height: u32,
    dpr: f32,
}

impl GpuRenderer {
    /// Initialize on the WebGL2 backend.
    pub async fn init(canvas: HtmlCanvasElement) -> Result<Self, String> {
        let width = canvas.width().max(1);
        let height = canvas.height().max(1);
        let dpr = web_sys::window()
            .map(|w| w.device_pixel_ratio() as f32)
            .unwrap_or(1.0)
            .max(0.5);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas))
            .map_err(|e| format!("wgpu init create_surface: {e}"))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await
            .ok_or_else(|| "wgpu init: no suitable GPU adapter found".to_string())?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("isoline-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|e| format!("wgpu init request_device: {e}"))?;

        let mut surface_config = surface
            .get_default_config(&adapter, width, height)
            .ok_or_else(|| "wgpu init: surface unsupported by adapter".to_string())?;
        let caps = surface.get_capabilities(&adapter);
        if let Some(format) = caps.formats.iter().copied().find(|f| !f.is_srgb()) {
            surface_config.format = format;
        }
        // Tiles show through from the canvas below
        if caps
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            surface_config.alpha_mode = wgpu::CompositeAlphaMode::PreMultiplied;
        }
        let format = surface_config.format;

        web_sys::console::log_1(
            &format!(
                "wgpu init: format={:?} alpha={:?}",
                surface_config.format, surface_config.alpha_mode,
            )
            .into(),
        );
        surface.configure(&device, &surface_config);

        let uniform_layout = |label: &str| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            })
        };

        // --- View uniform ---
        let view_bind_group_layout = uniform_layout("view-bgl");
        let view_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("view-ubo"),
            size: std::mem::size_of::<ViewUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let view_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("view-bg"),
            layout: &view_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: view_buffer.as_entire_binding(),
            }],
        });

        let target = [Some(wgpu::ColorTargetState {
            format,
            blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        // --- Fill + stroke pipelines ---
        let shape_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shape-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shape.wgsl").into()),
        });
        let color_vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ColorVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2, // position
                },
                wgpu::VertexAttribute {
                    offset: 8,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4, // color
                },
            ],
        };
        let shape_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shape-pl"),
            bind_group_layouts: &[&view_bind_group_layout],
            push_constant_ranges: &[],
        });
        let shape_pipeline = |label: &str, topology: wgpu::PrimitiveTopology| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&shape_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shape_shader,
                    entry_point: Some("vs_main"),
                    buffers: &[color_vertex_layout.clone()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shape_shader,
                    entry_point: Some("fs_main"),
                    targets: &target,
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };
        let fill_pipeline = shape_pipeline("fill-pipeline", wgpu::PrimitiveTopology::TriangleList);
        let stroke_pipeline = shape_pipeline("stroke-pipeline", wgpu::PrimitiveTopology::LineList);

        // --- Point pipeline ---
        let point_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("point-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("point.wgsl").into()),
        });
        let point_style_bind_group_layout = uniform_layout("point-style-bgl");
        let point_style_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("point-style-ubo"),
            size: std::mem::size_of::<PointStyleUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let point_style_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("point-style-bg"),
            layout: &point_style_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: point_style_buffer.as_entire_binding(),
            }],
        });
        let corner_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Corner>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            }],
        };
        let point_instance_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2, // center
                },
                wgpu::VertexAttribute {
                    offset: 8,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2, // is_point, pad
                },
                wgpu::VertexAttribute {
                    offset: 16,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4, // color
                },
            ],
        };
        let point_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("point-pl"),
            bind_group_layouts: &[&view_bind_group_layout, &point_style_bind_group_layout],
            push_constant_ranges: &[],
        });
        let point_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("point-pipeline"),
            layout: Some(&point_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &point_shader,
                entry_point: Some("vs_main"),
                buffers: &[corner_layout, point_instance_layout],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &point_shader,
                entry_point: Some("fs_main"),
                targets: &target,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let corner_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad-corners"),
            contents: bytemuck::cast_slice(QUAD_CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let corner_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad-indices"),
            contents: bytemuck::cast_slice(QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            view_buffer,
            view_bind_group,
            fill_pipeline,
            stroke_pipeline,
            point_pipeline,
            corner_buffer,
            corner_index_buffer,
            point_style_buffer,
            point_style_bind_group,
            mesh: None,
            width,
            height,
            dpr,
        })
    }

    /// Resize the surface when the canvas size changes.
    pub fn resize(&mut self, width: u32, height: u32, dpr: f32) {
        if width == 0 || height == 0 {
            return;
        }
        if width == self.width && height == self.height && dpr == self.dpr {
            return;
        }
        self.width = width;
        self.height = height;
        self.dpr = dpr;
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Draw the feature layer if it is accelerated; otherwise clear the surface.
    pub fn render(&mut self, layer: Option<&Layer>, vp: &Viewport) {
        let accelerated = layer.and_then(|layer| match &layer.kind {
            LayerKind::Features(FeatureLayerConfig::Accelerated(style)) => Some((layer, style)),
            _ => None,
        });

        match accelerated {
            Some((layer, style)) => {
                if self.mesh.as_ref().map(|m| m.generation) != Some(layer.generation) {
                    let mesh = build_feature_mesh(&layer.features, style);
                    self.mesh = Some(self.upload(layer.generation, &mesh));
                    self.queue.write_buffer(
                        &self.point_style_buffer,
                        0,
                        bytemuck::cast_slice(&[PointStyleUniform::from_style(style)]),
                    );
                }
            }
            None => self.mesh = None,
        }

        if let Some(mesh) = &self.mesh {
            self.queue.write_buffer(
                &self.view_buffer,
                0,
                bytemuck::cast_slice(&[ViewUniform {
                    center: [
                        (vp.center.0 - mesh.origin[0]) as f32,
                        (vp.center.1 - mesh.origin[1]) as f32,
                    ],
                    resolution: vp.resolution() as f32,
                    _pad0: 0.0,
                    size: [vp.width.max(1.0) as f32, vp.height.max(1.0) as f32],
                    _pad1: [0.0, 0.0],
                }]),
            );
        }

        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                return;
            }
            Err(_) => return,
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render-encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("features-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });

            if let Some(mesh) = &self.mesh {
                pass.set_bind_group(0, &self.view_bind_group, &[]);

                if let (Some(vertices), Some(indices)) = (&mesh.fill_vertices, &mesh.fill_indices) {
                    pass.set_pipeline(&self.fill_pipeline);
                    pass.set_vertex_buffer(0, vertices.slice(..));
                    pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..mesh.fill_index_count, 0, 0..1);
                }

                if let Some(vertices) = &mesh.stroke_vertices {
                    pass.set_pipeline(&self.stroke_pipeline);
                    pass.set_vertex_buffer(0, vertices.slice(..));
                    pass.draw(0..mesh.stroke_vertex_count, 0..1);
                }

                if let Some(points) = &mesh.points {
                    pass.set_pipeline(&self.point_pipeline);
                    pass.set_bind_group(1, &self.point_style_bind_group, &[]);
                    pass.set_vertex_buffer(0, self.corner_buffer.slice(..));
                    pass.set_vertex_buffer(1, points.slice(..));
                    pass.set_index_buffer(self.corner_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                    pass.draw_indexed(0..6, 0, 0..mesh.point_count);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    fn upload(&self, generation: u64, mesh: &FeatureMesh) -> GpuMesh {
        let vertex_buffer = |label: &str, contents: &[u8], usage: wgpu::BufferUsages| {
            (!contents.is_empty()).then(|| {
                self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage,
                })
            })
        };
        let fill_ready = !mesh.fill_indices.is_empty();
        GpuMesh {
            generation,
            origin: mesh.origin,
            fill_vertices: fill_ready
                .then(|| {
                    vertex_buffer(
                        "fill-verts",
                        bytemuck::cast_slice(&mesh.fill_vertices),
                        wgpu::BufferUsages::VERTEX,
                    )
                })
                .flatten(),
            fill_indices: vertex_buffer(
                "fill-indices",
                bytemuck::cast_slice(&mesh.fill_indices),
                wgpu::BufferUsages::INDEX,
            ),
            fill_index_count: mesh.fill_indices.len() as u32,
            stroke_vertices: vertex_buffer(
                "stroke-verts",
                bytemuck::cast_slice(&mesh.stroke_vertices),
                wgpu::BufferUsages::VERTEX,
            ),
            stroke_vertex_count: mesh.stroke_vertices.len() as u32,
            points: vertex_buffer(
                "point-instances",
                bytemuck::cast_slice(&mesh.points),
                wgpu::BufferUsages::VERTEX,
            ),
            point_count: mesh.points.len() as u32,
        }
    }
}
