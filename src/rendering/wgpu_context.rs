//! GPU graphics context backed by wgpu, rendering into an offscreen texture.

use crate::{
    constants::{PROJECTION_UNIFORM, UNIFORM_SLOTS},
    rendering::{
        context::{
            BufferId, BufferKind, DrawCall, GraphicsBackend, GraphicsContext, PrimitiveKind,
            ProgramId, ProgramSource,
        },
        uniforms::UniformValue,
    },
    MapError, Result,
};
use fxhash::FxHashMap;
use std::any::Any;
use wgpu::util::DeviceExt;

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Projection matrix followed by the `vec4` slots
const UNIFORM_BUFFER_SIZE: u64 = (16 + UNIFORM_SLOTS as u64 * 4) * 4;

struct Program {
    module: wgpu::ShaderModule,
    uniforms: Vec<String>,
    pipelines: FxHashMap<PrimitiveKind, wgpu::RenderPipeline>,
}

struct Target {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: (u32, u32),
}

pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: Target,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    buffers: FxHashMap<BufferId, (wgpu::Buffer, BufferKind)>,
    programs: FxHashMap<ProgramId, Program>,
    next_id: u32,
    clear_pending: bool,
}

impl WgpuContext {
    /// Requests an adapter and device; fails when no adapter is available
    pub async fn new(width: u32, height: u32) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            dx12_shader_compiler: Default::default(),
            flags: wgpu::InstanceFlags::default(),
            gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| MapError::Context("no suitable GPU adapter".to_string()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("glvector device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| MapError::Context(format!("failed to create device: {e}")))?;

        Ok(Self::from_device(device, queue, width, height))
    }

    /// Wraps an existing device, e.g. one shared with a windowing layer
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue, width: u32, height: u32) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Vector Bind Group Layout"),
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
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Vector Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Vector Uniforms"),
            size: UNIFORM_BUFFER_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Vector Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let target = create_target(&device, width, height);

        Self {
            device,
            queue,
            target,
            pipeline_layout,
            uniform_buffer,
            bind_group,
            buffers: FxHashMap::default(),
            programs: FxHashMap::default(),
            next_id: 0,
            clear_pending: true,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Offscreen texture the layers render into
    pub fn target(&self) -> &wgpu::Texture {
        &self.target.texture
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn create_gpu_buffer(&self, kind: BufferKind, data: &[u8]) -> wgpu::Buffer {
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
            BufferKind::HitDetection => wgpu::BufferUsages::COPY_SRC,
        } | wgpu::BufferUsages::COPY_DST;

        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("glvector buffer"),
            contents: data,
            usage,
        })
    }

    fn pack_uniforms(uniforms: &[String], call: &DrawCall) -> Vec<f32> {
        let mut packed = vec![0.0f32; 16 + UNIFORM_SLOTS * 4];
        if let Some(UniformValue::Mat4(matrix)) = call.uniform(PROJECTION_UNIFORM) {
            packed[..16].copy_from_slice(&matrix);
        }
        for (slot, name) in uniforms.iter().enumerate().take(UNIFORM_SLOTS) {
            if let Some(value) = call.uniform(name) {
                let offset = 16 + slot * 4;
                packed[offset..offset + 4].copy_from_slice(&value.to_vec4());
            }
        }
        packed
    }
}

fn create_target(device: &wgpu::Device, width: u32, height: u32) -> Target {
    let size = (width.max(1), height.max(1));
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("glvector target"),
        size: wgpu::Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Target {
        texture,
        view,
        size,
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    primitive: PrimitiveKind,
) -> wgpu::RenderPipeline {
    let topology = match primitive {
        PrimitiveKind::Points => wgpu::PrimitiveTopology::PointList,
        PrimitiveKind::Lines => wgpu::PrimitiveTopology::LineList,
        PrimitiveKind::Triangles => wgpu::PrimitiveTopology::TriangleList,
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Vector Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: "vs_main",
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: 8,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: 0,
                    shader_location: 0,
                }],
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

impl GraphicsContext for WgpuContext {
    fn backend(&self) -> GraphicsBackend {
        GraphicsBackend::Wgpu
    }

    fn begin_frame(&mut self, width: u32, height: u32) -> Result<()> {
        if self.target.size != (width.max(1), height.max(1)) {
            self.target = create_target(&self.device, width, height);
        }
        self.clear_pending = true;
        Ok(())
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<BufferId> {
        let buffer = self.create_gpu_buffer(kind, data);
        let id = self.allocate_id();
        self.buffers.insert(id, (buffer, kind));
        Ok(id)
    }

    fn update_buffer(&mut self, buffer: BufferId, data: &[u8]) -> Result<()> {
        let (existing, kind) = self
            .buffers
            .get(&buffer)
            .ok_or_else(|| MapError::Context(format!("unknown buffer {buffer}")))?;

        if (data.len() as u64) <= existing.size() {
            self.queue.write_buffer(existing, 0, data);
            return Ok(());
        }

        let kind = *kind;
        let replacement = self.create_gpu_buffer(kind, data);
        if let Some((old, _)) = self.buffers.insert(buffer, (replacement, kind)) {
            old.destroy();
        }
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some((buffer, _)) = self.buffers.remove(&buffer) {
            buffer.destroy();
        }
    }

    fn create_program(&mut self, source: &ProgramSource) -> Result<ProgramId> {
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(source.label.as_str()),
                source: wgpu::ShaderSource::Wgsl(source.source.as_str().into()),
            });

        let id = self.allocate_id();
        self.programs.insert(
            id,
            Program {
                module,
                uniforms: source.uniforms.clone(),
                pipelines: FxHashMap::default(),
            },
        );
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
    }

    fn draw(&mut self, call: DrawCall) -> Result<()> {
        let (vertex_buffer, _) = self
            .buffers
            .get(&call.buffer)
            .ok_or_else(|| MapError::Context(format!("draw with deleted buffer {}", call.buffer)))?;
        let program = self
            .programs
            .get_mut(&call.program)
            .ok_or_else(|| MapError::Context(format!("draw with deleted program {}", call.program)))?;

        let pipeline = program
            .pipelines
            .entry(call.primitive)
            .or_insert_with(|| {
                create_pipeline(&self.device, &self.pipeline_layout, &program.module, call.primitive)
            });

        let packed = Self::pack_uniforms(&program.uniforms, &call);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&packed));

        let load = if self.clear_pending {
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
        } else {
            wgpu::LoadOp::Load
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Vector Draw"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Vector Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            pass.draw(0..call.vertex_count, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        self.clear_pending = false;
        Ok(())
    }

    fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    fn live_programs(&self) -> usize {
        self.programs.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
