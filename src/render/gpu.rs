//! wgpu implementation of [`RenderBackend`] drawing into a window surface.
//!
//! Draw calls are queued between `begin_frame` and `end_frame` and encoded
//! into a single render pass in submission order, so the two-pass contract
//! the scene relies on survives unchanged. Each draw reads its matrices and
//! alpha from one slot of a dynamic uniform buffer.

use super::backend::{
    BlendMode, ColorSet, DrawCall, FrameUniforms, MeshBuffers, MeshHandle, PipelineState,
    RenderBackend, Topology,
};
use crate::geometry::Rgba;
use bytemuck::{Pod, Zeroable};
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.08,
    g: 0.09,
    b: 0.11,
    a: 1.0,
};
const INITIAL_DRAW_SLOTS: u64 = 256;

const SHADER: &str = r#"
struct DrawBlock {
    view_proj: mat4x4<f32>,
    model: mat4x4<f32>,
    alpha: f32,
};

@group(0) @binding(0) var<uniform> block: DrawBlock;

struct VertexOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec4<f32>) -> VertexOut {
    var out: VertexOut;
    out.clip = block.view_proj * block.model * vec4<f32>(position, 1.0);
    out.color = vec4<f32>(color.rgb, block.alpha);
    return out;
}

@fragment
fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible graphics adapter found")]
    NoAdapter,
    #[error("failed to open device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface is not supported by the adapter")]
    UnsupportedSurface,
}

/// Per-draw uniform slot. Layout matches `DrawBlock` in the shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct DrawBlock {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    alpha: f32,
    _pad: [f32; 3],
}

const DRAW_BLOCK_SIZE: u64 = std::mem::size_of::<DrawBlock>() as u64;

impl DrawBlock {
    fn new(frame: &FrameUniforms, draw: &DrawCall) -> Self {
        Self {
            view_proj: (frame.projection * frame.view).to_cols_array_2d(),
            model: draw.model.to_cols_array_2d(),
            alpha: draw.alpha,
            _pad: [0.0; 3],
        }
    }
}

struct IndexBuffer {
    buffer: wgpu::Buffer,
    count: u32,
}

struct GpuMesh {
    positions: wgpu::Buffer,
    /// Indexed by [`color_slot`].
    colors: [wgpu::Buffer; 4],
    vertex_count: usize,
    triangles: Option<IndexBuffer>,
    quads: Option<IndexBuffer>,
    edges: Option<IndexBuffer>,
}

impl GpuMesh {
    fn indices(&self, topology: Topology) -> Option<&IndexBuffer> {
        match topology {
            Topology::Triangles => self.triangles.as_ref(),
            Topology::Quads => self.quads.as_ref(),
            Topology::Lines => self.edges.as_ref(),
        }
    }
}

struct Pipelines {
    opaque_faces: wgpu::RenderPipeline,
    opaque_lines: wgpu::RenderPipeline,
    blended_faces: wgpu::RenderPipeline,
    blended_lines: wgpu::RenderPipeline,
}

impl Pipelines {
    fn select(&self, state: PipelineState, topology: Topology) -> &wgpu::RenderPipeline {
        match (state.blend, topology == Topology::Lines) {
            (BlendMode::Opaque, false) => &self.opaque_faces,
            (BlendMode::Opaque, true) => &self.opaque_lines,
            (BlendMode::AlphaBlend, false) => &self.blended_faces,
            (BlendMode::AlphaBlend, true) => &self.blended_lines,
        }
    }
}

struct DrawSlots {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: u64,
}

pub struct GpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    pipelines: Pipelines,
    slot_layout: wgpu::BindGroupLayout,
    slots: DrawSlots,
    slot_stride: u64,
    meshes: HashMap<MeshHandle, GpuMesh>,
    next_handle: u32,
    frame: Option<FrameUniforms>,
    state: PipelineState,
    queued: Vec<(PipelineState, DrawCall)>,
}

impl GpuBackend {
    /// Opens a device for `window` and configures its surface.
    pub fn new(window: Arc<Window>) -> Result<Self, GpuError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window)?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        }))
        .ok_or(GpuError::NoAdapter)?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("seisview-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))?;

        let config = surface
            .get_default_config(&adapter, size.width.max(1), size.height.max(1))
            .ok_or(GpuError::UnsupportedSurface)?;
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, config.width, config.height);

        let slot_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("seisview-draw-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(DRAW_BLOCK_SIZE),
                },
                count: None,
            }],
        });
        let pipelines = create_pipelines(&device, &slot_layout, config.format);
        let slot_stride = align_to(
            DRAW_BLOCK_SIZE,
            u64::from(device.limits().min_uniform_buffer_offset_alignment),
        );
        let slots = create_draw_slots(&device, &slot_layout, slot_stride, INITIAL_DRAW_SLOTS);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_view,
            pipelines,
            slot_layout,
            slots,
            slot_stride,
            meshes: HashMap::new(),
            next_handle: 0,
            frame: None,
            state: PipelineState::OPAQUE,
            queued: Vec::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
    }

    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }

    fn ensure_slots(&mut self, count: u64) {
        if count <= self.slots.capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        log::debug!("Growing draw uniform buffer to {} slots", capacity);
        self.slots = create_draw_slots(&self.device, &self.slot_layout, self.slot_stride, capacity);
    }

    fn vertex_buffer(&self, label: &str, contents: &[u8]) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            })
    }

    fn index_buffer(&self, label: &str, indices: &[u32]) -> Option<IndexBuffer> {
        if indices.is_empty() {
            return None;
        }
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        Some(IndexBuffer {
            buffer,
            count: indices.len() as u32,
        })
    }
}

impl RenderBackend for GpuBackend {
    fn upload(&mut self, buffers: &MeshBuffers<'_>) -> MeshHandle {
        let handle = MeshHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);

        let mesh = GpuMesh {
            positions: self.vertex_buffer("mesh-positions", bytemuck::cast_slice(buffers.positions)),
            colors: [
                self.vertex_buffer("mesh-face-colors", bytemuck::cast_slice(buffers.face_colors)),
                self.vertex_buffer("mesh-edge-colors", bytemuck::cast_slice(buffers.edge_colors)),
                self.vertex_buffer("mesh-hover-colors", bytemuck::cast_slice(buffers.hovered_colors)),
                self.vertex_buffer(
                    "mesh-selected-colors",
                    bytemuck::cast_slice(buffers.selected_colors),
                ),
            ],
            vertex_count: buffers.positions.len(),
            triangles: self.index_buffer("mesh-triangles", buffers.triangles),
            quads: self.index_buffer("mesh-quads", &quads_to_triangles(buffers.quads)),
            edges: self.index_buffer("mesh-edges", buffers.edges),
        };
        self.meshes.insert(handle, mesh);
        handle
    }

    fn update_face_colors(&mut self, mesh: MeshHandle, colors: &[Rgba]) -> bool {
        let Some(gpu_mesh) = self.meshes.get(&mesh) else {
            return false;
        };
        if colors.len() != gpu_mesh.vertex_count {
            return false;
        }
        self.queue.write_buffer(
            &gpu_mesh.colors[color_slot(ColorSet::Faces)],
            0,
            bytemuck::cast_slice(colors),
        );
        true
    }

    fn release(&mut self, mesh: MeshHandle) {
        self.meshes.remove(&mesh);
    }

    fn begin_frame(&mut self, uniforms: &FrameUniforms) {
        self.frame = Some(*uniforms);
        self.state = PipelineState::OPAQUE;
        self.queued.clear();
    }

    fn set_pipeline(&mut self, state: PipelineState) {
        self.state = state;
    }

    fn submit(&mut self, draw: &DrawCall) {
        self.queued.push((self.state, *draw));
    }

    fn end_frame(&mut self) {
        let Some(frame_uniforms) = self.frame.take() else {
            return;
        };
        let queued = std::mem::take(&mut self.queued);

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("Surface timeout; skipping frame");
                return;
            }
            Err(err) => {
                log::error!("Failed to acquire surface texture: {}", err);
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.ensure_slots(queued.len() as u64);
        let blocks: Vec<DrawBlock> = queued
            .iter()
            .map(|(_, draw)| DrawBlock::new(&frame_uniforms, draw))
            .collect();
        if !blocks.is_empty() {
            self.queue
                .write_buffer(&self.slots.buffer, 0, &pack_blocks(&blocks, self.slot_stride));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("seisview-encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("seisview-scene-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for (slot, (state, draw)) in queued.iter().enumerate() {
                let Some(mesh) = self.meshes.get(&draw.mesh) else {
                    continue;
                };
                let Some(indices) = mesh.indices(draw.topology) else {
                    continue;
                };
                let offset = slot as u64 * self.slot_stride;
                pass.set_pipeline(self.pipelines.select(*state, draw.topology));
                pass.set_bind_group(0, &self.slots.bind_group, &[offset as u32]);
                pass.set_vertex_buffer(0, mesh.positions.slice(..));
                pass.set_vertex_buffer(1, mesh.colors[color_slot(draw.colors)].slice(..));
                pass.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..indices.count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("seisview-depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_draw_slots(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    capacity: u64,
) -> DrawSlots {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("seisview-draw-slots"),
        size: stride * capacity,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("seisview-draw-slots"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(DRAW_BLOCK_SIZE),
            }),
        }],
    });
    DrawSlots {
        buffer,
        bind_group,
        capacity,
    }
}

fn create_pipelines(
    device: &wgpu::Device,
    slot_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> Pipelines {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("seisview-shader"),
        source: wgpu::ShaderSource::Wgsl(SHADER.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("seisview-pipeline-layout"),
        bind_group_layouts: &[slot_layout],
        push_constant_ranges: &[],
    });

    let build = |state: PipelineState, topology: wgpu::PrimitiveTopology| {
        let blend = match state.blend {
            BlendMode::Opaque => wgpu::BlendState::REPLACE,
            BlendMode::AlphaBlend => wgpu::BlendState::ALPHA_BLENDING,
        };
        let depth_compare = if state.depth_test {
            wgpu::CompareFunction::LessEqual
        } else {
            wgpu::CompareFunction::Always
        };
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("seisview-pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Rgba>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![1 => Float32x4],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: state.depth_write,
                depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    };

    Pipelines {
        opaque_faces: build(PipelineState::OPAQUE, wgpu::PrimitiveTopology::TriangleList),
        opaque_lines: build(PipelineState::OPAQUE, wgpu::PrimitiveTopology::LineList),
        blended_faces: build(PipelineState::TRANSPARENT, wgpu::PrimitiveTopology::TriangleList),
        blended_lines: build(PipelineState::TRANSPARENT, wgpu::PrimitiveTopology::LineList),
    }
}

/// Splits each `a b c d` quad into the triangles `a b c` and `a c d`.
/// A trailing partial quad is dropped.
fn quads_to_triangles(quads: &[u32]) -> Vec<u32> {
    quads
        .chunks_exact(4)
        .flat_map(|q| [q[0], q[1], q[2], q[0], q[2], q[3]])
        .collect()
}

fn color_slot(set: ColorSet) -> usize {
    match set {
        ColorSet::Faces => 0,
        ColorSet::Edges => 1,
        ColorSet::Hovered => 2,
        ColorSet::Selected => 3,
    }
}

fn align_to(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

/// Lays `blocks` out at `stride` byte intervals.
fn pack_blocks(blocks: &[DrawBlock], stride: u64) -> Vec<u8> {
    let stride = stride as usize;
    let mut bytes = vec![0u8; blocks.len() * stride];
    for (chunk, block) in bytes.chunks_exact_mut(stride).zip(blocks) {
        chunk[..DRAW_BLOCK_SIZE as usize].copy_from_slice(bytemuck::bytes_of(block));
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ObjectId;
    use glam::{Mat4, Vec3};

    #[test]
    fn quads_split_into_two_triangles() {
        assert_eq!(
            quads_to_triangles(&[0, 1, 2, 3, 4, 5, 6, 7, 8]),
            vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]
        );
        assert!(quads_to_triangles(&[]).is_empty());
    }

    #[test]
    fn draw_block_matches_shader_layout() {
        assert_eq!(DRAW_BLOCK_SIZE, 144);
        assert_eq!(align_to(DRAW_BLOCK_SIZE, 256), 256);
        assert_eq!(align_to(DRAW_BLOCK_SIZE, 16), 144);
        assert_eq!(align_to(DRAW_BLOCK_SIZE, 0), 144);
    }

    #[test]
    fn blocks_are_packed_at_the_stride() {
        let frame = FrameUniforms {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            camera_position: Vec3::ZERO,
        };
        let draw = |alpha: f32| DrawCall {
            object: ObjectId::from_raw(0),
            mesh: MeshHandle(0),
            topology: Topology::Triangles,
            colors: ColorSet::Faces,
            index_count: 3,
            model: Mat4::from_translation(Vec3::X),
            alpha,
        };
        let blocks = [DrawBlock::new(&frame, &draw(0.5)), DrawBlock::new(&frame, &draw(1.0))];
        let bytes = pack_blocks(&blocks, 256);
        assert_eq!(bytes.len(), 512);

        let second: DrawBlock = bytemuck::pod_read_unaligned(&bytes[256..256 + 144]);
        assert_eq!(second.alpha, 1.0);
        assert_eq!(second.model[3], [1.0, 0.0, 0.0, 1.0]);
        assert!(bytes[144..256].iter().all(|b| *b == 0));
    }

    #[test]
    fn color_sets_have_distinct_slots() {
        let slots = [
            color_slot(ColorSet::Faces),
            color_slot(ColorSet::Edges),
            color_slot(ColorSet::Hovered),
            color_slot(ColorSet::Selected),
        ];
        assert_eq!(slots, [0, 1, 2, 3]);
    }
}
