use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use scenehost_ecs::{Attribute, DisplayMode, GpuHandle};
use scenehost_render::{DrawCall, GpuDevice, RenderError, UNIFORMS};
use std::collections::BTreeMap;
use wgpu::util::DeviceExt;

const POSITION_COMPONENTS: u32 = 3;
const COLOR_COMPONENTS: u32 = 4;
const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct CameraUniforms {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct InstanceData {
    model_0: [f32; 4],
    model_1: [f32; 4],
    model_2: [f32; 4],
    model_3: [f32; 4],
}

impl From<Mat4> for InstanceData {
    fn from(model: Mat4) -> Self {
        let cols = model.to_cols_array_2d();
        Self {
            model_0: cols[0],
            model_1: cols[1],
            model_2: cols[2],
            model_3: cols[3],
        }
    }
}

struct VertexBuffer {
    buffer: wgpu::Buffer,
    components: u32,
    vertices: u32,
}

/// Buffers bound to one vertex array handle.
#[derive(Default)]
struct VertexArrayState {
    attributes: BTreeMap<Attribute, GpuHandle>,
    index: Option<GpuHandle>,
}

fn topology(mode: DisplayMode) -> wgpu::PrimitiveTopology {
    match mode {
        DisplayMode::Points => wgpu::PrimitiveTopology::PointList,
        DisplayMode::Lines => wgpu::PrimitiveTopology::LineList,
        DisplayMode::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        DisplayMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
        DisplayMode::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

/// wgpu implementation of [`GpuDevice`].
///
/// Draw calls are queued as they arrive and encoded in one pass by
/// [`encode_frame`](Self::encode_frame); the model matrix of each draw
/// becomes one instance in a shared instance buffer.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,

    pipelines: BTreeMap<DisplayMode, wgpu::RenderPipeline>,
    camera: CameraUniforms,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    instance_capacity: u32,
    white_buffer: wgpu::Buffer,
    white_capacity: u32,
    depth_texture: wgpu::TextureView,

    next_handle: u64,
    vertex_arrays: BTreeMap<GpuHandle, VertexArrayState>,
    vertex_buffers: BTreeMap<GpuHandle, VertexBuffer>,
    index_buffers: BTreeMap<GpuHandle, wgpu::Buffer>,
    frame: Vec<DrawCall>,
    clear_color: wgpu::Color,
}

impl WgpuDevice {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let camera = CameraUniforms {
            view: Mat4::IDENTITY.to_cols_array_2d(),
            projection: Mat4::IDENTITY.to_cols_array_2d(),
        };
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera_buffer"),
            contents: bytemuck::bytes_of(&camera),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SCENE_SHADER.into()),
        });

        let pipelines = DisplayMode::ALL
            .iter()
            .map(|mode| {
                let pipeline =
                    Self::create_pipeline(&device, &pipeline_layout, &shader, surface_format, *mode);
                (*mode, pipeline)
            })
            .collect();

        let instance_capacity = 256;
        let instance_buffer = Self::create_instance_buffer(&device, instance_capacity);
        let white_capacity = 256;
        let white_buffer = Self::create_white_buffer(&device, white_capacity);
        let depth_texture = Self::create_depth_texture(&device, width, height);

        Self {
            device,
            queue,
            surface_format,
            pipelines,
            camera,
            camera_buffer,
            camera_bind_group,
            instance_buffer,
            instance_capacity,
            white_buffer,
            white_capacity,
            depth_texture,
            next_handle: 0,
            vertex_arrays: BTreeMap::new(),
            vertex_buffers: BTreeMap::new(),
            index_buffers: BTreeMap::new(),
            frame: Vec::new(),
            clear_color: wgpu::Color {
                r: 0.0,
                g: 1.0,
                b: 0.2,
                a: 1.0,
            },
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(&self.device, width, height);
    }

    /// Live vertex arrays and buffers, for diagnostics.
    pub fn resource_count(&self) -> usize {
        self.vertex_arrays.len() + self.vertex_buffers.len() + self.index_buffers.len()
    }

    /// Encode every draw queued since the last frame into `target`, clearing
    /// it first.
    pub fn encode_frame(&mut self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let frame = std::mem::take(&mut self.frame);

        let mut max_vertices = 0;
        for call in &frame {
            if let Some(vertices) = self.vertex_count(call.vao) {
                max_vertices = max_vertices.max(vertices);
            }
        }
        self.reserve_instances(frame.len() as u32);
        self.reserve_white(max_vertices);

        let instances: Vec<InstanceData> = frame.iter().map(|c| c.model.into()).collect();
        if !instances.is_empty() {
            self.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        pass.set_vertex_buffer(2, self.instance_buffer.slice(..));

        for (instance, call) in frame.iter().enumerate() {
            let instance = instance as u32;
            let Some(vao) = self.vertex_arrays.get(&call.vao) else {
                continue;
            };
            let Some(position) = vao
                .attributes
                .get(&Attribute::Position)
                .and_then(|h| self.vertex_buffers.get(h))
            else {
                tracing::trace!("vertex array {:?} has no positions, skipped", call.vao);
                continue;
            };
            if position.components != POSITION_COMPONENTS {
                tracing::trace!("vertex array {:?} positions are not vec3, skipped", call.vao);
                continue;
            }
            let color = vao
                .attributes
                .get(&Attribute::Color)
                .and_then(|h| self.vertex_buffers.get(h))
                .filter(|b| b.components == COLOR_COMPONENTS && b.vertices >= position.vertices)
                .map(|b| &b.buffer)
                .unwrap_or(&self.white_buffer);

            let Some(pipeline) = self.pipelines.get(&call.mode) else {
                continue;
            };
            pass.set_pipeline(pipeline);
            pass.set_vertex_buffer(0, position.buffer.slice(..));
            pass.set_vertex_buffer(1, color.slice(..));

            match (call.indexed, vao.index.and_then(|h| self.index_buffers.get(&h))) {
                (true, Some(indices)) => {
                    pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..call.count, 0, instance..instance + 1);
                }
                (true, None) => {
                    tracing::trace!("vertex array {:?} has no index buffer, skipped", call.vao);
                }
                (false, _) => {
                    let count = call.count.min(position.vertices);
                    pass.draw(0..count, instance..instance + 1);
                }
            }
        }
    }

    fn allocate(&mut self) -> GpuHandle {
        self.next_handle += 1;
        GpuHandle(self.next_handle)
    }

    fn vertex_count(&self, vao: GpuHandle) -> Option<u32> {
        let state = self.vertex_arrays.get(&vao)?;
        let handle = state.attributes.get(&Attribute::Position)?;
        self.vertex_buffers.get(handle).map(|b| b.vertices)
    }

    fn reserve_instances(&mut self, needed: u32) {
        if needed <= self.instance_capacity {
            return;
        }
        self.instance_capacity = needed.next_power_of_two();
        tracing::debug!("instance buffer grown to {}", self.instance_capacity);
        self.instance_buffer = Self::create_instance_buffer(&self.device, self.instance_capacity);
    }

    fn reserve_white(&mut self, needed: u32) {
        if needed <= self.white_capacity {
            return;
        }
        self.white_capacity = needed.next_power_of_two();
        self.white_buffer = Self::create_white_buffer(&self.device, self.white_capacity);
    }

    fn create_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        surface_format: wgpu::TextureFormat,
        mode: DisplayMode,
    ) -> wgpu::RenderPipeline {
        let topology = topology(mode);
        let strip_index_format = topology.is_strip().then_some(wgpu::IndexFormat::Uint32);

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(mode.name()),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: (POSITION_COMPONENTS as usize * size_of::<f32>()) as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: (COLOR_COMPONENTS as usize * size_of::<f32>()) as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![1 => Float32x4],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: size_of::<InstanceData>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            2 => Float32x4,
                            3 => Float32x4,
                            4 => Float32x4,
                            5 => Float32x4,
                        ],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        })
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: u32) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: capacity as u64 * size_of::<InstanceData>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_white_buffer(device: &wgpu::Device, vertices: u32) -> wgpu::Buffer {
        let colors: Vec<[f32; 4]> = vec![WHITE; vertices as usize];
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("white_color_buffer"),
            contents: bytemuck::cast_slice(&colors),
            usage: wgpu::BufferUsages::VERTEX,
        })
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

impl GpuDevice for WgpuDevice {
    fn create_vertex_array(&mut self) -> GpuHandle {
        let handle = self.allocate();
        self.vertex_arrays.insert(handle, VertexArrayState::default());
        handle
    }

    fn create_vertex_buffer(
        &mut self,
        vao: GpuHandle,
        attribute: Attribute,
        data: &[f32],
        components: u32,
    ) -> GpuHandle {
        let handle = self.allocate();
        let expected = match attribute {
            Attribute::Position | Attribute::Normal => POSITION_COMPONENTS,
            Attribute::Color => COLOR_COMPONENTS,
        };
        if components != expected {
            tracing::warn!(
                "{} buffer with {components} components, pipeline expects {expected}",
                attribute.name()
            );
        }

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(attribute.name()),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let vertices = if components == 0 {
            0
        } else {
            (data.len() / components as usize) as u32
        };
        self.vertex_buffers.insert(
            handle,
            VertexBuffer {
                buffer,
                components,
                vertices,
            },
        );
        match self.vertex_arrays.get_mut(&vao) {
            Some(state) => {
                state.attributes.insert(attribute, handle);
            }
            None => tracing::warn!("vertex buffer {handle:?} bound to unknown array {vao:?}"),
        }
        handle
    }

    fn create_index_buffer(&mut self, vao: GpuHandle, indices: &[u32]) -> GpuHandle {
        let handle = self.allocate();
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("index_buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        self.index_buffers.insert(handle, buffer);
        match self.vertex_arrays.get_mut(&vao) {
            Some(state) => state.index = Some(handle),
            None => tracing::warn!("index buffer {handle:?} bound to unknown array {vao:?}"),
        }
        handle
    }

    fn release(&mut self, handle: GpuHandle) {
        if self.vertex_arrays.remove(&handle).is_some() {
            return;
        }
        if let Some(vb) = self.vertex_buffers.remove(&handle) {
            vb.buffer.destroy();
            return;
        }
        if let Some(ib) = self.index_buffers.remove(&handle) {
            ib.destroy();
            return;
        }
        tracing::warn!("release of unknown handle {handle:?}");
    }

    fn set_uniform(&mut self, name: &str, value: Mat4) -> Result<(), RenderError> {
        match name {
            "view" => self.camera.view = value.to_cols_array_2d(),
            "projection" => self.camera.projection = value.to_cols_array_2d(),
            // Per-draw; carried by the draw call itself.
            _ if UNIFORMS.contains(&name) => return Ok(()),
            _ => return Err(RenderError::UnknownUniform(name.to_string())),
        }
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&self.camera));
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), RenderError> {
        if !self.vertex_arrays.contains_key(&call.vao) {
            return Err(RenderError::UnknownHandle(call.vao));
        }
        self.frame.push(*call);
        Ok(())
    }
}
