use crate::device::{DrawCall, GpuDevice, RenderError, UNIFORMS};
use glam::Mat4;
use scenehost_ecs::{Attribute, GpuHandle};
use std::collections::BTreeMap;

/// What a recorded handle stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedResource {
    VertexArray,
    VertexBuffer {
        vao: GpuHandle,
        attribute: Attribute,
        len: usize,
        components: u32,
    },
    IndexBuffer {
        vao: GpuHandle,
        count: usize,
    },
}

/// A backend that talks to no GPU and remembers everything it was asked to
/// do. Used by the headless CLI and by tests.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    next_handle: u64,
    live: BTreeMap<GpuHandle, RecordedResource>,
    uniforms: BTreeMap<String, Mat4>,
    uniform_writes: usize,
    draws: Vec<DrawCall>,
    released: usize,
    double_releases: usize,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, resource: RecordedResource) -> GpuHandle {
        self.next_handle += 1;
        let handle = GpuHandle(self.next_handle);
        self.live.insert(handle, resource);
        handle
    }

    /// Number of handles created and not yet released.
    pub fn live(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, handle: GpuHandle) -> bool {
        self.live.contains_key(&handle)
    }

    pub fn resource(&self, handle: GpuHandle) -> Option<&RecordedResource> {
        self.live.get(&handle)
    }

    pub fn released(&self) -> usize {
        self.released
    }

    /// Releases of handles that were not live.
    pub fn double_releases(&self) -> usize {
        self.double_releases
    }

    pub fn uniform(&self, name: &str) -> Option<Mat4> {
        self.uniforms.get(name).copied()
    }

    /// Uniform uploads other than `model`.
    pub fn uniform_writes(&self) -> usize {
        self.uniform_writes
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    /// Forget recorded draws, e.g. between frames.
    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }
}

impl GpuDevice for RecordingDevice {
    fn create_vertex_array(&mut self) -> GpuHandle {
        self.allocate(RecordedResource::VertexArray)
    }

    fn create_vertex_buffer(
        &mut self,
        vao: GpuHandle,
        attribute: Attribute,
        data: &[f32],
        components: u32,
    ) -> GpuHandle {
        self.allocate(RecordedResource::VertexBuffer {
            vao,
            attribute,
            len: data.len(),
            components,
        })
    }

    fn create_index_buffer(&mut self, vao: GpuHandle, indices: &[u32]) -> GpuHandle {
        self.allocate(RecordedResource::IndexBuffer {
            vao,
            count: indices.len(),
        })
    }

    fn release(&mut self, handle: GpuHandle) {
        if self.live.remove(&handle).is_some() {
            self.released += 1;
        } else {
            tracing::warn!("release of unknown handle {handle:?}");
            self.double_releases += 1;
        }
    }

    fn set_uniform(&mut self, name: &str, value: Mat4) -> Result<(), RenderError> {
        if !UNIFORMS.contains(&name) {
            return Err(RenderError::UnknownUniform(name.to_string()));
        }
        if name != "model" {
            self.uniform_writes += 1;
        }
        self.uniforms.insert(name.to_string(), value);
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), RenderError> {
        match self.live.get(&call.vao) {
            Some(RecordedResource::VertexArray) => {}
            _ => return Err(RenderError::UnknownHandle(call.vao)),
        }
        self.uniforms.insert("model".to_string(), call.model);
        self.draws.push(*call);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenehost_ecs::DisplayMode;

    #[test]
    fn handles_are_unique_and_tracked() {
        let mut gpu = RecordingDevice::new();
        let vao = gpu.create_vertex_array();
        let vbo = gpu.create_vertex_buffer(vao, Attribute::Position, &[0.0; 6], 3);
        assert_ne!(vao, vbo);
        assert_eq!(gpu.live(), 2);
        assert!(matches!(
            gpu.resource(vbo),
            Some(RecordedResource::VertexBuffer { len: 6, .. })
        ));

        gpu.release(vbo);
        gpu.release(vbo);
        assert_eq!(gpu.released(), 1);
        assert_eq!(gpu.double_releases(), 1);
    }

    #[test]
    fn unknown_uniform_is_an_error() {
        let mut gpu = RecordingDevice::new();
        assert!(gpu.set_uniform("view", Mat4::IDENTITY).is_ok());
        assert!(matches!(
            gpu.set_uniform("normal_matrix", Mat4::IDENTITY),
            Err(RenderError::UnknownUniform(name)) if name == "normal_matrix"
        ));
    }

    #[test]
    fn draw_requires_live_vertex_array() {
        let mut gpu = RecordingDevice::new();
        let call = DrawCall {
            model: Mat4::IDENTITY,
            vao: GpuHandle(42),
            mode: DisplayMode::Triangles,
            count: 3,
            indexed: false,
        };
        assert!(matches!(
            gpu.draw(&call),
            Err(RenderError::UnknownHandle(GpuHandle(42)))
        ));

        let vao = gpu.create_vertex_array();
        gpu.draw(&DrawCall { vao, ..call }).unwrap();
        assert_eq!(gpu.draws().len(), 1);
        assert_eq!(gpu.uniform("model"), Some(Mat4::IDENTITY));
    }
}
