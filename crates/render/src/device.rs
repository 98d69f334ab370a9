use glam::Mat4;
use scenehost_ecs::{Attribute, DisplayMode, EntityId, GpuHandle};

/// Uniform names a backend must accept.
pub const UNIFORMS: [&str; 3] = ["model", "view", "projection"];

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("unknown uniform `{0}`")]
    UnknownUniform(String),
    #[error("unknown GPU handle {0:?}")]
    UnknownHandle(GpuHandle),
    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),
    #[error("{len} floats cannot be split into {components}-component vertices")]
    InvalidLayout { len: usize, components: u32 },
}

/// One draw submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub model: Mat4,
    pub vao: GpuHandle,
    pub mode: DisplayMode,
    /// Index count when `indexed`, vertex count otherwise.
    pub count: u32,
    pub indexed: bool,
}

/// The graphics backend seen by the host and by scenes.
///
/// Handles are opaque; the backend decides what they name. Every handle it
/// returns is released through [`release`](Self::release) exactly once.
pub trait GpuDevice {
    fn create_vertex_array(&mut self) -> GpuHandle;

    /// Upload `data` as `components`-wide vertices feeding `attribute` of `vao`.
    fn create_vertex_buffer(
        &mut self,
        vao: GpuHandle,
        attribute: Attribute,
        data: &[f32],
        components: u32,
    ) -> GpuHandle;

    fn create_index_buffer(&mut self, vao: GpuHandle, indices: &[u32]) -> GpuHandle;

    fn release(&mut self, handle: GpuHandle);

    fn set_uniform(&mut self, name: &str, value: Mat4) -> Result<(), RenderError>;

    fn draw(&mut self, call: &DrawCall) -> Result<(), RenderError>;
}
