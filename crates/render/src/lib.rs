//! Renderer-agnostic rendering: orbit camera, draw dispatch, GPU resource
//! components and the backend trait.
//!
//! # Invariants
//! - Every entity carrying a `VertexArray` yields exactly one draw per frame.
//! - The dispatcher reads the world; it never mutates it.
//! - GPU handles are released through the world's event log, once each.

mod camera;
mod device;
mod dispatcher;
mod headless;
mod resources;

pub use camera::{Matrix, OrbitCamera};
pub use device::{DrawCall, GpuDevice, RenderError, UNIFORMS};
pub use dispatcher::{RenderDispatcher, model_matrix, set_display_mode_all};
pub use headless::{RecordedResource, RecordingDevice};
pub use resources::{
    emplace_index_buffer, emplace_vertex_array, emplace_vertex_buffer, release_dropped_resources,
};
