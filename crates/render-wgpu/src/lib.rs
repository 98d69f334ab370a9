//! wgpu backend for the scene host.
//!
//! Every display mode gets its own pipeline; per-draw model matrices travel
//! through one shared instance buffer.
//!
//! # Invariants
//! - Handles are never reused within a device's lifetime.
//! - Entities without a color buffer render white.

mod gpu;
mod shaders;

pub use gpu::WgpuDevice;
