//! Entity world used by the host and by loaded scene modules.
//!
//! Components are stored in BTreeMap for deterministic iteration order.
//! Each component type has its own storage keyed by EntityId.
//!
//! # Invariants
//! - All structural mutations produce events.
//! - Every GPU handle held by a component is reported released exactly once.
//! - Iteration order is deterministic (BTreeMap).

mod components;
mod world;

pub use components::{
    Attribute, DisplayMode, GpuHandle, IndexBuffer, Name, VertexArray, VertexBuffers,
};
pub use scenehost_common::{EntityId, Position, Rotation, Scale};
pub use world::{Component, ComponentKind, World, WorldEvent};
