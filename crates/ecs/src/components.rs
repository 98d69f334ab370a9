use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque handle to a GPU-side object owned by a graphics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GpuHandle(pub u64);

/// Primitive assembly mode used when a vertex array is drawn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum DisplayMode {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 5] = [
        DisplayMode::Points,
        DisplayMode::Lines,
        DisplayMode::LineStrip,
        DisplayMode::Triangles,
        DisplayMode::TriangleStrip,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Points => "Points",
            Self::Lines => "Lines",
            Self::LineStrip => "LineStrip",
            Self::Triangles => "Triangles",
            Self::TriangleStrip => "TriangleStrip",
        }
    }
}

/// Vertex attribute slot a buffer feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Attribute {
    Position,
    Color,
    Normal,
}

impl Attribute {
    pub fn name(self) -> &'static str {
        match self {
            Self::Position => "Position",
            Self::Color => "Color",
            Self::Normal => "Normal",
        }
    }
}

/// Human-readable name component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name(pub String);

/// The one vertex-array object of a renderable entity.
///
/// `count` is the number of vertices fed to non-indexed draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexArray {
    pub handle: GpuHandle,
    pub mode: DisplayMode,
    pub count: u32,
}

/// Vertex buffers bound to an entity's vertex array, one per attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexBuffers {
    buffers: BTreeMap<Attribute, GpuHandle>,
}

impl VertexBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handle` to `attribute`, returning the buffer it replaces.
    pub fn insert(&mut self, attribute: Attribute, handle: GpuHandle) -> Option<GpuHandle> {
        self.buffers.insert(attribute, handle)
    }

    pub fn get(&self, attribute: Attribute) -> Option<GpuHandle> {
        self.buffers.get(&attribute).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, GpuHandle)> + '_ {
        self.buffers.iter().map(|(a, h)| (*a, *h))
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Element buffer. Its presence selects indexed drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexBuffer {
    pub handle: GpuHandle,
    pub count: u32,
}
