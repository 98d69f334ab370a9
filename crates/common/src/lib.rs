//! Shared types for the scenehost workspace.
//!
//! # Invariants
//! - Each transform component has an identity default; a missing component
//!   and a component holding its default describe the same placement.

mod types;

pub use types::{EntityId, Position, Rotation, Scale};
