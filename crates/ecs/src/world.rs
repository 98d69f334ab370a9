use crate::components::{GpuHandle, IndexBuffer, Name, VertexArray, VertexBuffers};
use scenehost_common::{EntityId, Position, Rotation, Scale};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Which component storage an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Name,
    Position,
    Rotation,
    Scale,
    VertexArray,
    VertexBuffers,
    IndexBuffer,
}

/// Record produced by every structural mutation of the world.
///
/// `ResourceReleased` is the destroy notification for GPU-backed components:
/// it is emitted exactly once per handle, when the component holding it is
/// removed, replaced, or its entity destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    Created { entity: EntityId },
    Destroyed { entity: EntityId },
    ComponentAdded { entity: EntityId, kind: ComponentKind },
    ComponentRemoved { entity: EntityId, kind: ComponentKind },
    ResourceReleased { entity: EntityId, handle: GpuHandle },
}

mod sealed {
    use super::World;
    use scenehost_common::EntityId;
    use std::collections::BTreeMap;

    pub trait Stored: Sized {
        fn storage(world: &World) -> &BTreeMap<EntityId, Self>;
        fn storage_mut(world: &mut World) -> &mut BTreeMap<EntityId, Self>;
    }
}

/// A type the world has a storage for.
pub trait Component: sealed::Stored + Clone + 'static {
    const KIND: ComponentKind;

    /// GPU objects owned by this component value.
    fn gpu_handles(&self) -> Vec<GpuHandle> {
        Vec::new()
    }
}

macro_rules! stored {
    ($ty:ty, $field:ident) => {
        impl sealed::Stored for $ty {
            fn storage(world: &World) -> &BTreeMap<EntityId, Self> {
                &world.$field
            }
            fn storage_mut(world: &mut World) -> &mut BTreeMap<EntityId, Self> {
                &mut world.$field
            }
        }
    };
}

stored!(Name, names);
stored!(Position, positions);
stored!(Rotation, rotations);
stored!(Scale, scales);
stored!(VertexArray, vertex_arrays);
stored!(VertexBuffers, vertex_buffers);
stored!(IndexBuffer, index_buffers);

impl Component for Name {
    const KIND: ComponentKind = ComponentKind::Name;
}

impl Component for Position {
    const KIND: ComponentKind = ComponentKind::Position;
}

impl Component for Rotation {
    const KIND: ComponentKind = ComponentKind::Rotation;
}

impl Component for Scale {
    const KIND: ComponentKind = ComponentKind::Scale;
}

impl Component for VertexArray {
    const KIND: ComponentKind = ComponentKind::VertexArray;

    fn gpu_handles(&self) -> Vec<GpuHandle> {
        vec![self.handle]
    }
}

impl Component for VertexBuffers {
    const KIND: ComponentKind = ComponentKind::VertexBuffers;

    fn gpu_handles(&self) -> Vec<GpuHandle> {
        self.iter().map(|(_, h)| h).collect()
    }
}

impl Component for IndexBuffer {
    const KIND: ComponentKind = ComponentKind::IndexBuffer;

    fn gpu_handles(&self) -> Vec<GpuHandle> {
        vec![self.handle]
    }
}

/// Entity world shared between the host and the loaded scene.
///
/// Component storages are BTreeMaps keyed by entity, so every query iterates
/// in the same order. All structural mutations append to the event log.
#[derive(Debug, Default)]
pub struct World {
    entities: BTreeSet<EntityId>,
    names: BTreeMap<EntityId, Name>,
    positions: BTreeMap<EntityId, Position>,
    rotations: BTreeMap<EntityId, Rotation>,
    scales: BTreeMap<EntityId, Scale>,
    vertex_arrays: BTreeMap<EntityId, VertexArray>,
    vertex_buffers: BTreeMap<EntityId, VertexBuffers>,
    index_buffers: BTreeMap<EntityId, IndexBuffer>,
    events: Vec<WorldEvent>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty entity.
    pub fn create(&mut self) -> EntityId {
        let entity = EntityId::new();
        self.entities.insert(entity);
        self.events.push(WorldEvent::Created { entity });
        entity
    }

    /// Destroy an entity and every component attached to it.
    /// Returns false if the entity did not exist.
    pub fn destroy(&mut self, entity: EntityId) -> bool {
        if !self.entities.remove(&entity) {
            return false;
        }
        self.remove::<Name>(entity);
        self.remove::<Position>(entity);
        self.remove::<Rotation>(entity);
        self.remove::<Scale>(entity);
        self.remove::<IndexBuffer>(entity);
        self.remove::<VertexBuffers>(entity);
        self.remove::<VertexArray>(entity);
        self.events.push(WorldEvent::Destroyed { entity });
        tracing::trace!("destroyed entity {entity}");
        true
    }

    /// Destroy every entity in `entities`, skipping ids that are already gone.
    pub fn destroy_all(&mut self, entities: impl IntoIterator<Item = EntityId>) {
        for entity in entities {
            self.destroy(entity);
        }
    }

    /// Destroy every entity in the world.
    pub fn clear(&mut self) {
        let all: Vec<EntityId> = self.entities.iter().copied().collect();
        self.destroy_all(all);
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains(&entity)
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All live entities in canonical order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().copied()
    }

    /// Attach or replace a component. GPU handles held by a replaced value
    /// and not carried over by the new one are released.
    ///
    /// Returns false, attaching nothing, if the entity does not exist.
    pub fn insert<T: Component>(&mut self, entity: EntityId, value: T) -> bool {
        if !self.entities.contains(&entity) {
            tracing::warn!("insert {:?} on unknown entity {entity}", T::KIND);
            return false;
        }
        let kept = value.gpu_handles();
        match T::storage_mut(self).insert(entity, value) {
            Some(old) => {
                for handle in old.gpu_handles() {
                    if !kept.contains(&handle) {
                        self.events
                            .push(WorldEvent::ResourceReleased { entity, handle });
                    }
                }
            }
            None => self.events.push(WorldEvent::ComponentAdded {
                entity,
                kind: T::KIND,
            }),
        }
        true
    }

    /// Detach a component, releasing any GPU handles it held.
    pub fn remove<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        let removed = T::storage_mut(self).remove(&entity)?;
        for handle in removed.gpu_handles() {
            self.events
                .push(WorldEvent::ResourceReleased { entity, handle });
        }
        self.events.push(WorldEvent::ComponentRemoved {
            entity,
            kind: T::KIND,
        });
        Some(removed)
    }

    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        T::storage(self).get(&entity)
    }

    /// The component if present, otherwise its default.
    pub fn get_or_default<T: Component + Default>(&self, entity: EntityId) -> T {
        self.get::<T>(entity).cloned().unwrap_or_default()
    }

    pub fn has<T: Component>(&self, entity: EntityId) -> bool {
        T::storage(self).contains_key(&entity)
    }

    /// Mutate a component in place. Returns false if it is not attached.
    pub fn patch<T: Component>(&mut self, entity: EntityId, f: impl FnOnce(&mut T)) -> bool {
        match T::storage_mut(self).get_mut(&entity) {
            Some(value) => {
                f(value);
                true
            }
            None => false,
        }
    }

    /// Apply `f` to every attached component of type `T`.
    pub fn patch_all<T: Component>(&mut self, mut f: impl FnMut(EntityId, &mut T)) {
        for (entity, value) in T::storage_mut(self).iter_mut() {
            f(*entity, value);
        }
    }

    /// Every entity carrying `T`, exactly once, with its component.
    pub fn view<T: Component>(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        T::storage(self).iter().map(|(e, v)| (*e, v))
    }

    /// Number of entities carrying `T`.
    pub fn count<T: Component>(&self) -> usize {
        T::storage(self).len()
    }

    /// Read-only access to the pending event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.events
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }
}
