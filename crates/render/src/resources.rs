use crate::device::{GpuDevice, RenderError};
use scenehost_ecs::{
    Attribute, DisplayMode, EntityId, GpuHandle, IndexBuffer, VertexArray, VertexBuffers, World,
    WorldEvent,
};

/// Attach a fresh vertex array to `entity`, replacing (and releasing) any
/// existing one.
pub fn emplace_vertex_array(
    world: &mut World,
    gpu: &mut dyn GpuDevice,
    entity: EntityId,
) -> Result<VertexArray, RenderError> {
    if !world.contains(entity) {
        return Err(RenderError::UnknownEntity(entity));
    }
    let vao = VertexArray {
        handle: gpu.create_vertex_array(),
        mode: DisplayMode::default(),
        count: 0,
    };
    tracing::trace!("vertex array {:?} emplaced on {entity}", vao.handle);
    world.insert(entity, vao);
    Ok(vao)
}

fn vertex_array_of(
    world: &mut World,
    gpu: &mut dyn GpuDevice,
    entity: EntityId,
) -> Result<VertexArray, RenderError> {
    match world.get::<VertexArray>(entity) {
        Some(vao) => Ok(*vao),
        None => emplace_vertex_array(world, gpu, entity),
    }
}

/// Upload `data` for `attribute`, creating the entity's vertex array if it
/// has none. The vertex count becomes `data.len() / components`.
pub fn emplace_vertex_buffer(
    world: &mut World,
    gpu: &mut dyn GpuDevice,
    entity: EntityId,
    attribute: Attribute,
    data: &[f32],
    components: u32,
) -> Result<GpuHandle, RenderError> {
    if components == 0 || data.len() % components as usize != 0 {
        return Err(RenderError::InvalidLayout {
            len: data.len(),
            components,
        });
    }
    let vao = vertex_array_of(world, gpu, entity)?;
    let handle = gpu.create_vertex_buffer(vao.handle, attribute, data, components);
    tracing::trace!(
        "vertex buffer {handle:?} ({}) emplaced on {entity}",
        attribute.name()
    );

    let count = (data.len() / components as usize) as u32;
    world.patch::<VertexArray>(entity, |vao| vao.count = count);

    let mut buffers = world.get_or_default::<VertexBuffers>(entity);
    buffers.insert(attribute, handle);
    world.insert(entity, buffers);
    Ok(handle)
}

/// Upload an element buffer, creating the vertex array if needed. Its
/// presence switches the entity to indexed drawing.
pub fn emplace_index_buffer(
    world: &mut World,
    gpu: &mut dyn GpuDevice,
    entity: EntityId,
    indices: &[u32],
) -> Result<GpuHandle, RenderError> {
    let vao = vertex_array_of(world, gpu, entity)?;
    let handle = gpu.create_index_buffer(vao.handle, indices);
    tracing::trace!("index buffer {handle:?} emplaced on {entity}");
    world.insert(
        entity,
        IndexBuffer {
            handle,
            count: indices.len() as u32,
        },
    );
    Ok(handle)
}

/// Drain the world's event log and release every GPU handle it reports as
/// dropped. Returns how many handles were released.
pub fn release_dropped_resources(world: &mut World, gpu: &mut dyn GpuDevice) -> usize {
    let mut released = 0;
    for event in world.drain_events() {
        if let WorldEvent::ResourceReleased { entity, handle } = event {
            tracing::trace!("releasing {handle:?} of {entity}");
            gpu.release(handle);
            released += 1;
        }
    }
    released
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::RecordingDevice;

    const TRIANGLE: [f32; 9] = [-0.5, -0.5, 0.0, 0.5, -0.5, 0.0, 0.0, 0.5, 0.0];

    #[test]
    fn vertex_buffer_creates_vertex_array_implicitly() {
        let mut world = World::new();
        let mut gpu = RecordingDevice::new();
        let e = world.create();

        let vbo =
            emplace_vertex_buffer(&mut world, &mut gpu, e, Attribute::Position, &TRIANGLE, 3)
                .unwrap();
        let vao = *world.get::<VertexArray>(e).unwrap();
        assert_eq!(vao.count, 3);
        assert_eq!(vao.mode, DisplayMode::Triangles);
        assert_eq!(
            world.get::<VertexBuffers>(e).unwrap().get(Attribute::Position),
            Some(vbo)
        );
        assert_eq!(gpu.live(), 2);
    }

    #[test]
    fn second_buffer_reuses_vertex_array() {
        let mut world = World::new();
        let mut gpu = RecordingDevice::new();
        let e = world.create();

        emplace_vertex_buffer(&mut world, &mut gpu, e, Attribute::Position, &TRIANGLE, 3).unwrap();
        let vao = world.get::<VertexArray>(e).unwrap().handle;
        let colors = [1.0; 12];
        emplace_vertex_buffer(&mut world, &mut gpu, e, Attribute::Color, &colors, 4).unwrap();

        assert_eq!(world.get::<VertexArray>(e).unwrap().handle, vao);
        assert_eq!(world.get::<VertexArray>(e).unwrap().count, 3);
        assert_eq!(world.get::<VertexBuffers>(e).unwrap().len(), 2);
        assert_eq!(gpu.live(), 3);
    }

    #[test]
    fn bad_layout_is_rejected_before_allocating() {
        let mut world = World::new();
        let mut gpu = RecordingDevice::new();
        let e = world.create();
        let err = emplace_vertex_buffer(&mut world, &mut gpu, e, Attribute::Position, &[0.0; 4], 3);
        assert!(matches!(err, Err(RenderError::InvalidLayout { len: 4, components: 3 })));
        let err = emplace_vertex_buffer(&mut world, &mut gpu, e, Attribute::Position, &[], 0);
        assert!(matches!(err, Err(RenderError::InvalidLayout { .. })));
        assert_eq!(gpu.live(), 0);
    }

    #[test]
    fn unknown_entity_allocates_nothing() {
        let mut world = World::new();
        let mut gpu = RecordingDevice::new();
        let ghost = EntityId::new();
        let err = emplace_index_buffer(&mut world, &mut gpu, ghost, &[0, 1, 2]);
        assert!(matches!(err, Err(RenderError::UnknownEntity(id)) if id == ghost));
        assert_eq!(gpu.live(), 0);
    }

    #[test]
    fn index_buffer_records_count() {
        let mut world = World::new();
        let mut gpu = RecordingDevice::new();
        let e = world.create();
        emplace_index_buffer(&mut world, &mut gpu, e, &[0, 1, 2, 2, 3, 0]).unwrap();
        assert_eq!(world.get::<IndexBuffer>(e).unwrap().count, 6);
        assert!(world.has::<VertexArray>(e));
    }

    #[test]
    fn destroyed_entities_release_each_handle_exactly_once() {
        let mut world = World::new();
        let mut gpu = RecordingDevice::new();
        let e = world.create();
        emplace_vertex_buffer(&mut world, &mut gpu, e, Attribute::Position, &TRIANGLE, 3).unwrap();
        emplace_vertex_buffer(&mut world, &mut gpu, e, Attribute::Color, &[0.5; 12], 4).unwrap();
        emplace_index_buffer(&mut world, &mut gpu, e, &[0, 1, 2]).unwrap();
        assert_eq!(gpu.live(), 4);

        world.destroy(e);
        assert_eq!(release_dropped_resources(&mut world, &mut gpu), 4);
        assert_eq!(gpu.live(), 0);
        assert_eq!(release_dropped_resources(&mut world, &mut gpu), 0);
        assert_eq!(gpu.double_releases(), 0);
    }

    #[test]
    fn replacing_a_buffer_releases_the_old_one() {
        let mut world = World::new();
        let mut gpu = RecordingDevice::new();
        let e = world.create();
        let first =
            emplace_vertex_buffer(&mut world, &mut gpu, e, Attribute::Position, &TRIANGLE, 3)
                .unwrap();
        emplace_vertex_buffer(&mut world, &mut gpu, e, Attribute::Position, &TRIANGLE, 3).unwrap();

        assert_eq!(release_dropped_resources(&mut world, &mut gpu), 1);
        assert!(!gpu.is_live(first));
        assert_eq!(gpu.live(), 2);
    }
}
