use crate::camera::{Matrix, OrbitCamera};
use crate::device::{DrawCall, GpuDevice, RenderError};
use glam::Mat4;
use scenehost_ecs::{DisplayMode, IndexBuffer, Position, Rotation, Scale, VertexArray, World};

/// `Translate · RotateX · RotateY · RotateZ · Scale`, rotation in degrees.
pub fn model_matrix(position: Position, rotation: Rotation, scale: Scale) -> Mat4 {
    let r = rotation.0;
    Mat4::from_translation(position.0)
        * Mat4::from_rotation_x(r.x.to_radians())
        * Mat4::from_rotation_y(r.y.to_radians())
        * Mat4::from_rotation_z(r.z.to_radians())
        * Mat4::from_scale(scale.0)
}

/// Switch every vertex array in the world to `mode`.
pub fn set_display_mode_all(world: &mut World, mode: DisplayMode) {
    world.patch_all::<VertexArray>(|_, vao| vao.mode = mode);
}

/// Walks renderable entities and emits one draw per vertex array.
///
/// An entity is renderable iff it carries a [`VertexArray`]. Missing
/// transform components fall back to their identity defaults, so entities
/// are never skipped or repeated based on which of them they carry.
#[derive(Debug, Default)]
pub struct RenderDispatcher {
    last_draws: usize,
}

impl RenderDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws submitted by the most recent [`render`](Self::render).
    pub fn last_draws(&self) -> usize {
        self.last_draws
    }

    /// Build every draw call and hand it to `submit`, stopping at the first
    /// error. Returns the number of submitted draws.
    pub fn render<E>(
        &mut self,
        world: &World,
        mut submit: impl FnMut(DrawCall) -> Result<(), E>,
    ) -> Result<usize, E> {
        let mut submitted = 0;
        for (entity, vao) in world.view::<VertexArray>() {
            let model = model_matrix(
                world.get_or_default::<Position>(entity),
                world.get_or_default::<Rotation>(entity),
                world.get_or_default::<Scale>(entity),
            );
            let (count, indexed) = match world.get::<IndexBuffer>(entity) {
                Some(ebo) => (ebo.count, true),
                None => (vao.count, false),
            };
            submit(DrawCall {
                model,
                vao: vao.handle,
                mode: vao.mode,
                count,
                indexed,
            })?;
            submitted += 1;
        }
        self.last_draws = submitted;
        Ok(submitted)
    }

    /// Render straight into a backend.
    pub fn draw(&mut self, world: &World, gpu: &mut dyn GpuDevice) -> Result<usize, RenderError> {
        self.render(world, |call| gpu.draw(&call))
    }

    /// Upload the camera matrices whose dirty flag is set, then clear it.
    pub fn sync_camera(
        &self,
        camera: &mut OrbitCamera,
        gpu: &mut dyn GpuDevice,
    ) -> Result<(), RenderError> {
        if camera.is_dirty(Matrix::View) {
            gpu.set_uniform("view", camera.view())?;
            camera.set_dirty(Matrix::View, false);
        }
        if camera.is_dirty(Matrix::Projection) {
            gpu.set_uniform("projection", camera.projection())?;
            camera.set_dirty(Matrix::Projection, false);
        }
        Ok(())
    }
}
