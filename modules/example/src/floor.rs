use crate::data;
use glam::{Vec3, Vec4};
use scenehost_api::SceneContext;
use scenehost_ecs::{Attribute, EntityId, Name, Position, Rotation, Scale};
use scenehost_render::{RenderError, emplace_index_buffer, emplace_vertex_buffer};

/// A square grid of alternating dark and light tiles on the XZ plane.
#[derive(Debug, Clone)]
pub struct CheckeredFloor {
    pub tile_size: f32,
    pub tiles_per_side: u32,
    pub dark_color: Vec4,
    pub light_color: Vec4,
    tiles: Vec<EntityId>,
}

impl Default for CheckeredFloor {
    fn default() -> Self {
        Self {
            tile_size: 10.0,
            tiles_per_side: 10,
            dark_color: Vec4::new(0.3, 0.3, 0.3, 1.0),
            light_color: Vec4::new(0.7, 0.7, 0.7, 1.0),
            tiles: Vec::new(),
        }
    }
}

impl CheckeredFloor {
    /// Tiles currently in the world.
    pub fn tiles(&self) -> &[EntityId] {
        &self.tiles
    }

    /// Destroy the previous tiles and build a fresh grid with the current
    /// settings, centered on the origin.
    pub fn generate(&mut self, ctx: &mut SceneContext<'_>) -> Result<(), RenderError> {
        self.destroy(ctx);

        let n = self.tiles_per_side;
        let size = self.tile_size;
        let offset = n as f32 / 2.0;
        let dark = data::solid_color(self.dark_color.to_array(), 4);
        let light = data::solid_color(self.light_color.to_array(), 4);

        for row in 0..n {
            for col in 0..n {
                let x = col as f32 - offset;
                let z = row as f32 - offset;
                let (ix, iz) = (x.floor() as i32, z.floor() as i32);
                let colors = if is_dark(ix, iz) {
                    &dark
                } else {
                    &light
                };

                let tile = ctx.world.create();
                self.tiles.push(tile);
                emplace_vertex_buffer(
                    ctx.world,
                    ctx.gpu,
                    tile,
                    Attribute::Position,
                    &data::SQUARE_POSITIONS,
                    3,
                )?;
                emplace_vertex_buffer(ctx.world, ctx.gpu, tile, Attribute::Color, colors, 4)?;
                emplace_index_buffer(ctx.world, ctx.gpu, tile, &data::SQUARE_INDICES)?;

                ctx.world
                    .insert(tile, Position(Vec3::new((x + 0.5) * size, 0.0, (z + 0.5) * size)));
                ctx.world.insert(tile, Rotation(Vec3::new(90.0, 0.0, 0.0)));
                ctx.world.insert(tile, Scale::uniform(size));
                ctx.world.insert(tile, Name(format!("cf_{ix}_{iz}")));
            }
        }
        tracing::debug!("checkered floor: {n}x{n} tiles of {size}");
        Ok(())
    }

    /// Remove every tile from the world.
    pub fn destroy(&mut self, ctx: &mut SceneContext<'_>) {
        ctx.world.destroy_all(self.tiles.drain(..));
    }
}

/// Exactly one odd coordinate makes a dark tile.
fn is_dark(x: i32, z: i32) -> bool {
    (x % 2 != 0) != (z % 2 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenehost_ecs::{IndexBuffer, VertexArray, World};
    use scenehost_render::{RecordingDevice, release_dropped_resources};

    #[test]
    fn generates_a_named_grid() {
        let mut world = World::new();
        let mut gpu = RecordingDevice::new();
        let mut floor = CheckeredFloor::default();
        floor
            .generate(&mut SceneContext::new(&mut world, &mut gpu))
            .unwrap();

        assert_eq!(floor.tiles().len(), 100);
        assert_eq!(world.count::<VertexArray>(), 100);
        assert_eq!(world.count::<IndexBuffer>(), 100);

        let names: Vec<&str> = world.view::<Name>().map(|(_, n)| n.0.as_str()).collect();
        assert!(names.contains(&"cf_-5_-5"));
        assert!(names.contains(&"cf_4_4"));

        let corner = world
            .view::<Name>()
            .find(|(_, n)| n.0 == "cf_-5_-5")
            .map(|(e, _)| e)
            .unwrap();
        assert_eq!(
            world.get::<Position>(corner),
            Some(&Position(Vec3::new(-45.0, 0.0, -45.0)))
        );
        assert_eq!(world.get::<Scale>(corner), Some(&Scale::uniform(10.0)));
    }

    #[test]
    fn neighbouring_tiles_alternate() {
        assert!(!is_dark(0, 0));
        assert!(is_dark(1, 0));
        assert!(is_dark(0, -1));
        assert!(!is_dark(-1, -1));
        assert!(!is_dark(-5, 3));
        assert!(is_dark(-4, 3));
    }

    #[test]
    fn regenerating_replaces_previous_tiles() {
        let mut world = World::new();
        let mut gpu = RecordingDevice::new();
        let mut floor = CheckeredFloor::default();
        {
            let mut ctx = SceneContext::new(&mut world, &mut gpu);
            floor.generate(&mut ctx).unwrap();
            floor.tiles_per_side = 4;
            floor.generate(&mut ctx).unwrap();
        }
        assert_eq!(world.len(), 16);
        release_dropped_resources(&mut world, &mut gpu);
        // vertex array + position + color + index per tile
        assert_eq!(gpu.live(), 16 * 4);
        assert_eq!(gpu.double_releases(), 0);
    }
}
