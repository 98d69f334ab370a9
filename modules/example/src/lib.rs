//! Example scene module: a checkered floor, a row of coloured triangles and
//! a spinning indexed cube.
//!
//! Built as a `cdylib` the host loads at runtime; also built as an `rlib`
//! so the scene can be exercised in-process.

mod data;
mod floor;

pub use floor::CheckeredFloor;

use glam::Vec3;
use scenehost_api::{Category, Module, Scene, SceneContext};
use scenehost_ecs::{Attribute, EntityId, Name, Position, Rotation, Scale};
use scenehost_render::{RenderError, emplace_index_buffer, emplace_vertex_buffer};
use std::time::Duration;

const TRIANGLES: usize = 10;
/// Degrees per second.
const CUBE_SPIN: f32 = 45.0;

#[derive(Debug, Default)]
pub struct ExampleScene {
    floor: CheckeredFloor,
    triangles: Vec<EntityId>,
    cube: Option<EntityId>,
    spinning: bool,
    elapsed: Duration,
}

impl ExampleScene {
    pub fn floor(&self) -> &CheckeredFloor {
        &self.floor
    }

    pub fn triangles(&self) -> &[EntityId] {
        &self.triangles
    }

    pub fn cube(&self) -> Option<EntityId> {
        self.cube
    }

    /// Total time the scene has been updated for.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    fn create_triangles(&mut self, ctx: &mut SceneContext<'_>) -> Result<(), RenderError> {
        for i in 0..TRIANGLES {
            let e = ctx.world.create();
            self.triangles.push(e);
            emplace_vertex_buffer(
                ctx.world,
                ctx.gpu,
                e,
                Attribute::Position,
                &data::TRIANGLE_POSITIONS,
                3,
            )?;
            emplace_vertex_buffer(
                ctx.world,
                ctx.gpu,
                e,
                Attribute::Color,
                &data::TRIANGLE_COLORS,
                4,
            )?;

            let f = i as f32;
            ctx.world.insert(e, Position(Vec3::new(f * 1.5, 0.0, 0.0)));
            ctx.world.insert(e, Rotation(Vec3::splat(f * 10.0)));
            ctx.world.insert(e, Scale::uniform(f));
            ctx.world.insert(e, Name(format!("triangle_{i}")));
        }
        Ok(())
    }

    fn create_cube(&mut self, ctx: &mut SceneContext<'_>) -> Result<(), RenderError> {
        let e = ctx.world.create();
        self.cube = Some(e);
        emplace_vertex_buffer(
            ctx.world,
            ctx.gpu,
            e,
            Attribute::Position,
            &data::CUBE_POSITIONS,
            3,
        )?;
        emplace_vertex_buffer(
            ctx.world,
            ctx.gpu,
            e,
            Attribute::Color,
            &data::CUBE_COLORS,
            4,
        )?;
        emplace_index_buffer(ctx.world, ctx.gpu, e, &data::CUBE_INDICES)?;

        ctx.world.insert(e, Position(Vec3::new(0.0, 2.0, -5.0)));
        ctx.world.insert(e, Rotation::default());
        ctx.world.insert(e, Scale::uniform(2.0));
        ctx.world.insert(e, Name("cube".to_string()));
        Ok(())
    }
}

impl Scene for ExampleScene {
    fn on_create(&mut self, ctx: &mut SceneContext<'_>) -> Result<(), RenderError> {
        self.floor.generate(ctx)?;
        self.create_triangles(ctx)?;
        self.create_cube(ctx)?;
        self.spinning = true;
        tracing::info!("example scene created: {} entities", ctx.world.len());
        Ok(())
    }

    fn on_update(
        &mut self,
        ctx: &mut SceneContext<'_>,
        elapsed: Duration,
    ) -> Result<(), RenderError> {
        self.elapsed += elapsed;
        if let (true, Some(cube)) = (self.spinning, self.cube) {
            let step = CUBE_SPIN * elapsed.as_secs_f32();
            ctx.world.patch::<Rotation>(cube, |r| r.0.y = (r.0.y + step) % 360.0);
        }
        Ok(())
    }

    fn on_destroy(&mut self, ctx: &mut SceneContext<'_>) {
        self.floor.destroy(ctx);
        ctx.world.destroy_all(self.triangles.drain(..));
        ctx.world.destroy_all(self.cube.take());
        tracing::info!("example scene destroyed");
    }

    fn on_draw_ui(&mut self, ctx: &mut SceneContext<'_>, ui: &egui::Context) {
        let mut regenerate = false;
        egui::Window::new("Checkered floor")
            .default_open(false)
            .show(ui, |ui| {
                ui.add(egui::Slider::new(&mut self.floor.tile_size, 0.5..=50.0).text("tile size"));
                ui.add(
                    egui::Slider::new(&mut self.floor.tiles_per_side, 1..=64).text("tiles per side"),
                );
                color_edit(ui, "dark", &mut self.floor.dark_color);
                color_edit(ui, "light", &mut self.floor.light_color);
                regenerate = ui.button("Regenerate").clicked();
                ui.separator();
                ui.checkbox(&mut self.spinning, "spin cube");
            });
        if regenerate {
            if let Err(e) = self.floor.generate(ctx) {
                tracing::error!("floor regeneration failed: {e}");
            }
        }
    }
}

fn color_edit(ui: &mut egui::Ui, label: &str, color: &mut glam::Vec4) {
    let mut rgba = color.to_array();
    ui.horizontal(|ui| {
        ui.label(label);
        ui.color_edit_button_rgba_unmultiplied(&mut rgba);
    });
    *color = glam::Vec4::from_array(rgba);
}

impl Module for ExampleScene {
    fn name(&self) -> &str {
        "Example"
    }

    fn category(&self) -> Category {
        Category::Scene
    }

    fn as_scene_mut(&mut self) -> Option<&mut dyn Scene> {
        Some(self)
    }
}

scenehost_api::declare_module!(ExampleScene::default());
