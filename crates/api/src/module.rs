use egui::Context as EguiContext;
use scenehost_ecs::World;
use scenehost_render::{GpuDevice, RenderError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a loaded module provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Scene,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scene => f.write_str("scene"),
        }
    }
}

/// Host state a scene works on during one hook call.
pub struct SceneContext<'a> {
    pub world: &'a mut World,
    pub gpu: &'a mut dyn GpuDevice,
}

impl<'a> SceneContext<'a> {
    pub fn new(world: &'a mut World, gpu: &'a mut dyn GpuDevice) -> Self {
        Self { world, gpu }
    }
}

/// Lifecycle hooks of a scene module.
///
/// The host calls `on_create` once after loading, `on_update` on every
/// time tick, `on_draw_ui` once per frame while the debug UI is shown, and
/// `on_destroy` once before the world is torn down.
pub trait Scene {
    fn on_create(&mut self, ctx: &mut SceneContext<'_>) -> Result<(), RenderError>;

    fn on_update(&mut self, ctx: &mut SceneContext<'_>, elapsed: Duration)
    -> Result<(), RenderError>;

    fn on_destroy(&mut self, ctx: &mut SceneContext<'_>);

    fn on_draw_ui(&mut self, _ctx: &mut SceneContext<'_>, _ui: &EguiContext) {}
}

/// A dynamically loaded unit of functionality.
pub trait Module {
    /// Diagnostic name.
    fn name(&self) -> &str;

    fn category(&self) -> Category;

    /// The scene capability, if this module has one.
    fn as_scene_mut(&mut self) -> Option<&mut dyn Scene> {
        None
    }
}
