//! egui debug panels: display mode, camera, event stats, component tree.

use egui::Context as EguiContext;
use glam::Vec3;
use scenehost_api::SceneContext;
use scenehost_dll::ModuleInstance;
use scenehost_ecs::{Component, DisplayMode, EntityId, Name, Position, Rotation, Scale, World};
use scenehost_input::EventPipeline;
use scenehost_render::{GpuDevice, OrbitCamera, set_display_mode_all};

/// Transform components edited as a single vector.
trait VectorComponent: Component + Default + Copy {
    const LABEL: &'static str;
    fn vector(&mut self) -> &mut Vec3;
}

impl VectorComponent for Position {
    const LABEL: &'static str = "Position";
    fn vector(&mut self) -> &mut Vec3 {
        &mut self.0
    }
}

impl VectorComponent for Rotation {
    const LABEL: &'static str = "Rotation";
    fn vector(&mut self) -> &mut Vec3 {
        &mut self.0
    }
}

impl VectorComponent for Scale {
    const LABEL: &'static str = "Scale";
    fn vector(&mut self) -> &mut Vec3 {
        &mut self.0
    }
}

/// Everything the panels read or edit during one frame.
pub struct UiFrame<'a> {
    pub world: &'a mut World,
    pub gpu: &'a mut dyn GpuDevice,
    pub camera: &'a mut OrbitCamera,
    pub pipeline: &'a mut EventPipeline,
    /// The loaded module, for its own panels.
    pub module: Option<&'a mut ModuleInstance>,
    pub draws: usize,
}

pub struct DebugUi {
    pub visible: bool,
    /// Orbit the camera on every tick.
    pub auto_move: bool,
    display_mode: DisplayMode,
    selected: Option<EntityId>,
}

impl DebugUi {
    pub fn new(visible: bool) -> Self {
        Self {
            visible,
            auto_move: false,
            display_mode: DisplayMode::default(),
            selected: None,
        }
    }

    pub fn show(&mut self, ctx: &EguiContext, frame: UiFrame<'_>) {
        if !self.visible {
            return;
        }
        let UiFrame {
            world,
            gpu,
            camera,
            pipeline,
            module,
            draws,
        } = frame;

        egui::SidePanel::left("debug")
            .default_width(300.0)
            .show(ctx, |ui| {
                ui.heading("scenehost");
                ui.label(format!("Entities: {}  Draws: {draws}", world.len()));
                ui.separator();

                self.display_mode_combo(ui, world);
                ui.separator();

                ui.collapsing("Camera", |ui| self.camera_widget(ui, camera));
                ui.collapsing("Events", |ui| events_widget(ui, pipeline));
                ui.separator();

                ui.heading("Entities");
                egui::ScrollArea::vertical().show(ui, |ui| self.component_tree(ui, world));

                ui.separator();
                ui.small("F1: toggle panel | LMB: orbit | MMB: zoom | RMB: pan");
            });

        if let Some(scene) = module.and_then(|m| m.scene()) {
            scene.on_draw_ui(&mut SceneContext::new(world, gpu), ctx);
        }
    }

    fn display_mode_combo(&mut self, ui: &mut egui::Ui, world: &mut World) {
        let before = self.display_mode;
        egui::ComboBox::from_label("Display mode")
            .selected_text(self.display_mode.name())
            .show_ui(ui, |ui| {
                for mode in DisplayMode::ALL {
                    ui.selectable_value(&mut self.display_mode, mode, mode.name());
                }
            });
        if self.display_mode != before {
            set_display_mode_all(world, self.display_mode);
        }
    }

    fn camera_widget(&mut self, ui: &mut egui::Ui, camera: &mut OrbitCamera) {
        let mut fov = camera.fov();
        if ui
            .add(egui::Slider::new(&mut fov, 10.0..=120.0).text("fov"))
            .changed()
        {
            camera.set_fov(fov);
        }
        let mut near = camera.near();
        if ui
            .add(egui::DragValue::new(&mut near).prefix("near: ").speed(0.01).range(0.001..=10.0))
            .changed()
        {
            camera.set_near(near);
        }
        let mut far = camera.far();
        if ui
            .add(egui::DragValue::new(&mut far).prefix("far: ").speed(1.0).range(1.0..=10_000.0))
            .changed()
        {
            camera.set_far(far);
        }

        let mut position = camera.position();
        ui.label("Position:");
        if vec3_row(ui, &mut position) {
            camera.set_position(position);
        }
        let target = camera.target();
        ui.label(format!(
            "Target: ({:.1}, {:.1}, {:.1})",
            target.x, target.y, target.z
        ));
        ui.checkbox(&mut self.auto_move, "auto-move");
    }

    fn component_tree(&mut self, ui: &mut egui::Ui, world: &mut World) {
        let entities: Vec<EntityId> = world.entities().collect();
        for id in entities {
            let label = world
                .get::<Name>(id)
                .map(|n| n.0.clone())
                .unwrap_or_else(|| id.short());
            let selected = self.selected == Some(id);
            if ui.selectable_label(selected, label).clicked() {
                self.selected = if selected { None } else { Some(id) };
            }
            if self.selected == Some(id) {
                ui.indent(id, |ui| {
                    vector_component::<Position>(ui, world, id);
                    vector_component::<Rotation>(ui, world, id);
                    vector_component::<Scale>(ui, world, id);
                });
            }
        }
    }
}

fn events_widget(ui: &mut egui::Ui, pipeline: &mut EventPipeline) {
    ui.label(format!("History entries: {}", pipeline.history().len()));
    ui.label(format!("Pending: {}", pipeline.pending()));
    ui.label(format!("Elapsed: {:.2?}", pipeline.total_elapsed()));
    ui.label(format!("Last: {}", pipeline.last_event()));
    let mut scale = pipeline.time_scale();
    if ui
        .add(egui::Slider::new(&mut scale, 0.0..=4.0).text("time scale"))
        .changed()
    {
        pipeline.set_time_scale(scale);
    }
}

fn vector_component<T: VectorComponent>(ui: &mut egui::Ui, world: &mut World, id: EntityId) {
    match world.get::<T>(id).copied() {
        Some(mut value) => {
            let removed = ui
                .horizontal(|ui| {
                    ui.label(T::LABEL);
                    ui.small_button("remove").clicked()
                })
                .inner;
            if removed {
                world.remove::<T>(id);
            } else if vec3_row(ui, value.vector()) {
                world.insert(id, value);
            }
        }
        None => {
            if ui.small_button(format!("add {}", T::LABEL)).clicked() {
                world.insert(id, T::default());
            }
        }
    }
}

fn vec3_row(ui: &mut egui::Ui, v: &mut Vec3) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        changed |= ui.add(egui::DragValue::new(&mut v.x).prefix("X: ").speed(0.1)).changed();
        changed |= ui.add(egui::DragValue::new(&mut v.y).prefix("Y: ").speed(0.1)).changed();
        changed |= ui.add(egui::DragValue::new(&mut v.z).prefix("Z: ").speed(0.1)).changed();
    });
    changed
}
