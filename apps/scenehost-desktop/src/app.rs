use crate::HostConfig;
use crate::platform::{self, PlatformState};
use crate::ui::{DebugUi, UiFrame};
use anyhow::{Context as _, Result};
use egui::Context as EguiContext;
use glam::{Vec2, Vec3};
use scenehost_api::SceneContext;
use scenehost_dll::{ModuleRef, PluginLoader};
use scenehost_ecs::World;
use scenehost_input::{Event, EventPipeline, JoystickAxis, MouseButton};
use scenehost_render::{Matrix, OrbitCamera, RenderDispatcher, release_dropped_resources};
use scenehost_render_wgpu::WgpuDevice;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

/// Orbit speed of the auto-move toggle, in camera rotate units per second.
const AUTO_MOVE_SPEED: f32 = 0.1;
const STICK_DEADZONE: f32 = 0.15;

/// Everything tied to one window: its surface and GPU backend, its event
/// pipeline, camera and UI. Platform callbacks reach the pipeline through
/// this value rather than through process-wide state.
struct WindowContext {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    gpu: WgpuDevice,
    egui_ctx: EguiContext,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    pipeline: EventPipeline,
    camera: OrbitCamera,
    platform: PlatformState,
    /// Button held and the cursor position where it went down.
    drag: Option<(MouseButton, Vec2)>,
    stick: Vec2,
    ui: DebugUi,
}

impl WindowContext {
    fn new(event_loop: &ActiveEventLoop, host: &HostConfig) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(format!("scenehost - {}", host.module))
            .with_inner_size(PhysicalSize::new(host.width, host.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no compatible GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("scenehost_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("failed to create GPU device")?;

        let size = window.inner_size();
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(caps.formats.first())
            .copied()
            .context("surface reports no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        let egui_ctx = EguiContext::default();
        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, format, None, 1, false);
        let gpu = WgpuDevice::new(device, queue, format, config.width, config.height);

        let mut camera = OrbitCamera::new(Vec3::new(0.0, 10.0, 25.0), config.width, config.height);
        // Nothing has been uploaded yet.
        camera.set_dirty(Matrix::View, true);

        let mut pipeline = EventPipeline::new();
        pipeline.set_time_scale(host.time_scale);
        pipeline.attach_window();

        Ok(Self {
            window,
            surface,
            config,
            gpu,
            egui_ctx,
            egui_winit,
            egui_renderer,
            pipeline,
            camera,
            platform: PlatformState::default(),
            drag: None,
            stick: Vec2::ZERO,
            ui: DebugUi::new(host.show_ui),
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(self.gpu.device(), &self.config);
        self.gpu.resize(self.config.width, self.config.height);
        self.camera.set_viewport(self.config.width, self.config.height);
    }

    fn steer_camera(&mut self, dt: Duration) {
        if let Some((button, pressed_at)) = self.drag {
            let cursor = Vec2::new(self.platform.cursor.0 as f32, self.platform.cursor.1 as f32);
            self.camera.handle_mouse_drag(button, cursor, pressed_at, dt);
        }
        let seconds = dt.as_secs_f32();
        if self.ui.auto_move {
            self.camera.rotate(AUTO_MOVE_SPEED * seconds, 0.0);
        }
        if self.stick.length() > STICK_DEADZONE {
            self.camera.rotate(self.stick.x * seconds, self.stick.y * seconds);
        }
    }
}

/// The host: owns the world, the loaded scene module and at most one window.
pub struct HostApp {
    config: HostConfig,
    loader: PluginLoader,
    module: Option<ModuleRef>,
    world: World,
    dispatcher: RenderDispatcher,
    window: Option<WindowContext>,
    #[cfg(feature = "gamepad")]
    gamepads: Option<crate::gamepad::Gamepads>,
    closing: bool,
    failed: bool,
}

impl HostApp {
    pub fn new(config: HostConfig, loader: PluginLoader, module: ModuleRef) -> Self {
        Self {
            config,
            loader,
            module: Some(module),
            world: World::new(),
            dispatcher: RenderDispatcher::new(),
            window: None,
            #[cfg(feature = "gamepad")]
            gamepads: crate::gamepad::Gamepads::new()
                .inspect_err(|e| tracing::warn!("gamepad support unavailable: {e}"))
                .ok(),
            closing: false,
            failed: false,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.failed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{error:#}");
        self.failed = true;
        self.closing = true;
        event_loop.exit();
    }

    fn create_scene(&mut self) -> Result<()> {
        let (Some(ctx), Some(module)) = (self.window.as_mut(), self.module.as_ref()) else {
            return Ok(());
        };
        let mut module = module.borrow_mut();
        let name = module.name().to_string();
        if let Some(scene) = module.scene() {
            scene
                .on_create(&mut SceneContext::new(&mut self.world, &mut ctx.gpu))
                .with_context(|| format!("scene '{name}' failed to create"))?;
        }
        Ok(())
    }

    /// Pull events until the next time tick, dispatching each.
    fn pump(&mut self, event_loop: &ActiveEventLoop) {
        while !self.closing {
            let Some(ctx) = self.window.as_mut() else {
                return;
            };
            let event = ctx.pipeline.next();
            let tick = event.is_tick();
            self.dispatch(event, event_loop);
            if tick {
                break;
            }
        }
    }

    fn dispatch(&mut self, event: Event, event_loop: &ActiveEventLoop) {
        let Some(ctx) = self.window.as_mut() else {
            return;
        };
        match event {
            Event::WindowClosed => {
                tracing::info!("window closed");
                self.closing = true;
                event_loop.exit();
            }
            Event::WindowResized { width, height } => ctx.resize(width, height),
            Event::KeyPressed(key) => {
                if key.is("F1") {
                    ctx.ui.visible = !ctx.ui.visible;
                } else if key.is("Escape") {
                    ctx.pipeline.capture(Event::WindowClosed);
                }
            }
            Event::MouseButtonPressed(press) => {
                if ctx.drag.is_none() {
                    ctx.drag = Some((press.button, Vec2::new(press.x as f32, press.y as f32)));
                }
            }
            Event::MouseButtonReleased(release) => {
                if ctx.drag.is_some_and(|(button, _)| button == release.button) {
                    ctx.drag = None;
                }
            }
            Event::JoystickAxisMoved { axis, value, .. } => match axis {
                JoystickAxis::RightStickX => ctx.stick.x = value,
                JoystickAxis::RightStickY => ctx.stick.y = value,
                _ => {}
            },
            Event::JoystickConnected { id } => tracing::info!("joystick {id} connected"),
            Event::JoystickDisconnected { id } => {
                tracing::info!("joystick {id} disconnected");
                ctx.stick = Vec2::ZERO;
            }
            Event::TimeElapsed(dt) => self.update(dt),
            Event::WindowOpened
            | Event::WindowMoved { .. }
            | Event::KeyReleased(_)
            | Event::Character(_)
            | Event::MouseMoved { .. }
            | Event::JoystickButtonPressed { .. }
            | Event::JoystickButtonReleased { .. } => tracing::trace!("{event}"),
        }
    }

    fn update(&mut self, dt: Duration) {
        let Some(ctx) = self.window.as_mut() else {
            return;
        };
        ctx.steer_camera(dt);

        if let Some(module) = &self.module {
            let mut module = module.borrow_mut();
            if let Some(scene) = module.scene() {
                if let Err(e) =
                    scene.on_update(&mut SceneContext::new(&mut self.world, &mut ctx.gpu), dt)
                {
                    tracing::error!("scene update failed: {e}");
                }
            }
        }
        release_dropped_resources(&mut self.world, &mut ctx.gpu);
    }

    fn redraw(&mut self) {
        let Some(ctx) = self.window.as_mut() else {
            return;
        };

        release_dropped_resources(&mut self.world, &mut ctx.gpu);
        if let Err(e) = self.dispatcher.sync_camera(&mut ctx.camera, &mut ctx.gpu) {
            tracing::error!("camera upload failed: {e}");
        }
        let output = match ctx.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                ctx.surface.configure(ctx.gpu.device(), &ctx.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        // Queue draws only once there is a frame to encode them into.
        let draws = match self.dispatcher.draw(&self.world, &mut ctx.gpu) {
            Ok(n) => n,
            Err(e) => {
                tracing::error!("draw failed: {e}");
                0
            }
        };
        let mut encoder = ctx
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        ctx.gpu.encode_frame(&mut encoder, &view);

        let raw_input = ctx.egui_winit.take_egui_input(&ctx.window);
        let mut module = self.module.as_ref().map(|m| m.borrow_mut());
        let full_output = ctx.egui_ctx.run(raw_input, |ui_ctx| {
            ctx.ui.show(
                ui_ctx,
                UiFrame {
                    world: &mut self.world,
                    gpu: &mut ctx.gpu,
                    camera: &mut ctx.camera,
                    pipeline: &mut ctx.pipeline,
                    module: module.as_deref_mut(),
                    draws,
                },
            );
        });
        drop(module);
        ctx.egui_winit
            .handle_platform_output(&ctx.window, full_output.platform_output);

        let paint_jobs = ctx
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [ctx.config.width, ctx.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let (device, queue) = (ctx.gpu.device(), ctx.gpu.queue());
        for (id, delta) in &full_output.textures_delta.set {
            ctx.egui_renderer.update_texture(device, queue, *id, delta);
        }
        let uploads =
            ctx.egui_renderer
                .update_buffers(device, queue, &mut encoder, &paint_jobs, &screen);
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            ctx.egui_renderer.render(&mut pass, &paint_jobs, &screen);
        }
        queue.submit(uploads.into_iter().chain(std::iter::once(encoder.finish())));
        for id in &full_output.textures_delta.free {
            ctx.egui_renderer.free_texture(id);
        }

        output.present();
    }

    /// Tear down in dependency order: scene, world, GPU resources, backend,
    /// and only then the module and its library.
    fn shutdown(&mut self) {
        if let Some(mut ctx) = self.window.take() {
            if let Some(module) = &self.module {
                let mut module = module.borrow_mut();
                if let Some(scene) = module.scene() {
                    scene.on_destroy(&mut SceneContext::new(&mut self.world, &mut ctx.gpu));
                }
            }
            self.world.clear();
            let released = release_dropped_resources(&mut self.world, &mut ctx.gpu);
            tracing::debug!(
                "released {released} GPU resources, {} left",
                ctx.gpu.resource_count()
            );
        }
        self.world.clear();
        self.module = None;
        self.loader.unload_all();
        tracing::info!("scenehost stopped");
    }
}

impl ApplicationHandler for HostApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.closing {
            return;
        }
        match WindowContext::new(event_loop, &self.config) {
            Ok(ctx) => self.window = Some(ctx),
            Err(e) => return self.fail(event_loop, e),
        }
        if let Err(e) = self.create_scene() {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(ctx) = self.window.as_mut() else {
            return;
        };
        if ctx.window.id() != window_id {
            return;
        }
        if let WindowEvent::RedrawRequested = event {
            self.redraw();
            return;
        }

        let response = ctx.egui_winit.on_window_event(&ctx.window, &event);
        let always = matches!(
            event,
            WindowEvent::CloseRequested
                | WindowEvent::Resized(_)
                | WindowEvent::ModifiersChanged(_)
                | WindowEvent::MouseInput {
                    state: ElementState::Released,
                    ..
                }
        );
        if response.consumed && !always {
            return;
        }
        platform::translate(&event, &mut ctx.platform, |e| ctx.pipeline.capture(e));
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        #[cfg(feature = "gamepad")]
        if let (Some(pads), Some(ctx)) = (self.gamepads.as_mut(), self.window.as_mut()) {
            pads.poll(|e| ctx.pipeline.capture(e));
        }

        self.pump(event_loop);
        if let Some(ctx) = &self.window {
            ctx.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}
