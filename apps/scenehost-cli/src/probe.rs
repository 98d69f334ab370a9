use scenehost_api::{Scene, SceneContext};
use scenehost_ecs::World;
use scenehost_input::{Event, EventPipeline, ManualClock};
use scenehost_render::{RecordingDevice, RenderDispatcher, RenderError, release_dropped_resources};
use serde::Serialize;
use std::time::Duration;

/// What a headless run of a scene did.
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub module: String,
    pub category: String,
    pub frames: u32,
    pub entities: usize,
    pub draws: Vec<usize>,
    pub indexed_draws: usize,
    pub live_resources: usize,
    pub live_after_teardown: usize,
    pub double_releases: usize,
    pub history: Vec<Event>,
}

/// Drive `scene` through create, `frames` fixed ticks and destroy against a
/// recording backend.
pub fn run(
    scene: &mut dyn Scene,
    module: &str,
    category: &str,
    frames: u32,
    frame_time: Duration,
) -> Result<ProbeReport, RenderError> {
    let mut world = World::new();
    let mut gpu = RecordingDevice::new();
    let mut dispatcher = RenderDispatcher::new();
    let mut pipeline = EventPipeline::with_clock(ManualClock::new());
    pipeline.attach_window();

    scene.on_create(&mut SceneContext::new(&mut world, &mut gpu))?;
    let entities = world.len();

    let mut draws = Vec::with_capacity(frames as usize);
    let mut indexed_draws = 0;
    let mut frame = 0;
    while frame < frames {
        if pipeline.pending() == 0 {
            pipeline.clock().advance(frame_time);
        }
        let event = pipeline.next();
        let Some(elapsed) = event.elapsed() else {
            tracing::debug!("probe: {event}");
            continue;
        };
        frame += 1;

        scene.on_update(&mut SceneContext::new(&mut world, &mut gpu), elapsed)?;
        release_dropped_resources(&mut world, &mut gpu);
        gpu.clear_draws();
        draws.push(dispatcher.draw(&world, &mut gpu)?);
        indexed_draws += gpu.draws().iter().filter(|d| d.indexed).count();
    }
    let live_resources = gpu.live();

    scene.on_destroy(&mut SceneContext::new(&mut world, &mut gpu));
    world.clear();
    release_dropped_resources(&mut world, &mut gpu);

    Ok(ProbeReport {
        module: module.to_string(),
        category: category.to_string(),
        frames,
        entities,
        draws,
        indexed_draws,
        live_resources,
        live_after_teardown: gpu.live(),
        double_releases: gpu.double_releases(),
        history: pipeline.history().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenehost_ecs::{Attribute, Position};
    use scenehost_render::emplace_vertex_buffer;

    /// Two triangles; one is dropped on the first update.
    #[derive(Default)]
    struct Shrinking {
        spare: Option<scenehost_ecs::EntityId>,
    }

    impl Scene for Shrinking {
        fn on_create(&mut self, ctx: &mut SceneContext<'_>) -> Result<(), RenderError> {
            for i in 0..2 {
                let e = ctx.world.create();
                emplace_vertex_buffer(ctx.world, ctx.gpu, e, Attribute::Position, &[0.0; 9], 3)?;
                ctx.world.insert(e, Position(glam::Vec3::X * i as f32));
                self.spare = Some(e);
            }
            Ok(())
        }

        fn on_update(
            &mut self,
            ctx: &mut SceneContext<'_>,
            _elapsed: Duration,
        ) -> Result<(), RenderError> {
            if let Some(e) = self.spare.take() {
                ctx.world.destroy(e);
            }
            Ok(())
        }

        fn on_destroy(&mut self, _ctx: &mut SceneContext<'_>) {}
    }

    #[test]
    fn probe_runs_requested_frames_and_tears_down() {
        let mut scene = Shrinking::default();
        let report = run(&mut scene, "shrinking", "scene", 3, Duration::from_millis(16)).unwrap();

        assert_eq!(report.entities, 2);
        assert_eq!(report.draws, vec![1, 1, 1]);
        assert_eq!(report.indexed_draws, 0);
        assert_eq!(report.live_resources, 2);
        assert_eq!(report.live_after_teardown, 0);
        assert_eq!(report.double_releases, 0);
        // WindowOpened, then one coalesced run of ticks.
        assert_eq!(
            report.history,
            vec![
                Event::TimeElapsed(Duration::ZERO),
                Event::WindowOpened,
                Event::TimeElapsed(Duration::from_millis(48)),
            ]
        );
    }
}
