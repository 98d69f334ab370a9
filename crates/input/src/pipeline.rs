use crate::clock::{Clock, SystemClock};
use crate::event::Event;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Turns platform callbacks into an ordered stream of events.
///
/// Platform callbacks push into the queue with [`capture`](Self::capture);
/// the loop pulls with [`next`](Self::next). When nothing is queued, `next`
/// samples the clock and yields a `TimeElapsed` tick, so the stream never
/// runs dry.
///
/// Every delivered event is also folded into a history log. Consecutive
/// ticks are merged into one entry whose duration is their sum; discrete
/// events are always appended. The log starts with `TimeElapsed(0)`.
///
/// One pipeline serves one window. The host owns it alongside the window it
/// listens to, and routes callbacks to it explicitly.
#[derive(Debug)]
pub struct EventPipeline<C: Clock = SystemClock> {
    queue: VecDeque<Event>,
    history: Vec<Event>,
    last_sampled: Instant,
    time_scale: f64,
    clock: C,
}

impl EventPipeline<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for EventPipeline<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> EventPipeline<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            queue: VecDeque::new(),
            history: vec![Event::TimeElapsed(Duration::ZERO)],
            last_sampled: clock.now(),
            time_scale: 1.0,
            clock,
        }
    }

    /// Announce the window this pipeline listens to. `WindowOpened` queues
    /// like any other event, behind whatever was captured before.
    pub fn attach_window(&mut self) {
        self.capture(Event::WindowOpened);
    }

    /// Queue a platform event behind everything already captured.
    pub fn capture(&mut self, event: Event) {
        tracing::trace!("captured {}", event.name());
        self.queue.push_back(event);
    }

    /// The oldest captured event, or a fresh tick if none is pending.
    pub fn next(&mut self) -> Event {
        let event = match self.queue.pop_front() {
            Some(event) => event,
            None => Event::TimeElapsed(self.sample_elapsed()),
        };
        self.record(&event);
        event
    }

    /// Restart elapsed-time measurement from now, e.g. after a long stall
    /// the next tick should not account for.
    pub fn reset_clock(&mut self) {
        self.last_sampled = self.clock.now();
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Set the multiplier applied to sampled wall-clock time.
    /// Negative or non-finite values are ignored.
    pub fn set_time_scale(&mut self, scale: f64) {
        if !scale.is_finite() || scale < 0.0 {
            tracing::warn!("ignoring invalid time scale {scale}");
            return;
        }
        self.time_scale = scale;
    }

    /// Coalesced record of delivered events, oldest first.
    pub fn history(&self) -> &[Event] {
        &self.history
    }

    /// The most recent history entry.
    pub fn last_event(&self) -> &Event {
        // Seeded with one entry and never shrinks.
        &self.history[self.history.len() - 1]
    }

    /// Total scaled time delivered through ticks.
    pub fn total_elapsed(&self) -> Duration {
        self.history.iter().filter_map(Event::elapsed).sum()
    }

    /// Number of captured events not yet delivered.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn sample_elapsed(&mut self) -> Duration {
        let now = self.clock.now();
        let raw = now.saturating_duration_since(self.last_sampled);
        self.last_sampled = now;
        // Scale whole nanoseconds so exact inputs give exact ticks.
        Duration::from_nanos((raw.as_nanos() as f64 * self.time_scale).round() as u64)
    }

    fn record(&mut self, event: &Event) {
        if let (Some(Event::TimeElapsed(total)), Event::TimeElapsed(delta)) =
            (self.history.last_mut(), event)
        {
            *total += *delta;
            return;
        }
        self.history.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::{Key, Modifiers};

    fn pipeline() -> EventPipeline<ManualClock> {
        EventPipeline::with_clock(ManualClock::new())
    }

    fn key(code: &str) -> Key {
        Key {
            modifiers: Modifiers::default(),
            scancode: 0,
            code: code.into(),
        }
    }

    #[test]
    fn history_is_seeded_with_zero_tick() {
        let p = pipeline();
        assert_eq!(p.history(), &[Event::TimeElapsed(Duration::ZERO)]);
        assert_eq!(p.total_elapsed(), Duration::ZERO);
    }

    #[test]
    fn captured_events_come_out_in_order_then_ticks() {
        let mut p = pipeline();
        let a = Event::KeyPressed(key("KeyA"));
        let b = Event::Character('a');
        p.capture(a.clone());
        p.capture(b.clone());
        assert_eq!(p.pending(), 2);

        assert_eq!(p.next(), a);
        assert_eq!(p.next(), b);

        let mut cumulative = Duration::ZERO;
        for step in 1..=5u64 {
            p.clock().advance(Duration::from_millis(step));
            let elapsed = p.next().elapsed().expect("tick once drained");
            cumulative += elapsed;
            assert_eq!(elapsed, Duration::from_millis(step));
        }
        assert_eq!(cumulative, Duration::from_millis(15));
    }

    #[test]
    fn consecutive_ticks_coalesce_in_history_only() {
        let mut p = pipeline();
        p.clock().advance(Duration::from_millis(3));
        let d1 = p.next();
        p.clock().advance(Duration::from_millis(4));
        let d2 = p.next();

        assert_eq!(d1, Event::TimeElapsed(Duration::from_millis(3)));
        assert_eq!(d2, Event::TimeElapsed(Duration::from_millis(4)));
        assert_eq!(p.history().len(), 1);
        assert_eq!(
            p.last_event(),
            &Event::TimeElapsed(Duration::from_millis(7))
        );
    }

    #[test]
    fn discrete_events_split_tick_runs() {
        let mut p = pipeline();
        p.clock().advance(Duration::from_millis(1));
        p.next();
        p.capture(Event::WindowMoved { x: 1, y: 2 });
        p.next();
        p.clock().advance(Duration::from_millis(2));
        p.next();
        p.clock().advance(Duration::from_millis(2));
        p.next();

        assert_eq!(
            p.history(),
            &[
                Event::TimeElapsed(Duration::from_millis(1)),
                Event::WindowMoved { x: 1, y: 2 },
                Event::TimeElapsed(Duration::from_millis(4)),
            ]
        );
    }

    #[test]
    fn repeated_discrete_events_are_not_merged() {
        let mut p = pipeline();
        p.capture(Event::KeyPressed(key("KeyA")));
        p.capture(Event::KeyPressed(key("KeyA")));
        p.next();
        p.next();
        assert_eq!(p.history().len(), 3);
    }

    #[test]
    fn attach_window_keeps_capture_order() {
        let mut p = pipeline();
        p.capture(Event::WindowResized {
            width: 10,
            height: 10,
        });
        p.attach_window();
        p.capture(Event::WindowClosed);
        assert!(matches!(p.next(), Event::WindowResized { .. }));
        assert_eq!(p.next(), Event::WindowOpened);
        assert_eq!(p.next(), Event::WindowClosed);
    }

    #[test]
    fn time_scale_scales_ticks_not_sampling() {
        let mut p = pipeline();
        p.set_time_scale(0.5);
        p.clock().advance(Duration::from_millis(10));
        assert_eq!(p.next(), Event::TimeElapsed(Duration::from_millis(5)));

        p.set_time_scale(2.0);
        p.clock().advance(Duration::from_millis(10));
        assert_eq!(p.next(), Event::TimeElapsed(Duration::from_millis(20)));
        assert_eq!(p.total_elapsed(), Duration::from_millis(25));
    }

    #[test]
    fn invalid_time_scale_is_ignored() {
        let mut p = pipeline();
        p.set_time_scale(-1.0);
        p.set_time_scale(f64::NAN);
        assert_eq!(p.time_scale(), 1.0);
    }

    #[test]
    fn reset_clock_drops_accumulated_wall_time() {
        let mut p = pipeline();
        p.clock().advance(Duration::from_secs(5));
        p.reset_clock();
        p.clock().advance(Duration::from_millis(1));
        assert_eq!(p.next(), Event::TimeElapsed(Duration::from_millis(1)));
    }

    #[test]
    fn system_clock_ticks_are_non_negative() {
        let mut p = EventPipeline::new();
        for _ in 0..3 {
            assert!(p.next().elapsed().is_some());
        }
        assert_eq!(p.history().len(), 1);
    }
}
