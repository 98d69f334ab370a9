//! Platform input as an ordered, replayable event stream.
//!
//! # Invariants
//! - Captured events are delivered strictly first-in first-out, none dropped.
//! - `TimeElapsed` is the only event the pipeline synthesizes.
//! - The history log merges tick runs; delivery never does.

mod clock;
mod event;
mod pipeline;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{
    Event, JoystickAxis, JoystickButton, Key, Modifiers, MouseButton, MouseButtonEvent,
};
pub use pipeline::EventPipeline;
