use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Modifier keys held while a key event fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub alt: bool,
    pub control: bool,
    /// Super / Windows / Command.
    pub system: bool,
    pub shift: bool,
}

/// A physical key as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub modifiers: Modifiers,
    pub scancode: u32,
    /// Layout-independent key code name, e.g. `"KeyW"` or `"Escape"`.
    pub code: String,
}

impl Key {
    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

/// A mouse button transition with the cursor position at that moment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MouseButtonEvent {
    pub button: MouseButton,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoystickAxis {
    LeftStickX,
    LeftStickY,
    RightStickX,
    RightStickY,
    LeftTrigger,
    RightTrigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoystickButton {
    /// A / Cross.
    ActionBottom,
    /// B / Circle.
    ActionRight,
    /// X / Square.
    ActionLeft,
    /// Y / Triangle.
    ActionTop,
    LeftShoulder,
    RightShoulder,
    Back,
    Start,
    Home,
    LeftStick,
    RightStick,
    DPadUp,
    DPadRight,
    DPadDown,
    DPadLeft,
}

/// Everything the host loop reacts to.
///
/// This is a closed set: adding a variant breaks every exhaustive `match`
/// over it, which is how dispatch sites are kept in sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    WindowOpened,
    WindowClosed,
    WindowResized { width: u32, height: u32 },
    WindowMoved { x: i32, y: i32 },
    /// Scaled wall-clock time since the previous sample. Synthesized by the
    /// pipeline when no platform event is pending.
    TimeElapsed(Duration),
    KeyPressed(Key),
    KeyReleased(Key),
    Character(char),
    MouseMoved { x: f64, y: f64 },
    MouseButtonPressed(MouseButtonEvent),
    MouseButtonReleased(MouseButtonEvent),
    JoystickConnected { id: u32 },
    JoystickDisconnected { id: u32 },
    JoystickButtonPressed { id: u32, button: JoystickButton },
    JoystickButtonReleased { id: u32, button: JoystickButton },
    JoystickAxisMoved { id: u32, axis: JoystickAxis, value: f32 },
}

impl Event {
    /// Variant name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::WindowOpened => "WindowOpened",
            Self::WindowClosed => "WindowClosed",
            Self::WindowResized { .. } => "WindowResized",
            Self::WindowMoved { .. } => "WindowMoved",
            Self::TimeElapsed(_) => "TimeElapsed",
            Self::KeyPressed(_) => "KeyPressed",
            Self::KeyReleased(_) => "KeyReleased",
            Self::Character(_) => "Character",
            Self::MouseMoved { .. } => "MouseMoved",
            Self::MouseButtonPressed(_) => "MouseButtonPressed",
            Self::MouseButtonReleased(_) => "MouseButtonReleased",
            Self::JoystickConnected { .. } => "JoystickConnected",
            Self::JoystickDisconnected { .. } => "JoystickDisconnected",
            Self::JoystickButtonPressed { .. } => "JoystickButtonPressed",
            Self::JoystickButtonReleased { .. } => "JoystickButtonReleased",
            Self::JoystickAxisMoved { .. } => "JoystickAxisMoved",
        }
    }

    /// The duration carried by a `TimeElapsed`, if this is one.
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            Self::TimeElapsed(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_tick(&self) -> bool {
        matches!(self, Self::TimeElapsed(_))
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WindowResized { width, height } => {
                write!(f, "{} {{ width: {width}, height: {height} }}", self.name())
            }
            Self::WindowMoved { x, y } => write!(f, "{} {{ x: {x}, y: {y} }}", self.name()),
            Self::TimeElapsed(d) => write!(f, "{} {{ elapsed: {d:?} }}", self.name()),
            Self::KeyPressed(k) | Self::KeyReleased(k) => {
                write!(f, "{} {{ code: {}, scancode: {} }}", self.name(), k.code, k.scancode)
            }
            Self::Character(c) => write!(f, "{} {{ codepoint: U+{:04X} }}", self.name(), *c as u32),
            Self::MouseMoved { x, y } => write!(f, "{} {{ x: {x:.1}, y: {y:.1} }}", self.name()),
            Self::MouseButtonPressed(m) | Self::MouseButtonReleased(m) => write!(
                f,
                "{} {{ button: {:?}, x: {:.1}, y: {:.1} }}",
                self.name(),
                m.button,
                m.x,
                m.y
            ),
            Self::JoystickConnected { id } | Self::JoystickDisconnected { id } => {
                write!(f, "{} {{ id: {id} }}", self.name())
            }
            Self::JoystickButtonPressed { id, button }
            | Self::JoystickButtonReleased { id, button } => {
                write!(f, "{} {{ id: {id}, button: {button:?} }}", self.name())
            }
            Self::JoystickAxisMoved { id, axis, value } => {
                write!(f, "{} {{ id: {id}, axis: {axis:?}, value: {value:.3} }}", self.name())
            }
            Self::WindowOpened | Self::WindowClosed => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_only_on_ticks() {
        let tick = Event::TimeElapsed(Duration::from_millis(16));
        assert_eq!(tick.elapsed(), Some(Duration::from_millis(16)));
        assert!(tick.is_tick());
        assert_eq!(Event::WindowClosed.elapsed(), None);
        assert!(!Event::WindowClosed.is_tick());
    }

    #[test]
    fn display_includes_fields() {
        let e = Event::WindowResized {
            width: 800,
            height: 600,
        };
        assert_eq!(e.to_string(), "WindowResized { width: 800, height: 600 }");
        assert_eq!(
            Event::Character('A').to_string(),
            "Character { codepoint: U+0041 }"
        );
    }

    #[test]
    fn key_code_match() {
        let k = Key {
            modifiers: Modifiers {
                control: true,
                ..Modifiers::default()
            },
            scancode: 17,
            code: "KeyW".into(),
        };
        assert!(k.is("KeyW"));
        assert!(!k.is("KeyS"));
        assert!(k.modifiers.control);
    }
}
