//! Gamepad input through gilrs.

use gilrs::{Axis, Button, EventType, Gilrs};
use scenehost_input::{Event, JoystickAxis, JoystickButton};

pub struct Gamepads {
    gilrs: Gilrs,
}

impl Gamepads {
    pub fn new() -> Result<Self, gilrs::Error> {
        let gilrs = Gilrs::new()?;
        for (id, pad) in gilrs.gamepads() {
            tracing::info!("gamepad {id}: {}", pad.name());
        }
        Ok(Self { gilrs })
    }

    /// Drain pending gamepad events.
    pub fn poll(&mut self, mut emit: impl FnMut(Event)) {
        while let Some(gilrs::Event { id, event, .. }) = self.gilrs.next_event() {
            let id = usize::from(id) as u32;
            let mapped = match event {
                EventType::Connected => Some(Event::JoystickConnected { id }),
                EventType::Disconnected => Some(Event::JoystickDisconnected { id }),
                EventType::ButtonPressed(button, _) => {
                    joystick_button(button).map(|button| Event::JoystickButtonPressed { id, button })
                }
                EventType::ButtonReleased(button, _) => joystick_button(button)
                    .map(|button| Event::JoystickButtonReleased { id, button }),
                // Analog triggers report as buttons with a value.
                EventType::ButtonChanged(button, value, _) => {
                    trigger_axis(button).map(|axis| Event::JoystickAxisMoved { id, axis, value })
                }
                EventType::AxisChanged(axis, value, _) => {
                    joystick_axis(axis).map(|axis| Event::JoystickAxisMoved { id, axis, value })
                }
                _ => None,
            };
            if let Some(event) = mapped {
                emit(event);
            }
        }
    }
}

fn joystick_button(button: Button) -> Option<JoystickButton> {
    Some(match button {
        Button::South => JoystickButton::ActionBottom,
        Button::East => JoystickButton::ActionRight,
        Button::West => JoystickButton::ActionLeft,
        Button::North => JoystickButton::ActionTop,
        Button::LeftTrigger => JoystickButton::LeftShoulder,
        Button::RightTrigger => JoystickButton::RightShoulder,
        Button::Select => JoystickButton::Back,
        Button::Start => JoystickButton::Start,
        Button::Mode => JoystickButton::Home,
        Button::LeftThumb => JoystickButton::LeftStick,
        Button::RightThumb => JoystickButton::RightStick,
        Button::DPadUp => JoystickButton::DPadUp,
        Button::DPadRight => JoystickButton::DPadRight,
        Button::DPadDown => JoystickButton::DPadDown,
        Button::DPadLeft => JoystickButton::DPadLeft,
        _ => return None,
    })
}

fn trigger_axis(button: Button) -> Option<JoystickAxis> {
    match button {
        Button::LeftTrigger2 => Some(JoystickAxis::LeftTrigger),
        Button::RightTrigger2 => Some(JoystickAxis::RightTrigger),
        _ => None,
    }
}

fn joystick_axis(axis: Axis) -> Option<JoystickAxis> {
    Some(match axis {
        Axis::LeftStickX => JoystickAxis::LeftStickX,
        Axis::LeftStickY => JoystickAxis::LeftStickY,
        Axis::RightStickX => JoystickAxis::RightStickX,
        Axis::RightStickY => JoystickAxis::RightStickY,
        Axis::LeftZ => JoystickAxis::LeftTrigger,
        Axis::RightZ => JoystickAxis::RightTrigger,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_buttons_follow_position() {
        assert_eq!(joystick_button(Button::South), Some(JoystickButton::ActionBottom));
        assert_eq!(joystick_button(Button::North), Some(JoystickButton::ActionTop));
        assert_eq!(joystick_button(Button::C), None);
    }

    #[test]
    fn triggers_become_axes() {
        assert_eq!(trigger_axis(Button::LeftTrigger2), Some(JoystickAxis::LeftTrigger));
        assert_eq!(trigger_axis(Button::South), None);
        assert_eq!(joystick_axis(Axis::RightZ), Some(JoystickAxis::RightTrigger));
        assert_eq!(joystick_axis(Axis::DPadX), None);
    }
}
