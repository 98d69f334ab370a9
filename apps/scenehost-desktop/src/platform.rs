//! winit → [`Event`] translation.

use scenehost_input::{Event, Key, Modifiers, MouseButton, MouseButtonEvent};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{ModifiersState, NativeKeyCode, PhysicalKey};

/// Platform state a single window event cannot carry on its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformState {
    pub cursor: (f64, f64),
    pub modifiers: Modifiers,
}

pub fn modifiers(state: ModifiersState) -> Modifiers {
    Modifiers {
        alt: state.alt_key(),
        control: state.control_key(),
        system: state.super_key(),
        shift: state.shift_key(),
    }
}

pub fn mouse_button(button: winit::event::MouseButton) -> MouseButton {
    match button {
        winit::event::MouseButton::Left => MouseButton::Left,
        winit::event::MouseButton::Right => MouseButton::Right,
        winit::event::MouseButton::Middle => MouseButton::Middle,
        winit::event::MouseButton::Back => MouseButton::Back,
        winit::event::MouseButton::Forward => MouseButton::Forward,
        winit::event::MouseButton::Other(n) => MouseButton::Other(n),
    }
}

/// Keys winit could not map to a [`winit::keyboard::KeyCode`] keep their
/// native code as the scancode.
pub fn key(physical: PhysicalKey, modifiers: Modifiers) -> Key {
    let (code, scancode) = match physical {
        PhysicalKey::Code(code) => (format!("{code:?}"), 0),
        PhysicalKey::Unidentified(native) => {
            let scancode = match native {
                NativeKeyCode::Android(c) | NativeKeyCode::Xkb(c) => c,
                NativeKeyCode::MacOS(c) | NativeKeyCode::Windows(c) => u32::from(c),
                NativeKeyCode::Unidentified => 0,
            };
            ("Unidentified".to_string(), scancode)
        }
    };
    Key {
        modifiers,
        scancode,
        code,
    }
}

fn key_events(event: &KeyEvent, state: &PlatformState, emit: &mut impl FnMut(Event)) {
    let key = key(event.physical_key, state.modifiers);
    match event.state {
        ElementState::Pressed => {
            emit(Event::KeyPressed(key));
            if let Some(text) = &event.text {
                text.chars()
                    .filter(|c| !c.is_control())
                    .for_each(|c| emit(Event::Character(c)));
            }
        }
        ElementState::Released => emit(Event::KeyReleased(key)),
    }
}

/// Turn one window event into zero or more pipeline events.
///
/// Redraw, focus and IME notifications produce nothing; the host handles
/// redraws itself.
pub fn translate(event: &WindowEvent, state: &mut PlatformState, mut emit: impl FnMut(Event)) {
    match event {
        WindowEvent::CloseRequested => emit(Event::WindowClosed),
        WindowEvent::Resized(size) => emit(Event::WindowResized {
            width: size.width,
            height: size.height,
        }),
        WindowEvent::Moved(position) => emit(Event::WindowMoved {
            x: position.x,
            y: position.y,
        }),
        WindowEvent::ModifiersChanged(m) => state.modifiers = modifiers(m.state()),
        WindowEvent::KeyboardInput { event, .. } => key_events(event, state, &mut emit),
        WindowEvent::CursorMoved { position, .. } => {
            state.cursor = (position.x, position.y);
            emit(Event::MouseMoved {
                x: position.x,
                y: position.y,
            });
        }
        WindowEvent::MouseInput {
            state: element,
            button,
            ..
        } => {
            let press = MouseButtonEvent {
                button: mouse_button(*button),
                x: state.cursor.0,
                y: state.cursor.1,
            };
            emit(match element {
                ElementState::Pressed => Event::MouseButtonPressed(press),
                ElementState::Released => Event::MouseButtonReleased(press),
            });
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::{PhysicalPosition, PhysicalSize};
    use winit::keyboard::KeyCode;

    fn collect(event: WindowEvent, state: &mut PlatformState) -> Vec<Event> {
        let mut out = Vec::new();
        translate(&event, state, |e| out.push(e));
        out
    }

    #[test]
    fn window_events_map_one_to_one() {
        let mut state = PlatformState::default();
        assert_eq!(
            collect(WindowEvent::CloseRequested, &mut state),
            vec![Event::WindowClosed]
        );
        assert_eq!(
            collect(WindowEvent::Resized(PhysicalSize::new(800, 600)), &mut state),
            vec![Event::WindowResized {
                width: 800,
                height: 600
            }]
        );
        assert_eq!(
            collect(WindowEvent::Moved(PhysicalPosition::new(-10, 20)), &mut state),
            vec![Event::WindowMoved { x: -10, y: 20 }]
        );
        assert!(collect(WindowEvent::RedrawRequested, &mut state).is_empty());
    }

    #[test]
    fn key_names_come_from_key_codes() {
        let held = Modifiers {
            shift: true,
            ..Modifiers::default()
        };
        let k = key(PhysicalKey::Code(KeyCode::KeyW), held);
        assert!(k.is("KeyW"));
        assert!(k.modifiers.shift);

        let native = key(PhysicalKey::Unidentified(NativeKeyCode::Xkb(191)), held);
        assert_eq!(native.scancode, 191);
    }

    #[test]
    fn modifier_flags_are_mapped() {
        let m = modifiers(ModifiersState::CONTROL | ModifiersState::SUPER);
        assert!(m.control && m.system);
        assert!(!m.alt && !m.shift);
    }

    #[test]
    fn mouse_buttons_are_mapped() {
        assert_eq!(
            mouse_button(winit::event::MouseButton::Middle),
            MouseButton::Middle
        );
        assert_eq!(
            mouse_button(winit::event::MouseButton::Other(7)),
            MouseButton::Other(7)
        );
    }
}
