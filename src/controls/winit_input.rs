use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use super::{InputEvent, Key, PointerButton, TouchPhase};

/// Pixels of trackpad scroll treated as one wheel notch.
const PIXELS_PER_LINE: f32 = 100.0;

/// Translates winit events into [`InputEvent`]s, tracking the cursor so
/// button events carry a position.
#[derive(Debug, Default)]
pub struct WinitInput {
    cursor: [f32; 2],
}

impl WinitInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> [f32; 2] {
        self.cursor
    }

    pub fn translate_window_event(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = [position.x as f32, position.y as f32];
                Some(InputEvent::PointerMove {
                    x: self.cursor[0],
                    y: self.cursor[1],
                })
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = map_button(*button)?;
                let [x, y] = self.cursor;
                Some(match state {
                    ElementState::Pressed => InputEvent::PointerDown { button, x, y },
                    ElementState::Released => InputEvent::PointerUp { button, x, y },
                })
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta = wheel_delta(*delta);
                (delta != 0.0).then_some(InputEvent::Wheel { delta })
            }
            WindowEvent::Touch(touch) => Some(InputEvent::Touch {
                id: touch.id,
                phase: map_touch_phase(touch.phase),
                x: touch.location.x as f32,
                y: touch.location.y as f32,
            }),
            WindowEvent::KeyboardInput { event, .. } => {
                let key = map_key(event.physical_key);
                match event.state {
                    ElementState::Pressed if event.repeat => None,
                    ElementState::Pressed => Some(InputEvent::KeyDown(key)),
                    ElementState::Released => Some(InputEvent::KeyUp(key)),
                }
            }
            _ => None,
        }
    }

    pub fn translate_device_event(&self, event: &DeviceEvent) -> Option<InputEvent> {
        match event {
            DeviceEvent::MouseMotion { delta } => Some(InputEvent::RawMotion {
                dx: delta.0 as f32,
                dy: delta.1 as f32,
            }),
            _ => None,
        }
    }
}

pub fn map_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}

pub fn map_touch_phase(phase: winit::event::TouchPhase) -> TouchPhase {
    match phase {
        winit::event::TouchPhase::Started => TouchPhase::Started,
        winit::event::TouchPhase::Moved => TouchPhase::Moved,
        winit::event::TouchPhase::Ended => TouchPhase::Ended,
        winit::event::TouchPhase::Cancelled => TouchPhase::Cancelled,
    }
}

/// Scroll in wheel notches; positive scrolls away from the user.
pub fn wheel_delta(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => y as f32 / PIXELS_PER_LINE,
    }
}

pub fn map_key(key: PhysicalKey) -> Key {
    match key {
        PhysicalKey::Code(KeyCode::KeyW) => Key::W,
        PhysicalKey::Code(KeyCode::KeyA) => Key::A,
        PhysicalKey::Code(KeyCode::KeyS) => Key::S,
        PhysicalKey::Code(KeyCode::KeyD) => Key::D,
        PhysicalKey::Code(KeyCode::ArrowUp) => Key::ArrowUp,
        PhysicalKey::Code(KeyCode::ArrowDown) => Key::ArrowDown,
        PhysicalKey::Code(KeyCode::ArrowLeft) => Key::ArrowLeft,
        PhysicalKey::Code(KeyCode::ArrowRight) => Key::ArrowRight,
        PhysicalKey::Code(KeyCode::Space) => Key::Space,
        PhysicalKey::Code(KeyCode::Escape) => Key::Escape,
        _ => Key::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_by_physical_position() {
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::KeyW)), Key::W);
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::Space)), Key::Space);
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::KeyQ)), Key::Other);
    }

    #[test]
    fn wheel_units() {
        assert_eq!(wheel_delta(MouseScrollDelta::LineDelta(0.0, 1.0)), 1.0);
        let pixels = wheel_delta(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -250.0)));
        assert!((pixels - -2.5).abs() < 1e-6);
    }

    #[test]
    fn only_three_buttons_map() {
        assert_eq!(map_button(MouseButton::Right), Some(PointerButton::Secondary));
        assert_eq!(map_button(MouseButton::Back), None);
    }
}
