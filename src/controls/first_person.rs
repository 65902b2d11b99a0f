use std::collections::HashSet;
use std::time::Duration;

use crate::options::ControlOptions;

use super::{
    frame_scale, ControlContext, ControlResponse, ControlScheme, ControlSchemeKind, InputEvent, Key,
    PointerButton,
};

/// Pointer-lock mouse look with held WASD movement.
pub struct FirstPersonControls {
    enabled: bool,
    locked: bool,
    held: HashSet<Key>,
    sensitivity: f32,
    move_speed: f32,
}

impl FirstPersonControls {
    pub fn new(options: &ControlOptions) -> Self {
        Self {
            enabled: false,
            locked: false,
            held: HashSet::new(),
            sensitivity: options.pointer_lock_sensitivity,
            move_speed: options.first_person_move_speed,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl ControlScheme for FirstPersonControls {
    fn kind(&self) -> ControlSchemeKind {
        ControlSchemeKind::FirstPerson
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.locked = false;
        self.held.clear();
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn holds_pointer_lock(&self) -> bool {
        self.locked
    }

    fn handle_event(&mut self, event: &InputEvent, ctx: &mut ControlContext<'_>) -> ControlResponse {
        if !self.enabled || ctx.modes.blocks_camera() {
            return ControlResponse::IGNORED;
        }

        match *event {
            InputEvent::PointerDown {
                button: PointerButton::Primary,
                ..
            } if !self.locked => {
                self.locked = true;
                ControlResponse::lock(true)
            }
            InputEvent::RawMotion { dx, dy } if self.locked => {
                ctx.camera
                    .rotate(-dx * self.sensitivity, -dy * self.sensitivity);
                ControlResponse::CONSUMED
            }
            InputEvent::KeyDown(Key::Escape) if self.locked => {
                self.locked = false;
                self.held.clear();
                ControlResponse::lock(false)
            }
            InputEvent::KeyDown(key @ (Key::W | Key::A | Key::S | Key::D)) => {
                self.held.insert(key);
                ControlResponse::CONSUMED
            }
            InputEvent::KeyUp(key) => {
                if self.held.remove(&key) {
                    ControlResponse::CONSUMED
                } else {
                    ControlResponse::IGNORED
                }
            }
            _ => ControlResponse::IGNORED,
        }
    }

    fn update(&mut self, dt: Duration, ctx: &mut ControlContext<'_>) {
        if !self.enabled || ctx.modes.blocks_camera() || self.held.is_empty() {
            return;
        }
        let step = self.move_speed * frame_scale(dt);
        let forward = ctx.camera.forward();
        let right = ctx.camera.right();

        let axis = |positive: Key, negative: Key| {
            (self.held.contains(&positive) as i32 - self.held.contains(&negative) as i32) as f32
        };
        ctx.camera.position += forward * (axis(Key::W, Key::S) * step) + right * (axis(Key::D, Key::A) * step);
    }
}
