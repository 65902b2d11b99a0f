use crate::controls::Key;

/// Locomotion intent bound to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
    TurnLeft,
    TurnRight,
    Jump,
}

impl Action {
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::W | Key::ArrowUp => Some(Action::Forward),
            Key::S | Key::ArrowDown => Some(Action::Back),
            Key::A => Some(Action::StrafeLeft),
            Key::D => Some(Action::StrafeRight),
            Key::ArrowLeft => Some(Action::TurnLeft),
            Key::ArrowRight => Some(Action::TurnRight),
            Key::Space => Some(Action::Jump),
            Key::Escape | Key::Other => None,
        }
    }
}

/// Held-key snapshot read once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldKeys {
    pub forward: bool,
    pub back: bool,
    pub strafe_left: bool,
    pub strafe_right: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub jump: bool,
    jump_latched: bool,
}

fn axis(positive: bool, negative: bool) -> f32 {
    (positive as i32 - negative as i32) as f32
}

impl HeldKeys {
    pub fn set(&mut self, action: Action, pressed: bool) {
        match action {
            Action::Forward => self.forward = pressed,
            Action::Back => self.back = pressed,
            Action::StrafeLeft => self.strafe_left = pressed,
            Action::StrafeRight => self.strafe_right = pressed,
            Action::TurnLeft => self.turn_left = pressed,
            Action::TurnRight => self.turn_right = pressed,
            Action::Jump => {
                // Holding space does not bunny-hop; each jump needs a new press.
                if pressed && !self.jump {
                    self.jump_latched = true;
                }
                self.jump = pressed;
            }
        }
    }

    /// Consumes a pending jump press.
    pub fn take_jump(&mut self) -> bool {
        std::mem::take(&mut self.jump_latched)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// +1 forward, -1 back.
    pub fn forward_axis(&self) -> f32 {
        axis(self.forward, self.back)
    }

    /// +1 right, -1 left.
    pub fn strafe_axis(&self) -> f32 {
        axis(self.strafe_right, self.strafe_left)
    }

    /// +1 turns left (heading increases).
    pub fn turn_axis(&self) -> f32 {
        axis(self.turn_left, self.turn_right)
    }
}
