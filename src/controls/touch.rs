use crate::options::ControlOptions;

use super::{ControlContext, ControlResponse, ControlScheme, ControlSchemeKind, InputEvent, TouchPhase};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Pan { last: [f32; 2] },
    /// Two-finger gesture. `distance` is the pinch baseline, `centroid`
    /// the midpoint at the last move of either kind.
    TwoFinger { distance: f32, centroid: [f32; 2] },
}

/// Touch controls: one finger pans, two fingers pinch-zoom or rotate.
pub struct TouchControls {
    enabled: bool,
    touches: Vec<(u64, [f32; 2])>,
    gesture: Gesture,
    rotate_speed: f32,
    pinch_threshold: f32,
    pinch_zoom_scale: f32,
}

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

fn midpoint(a: [f32; 2], b: [f32; 2]) -> [f32; 2] {
    [(a[0] + b[0]) * 0.5, (a[1] + b[1]) * 0.5]
}

impl TouchControls {
    pub fn new(options: &ControlOptions) -> Self {
        Self {
            enabled: false,
            touches: Vec::new(),
            gesture: Gesture::Idle,
            rotate_speed: options.rotate_speed,
            pinch_threshold: options.pinch_threshold,
            pinch_zoom_scale: options.pinch_zoom_scale,
        }
    }

    pub fn active_touches(&self) -> usize {
        self.touches.len()
    }

    /// Restarts the gesture from the current finger positions.
    fn rebaseline(&mut self) {
        self.gesture = match self.touches.as_slice() {
            [] => Gesture::Idle,
            [(_, p)] => Gesture::Pan { last: *p },
            [(_, a), (_, b), ..] => Gesture::TwoFinger {
                distance: distance(*a, *b),
                centroid: midpoint(*a, *b),
            },
        };
    }

    fn on_move(&mut self, ctx: &mut ControlContext<'_>) {
        match (&mut self.gesture, self.touches.as_slice()) {
            (Gesture::Pan { last }, [(_, p)]) => {
                let dx = p[0] - last[0];
                let dy = p[1] - last[1];
                *last = *p;
                ctx.camera.pan(dx, dy, ctx.viewport.height);
            }
            (Gesture::TwoFinger { distance: baseline, centroid }, [(_, a), (_, b), ..]) => {
                let current = distance(*a, *b);
                let change = current - *baseline;
                if *baseline > f32::EPSILON && (change / *baseline).abs() > self.pinch_threshold {
                    ctx.camera.apply_zoom(change * self.pinch_zoom_scale);
                    *baseline = current;
                    *centroid = midpoint(*a, *b);
                } else {
                    let mid = midpoint(*a, *b);
                    let dx = mid[0] - centroid[0];
                    let dy = mid[1] - centroid[1];
                    *centroid = mid;
                    ctx.camera
                        .rotate(-dx * self.rotate_speed, -dy * self.rotate_speed);
                }
            }
            _ => {}
        }
    }
}

impl ControlScheme for TouchControls {
    fn kind(&self) -> ControlSchemeKind {
        ControlSchemeKind::Touch
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.touches.clear();
        self.gesture = Gesture::Idle;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn handle_event(&mut self, event: &InputEvent, ctx: &mut ControlContext<'_>) -> ControlResponse {
        if !self.enabled || ctx.modes.blocks_camera() {
            return ControlResponse::IGNORED;
        }
        let InputEvent::Touch { id, phase, x, y } = *event else {
            return ControlResponse::IGNORED;
        };

        match phase {
            TouchPhase::Started => {
                match self.touches.iter().position(|(tid, _)| *tid == id) {
                    Some(index) => self.touches[index].1 = [x, y],
                    None => self.touches.push((id, [x, y])),
                }
                self.rebaseline();
            }
            TouchPhase::Moved => {
                let Some(touch) = self.touches.iter_mut().find(|(tid, _)| *tid == id) else {
                    return ControlResponse::IGNORED;
                };
                touch.1 = [x, y];
                self.on_move(ctx);
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.touches.retain(|(tid, _)| *tid != id);
                self.rebaseline();
            }
        }
        ControlResponse::CONSUMED
    }
}
