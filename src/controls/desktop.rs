use crate::options::ControlOptions;

use super::{ControlContext, ControlResponse, ControlScheme, ControlSchemeKind, InputEvent, PointerButton};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Pan,
    Rotate,
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    mode: DragMode,
    button: PointerButton,
    last: [f32; 2],
}

/// Mouse controls: left-drag pans, right-drag rotates, the wheel zooms.
pub struct DesktopControls {
    enabled: bool,
    drag: Option<Drag>,
    rotate_speed: f32,
    zoom_step: f32,
}

impl DesktopControls {
    pub fn new(options: &ControlOptions) -> Self {
        Self {
            enabled: false,
            drag: None,
            rotate_speed: options.rotate_speed,
            zoom_step: options.zoom_step,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }
}

impl ControlScheme for DesktopControls {
    fn kind(&self) -> ControlSchemeKind {
        ControlSchemeKind::Desktop
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.drag = None;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn handle_event(&mut self, event: &InputEvent, ctx: &mut ControlContext<'_>) -> ControlResponse {
        if !self.enabled || ctx.modes.blocks_camera() {
            return ControlResponse::IGNORED;
        }

        match *event {
            InputEvent::PointerDown { button, x, y } => {
                let mode = match button {
                    PointerButton::Primary => DragMode::Pan,
                    PointerButton::Secondary => DragMode::Rotate,
                    PointerButton::Middle => return ControlResponse::IGNORED,
                };
                self.drag = Some(Drag {
                    mode,
                    button,
                    last: [x, y],
                });
                ControlResponse::CONSUMED
            }
            InputEvent::PointerMove { x, y } => {
                let Some(drag) = self.drag.as_mut() else {
                    return ControlResponse::IGNORED;
                };
                let dx = x - drag.last[0];
                let dy = y - drag.last[1];
                drag.last = [x, y];
                match drag.mode {
                    DragMode::Pan => ctx.camera.pan(dx, dy, ctx.viewport.height),
                    DragMode::Rotate => ctx
                        .camera
                        .rotate(-dx * self.rotate_speed, -dy * self.rotate_speed),
                }
                ControlResponse::CONSUMED
            }
            InputEvent::PointerUp { button, .. } => match self.drag {
                Some(drag) if drag.button == button => {
                    self.drag = None;
                    ControlResponse::CONSUMED
                }
                _ => ControlResponse::IGNORED,
            },
            InputEvent::Wheel { delta } if delta != 0.0 => {
                ctx.camera.apply_zoom(delta.signum() * self.zoom_step);
                ControlResponse::CONSUMED
            }
            _ => ControlResponse::IGNORED,
        }
    }
}
