use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector3};

use crate::options::ControlOptions;

use super::{ControlContext, ControlResponse, ControlScheme, ControlSchemeKind, InputEvent, PointerButton};

const MIN_PHI: f32 = 0.1;
const MAX_PHI: f32 = PI - 0.1;

/// Spherical coordinates of `offset`: radius, azimuth about +Y from +Z,
/// and polar angle from +Y.
fn to_spherical(offset: Vector3<f32>) -> (f32, f32, f32) {
    let radius = offset.magnitude();
    let theta = offset.x.atan2(offset.z);
    let phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
    (radius, theta, phi)
}

fn from_spherical(radius: f32, theta: f32, phi: f32) -> Vector3<f32> {
    let (st, ct) = theta.sin_cos();
    let (sp, cp) = phi.sin_cos();
    Vector3::new(radius * sp * st, radius * cp, radius * sp * ct)
}

/// Drag orbits the camera around the scene centre; the wheel dollies toward it.
pub struct OrbitControls {
    enabled: bool,
    last: Option<[f32; 2]>,
    rotate_speed: f32,
    zoom_step: f32,
    min_distance: f32,
}

impl OrbitControls {
    pub fn new(options: &ControlOptions) -> Self {
        Self {
            enabled: false,
            last: None,
            rotate_speed: options.orbit_rotate_speed,
            zoom_step: options.zoom_step,
            min_distance: options.orbit_min_distance,
        }
    }

    fn orbit(&self, dx: f32, dy: f32, ctx: &mut ControlContext<'_>) {
        let center = ctx.scene_center;
        let offset = ctx.camera.position - center;
        if offset.magnitude2() <= f32::EPSILON {
            return;
        }
        let (radius, theta, phi) = to_spherical(offset);
        let theta = theta - dx * self.rotate_speed;
        let phi = (phi - dy * self.rotate_speed).clamp(MIN_PHI, MAX_PHI);

        ctx.camera.position = center + from_spherical(radius, theta, phi);
        ctx.camera.look_at(center);
    }

    fn dolly(&self, delta: f32, ctx: &mut ControlContext<'_>) {
        let center = ctx.scene_center;
        let to_center = center - ctx.camera.position;
        let distance = to_center.magnitude();
        if distance <= f32::EPSILON {
            return;
        }
        let target = (distance - delta.signum() * self.zoom_step).max(self.min_distance);
        ctx.camera.position = center - to_center / distance * target;
    }
}

impl ControlScheme for OrbitControls {
    fn kind(&self) -> ControlSchemeKind {
        ControlSchemeKind::Orbit
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.last = None;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn handle_event(&mut self, event: &InputEvent, ctx: &mut ControlContext<'_>) -> ControlResponse {
        if !self.enabled || ctx.modes.blocks_camera() {
            return ControlResponse::IGNORED;
        }

        match *event {
            InputEvent::PointerDown {
                button: PointerButton::Primary,
                x,
                y,
            } => {
                self.last = Some([x, y]);
                ControlResponse::CONSUMED
            }
            InputEvent::PointerMove { x, y } => {
                let Some(last) = self.last else {
                    return ControlResponse::IGNORED;
                };
                self.last = Some([x, y]);
                self.orbit(x - last[0], y - last[1], ctx);
                ControlResponse::CONSUMED
            }
            InputEvent::PointerUp {
                button: PointerButton::Primary,
                ..
            } => {
                self.last = None;
                ControlResponse::CONSUMED
            }
            InputEvent::Wheel { delta } if delta != 0.0 => {
                self.dolly(delta, ctx);
                ControlResponse::CONSUMED
            }
            _ => ControlResponse::IGNORED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::tests::{camera, context};

    fn enabled() -> OrbitControls {
        let mut controls = OrbitControls::new(&ControlOptions::default());
        controls.enable();
        controls
    }

    #[test]
    fn orbit_keeps_radius_and_aims_at_center() {
        let mut controls = enabled();
        let mut cam = camera();
        let mut ctx = context(&mut cam);
        let radius = ctx.camera.position.magnitude();

        controls.handle_event(&InputEvent::PointerDown { button: PointerButton::Primary, x: 0.0, y: 0.0 }, &mut ctx);
        controls.handle_event(&InputEvent::PointerMove { x: 80.0, y: 30.0 }, &mut ctx);

        assert!((ctx.camera.position.magnitude() - radius).abs() < 1e-3);
        let to_center = (-ctx.camera.position).normalize();
        assert!((ctx.camera.forward() - to_center).magnitude() < 1e-4);
    }

    #[test]
    fn polar_angle_is_clamped() {
        let mut controls = enabled();
        let mut cam = camera();
        let mut ctx = context(&mut cam);
        controls.handle_event(&InputEvent::PointerDown { button: PointerButton::Primary, x: 0.0, y: 0.0 }, &mut ctx);
        controls.handle_event(&InputEvent::PointerMove { x: 0.0, y: 10_000.0 }, &mut ctx);

        let (_, _, phi) = to_spherical(ctx.camera.position);
        assert!((phi - MIN_PHI).abs() < 1e-3);
    }

    #[test]
    fn dolly_stops_short_of_center() {
        let mut controls = enabled();
        let mut cam = camera();
        cam.position = Vector3::new(0.0, 0.0, 40.0);
        let mut ctx = context(&mut cam);

        controls.handle_event(&InputEvent::Wheel { delta: 1.0 }, &mut ctx);
        assert!((ctx.camera.position.z - 10.0).abs() < 1e-4);
        controls.handle_event(&InputEvent::Wheel { delta: 1.0 }, &mut ctx);
        assert!((ctx.camera.position.z - 1.0).abs() < 1e-4);
        controls.handle_event(&InputEvent::Wheel { delta: -1.0 }, &mut ctx);
        assert!((ctx.camera.position.z - 31.0).abs() < 1e-4);
    }
}
