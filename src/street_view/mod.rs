//! # Street View
//!
//! First-person walking over the loaded campus. While active the engine owns
//! the camera: every frame it turns held keys into a horizontal move resolved
//! against the building, integrates gravity and jumps, and keeps the eye a
//! fixed height above the ground.
//!
//! Speeds are tuned per frame at 60 Hz and scaled by the real frame time.

pub mod collision;
pub mod keys;

use std::f32::consts::PI;
use std::time::Duration;

use cgmath::{InnerSpace, Vector3};

use crate::controls::Key;
use crate::error::TransitionError;
use crate::gfx::scene::{Role, Scene};
use crate::options::StreetViewOptions;

pub use keys::{Action, HeldKeys};

/// Start position used when no map mesh is loaded.
const DEFAULT_START: [f32; 2] = [0.0, 30.0];

/// What the host should do after a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    Handled,
    /// The user asked to leave street view.
    Exit,
}

/// Per-activation locomotion state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocomotionState {
    /// Heading about +Y; 0 faces +Z.
    pub heading: f32,
    pub vertical_velocity: f32,
    pub grounded: bool,
}

impl LocomotionState {
    pub fn forward(&self) -> Vector3<f32> {
        let (s, c) = self.heading.sin_cos();
        Vector3::new(s, 0.0, c)
    }

    /// `forward × up`
    pub fn right(&self) -> Vector3<f32> {
        self.forward().cross(Vector3::unit_y())
    }
}

pub struct StreetView {
    options: StreetViewOptions,
    state: Option<LocomotionState>,
    keys: HeldKeys,
    /// Roles hidden on activation and their previous visibility.
    hidden: Vec<(Role, bool)>,
}

impl StreetView {
    pub fn new(options: StreetViewOptions) -> Self {
        Self {
            options,
            state: None,
            keys: HeldKeys::default(),
            hidden: Vec::new(),
        }
    }

    pub fn options(&self) -> &StreetViewOptions {
        &self.options
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&LocomotionState> {
        self.state.as_ref()
    }

    pub fn keys(&self) -> &HeldKeys {
        &self.keys
    }

    /// Eye height when standing on the ground under the player.
    pub fn standing_height(&self, scene: &Scene) -> f32 {
        collision::ground_level(scene, self.options.fallback_ground_height) + self.options.eye_height
    }

    pub fn activate(&mut self, scene: &mut Scene) -> Result<(), TransitionError> {
        if self.is_active() {
            return Err(TransitionError::AlreadyActive);
        }

        self.hidden = Role::ALL
            .into_iter()
            .filter(|role| !role.visible_in_street_view())
            .filter_map(|role| scene.set_role_visible(role, false).map(|was| (role, was)))
            .collect();

        let eye_y = self.standing_height(scene);
        let start = match scene.bounds_of(&[Role::Building, Role::Ground]) {
            Some(bounds) => {
                let center = bounds.center();
                let size = bounds.size();
                let back_off = size.x.max(size.z) * self.options.start_offset_factor;
                Vector3::new(center.x, eye_y, center.z + back_off)
            }
            None => Vector3::new(DEFAULT_START[0], eye_y, DEFAULT_START[1]),
        };

        let look = scene.camera.forward();
        let heading = if look.x * look.x + look.z * look.z > 1e-8 {
            look.x.atan2(look.z)
        } else {
            PI
        };

        let state = LocomotionState {
            heading,
            vertical_velocity: 0.0,
            grounded: true,
        };
        scene.cancel_animation();
        scene.camera.position = start;
        scene.camera.look_along(state.forward());

        self.keys.clear();
        self.state = Some(state);
        log::info!(
            "Street view on at ({:.1}, {:.1}, {:.1}), {} role(s) hidden",
            start.x,
            start.y,
            start.z,
            self.hidden.len()
        );
        Ok(())
    }

    pub fn deactivate(&mut self, scene: &mut Scene) -> Result<(), TransitionError> {
        if self.state.take().is_none() {
            return Err(TransitionError::NotActive);
        }
        for (role, visible) in self.hidden.drain(..) {
            scene.set_role_visible(role, visible);
        }
        self.keys.clear();
        log::info!("Street view off");
        Ok(())
    }

    pub fn handle_key(&mut self, key: Key, pressed: bool) -> KeyOutcome {
        if !self.is_active() {
            return KeyOutcome::Ignored;
        }
        if key == Key::Escape {
            return if pressed { KeyOutcome::Exit } else { KeyOutcome::Handled };
        }
        match Action::from_key(key) {
            Some(action) => {
                self.keys.set(action, pressed);
                KeyOutcome::Handled
            }
            None => KeyOutcome::Ignored,
        }
    }

    /// Advances one frame. Does nothing while inactive.
    pub fn update(&mut self, dt: Duration, scene: &mut Scene) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let options = &self.options;
        let dt = dt.as_secs_f32();
        let frame = dt * options.frame_rate_normalizer;
        let keys = self.keys;
        let jump = self.keys.take_jump();

        state.heading += keys.turn_axis() * options.turn_speed * frame;

        let forward = state.forward();
        let right = state.right();
        let wish = forward * keys.forward_axis() + right * keys.strafe_axis();
        let mut position = scene.camera.position;
        if wish.magnitude2() > 0.0 {
            let movement = wish.normalize() * (options.move_speed * frame);
            position += collision::resolve_horizontal(scene, position, movement, forward, right, options);
        }

        state.vertical_velocity += options.gravity * dt;
        if jump && state.grounded {
            state.vertical_velocity = options.jump_speed;
            state.grounded = false;
        }

        let rise = state.vertical_velocity * dt;
        match collision::ceiling_clamp(scene, position, rise, options) {
            Some(limit) => {
                log::debug!("Head hit ceiling at {:.2}", limit + options.ceiling_clearance);
                position.y = limit;
                state.vertical_velocity = 0.0;
            }
            None => position.y += rise,
        }

        let standing = collision::ground_level(scene, options.fallback_ground_height) + options.eye_height;
        if position.y <= standing {
            position.y = standing;
            state.vertical_velocity = 0.0;
            state.grounded = true;
        } else {
            state.grounded = false;
        }

        scene.camera.position = position;
        scene.camera.look_along(forward);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::ViewCamera;
    use crate::gfx::geometry::generate_box;
    use crate::gfx::scene::{Material, Mesh, Object};

    const FRAME: Duration = Duration::from_nanos(16_666_667);

    fn block(min: [f32; 3], max: [f32; 3]) -> Object {
        Object::new("block", vec![Mesh::surface(generate_box(min, max), Material::default())])
    }

    fn campus() -> Scene {
        let mut scene = Scene::new(ViewCamera::new(Vector3::new(0.0, 50.0, 100.0), 0.0, -0.5, 1.6));
        scene.add_role_object(Role::Ground, block([-50.0, -1.0, -50.0], [50.0, 0.0, 50.0]));
        scene
    }

    /// Ground plus a wall whose near face is 2 units ahead of the start.
    fn walled(start: Vector3<f32>) -> (Scene, StreetView) {
        let mut scene = campus();
        let face = start.z - 2.0;
        scene.add_role_object(
            Role::Building,
            block([-20.0, 0.0, face - 1.0], [20.0, 20.0, face]),
        );
        let mut engine = StreetView::new(StreetViewOptions::default());
        engine.activate(&mut scene).unwrap();
        scene.camera.position = start;
        (scene, engine)
    }

    fn run(engine: &mut StreetView, scene: &mut Scene, frames: usize) {
        for _ in 0..frames {
            engine.update(FRAME, scene);
        }
    }

    #[test]
    fn activation_places_eye_above_ground_and_hides_labels() {
        let mut scene = campus();
        scene.add_role_object(Role::Building, block([-10.0, 0.0, -10.0], [10.0, 30.0, 10.0]));
        scene.add_role_object(Role::Label, block([0.0, 30.0, 0.0], [1.0, 31.0, 1.0]));
        let mut engine = StreetView::new(StreetViewOptions::default());

        engine.activate(&mut scene).unwrap();

        assert!(!scene.role_object(Role::Label).unwrap().visible);
        assert!(scene.role_object(Role::Building).unwrap().visible);
        // ground top 0, eye 6, footprint 100 * 0.3 behind the centre
        assert!((scene.camera.position - Vector3::new(0.0, 6.0, 30.0)).magnitude() < 1e-4);
        let state = engine.state().unwrap();
        assert!(state.grounded);
        assert_eq!(state.vertical_velocity, 0.0);
        // camera looked down -Z before activation
        assert!((state.heading.abs() - PI).abs() < 1e-4);
        assert!((scene.camera.forward() - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-4);

        engine.deactivate(&mut scene).unwrap();
        assert!(scene.role_object(Role::Label).unwrap().visible);
    }

    #[test]
    fn transitions_are_checked() {
        let mut scene = campus();
        let mut engine = StreetView::new(StreetViewOptions::default());
        assert_eq!(engine.deactivate(&mut scene), Err(TransitionError::NotActive));
        engine.activate(&mut scene).unwrap();
        assert_eq!(engine.activate(&mut scene), Err(TransitionError::AlreadyActive));
        engine.deactivate(&mut scene).unwrap();
        assert!(!engine.is_active());
    }

    #[test]
    fn walking_into_wall_stops_short() {
        let start = Vector3::new(1.3, 6.0, 0.0);
        let (mut scene, mut engine) = walled(start);
        let face = start.z - 2.0;
        engine.handle_key(Key::W, true);

        for _ in 0..60 {
            engine.update(FRAME, &mut scene);
            let z = scene.camera.position.z;
            assert!(z > face, "passed through the wall at z = {z}");
        }
        assert!(scene.camera.position.z - face >= 0.75);
        assert!((scene.camera.position.x - start.x).abs() < 1e-4);
    }

    #[test]
    fn huge_frame_does_not_tunnel() {
        let start = Vector3::new(1.3, 6.0, 0.0);
        let (mut scene, mut engine) = walled(start);
        engine.handle_key(Key::ArrowUp, true);
        engine.update(Duration::from_millis(500), &mut scene);
        assert!(scene.camera.position.z - (start.z - 2.0) >= 0.75);
    }

    #[test]
    fn resting_player_stays_on_ground() {
        let mut scene = campus();
        let mut engine = StreetView::new(StreetViewOptions::default());
        engine.activate(&mut scene).unwrap();
        engine.handle_key(Key::D, true);
        run(&mut engine, &mut scene, 30);

        let state = engine.state().unwrap();
        assert!(state.grounded);
        assert_eq!(state.vertical_velocity, 0.0);
        assert!((scene.camera.position.y - engine.standing_height(&scene)).abs() < 1e-5);
    }

    #[test]
    fn jump_rises_then_lands() {
        let mut scene = campus();
        let mut engine = StreetView::new(StreetViewOptions::default());
        engine.activate(&mut scene).unwrap();

        engine.handle_key(Key::Space, true);
        engine.update(FRAME, &mut scene);
        let state = *engine.state().unwrap();
        assert!(!state.grounded);
        assert!(state.vertical_velocity > 0.0);
        assert!(scene.camera.position.y > 6.0);

        // holding space must not jump again on landing
        run(&mut engine, &mut scene, 120);
        let state = engine.state().unwrap();
        assert!(state.grounded);
        assert!((scene.camera.position.y - 6.0).abs() < 1e-5);
    }

    #[test]
    fn ceiling_stops_the_jump() {
        let mut scene = campus();
        // a slab 4 units above the eye
        scene.add_role_object(Role::Building, block([-50.0, 10.0, -50.0], [50.0, 11.0, 50.0]));
        let mut engine = StreetView::new(StreetViewOptions::default());
        engine.activate(&mut scene).unwrap();

        engine.handle_key(Key::Space, true);
        let mut peak: f32 = 0.0;
        for _ in 0..60 {
            engine.update(FRAME, &mut scene);
            peak = peak.max(scene.camera.position.y);
        }
        assert!(peak <= 10.0 - 1.5 + 1e-4);
        assert!(engine.state().unwrap().grounded);
    }

    #[test]
    fn arrows_turn_in_place() {
        let mut scene = campus();
        let mut engine = StreetView::new(StreetViewOptions::default());
        engine.activate(&mut scene).unwrap();
        let position = scene.camera.position;
        let heading = engine.state().unwrap().heading;

        engine.handle_key(Key::ArrowLeft, true);
        run(&mut engine, &mut scene, 10);
        let turned = engine.state().unwrap().heading - heading;
        assert!((turned - 0.25).abs() < 1e-3);
        assert!((scene.camera.position - position).magnitude() < 1e-5);
    }

    #[test]
    fn escape_requests_exit() {
        let mut scene = campus();
        let mut engine = StreetView::new(StreetViewOptions::default());
        assert_eq!(engine.handle_key(Key::W, true), KeyOutcome::Ignored);
        engine.activate(&mut scene).unwrap();
        assert_eq!(engine.handle_key(Key::Escape, true), KeyOutcome::Exit);
        assert_eq!(engine.handle_key(Key::Other, true), KeyOutcome::Ignored);
    }
}
