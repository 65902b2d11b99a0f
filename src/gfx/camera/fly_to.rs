//! Eased camera fly-to animation.
//!
//! The animation is advanced by frame delta time from inside the per-frame
//! tick, so it never races with the control schemes or street view.

use std::time::Duration;

use cgmath::{InnerSpace, Vector3};

use super::view_camera::ViewCamera;

/// Easing curve applied to animation progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Easing {
    Linear,
    /// `t * (2 - t)`: fast start, gentle arrival.
    #[default]
    QuadraticOut,
}

impl Easing {
    /// Input is clamped to [0, 1].
    #[inline]
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadraticOut => t * (2.0 - t),
        }
    }
}

/// A running camera move toward `target + offset` that keeps aiming at `target`.
#[derive(Debug, Clone)]
pub struct CameraAnimation {
    from: Vector3<f32>,
    to: Vector3<f32>,
    target: Vector3<f32>,
    duration: Duration,
    elapsed: Duration,
    easing: Easing,
}

impl CameraAnimation {
    pub fn new(
        camera: &ViewCamera,
        target: Vector3<f32>,
        offset: Vector3<f32>,
        duration: Duration,
    ) -> Self {
        Self {
            from: camera.position,
            to: target + offset,
            target,
            duration,
            elapsed: Duration::ZERO,
            easing: Easing::default(),
        }
    }

    /// Fly toward `target`, arriving `distance` units back along the camera's
    /// current look direction.
    pub fn toward(camera: &ViewCamera, target: Vector3<f32>, distance: f32, duration: Duration) -> Self {
        let offset = -camera.forward().normalize() * distance;
        Self::new(camera, target, offset, duration)
    }

    pub fn target(&self) -> Vector3<f32> {
        self.target
    }

    pub fn destination(&self) -> Vector3<f32> {
        self.to
    }

    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Advances by `dt` and writes the new pose into `camera`.
    /// Returns true once the animation has reached its destination.
    pub fn step(&mut self, dt: Duration, camera: &mut ViewCamera) -> bool {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        let eased = self.easing.evaluate(self.progress());
        camera.position = self.from + (self.to - self.from) * eased;
        camera.look_at(self.target);
        self.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Zero;

    #[test]
    fn quadratic_out_endpoints() {
        let ease = Easing::QuadraticOut;
        assert_eq!(ease.evaluate(0.0), 0.0);
        assert_eq!(ease.evaluate(1.0), 1.0);
        assert_eq!(ease.evaluate(0.5), 0.75);
        assert_eq!(ease.evaluate(3.0), 1.0);
    }

    #[test]
    fn animation_arrives_and_aims_at_target() {
        let mut camera = ViewCamera::new(Vector3::new(0.0, 50.0, 100.0), 0.0, -0.5, 1.0);
        let target = Vector3::new(10.0, 0.0, 10.0);
        let mut anim = CameraAnimation::toward(&camera, target, 40.0, Duration::from_millis(800));
        let destination = anim.destination();

        let mut frames = 0;
        while !anim.step(Duration::from_millis(16), &mut camera) {
            frames += 1;
            assert!(frames < 100);
        }

        assert!((camera.position - destination).magnitude() < 1e-4);
        assert!(((destination - target).magnitude() - 40.0).abs() < 1e-3);
        let to_target = (target - camera.position).normalize();
        assert!((camera.forward() - to_target).magnitude() < 1e-4);
    }

    #[test]
    fn halfway_is_past_midpoint() {
        let mut camera = ViewCamera::new(Vector3::new(0.0, 0.0, 20.0), 0.0, 0.0, 1.0);
        let mut anim = CameraAnimation::new(
            &camera,
            Vector3::new(0.0, 0.0, -10.0),
            Vector3::new(0.0, 0.0, 10.0),
            Duration::from_secs(1),
        );
        anim.step(Duration::from_millis(500), &mut camera);
        // eased 0.75 of the way from z=20 to z=0
        assert!((camera.position.z - 5.0).abs() < 1e-4);
        assert!(!anim.is_finished());
    }

    #[test]
    fn zero_duration_finishes_immediately() {
        let mut camera = ViewCamera::new(Vector3::zero(), 0.0, 0.0, 1.0);
        let mut anim = CameraAnimation::new(
            &camera,
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 5.0),
            Duration::ZERO,
        );
        assert!(anim.step(Duration::ZERO, &mut camera));
        assert!((camera.position - Vector3::new(1.0, 0.0, 5.0)).magnitude() < 1e-6);
    }
}
