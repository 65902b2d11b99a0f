use super::camera_utils::{convert_matrix4_to_array, Camera, CameraUniform};
use cgmath::*;

use crate::options::CameraOptions;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

pub const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2;

/// Free-look perspective camera.
///
/// Orientation is stored as yaw about world up followed by pitch about the
/// resulting local right, so the camera never rolls. Yaw 0 looks down -Z.
#[derive(Debug, Clone, Copy)]
pub struct ViewCamera {
    pub position: Vector3<f32>,
    yaw: f32,
    pitch: f32,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub uniform: CameraUniform,
}

impl Camera for ViewCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * self.projection_matrix() * self.view_matrix()
    }
}

impl ViewCamera {
    pub fn new(position: Vector3<f32>, yaw: f32, pitch: f32, aspect: f32) -> Self {
        let mut camera = Self {
            position,
            yaw,
            pitch: 0.0,
            aspect,
            fovy: Deg(75.0).into(),
            znear: 0.1,
            zfar: 1000.0,
            uniform: CameraUniform::default(),
        };
        camera.set_pitch(pitch);
        camera
    }

    pub fn from_options(options: &CameraOptions, aspect: f32) -> Self {
        let [x, y, z] = options.initial_position;
        let mut camera = Self::new(Vector3::new(x, y, z), 0.0, options.initial_pitch, aspect);
        camera.fovy = Deg(options.fov_degrees).into();
        camera.znear = options.znear;
        camera.zfar = options.zfar;
        camera
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        self.yaw = yaw;
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        self.set_yaw(yaw);
        self.set_pitch(pitch);
    }

    /// Accumulates yaw and pitch; pitch stays within ±90°.
    pub fn rotate(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.set_pitch(self.pitch + delta_pitch);
    }

    pub fn forward(&self) -> Vector3<f32> {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vector3::new(-sy * cp, sp, -cy * cp)
    }

    pub fn right(&self) -> Vector3<f32> {
        let (sy, cy) = self.yaw.sin_cos();
        Vector3::new(cy, 0.0, -sy)
    }

    pub fn up(&self) -> Vector3<f32> {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vector3::new(sp * sy, cp, sp * cy)
    }

    /// Points the camera along `direction`. A vertical direction keeps the
    /// current yaw.
    pub fn look_along(&mut self, direction: Vector3<f32>) {
        if direction.magnitude2() <= f32::EPSILON {
            return;
        }
        let dir = direction.normalize();
        if dir.x * dir.x + dir.z * dir.z > 1e-8 {
            self.yaw = (-dir.x).atan2(-dir.z);
        }
        self.set_pitch(dir.y.clamp(-1.0, 1.0).asin());
    }

    pub fn look_at(&mut self, target: Vector3<f32>) {
        self.look_along(target - self.position);
    }

    /// Dollies along the look direction; positive moves forward.
    pub fn apply_zoom(&mut self, delta: f32) {
        self.position += self.forward() * delta;
    }

    /// World units per screen pixel at the current distance to the origin.
    pub fn pan_speed(&self, viewport_height: f32) -> f32 {
        let visible_height = 2.0 * (self.fovy.0 / 2.0).tan() * self.position.magnitude();
        visible_height / viewport_height.max(1.0)
    }

    /// Pans in the camera's right/up plane by a pointer delta in pixels.
    pub fn pan(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let speed = self.pan_speed(viewport_height);
        self.position += self.right() * (-dx * speed) + self.up() * (dy * speed);
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_angle_x(Rad(-self.pitch))
            * Matrix4::from_angle_y(Rad(-self.yaw))
            * Matrix4::from_translation(-self.position)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn update_view_proj(&mut self) {
        let p = self.position;
        self.uniform.view_position = [p.x, p.y, p.z, 1.0];
        self.uniform.view_proj = convert_matrix4_to_array(self.build_view_projection_matrix());
    }
}
