pub mod camera_utils;
pub mod fly_to;
pub mod view_camera;

pub use camera_utils::{CameraUniform, Viewport};
pub use fly_to::{CameraAnimation, Easing};
pub use view_camera::ViewCamera;
