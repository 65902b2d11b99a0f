use cgmath::{Matrix4, SquareMatrix, Vector3, Vector4};

pub trait Camera: Sized {
    fn build_view_projection_matrix(&self) -> Matrix4<f32>;
}

/// Size of the drawable area in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Pixel coordinates (origin top-left) to normalized device coordinates.
    pub fn to_ndc(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (2.0 * x) / self.width.max(1.0) - 1.0,
            1.0 - (2.0 * y) / self.height.max(1.0),
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct CameraUniform {
    /// The eye position of the camera in homogenous coordinates.
    ///
    /// Homogenous coordinates are used to fullfill the 16 byte alignment requirement.
    pub view_position: [f32; 4],

    /// Contains the view projection matrix.
    pub view_proj: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: convert_matrix4_to_array(Matrix4::identity()),
        }
    }
}

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    let mut result = [[0.0; 4]; 4];

    for i in 0..4 {
        for j in 0..4 {
            result[i][j] = matrix4[i][j];
        }
    }

    result
}

/// Projects a world point to pixel coordinates. Returns `None` behind the camera.
pub fn project_to_screen(
    view_proj: &Matrix4<f32>,
    point: Vector3<f32>,
    viewport: Viewport,
) -> Option<[f32; 2]> {
    let clip = view_proj * Vector4::new(point.x, point.y, point.z, 1.0);
    if clip.w <= f32::EPSILON {
        return None;
    }
    let ndc_x = clip.x / clip.w;
    let ndc_y = clip.y / clip.w;
    Some([
        (ndc_x + 1.0) * 0.5 * viewport.width,
        (1.0 - ndc_y) * 0.5 * viewport.height,
    ])
}
