//! Coordinate-frame normalization for loaded assets.
//!
//! Assets are authored Z-up. Every asset shares one pivot and one scale, so
//! their authored relative placement survives normalization.

use cgmath::{Deg, Matrix4, Vector3};

use crate::gfx::picking::AABB;

use super::loader::RawAsset;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub scale: f32,
    /// Authored point that lands on the world origin.
    pub pivot: Vector3<f32>,
    /// Union of the untransformed assets, authored frame.
    pub authored_bounds: AABB,
}

impl Normalization {
    /// Derives the shared scale and pivot from the assets that loaded.
    pub fn from_assets(assets: &[RawAsset], target_size: f32) -> Option<Self> {
        let boxes: Vec<AABB> = assets.iter().filter_map(RawAsset::authored_bounds).collect();
        let bounds = AABB::union_all(&boxes)?;
        Some(Self::from_bounds(bounds, target_size))
    }

    pub fn from_bounds(bounds: AABB, target_size: f32) -> Self {
        let size = bounds.size();
        // x and y are horizontal while still Z-up
        let footprint = size.x.max(size.y);
        let scale = if footprint > 1e-6 {
            target_size / footprint
        } else {
            1.0
        };
        let centre = bounds.center();
        Self {
            scale,
            pivot: Vector3::new(centre.x, centre.y, bounds.min.z),
            authored_bounds: bounds,
        }
    }

    /// Z-up to Y-up rotation.
    pub fn rotation() -> Matrix4<f32> {
        Matrix4::from_angle_x(Deg(-90.0))
    }

    /// Model matrix for an asset authored at `offset`.
    pub fn transform_for(&self, offset: [f32; 3]) -> Matrix4<f32> {
        let [ox, oy, oz] = offset;
        Matrix4::from_scale(self.scale)
            * Self::rotation()
            * Matrix4::from_translation(Vector3::new(ox, oy, oz) - self.pivot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::picking::transform_point;
    use cgmath::InnerSpace;

    fn assert_vec_eq(a: Vector3<f32>, b: Vector3<f32>) {
        assert!((a - b).magnitude() < 1e-3, "{:?} != {:?}", a, b);
    }

    #[test]
    fn largest_horizontal_extent_hits_target() {
        let bounds = AABB::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(90.0, 45.0, 300.0));
        let n = Normalization::from_bounds(bounds, 180.0);
        // z is vertical in the authored frame and does not count
        assert!((n.scale - 2.0).abs() < 1e-6);
    }

    #[test]
    fn footprint_is_centred_and_rests_on_zero() {
        let bounds = AABB::new(Vector3::new(10.0, 20.0, 5.0), Vector3::new(30.0, 60.0, 15.0));
        let n = Normalization::from_bounds(bounds, 180.0);
        let m = n.transform_for([0.0; 3]);
        let world = bounds.transform(&m);
        assert_vec_eq(world.center(), Vector3::new(0.0, world.center().y, 0.0));
        assert!(world.min.y.abs() < 1e-3);
        assert!((world.size().x.max(world.size().z) - 180.0).abs() < 1e-2);
    }

    #[test]
    fn authored_up_becomes_world_up() {
        let n = Normalization::from_bounds(
            AABB::new(Vector3::new(-1.0, -1.0, 0.0), Vector3::new(1.0, 1.0, 1.0)),
            2.0,
        );
        let top = transform_point(&n.transform_for([0.0; 3]), Vector3::new(0.0, 0.0, 1.0));
        assert_vec_eq(top, Vector3::new(0.0, 1.0, 0.0));
        // authored +Y (north) maps to world -Z
        let north = transform_point(&n.transform_for([0.0; 3]), Vector3::new(0.0, 1.0, 0.0));
        assert_vec_eq(north, Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn offsets_keep_relative_placement() {
        let n = Normalization::from_bounds(
            AABB::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(10.0, 10.0, 1.0)),
            20.0,
        );
        let a = transform_point(&n.transform_for([0.0; 3]), Vector3::new(1.0, 1.0, 0.0));
        let b = transform_point(&n.transform_for([3.0, 0.0, 0.0]), Vector3::new(1.0, 1.0, 0.0));
        assert_vec_eq(b - a, Vector3::new(6.0, 0.0, 0.0));
    }

    #[test]
    fn degenerate_extent_keeps_unit_scale() {
        let p = Vector3::new(1.0, 2.0, 3.0);
        let n = Normalization::from_bounds(AABB::new(p, p), 180.0);
        assert_eq!(n.scale, 1.0);
    }
}
