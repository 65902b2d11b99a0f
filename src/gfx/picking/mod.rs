//! # Ray Casting
//!
//! Rays, bounding boxes and ray/triangle tests shared by three consumers:
//!
//! 1. **Street view collision**: horizontal and vertical probes against the building
//! 2. **Position picking**: clicks resolved to a point on solid geometry
//! 3. **Marker selection**: clicks resolved to the marker under the cursor
//!
//! Scene-level queries live on [`Scene::raycast`](crate::gfx::scene::Scene::raycast);
//! this module holds the geometric primitives and screen-to-ray unprojection.

use cgmath::{ElementWise, InnerSpace, Matrix4, SquareMatrix, Vector3, Vector4, Zero};

use crate::gfx::camera::{camera_utils::Viewport, ViewCamera};
use crate::gfx::scene::ObjectId;

/// A 3D ray for intersection testing
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Ray origin point in world space
    pub origin: Vector3<f32>,
    /// Ray direction (normalized)
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }

    /// Möller–Trumbore intersection, double sided.
    ///
    /// Returns the distance along the ray, or `None` for a miss, a hit behind
    /// the origin, or a ray parallel to the triangle plane.
    pub fn intersect_triangle(&self, tri: &[Vector3<f32>; 3]) -> Option<f32> {
        const EPS: f32 = 1e-7;

        let edge1 = tri[1] - tri[0];
        let edge2 = tri[2] - tri[0];
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < EPS {
            return None;
        }
        let inv_det = 1.0 / det;

        let s = self.origin - tri[0];
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(q) * inv_det;
        (t > EPS).then_some(t)
    }
}

/// Axis-aligned bounding box for intersection testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vector3<f32>,
    /// Maximum corner of the bounding box
    pub max: Vector3<f32>,
}

impl AABB {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Create AABB from a set of vertices
    pub fn from_vertices(vertices: &[[f32; 3]]) -> Self {
        if vertices.is_empty() {
            return Self::new(Vector3::zero(), Vector3::zero());
        }

        let mut min = Vector3::from(vertices[0]);
        let mut max = min;

        for vertex in vertices.iter().skip(1) {
            let v = Vector3::from(*vertex);
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            min.z = min.z.min(v.z);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
            max.z = max.z.max(v.z);
        }

        Self::new(min, max)
    }

    pub fn union(&self, other: &AABB) -> AABB {
        AABB::new(
            Vector3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            Vector3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        )
    }

    /// Union of all boxes, `None` when the iterator is empty.
    pub fn union_all<'a>(boxes: impl IntoIterator<Item = &'a AABB>) -> Option<AABB> {
        boxes
            .into_iter()
            .fold(None, |acc: Option<AABB>, b| Some(acc.map_or(*b, |a| a.union(b))))
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn max_extent(&self) -> f32 {
        let s = self.size();
        s.x.max(s.y).max(s.z)
    }

    /// Test ray-AABB intersection
    /// Returns the distance to intersection point, or None if no intersection
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let inv_dir = Vector3::new(
            1.0 / ray.direction.x,
            1.0 / ray.direction.y,
            1.0 / ray.direction.z,
        );

        let t_min = (self.min - ray.origin).mul_element_wise(inv_dir);
        let t_max = (self.max - ray.origin).mul_element_wise(inv_dir);

        let t1 = Vector3::new(
            nan_min(t_min.x, t_max.x),
            nan_min(t_min.y, t_max.y),
            nan_min(t_min.z, t_max.z),
        );
        let t2 = Vector3::new(
            nan_max(t_min.x, t_max.x),
            nan_max(t_min.y, t_max.y),
            nan_max(t_min.z, t_max.z),
        );

        let t_near = t1.x.max(t1.y.max(t1.z));
        let t_far = t2.x.min(t2.y.min(t2.z));

        if t_near <= t_far && t_far >= 0.0 {
            Some(if t_near >= 0.0 { t_near } else { t_far })
        } else {
            None
        }
    }

    /// Apply a transformation matrix to the AABB
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        let corners = [
            Vector3::new(self.min.x, self.min.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.min.z),
            Vector3::new(self.min.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.max.z),
            Vector3::new(self.min.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.max.z),
        ];

        let transformed: Vec<[f32; 3]> = corners
            .iter()
            .map(|c| transform_point(matrix, *c).into())
            .collect();

        Self::from_vertices(&transformed)
    }
}

// A ray lying exactly in a slab plane yields 0 * inf = NaN; treat the slab as
// unbounded on that axis instead of poisoning the comparison.
fn nan_min(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        f32::NEG_INFINITY
    } else {
        a.min(b)
    }
}

fn nan_max(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        f32::INFINITY
    } else {
        a.max(b)
    }
}

pub fn transform_point(matrix: &Matrix4<f32>, p: Vector3<f32>) -> Vector3<f32> {
    let h = matrix * Vector4::new(p.x, p.y, p.z, 1.0);
    if h.w.abs() > f32::EPSILON && (h.w - 1.0).abs() > f32::EPSILON {
        Vector3::new(h.x / h.w, h.y / h.w, h.z / h.w)
    } else {
        h.truncate()
    }
}

/// Nearest intersection returned by a scene ray cast.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub object: ObjectId,
    /// Distance from the ray origin
    pub distance: f32,
    /// World space intersection point
    pub point: Vector3<f32>,
    /// Unit normal of the triangle that was hit. Its sign follows the
    /// triangle winding, so compare against the ray with `abs`.
    pub normal: Vector3<f32>,
}

/// Distance along a ray and the normal of the triangle it struck.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit {
    pub distance: f32,
    pub normal: Vector3<f32>,
}

/// Unit normal of `tri`, or zero for a degenerate triangle.
pub fn triangle_normal(tri: &[Vector3<f32>; 3]) -> Vector3<f32> {
    let n = (tri[1] - tri[0]).cross(tri[2] - tri[0]);
    let len = n.magnitude();
    if len > f32::EPSILON {
        n / len
    } else {
        Vector3::new(0.0, 0.0, 0.0)
    }
}

/// Convert pixel coordinates to a world-space ray through the camera.
pub fn screen_to_ray(screen_pos: (f32, f32), viewport: Viewport, camera: &ViewCamera) -> Ray {
    let (ndc_x, ndc_y) = viewport.to_ndc(screen_pos.0, screen_pos.1);

    let view_proj = camera.projection_matrix() * camera.view_matrix();
    let inv_view_proj = view_proj.invert().unwrap_or(Matrix4::from_scale(1.0));

    // OpenGL-style clip space: near plane at -1, far plane at 1
    let world_near = inv_view_proj * Vector4::new(ndc_x, ndc_y, -1.0, 1.0);
    let world_far = inv_view_proj * Vector4::new(ndc_x, ndc_y, 1.0, 1.0);

    let near_3d = world_near.truncate() / world_near.w;
    let far_3d = world_far.truncate() / world_far.w;

    Ray::new(near_3d, far_3d - near_3d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_creation() {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [-1.0, -1.0, -1.0]];
        let aabb = AABB::from_vertices(&vertices);

        assert_eq!(aabb.min, Vector3::new(-1.0, -1.0, -1.0));
        assert_eq!(aabb.max, Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_ray_aabb_intersection() {
        let aabb = AABB::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));

        let ray = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(aabb.intersect_ray(&ray), Some(4.0));

        let ray_miss = Ray::new(Vector3::new(5.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&ray_miss).is_none());
    }

    #[test]
    fn ray_on_slab_boundary_does_not_panic_or_nan() {
        let aabb = AABB::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Vector3::new(0.0, 0.5, -2.0), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(aabb.intersect_ray(&ray), Some(2.0));
    }

    #[test]
    fn triangle_hit_from_both_sides() {
        let tri = [
            Vector3::new(-1.0, -1.0, 0.0),
            Vector3::new(1.0, -1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        let front = Ray::new(Vector3::new(0.0, 0.0, 3.0), Vector3::new(0.0, 0.0, -1.0));
        let back = Ray::new(Vector3::new(0.0, 0.0, -2.0), Vector3::new(0.0, 0.0, 1.0));
        assert!((front.intersect_triangle(&tri).unwrap() - 3.0).abs() < 1e-6);
        assert!((back.intersect_triangle(&tri).unwrap() - 2.0).abs() < 1e-6);

        let away = Ray::new(Vector3::new(0.0, 0.0, 3.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(away.intersect_triangle(&tri).is_none());

        let parallel = Ray::new(Vector3::new(-5.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        assert!(parallel.intersect_triangle(&tri).is_none());
    }

    #[test]
    fn union_covers_both() {
        let a = AABB::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        let b = AABB::new(Vector3::new(-2.0, 0.5, 0.5), Vector3::new(0.5, 3.0, 0.7));
        let u = AABB::union_all([&a, &b]).unwrap();
        assert_eq!(u.min, Vector3::new(-2.0, 0.0, 0.0));
        assert_eq!(u.max, Vector3::new(1.0, 3.0, 1.0));
        assert!(AABB::union_all(std::iter::empty()).is_none());
    }

    #[test]
    fn centre_pixel_ray_follows_camera_forward() {
        let mut camera = ViewCamera::new(Vector3::new(0.0, 50.0, 100.0), 0.3, -0.5, 1.5);
        camera.resize_projection(1200, 800);
        let ray = screen_to_ray((600.0, 400.0), Viewport::new(1200.0, 800.0), &camera);
        assert!((ray.direction - camera.forward()).magnitude() < 1e-3);
        assert!((ray.origin - camera.position).magnitude() < 1.0);
    }
}
