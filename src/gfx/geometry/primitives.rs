//! Procedural primitives.

use std::f32::consts::PI;

use super::GeometryData;

/// UV sphere centred on the origin, Y-up.
///
/// # Arguments
/// * `radius` - Sphere radius in world units
/// * `longitude_segments` - Segments around the equator (min 3)
/// * `latitude_segments` - Segments pole to pole (min 2)
pub fn generate_sphere(radius: f32, longitude_segments: u32, latitude_segments: u32) -> GeometryData {
    let mut data = GeometryData::new();

    let long_segs = longitude_segments.max(3);
    let lat_segs = latitude_segments.max(2);

    for lat in 0..=lat_segs {
        let theta = lat as f32 * PI / lat_segs as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for long in 0..=long_segs {
            let phi = long as f32 * 2.0 * PI / long_segs as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let x = sin_theta * cos_phi;
            let y = cos_theta;
            let z = sin_theta * sin_phi;

            data.vertices.push([x * radius, y * radius, z * radius]);
            data.normals.push([x, y, z]);
        }
    }

    for lat in 0..lat_segs {
        for long in 0..long_segs {
            let first = lat * (long_segs + 1) + long;
            let second = first + long_segs + 1;

            data.indices.extend_from_slice(&[first, second, first + 1]);
            data.indices.extend_from_slice(&[second, second + 1, first + 1]);
        }
    }

    data
}

/// Axis-aligned box spanning `min`..`max`, with flat per-face normals.
pub fn generate_box(min: [f32; 3], max: [f32; 3]) -> GeometryData {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;

    // (normal, four corners counter-clockwise seen from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([0.0, 0.0, 1.0], [[x0, y0, z1], [x1, y0, z1], [x1, y1, z1], [x0, y1, z1]]),
        ([0.0, 0.0, -1.0], [[x1, y0, z0], [x0, y0, z0], [x0, y1, z0], [x1, y1, z0]]),
        ([-1.0, 0.0, 0.0], [[x0, y0, z0], [x0, y0, z1], [x0, y1, z1], [x0, y1, z0]]),
        ([1.0, 0.0, 0.0], [[x1, y0, z1], [x1, y0, z0], [x1, y1, z0], [x1, y1, z1]]),
        ([0.0, 1.0, 0.0], [[x0, y1, z1], [x1, y1, z1], [x1, y1, z0], [x0, y1, z0]]),
        ([0.0, -1.0, 0.0], [[x0, y0, z0], [x1, y0, z0], [x1, y0, z1], [x0, y0, z1]]),
    ];

    let mut data = GeometryData::new();
    for (normal, corners) in faces {
        let base = data.vertices.len() as u32;
        for corner in corners {
            data.vertices.push(corner);
            data.normals.push(normal);
        }
        data.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let sphere = generate_sphere(1.2, 16, 8);
        assert_eq!(sphere.triangle_count(), 16 * 8 * 2);
        for v in &sphere.vertices {
            let r = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
            assert!((r - 1.2).abs() < 1e-5);
        }
    }

    #[test]
    fn box_has_twelve_outward_triangles() {
        let data = generate_box([0.0, 0.0, 0.0], [2.0, 1.0, 3.0]);
        assert_eq!(data.triangle_count(), 12);
        let bounds = data.bounds();
        assert_eq!(bounds.max.z, 3.0);

        let centre = cgmath::Vector3::new(1.0, 0.5, 1.5);
        for tri in data.triangles() {
            let normal = (tri[1] - tri[0]).cross(tri[2] - tri[0]);
            let outward = tri[0] - centre;
            assert!(cgmath::InnerSpace::dot(normal, outward) > 0.0);
        }
    }
}
