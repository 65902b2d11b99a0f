//! Outline synthesis.
//!
//! An edge is kept when the two faces sharing it meet at more than the
//! threshold angle, or when only one face uses it. Vertices are welded by
//! quantized position first, so split normals in the source mesh don't turn
//! every triangle border into an outline.

use std::collections::HashMap;

use cgmath::{InnerSpace, Vector3};

use super::GeometryData;

const WELD_PRECISION: f32 = 1e4;

type VertexKey = (i64, i64, i64);

fn weld_key(v: [f32; 3]) -> VertexKey {
    (
        (v[0] * WELD_PRECISION).round() as i64,
        (v[1] * WELD_PRECISION).round() as i64,
        (v[2] * WELD_PRECISION).round() as i64,
    )
}

struct HalfEdge {
    start: [f32; 3],
    end: [f32; 3],
    normal: Vector3<f32>,
}

/// Returns a line list (pairs of endpoints) outlining `geometry`.
pub fn synthesize_edges(geometry: &GeometryData, threshold_degrees: f32) -> Vec<[f32; 3]> {
    let threshold_dot = threshold_degrees.to_radians().cos();
    let mut open: HashMap<(VertexKey, VertexKey), HalfEdge> = HashMap::new();
    let mut lines = Vec::new();

    for tri in geometry.indices.chunks_exact(3) {
        let Some(corners) = tri
            .iter()
            .map(|&i| geometry.vertices.get(i as usize).copied())
            .collect::<Option<Vec<_>>>()
        else {
            continue;
        };

        let keys = [weld_key(corners[0]), weld_key(corners[1]), weld_key(corners[2])];
        if keys[0] == keys[1] || keys[1] == keys[2] || keys[2] == keys[0] {
            continue;
        }

        let a = Vector3::from(corners[0]);
        let b = Vector3::from(corners[1]);
        let c = Vector3::from(corners[2]);
        let face = (b - a).cross(c - a);
        if face.magnitude2() <= f32::EPSILON * f32::EPSILON {
            continue;
        }
        let normal = face.normalize();

        for j in 0..3 {
            let next = (j + 1) % 3;
            let (ka, kb) = (keys[j], keys[next]);
            match open.remove(&(kb, ka)) {
                Some(twin) => {
                    if twin.normal.dot(normal) <= threshold_dot {
                        lines.push(twin.start);
                        lines.push(twin.end);
                    }
                }
                None => {
                    open.insert(
                        (ka, kb),
                        HalfEdge {
                            start: corners[j],
                            end: corners[next],
                            normal,
                        },
                    );
                }
            }
        }
    }

    // Unpaired edges border a single face and are always drawn.
    for edge in open.into_values() {
        lines.push(edge.start);
        lines.push(edge.end);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::generate_box;

    #[test]
    fn flat_quad_keeps_only_its_border() {
        let quad = GeometryData {
            vertices: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            normals: Vec::new(),
            indices: vec![0, 1, 2, 2, 3, 0],
        };
        let lines = synthesize_edges(&quad, 1.0);
        // four border edges, the shared diagonal is coplanar
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn box_outline_is_twelve_edges() {
        // faces don't share vertices, welding has to pair them
        let cube = generate_box([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]);
        let lines = synthesize_edges(&cube, 1.0);
        assert_eq!(lines.len(), 12 * 2);
    }
}
