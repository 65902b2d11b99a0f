//! # Geometry
//!
//! CPU-side triangle data shared by the model loader, the marker visuals and
//! the ray caster.
//!
//! - [`primitives`]: procedural spheres and boxes
//! - [`edges`]: outline synthesis for the cel-shaded look

pub mod edges;
pub mod primitives;

pub use edges::synthesize_edges;
pub use primitives::*;

use cgmath::{InnerSpace, Vector3};

use crate::gfx::picking::AABB;
use crate::gfx::scene::vertex::Vertex3D;

/// Indexed triangle geometry.
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    /// Vertex positions (x, y, z)
    pub vertices: Vec<[f32; 3]>,
    /// Per-vertex normals; may be empty until [`GeometryData::compute_normals`] runs
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (counter-clockwise winding)
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> AABB {
        AABB::from_vertices(&self.vertices)
    }

    /// Iterates triangles as position triples, skipping out-of-range indices.
    pub fn triangles(&self) -> impl Iterator<Item = [Vector3<f32>; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(move |tri| {
            let a = self.vertices.get(tri[0] as usize)?;
            let b = self.vertices.get(tri[1] as usize)?;
            let c = self.vertices.get(tri[2] as usize)?;
            Some([Vector3::from(*a), Vector3::from(*b), Vector3::from(*c)])
        })
    }

    /// Fills `normals` with area-weighted vertex normals when the source
    /// provided none.
    pub fn compute_normals(&mut self) {
        if self.normals.len() == self.vertices.len() {
            return;
        }

        let mut accum = vec![Vector3::new(0.0f32, 0.0, 0.0); self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            if i0 >= accum.len() || i1 >= accum.len() || i2 >= accum.len() {
                continue;
            }
            let v0 = Vector3::from(self.vertices[i0]);
            let v1 = Vector3::from(self.vertices[i1]);
            let v2 = Vector3::from(self.vertices[i2]);
            let face = (v1 - v0).cross(v2 - v0);
            accum[i0] += face;
            accum[i1] += face;
            accum[i2] += face;
        }

        self.normals = accum
            .into_iter()
            .map(|n| {
                if n.magnitude2() > f32::EPSILON {
                    n.normalize().into()
                } else {
                    [0.0, 1.0, 0.0]
                }
            })
            .collect();
    }

    /// Interleaved vertices for GPU upload.
    pub fn to_vertices(&self) -> Vec<Vertex3D> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, position)| Vertex3D {
                position: *position,
                normal: self.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
            })
            .collect()
    }
}
