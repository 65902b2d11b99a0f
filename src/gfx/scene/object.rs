use cgmath::{Matrix4, SquareMatrix, Vector3, Zero};

use crate::gfx::geometry::GeometryData;
use crate::gfx::picking::{transform_point, triangle_normal, Ray, SurfaceHit, AABB};

/// Stable handle to an object in a [`Scene`](super::Scene).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

/// How a mesh is drawn and whether it takes part in ray casts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// Opaque or translucent triangles; hit by ray casts.
    Surface,
    /// Line list outline; never hit by ray casts.
    EdgeLines,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub base_color: [f32; 4],
    pub emissive: [f32; 3],
}

impl Material {
    pub fn new(base_color: [f32; 4]) -> Self {
        Self {
            base_color,
            emissive: [0.0; 3],
        }
    }

    pub fn with_emissive(mut self, emissive: [f32; 3]) -> Self {
        self.emissive = emissive;
        self
    }

    pub fn from_rgb_hex(hex: u32, alpha: f32) -> Self {
        let r = ((hex >> 16) & 0xff) as f32 / 255.0;
        let g = ((hex >> 8) & 0xff) as f32 / 255.0;
        let b = (hex & 0xff) as f32 / 255.0;
        Self::new([r, g, b, alpha])
    }

    pub fn is_translucent(&self) -> bool {
        self.base_color[3] < 1.0
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new([0.8, 0.8, 0.8, 1.0])
    }
}

pub struct Mesh {
    pub kind: PrimitiveKind,
    /// Local-space geometry. For edge lines, consecutive vertex pairs.
    pub geometry: GeometryData,
    pub material: Material,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
    world_triangles: Vec<[Vector3<f32>; 3]>,
    world_bounds: Option<AABB>,
}

impl Mesh {
    pub fn surface(mut geometry: GeometryData, material: Material) -> Self {
        geometry.compute_normals();
        Self {
            kind: PrimitiveKind::Surface,
            geometry,
            material,
            cast_shadows: false,
            receive_shadows: false,
            world_triangles: Vec::new(),
            world_bounds: None,
        }
    }

    pub fn edge_lines(points: Vec<[f32; 3]>, color: [f32; 4]) -> Self {
        let indices = (0..points.len() as u32).collect();
        Self {
            kind: PrimitiveKind::EdgeLines,
            geometry: GeometryData {
                vertices: points,
                normals: Vec::new(),
                indices,
            },
            material: Material::new(color),
            cast_shadows: false,
            receive_shadows: false,
            world_triangles: Vec::new(),
            world_bounds: None,
        }
    }

    pub fn is_surface(&self) -> bool {
        self.kind == PrimitiveKind::Surface
    }

    pub fn world_bounds(&self) -> Option<AABB> {
        self.world_bounds
    }

    fn refresh_world_cache(&mut self, transform: &Matrix4<f32>) {
        if self.geometry.vertices.is_empty() {
            self.world_bounds = None;
            self.world_triangles.clear();
            return;
        }
        let world: Vec<[f32; 3]> = self
            .geometry
            .vertices
            .iter()
            .map(|v| transform_point(transform, Vector3::from(*v)).into())
            .collect();
        self.world_bounds = Some(AABB::from_vertices(&world));

        self.world_triangles.clear();
        if self.is_surface() {
            for tri in self.geometry.indices.chunks_exact(3) {
                if let (Some(a), Some(b), Some(c)) = (
                    world.get(tri[0] as usize),
                    world.get(tri[1] as usize),
                    world.get(tri[2] as usize),
                ) {
                    self.world_triangles
                        .push([Vector3::from(*a), Vector3::from(*b), Vector3::from(*c)]);
                }
            }
        }
    }

    /// Nearest surface hit within `max_distance`. Edge lines never hit.
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<SurfaceHit> {
        if !self.is_surface() {
            return None;
        }
        let bounds = self.world_bounds?;
        match bounds.intersect_ray(ray) {
            Some(t) if t <= max_distance => {}
            _ if contains(&bounds, ray.origin) => {}
            _ => return None,
        }

        self.world_triangles
            .iter()
            .filter_map(|tri| {
                ray.intersect_triangle(tri)
                    .filter(|&t| t <= max_distance)
                    .map(|distance| SurfaceHit {
                        distance,
                        normal: triangle_normal(tri),
                    })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

fn contains(bounds: &AABB, p: Vector3<f32>) -> bool {
    p.x >= bounds.min.x
        && p.x <= bounds.max.x
        && p.y >= bounds.min.y
        && p.y <= bounds.max.y
        && p.z >= bounds.min.z
        && p.z <= bounds.max.z
}

/// Screen-facing text attached to an object.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSprite {
    pub text: String,
    /// Offset from the object origin in world units.
    pub offset: Vector3<f32>,
}

pub struct Object {
    pub name: String,
    pub meshes: Vec<Mesh>,
    pub visible: bool,
    pub label: Option<LabelSprite>,
    transform: Matrix4<f32>,
    world_bounds: Option<AABB>,
}

impl Object {
    /// Create a new Object with identity transformation
    pub fn new(name: impl Into<String>, meshes: Vec<Mesh>) -> Self {
        let mut object = Self {
            name: name.into(),
            meshes,
            visible: true,
            label: None,
            transform: Matrix4::identity(),
            world_bounds: None,
        };
        object.refresh_world_cache();
        object
    }

    pub fn with_transform(mut self, transform: Matrix4<f32>) -> Self {
        self.set_transform(transform);
        self
    }

    pub fn with_label(mut self, label: LabelSprite) -> Self {
        self.label = Some(label);
        self
    }

    pub fn transform(&self) -> &Matrix4<f32> {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Matrix4<f32>) {
        self.transform = transform;
        self.refresh_world_cache();
    }

    /// Set translation
    pub fn set_translation(&mut self, translation: Vector3<f32>) {
        self.set_transform(Matrix4::from_translation(translation));
    }

    pub fn origin(&self) -> Vector3<f32> {
        transform_point(&self.transform, Vector3::zero())
    }

    /// World anchor of the label, if any.
    pub fn label_anchor(&self) -> Option<Vector3<f32>> {
        self.label.as_ref().map(|l| self.origin() + l.offset)
    }

    /// Marks every surface primitive as a shadow caster and receiver.
    pub fn enable_shadows(&mut self) {
        for mesh in self.meshes.iter_mut().filter(|m| m.is_surface()) {
            mesh.cast_shadows = true;
            mesh.receive_shadows = true;
        }
    }

    /// World-space bounds of the surface primitives.
    pub fn world_bounds(&self) -> Option<AABB> {
        self.world_bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes
            .iter()
            .filter(|m| m.is_surface())
            .map(|m| m.geometry.triangle_count())
            .sum()
    }

    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<SurfaceHit> {
        self.meshes
            .iter()
            .filter_map(|m| m.raycast(ray, max_distance))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn refresh_world_cache(&mut self) {
        for mesh in &mut self.meshes {
            mesh.refresh_world_cache(&self.transform);
        }
        self.world_bounds = AABB::union_all(
            self.meshes
                .iter()
                .filter(|m| m.is_surface())
                .filter_map(|m| m.world_bounds.as_ref()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::generate_box;

    #[test]
    fn world_bounds_follow_transform() {
        let mut object = Object::new(
            "crate",
            vec![Mesh::surface(
                generate_box([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]),
                Material::default(),
            )],
        );
        object.set_translation(Vector3::new(10.0, 0.0, 0.0));
        let bounds = object.world_bounds().unwrap();
        assert_eq!(bounds.min, Vector3::new(9.0, -1.0, -1.0));
        assert_eq!(bounds.max, Vector3::new(11.0, 1.0, 1.0));
    }

    #[test]
    fn edge_lines_are_ignored_by_raycast() {
        let lines = Mesh::edge_lines(vec![[0.0, -5.0, 0.0], [0.0, 5.0, 0.0]], [0.0, 0.0, 0.0, 1.0]);
        let object = Object::new("outline", vec![lines]);
        let ray = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(object.raycast(&ray, 100.0).is_none());
        assert!(object.world_bounds().is_none());
    }

    #[test]
    fn raycast_respects_max_distance() {
        let object = Object::new(
            "wall",
            vec![Mesh::surface(
                generate_box([-5.0, 0.0, -3.0], [5.0, 10.0, -2.0]),
                Material::default(),
            )],
        );
        let ray = Ray::new(Vector3::new(0.0, 5.0, 0.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = object.raycast(&ray, 10.0).unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-5);
        assert!((hit.normal.z.abs() - 1.0).abs() < 1e-5);
        assert!(object.raycast(&ray, 1.5).is_none());
    }

    #[test]
    fn shadows_only_on_surfaces() {
        let mut object = Object::new(
            "mixed",
            vec![
                Mesh::surface(generate_box([0.0; 3], [1.0; 3]), Material::default()),
                Mesh::edge_lines(vec![[0.0; 3], [1.0; 3]], [0.0, 0.0, 0.0, 0.8]),
            ],
        );
        object.enable_shadows();
        assert!(object.meshes[0].cast_shadows && object.meshes[0].receive_shadows);
        assert!(!object.meshes[1].cast_shadows);
    }

    #[test]
    fn hex_colour_decodes() {
        let m = Material::from_rgb_hex(0x667eea, 0.5);
        assert!((m.base_color[0] - 0x66 as f32 / 255.0).abs() < 1e-6);
        assert!(m.is_translucent());
    }
}
