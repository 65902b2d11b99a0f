use std::time::Duration;

use cgmath::Vector3;

use crate::gfx::{
    camera::{CameraAnimation, ViewCamera},
    picking::{Ray, RayHit, AABB},
};

use super::{
    object::{Object, ObjectId},
    registry::{MeshRegistry, ObjectTag, Role},
};

/// Main scene containing objects, the camera and the role registry
pub struct Scene {
    pub camera: ViewCamera,
    pub registry: MeshRegistry,
    objects: Vec<(ObjectId, Object)>,
    next_id: u32,
    animation: Option<CameraAnimation>,
}

impl Scene {
    pub fn new(camera: ViewCamera) -> Self {
        Self {
            camera,
            registry: MeshRegistry::new(),
            objects: Vec::new(),
            next_id: 1,
            animation: None,
        }
    }

    /// Advances the fly-to animation and refreshes the camera uniform.
    pub fn update(&mut self, dt: Duration) {
        if let Some(animation) = self.animation.as_mut() {
            if animation.step(dt, &mut self.camera) {
                self.animation = None;
            }
        }
        self.camera.update_view_proj();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.resize_projection(width, height);
    }

    pub fn add_object(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push((id, object));
        id
    }

    /// Inserts a map mesh under `role`, replacing any previous holder.
    pub fn add_role_object(&mut self, role: Role, object: Object) -> ObjectId {
        let id = self.add_object(object);
        if let Some(previous) = self.registry.assign_role(role, id) {
            log::debug!("Replacing {} mesh", role.name());
            self.objects.retain(|(oid, _)| *oid != previous);
        }
        id
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<Object> {
        let index = self.objects.iter().position(|(oid, _)| *oid == id)?;
        self.registry.remove(id);
        Some(self.objects.remove(index).1)
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects
            .iter()
            .find(|(oid, _)| *oid == id)
            .map(|(_, o)| o)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects
            .iter_mut()
            .find(|(oid, _)| *oid == id)
            .map(|(_, o)| o)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter().map(|(id, o)| (*id, o))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn role_object(&self, role: Role) -> Option<&Object> {
        self.registry.get(role).and_then(|id| self.object(id))
    }

    pub fn role_bounds(&self, role: Role) -> Option<AABB> {
        self.role_object(role).and_then(Object::world_bounds)
    }

    /// Union of the bounds of the given roles that are present.
    pub fn bounds_of(&self, roles: &[Role]) -> Option<AABB> {
        let boxes: Vec<AABB> = roles.iter().filter_map(|r| self.role_bounds(*r)).collect();
        AABB::union_all(&boxes)
    }

    /// Bounds of all loaded map meshes.
    pub fn map_bounds(&self) -> Option<AABB> {
        self.bounds_of(&Role::ALL)
    }

    /// Sets a role's visibility, returning the previous value if the role is loaded.
    pub fn set_role_visible(&mut self, role: Role, visible: bool) -> Option<bool> {
        let id = self.registry.get(role)?;
        let object = self.object_mut(id)?;
        let previous = object.visible;
        object.visible = visible;
        Some(previous)
    }

    /// Nearest surface hit among objects accepted by `filter`.
    pub fn raycast<F>(&self, ray: &Ray, max_distance: f32, filter: F) -> Option<RayHit>
    where
        F: Fn(ObjectId, Option<&ObjectTag>) -> bool,
    {
        self.objects
            .iter()
            .filter(|(id, _)| filter(*id, self.registry.tag(*id)))
            .filter_map(|(id, object)| {
                object.raycast(ray, max_distance).map(|hit| RayHit {
                    object: *id,
                    distance: hit.distance,
                    point: ray.point_at(hit.distance),
                    normal: hit.normal,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Ray cast restricted to the listed map roles.
    pub fn raycast_roles(&self, ray: &Ray, max_distance: f32, roles: &[Role]) -> Option<RayHit> {
        self.raycast(ray, max_distance, |_, tag| {
            matches!(tag, Some(ObjectTag::Map(role)) if roles.contains(role))
        })
    }

    /// Ray cast against the solid (collision) roles only.
    pub fn raycast_solid(&self, ray: &Ray, max_distance: f32) -> Option<RayHit> {
        self.raycast(ray, max_distance, |_, tag| {
            matches!(tag, Some(ObjectTag::Map(role)) if role.is_solid())
        })
    }

    /// Starts an eased flight toward `target + offset`, replacing any running one.
    pub fn fly_to(&mut self, target: Vector3<f32>, offset: Vector3<f32>, duration: Duration) {
        self.animation = Some(CameraAnimation::new(&self.camera, target, offset, duration));
    }

    pub fn start_animation(&mut self, animation: CameraAnimation) {
        self.animation = Some(animation);
    }

    pub fn cancel_animation(&mut self) {
        self.animation = None;
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::generate_box;
    use crate::gfx::scene::object::{Material, Mesh};
    use crate::markers::MarkerId;
    use cgmath::InnerSpace;

    fn block(min: [f32; 3], max: [f32; 3]) -> Object {
        Object::new("block", vec![Mesh::surface(generate_box(min, max), Material::default())])
    }

    fn scene() -> Scene {
        Scene::new(ViewCamera::new(Vector3::new(0.0, 5.0, 20.0), 0.0, 0.0, 1.0))
    }

    #[test]
    fn role_replacement_keeps_one_object() {
        let mut scene = scene();
        scene.add_role_object(Role::Building, block([0.0; 3], [1.0; 3]));
        let second = scene.add_role_object(Role::Building, block([0.0; 3], [2.0; 3]));
        assert_eq!(scene.object_count(), 1);
        assert_eq!(scene.registry.get(Role::Building), Some(second));
    }

    #[test]
    fn solid_raycast_skips_ground_and_markers() {
        let mut scene = scene();
        scene.add_role_object(Role::Ground, block([-50.0, -1.0, -50.0], [50.0, 0.0, 50.0]));
        let wall = scene.add_role_object(Role::Building, block([-5.0, 0.0, -11.0], [5.0, 10.0, -10.0]));
        let marker = scene.add_object(block([-1.0, 4.0, -3.0], [1.0, 6.0, -2.0]));
        scene.registry.tag_marker(marker, MarkerId::new("photo_1"));

        let ray = Ray::new(Vector3::new(0.0, 5.0, 0.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = scene.raycast_solid(&ray, 100.0).unwrap();
        assert_eq!(hit.object, wall);
        assert!((hit.distance - 10.0).abs() < 1e-4);

        let any = scene.raycast(&ray, 100.0, |_, _| true).unwrap();
        assert_eq!(any.object, marker);

        let down = Ray::new(Vector3::new(20.0, 5.0, 0.0), Vector3::new(0.0, -1.0, 0.0));
        assert!(scene.raycast_solid(&down, 100.0).is_none());
        let ground_hit = scene.raycast_roles(&down, 100.0, &[Role::Ground]).unwrap();
        assert!((ground_hit.point.y - 0.0).abs() < 1e-4);
    }

    #[test]
    fn role_visibility_round_trip() {
        let mut scene = scene();
        assert_eq!(scene.set_role_visible(Role::Label, false), None);
        scene.add_role_object(Role::Label, block([0.0; 3], [1.0; 3]));
        assert_eq!(scene.set_role_visible(Role::Label, false), Some(true));
        assert_eq!(scene.set_role_visible(Role::Label, true), Some(false));
    }

    #[test]
    fn fly_to_runs_inside_update() {
        let mut scene = scene();
        let target = Vector3::new(10.0, 0.0, 10.0);
        scene.fly_to(target, Vector3::new(0.0, 20.0, 20.0), Duration::from_millis(800));
        for _ in 0..60 {
            scene.update(Duration::from_millis(16));
        }
        assert!(!scene.is_animating());
        assert!((scene.camera.position - Vector3::new(10.0, 20.0, 30.0)).magnitude() < 1e-4);
    }

    #[test]
    fn map_bounds_union() {
        let mut scene = scene();
        assert!(scene.map_bounds().is_none());
        scene.add_role_object(Role::Ground, block([-10.0, -1.0, -10.0], [10.0, 0.0, 10.0]));
        scene.add_role_object(Role::Building, block([-2.0, 0.0, -2.0], [2.0, 8.0, 2.0]));
        let bounds = scene.map_bounds().unwrap();
        assert_eq!(bounds.min, Vector3::new(-10.0, -1.0, -10.0));
        assert_eq!(bounds.max, Vector3::new(10.0, 8.0, 10.0));
    }
}
