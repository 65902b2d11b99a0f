use std::collections::{HashMap, HashSet};

use cgmath::Vector3;

use crate::gfx::geometry::generate_sphere;
use crate::gfx::picking::Ray;
use crate::gfx::scene::{LabelSprite, Material, Mesh, Object, ObjectId, ObjectTag, Scene};

use super::marker::{Marker, MarkerId, Position};

const OUTER_RADIUS: f32 = 1.2;
const INNER_RADIUS: f32 = 0.8;
const SPHERE_SEGMENTS: u32 = 16;
const LABEL_HEIGHT: f32 = 2.5;

/// Longest ray used when hit-testing marker objects.
pub const HIT_TEST_RANGE: f32 = 10_000.0;

fn emissive(hex: u32, intensity: f32) -> [f32; 3] {
    let c = Material::from_rgb_hex(hex, 1.0).base_color;
    [c[0] * intensity, c[1] * intensity, c[2] * intensity]
}

/// Builds the scene object for a placed marker: two concentric spheres and a label.
pub fn marker_object(marker: &Marker, position: Position) -> Object {
    let outer = Mesh::surface(
        generate_sphere(OUTER_RADIUS, SPHERE_SEGMENTS, SPHERE_SEGMENTS),
        Material::from_rgb_hex(0x667eea, 0.8).with_emissive(emissive(0x667eea, 0.4)),
    );
    let inner = Mesh::surface(
        generate_sphere(INNER_RADIUS, SPHERE_SEGMENTS, SPHERE_SEGMENTS),
        Material::from_rgb_hex(0xffffff, 0.9).with_emissive(emissive(0x764ba2, 0.6)),
    );

    let mut object = Object::new(marker.display_name(), vec![outer, inner]).with_label(LabelSprite {
        text: marker.display_name().to_string(),
        offset: Vector3::new(0.0, LABEL_HEIGHT, 0.0),
    });
    object.set_translation(position.to_vec3());
    object
}

#[derive(Debug, Clone)]
struct Placed {
    object: ObjectId,
    name: String,
    position: Position,
}

/// Keeps one scene object per placed marker.
#[derive(Debug, Default)]
pub struct SceneMarkers {
    placed: HashMap<MarkerId, Placed>,
}

impl SceneMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings the scene in line with `markers`.
    ///
    /// Objects of removed or unplaced markers are dropped; a changed name or
    /// position recreates the object. Returns the number of objects touched.
    pub fn sync<'a, I>(&mut self, scene: &mut Scene, markers: I) -> usize
    where
        I: IntoIterator<Item = &'a Marker>,
    {
        let wanted: Vec<(&Marker, Position)> = markers
            .into_iter()
            .filter_map(|m| m.position.map(|p| (m, p)))
            .collect();
        let wanted_ids: HashSet<&MarkerId> = wanted.iter().map(|(m, _)| &m.id).collect();
        let mut touched = 0;

        let stale: Vec<MarkerId> = self
            .placed
            .iter()
            .filter(|(id, placed)| {
                !wanted_ids.contains(id)
                    || wanted.iter().any(|(m, p)| {
                        &m.id == *id && (m.name != placed.name || *p != placed.position)
                    })
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in stale {
            if let Some(placed) = self.placed.remove(&id) {
                scene.remove_object(placed.object);
                touched += 1;
            }
        }

        for (marker, position) in wanted {
            if self.placed.contains_key(&marker.id) {
                continue;
            }
            let object = scene.add_object(marker_object(marker, position));
            scene.registry.tag_marker(object, marker.id.clone());
            self.placed.insert(
                marker.id.clone(),
                Placed {
                    object,
                    name: marker.name.clone(),
                    position,
                },
            );
            touched += 1;
        }

        if touched > 0 {
            log::debug!("Marker sync touched {} object(s), {} placed", touched, self.placed.len());
        }
        touched
    }

    /// Removes every marker object from the scene.
    pub fn clear(&mut self, scene: &mut Scene) {
        for (_, placed) in self.placed.drain() {
            scene.remove_object(placed.object);
        }
    }

    /// Nearest marker under `ray`; map meshes do not occlude.
    pub fn hit_test(&self, scene: &Scene, ray: &Ray) -> Option<MarkerId> {
        let hit = scene.raycast(ray, HIT_TEST_RANGE, |_, tag| {
            matches!(tag, Some(ObjectTag::Marker(_)))
        })?;
        scene.registry.marker_of(hit.object).cloned()
    }

    pub fn object_of(&self, id: &MarkerId) -> Option<ObjectId> {
        self.placed.get(id).map(|p| p.object)
    }

    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::ViewCamera;
    use crate::markers::marker::MarkerDraft;
    use crate::markers::storage::MemoryStorage;
    use crate::markers::store::{IdScheme, MarkerStore};

    fn scene() -> Scene {
        Scene::new(ViewCamera::new(Vector3::new(0.0, 50.0, 100.0), 0.0, -0.5, 1.0))
    }

    fn assert_bijection(scene: &Scene, sync: &SceneMarkers, markers: &[Marker]) {
        let placed: Vec<&Marker> = markers.iter().filter(|m| m.is_placed()).collect();
        assert_eq!(sync.len(), placed.len());
        for marker in placed {
            let object = sync.object_of(&marker.id).unwrap();
            assert_eq!(scene.registry.marker_of(object), Some(&marker.id));
        }
        let tagged = scene
            .objects()
            .filter(|(id, _)| scene.registry.marker_of(*id).is_some())
            .count();
        assert_eq!(tagged, sync.len());
    }

    #[test]
    fn library_marker_appears_and_is_hit() {
        let mut store = MarkerStore::open(MemoryStorage::new(), "photoMarkers", IdScheme::NameHash);
        let id = store
            .add(MarkerDraft::named("Library.jpg").at(Position::new(10.0, 0.0, 10.0)))
            .unwrap();
        let mut scene = scene();
        let mut sync = SceneMarkers::new();
        sync.sync(&mut scene, store.list());

        let object = scene.object(sync.object_of(&id).unwrap()).unwrap();
        assert_eq!(object.origin(), Vector3::new(10.0, 0.0, 10.0));
        assert_eq!(object.label.as_ref().unwrap().text, "Library");
        assert_eq!(object.label_anchor(), Some(Vector3::new(10.0, 2.5, 10.0)));

        let ray = Ray::new(Vector3::new(10.3, 50.0, 10.2), Vector3::new(0.0, -1.0, 0.0));
        assert_eq!(sync.hit_test(&scene, &ray), Some(id));

        let miss = Ray::new(Vector3::new(30.0, 50.0, 10.0), Vector3::new(0.0, -1.0, 0.0));
        assert_eq!(sync.hit_test(&scene, &miss), None);
    }

    #[test]
    fn bijection_holds_across_edits() {
        let mut store = MarkerStore::open(MemoryStorage::new(), "mapMarkers", IdScheme::Timestamp);
        let a = store.add(MarkerDraft::named("Gate").at(Position::new(0.0, 0.0, 0.0))).unwrap();
        let b = store.add(MarkerDraft::named("Gym").at(Position::new(5.0, 0.0, 5.0))).unwrap();
        store.add(MarkerDraft::named("Unplaced")).unwrap();

        let mut scene = scene();
        let mut sync = SceneMarkers::new();
        assert_eq!(sync.sync(&mut scene, store.list()), 2);
        assert_bijection(&scene, &sync, store.list());

        let before = sync.object_of(&a).unwrap();
        store.set_position(&a, Some(Position::new(1.0, 0.0, 1.0))).unwrap();
        store.delete(&b).unwrap();
        sync.sync(&mut scene, store.list());
        assert_bijection(&scene, &sync, store.list());
        assert_ne!(sync.object_of(&a).unwrap(), before);
        assert!(sync.object_of(&b).is_none());

        // unchanged markers are left alone
        assert_eq!(sync.sync(&mut scene, store.list()), 0);

        store.set_position(&a, None).unwrap();
        sync.sync(&mut scene, store.list());
        assert!(sync.is_empty());
        assert_eq!(scene.object_count(), 0);
    }

    #[test]
    fn hit_test_ignores_map_meshes() {
        use crate::gfx::geometry::generate_box;
        use crate::gfx::scene::Role;

        let mut scene = scene();
        scene.add_role_object(
            Role::Building,
            Object::new(
                "roof",
                vec![Mesh::surface(generate_box([-5.0, 20.0, -5.0], [5.0, 21.0, 5.0]), Material::default())],
            ),
        );
        let marker = MarkerDraft::named("Hall").at(Position::new(0.0, 0.0, 0.0)).into_marker(MarkerId::new("1"));
        let mut sync = SceneMarkers::new();
        sync.sync(&mut scene, [&marker]);

        let ray = Ray::new(Vector3::new(0.3, 50.0, 0.2), Vector3::new(0.0, -1.0, 0.0));
        assert_eq!(sync.hit_test(&scene, &ray), Some(MarkerId::new("1")));

        sync.clear(&mut scene);
        assert_eq!(scene.object_count(), 1);
    }
}
