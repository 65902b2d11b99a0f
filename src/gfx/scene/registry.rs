//! Role lookup and per-object metadata.
//!
//! Scene objects carry no ad hoc metadata. What an object *is* (a map mesh
//! with a semantic role, or the visual of a marker) lives in this side table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ObjectId;
use crate::markers::MarkerId;

/// Semantic purpose of a loaded map mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Building,
    Ground,
    Label,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Building, Role::Ground, Role::Label];

    /// Solid roles block horizontal street-view movement.
    pub fn is_solid(self) -> bool {
        matches!(self, Role::Building)
    }

    /// Roles that stay visible while walking.
    pub fn visible_in_street_view(self) -> bool {
        !matches!(self, Role::Label)
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Building => "building",
            Role::Ground => "ground",
            Role::Label => "label",
        }
    }
}

/// Metadata attached to a scene object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectTag {
    Map(Role),
    Marker(MarkerId),
}

/// Role → object mapping plus the object → tag side table.
///
/// Holds at most one object per role.
#[derive(Debug, Default)]
pub struct MeshRegistry {
    roles: HashMap<Role, ObjectId>,
    tags: HashMap<ObjectId, ObjectTag>,
}

impl MeshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `role` to `id`, returning the object previously holding the role.
    pub fn assign_role(&mut self, role: Role, id: ObjectId) -> Option<ObjectId> {
        let previous = self.roles.insert(role, id);
        if let Some(old) = previous {
            self.tags.remove(&old);
        }
        self.tags.insert(id, ObjectTag::Map(role));
        previous
    }

    pub fn get(&self, role: Role) -> Option<ObjectId> {
        self.roles.get(&role).copied()
    }

    pub fn contains(&self, role: Role) -> bool {
        self.roles.contains_key(&role)
    }

    /// Roles currently populated, in declaration order.
    pub fn roles(&self) -> impl Iterator<Item = (Role, ObjectId)> + '_ {
        Role::ALL
            .into_iter()
            .filter_map(|role| self.get(role).map(|id| (role, id)))
    }

    pub fn tag_marker(&mut self, id: ObjectId, marker: MarkerId) {
        self.tags.insert(id, ObjectTag::Marker(marker));
    }

    pub fn tag(&self, id: ObjectId) -> Option<&ObjectTag> {
        self.tags.get(&id)
    }

    pub fn marker_of(&self, id: ObjectId) -> Option<&MarkerId> {
        match self.tags.get(&id) {
            Some(ObjectTag::Marker(marker)) => Some(marker),
            _ => None,
        }
    }

    pub fn role_of(&self, id: ObjectId) -> Option<Role> {
        match self.tags.get(&id) {
            Some(ObjectTag::Map(role)) => Some(*role),
            _ => None,
        }
    }

    /// Forgets everything known about `id`.
    pub fn remove(&mut self, id: ObjectId) -> Option<ObjectTag> {
        let tag = self.tags.remove(&id);
        if let Some(ObjectTag::Map(role)) = &tag {
            if self.roles.get(role) == Some(&id) {
                self.roles.remove(role);
            }
        }
        tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_object_per_role() {
        let mut registry = MeshRegistry::new();
        assert_eq!(registry.assign_role(Role::Building, ObjectId(1)), None);
        assert_eq!(registry.assign_role(Role::Building, ObjectId(2)), Some(ObjectId(1)));
        assert_eq!(registry.get(Role::Building), Some(ObjectId(2)));
        assert!(registry.tag(ObjectId(1)).is_none());
        assert_eq!(registry.role_of(ObjectId(2)), Some(Role::Building));
    }

    #[test]
    fn removing_object_clears_role() {
        let mut registry = MeshRegistry::new();
        registry.assign_role(Role::Ground, ObjectId(7));
        registry.tag_marker(ObjectId(8), MarkerId::new("photo_1"));

        assert_eq!(registry.remove(ObjectId(7)), Some(ObjectTag::Map(Role::Ground)));
        assert!(!registry.contains(Role::Ground));
        assert_eq!(registry.marker_of(ObjectId(8)), Some(&MarkerId::new("photo_1")));
        assert_eq!(registry.roles().count(), 0);
    }

    #[test]
    fn only_building_is_solid() {
        assert!(Role::Building.is_solid());
        assert!(!Role::Ground.is_solid());
        assert!(!Role::Label.visible_in_street_view());
    }
}
