use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use cgmath::Vector3;
use serde::{Deserialize, Serialize};

const IMAGE_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// Stable marker identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(String);

impl MarkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Deterministic id for a photo name: `photo_` + hex of the absolute
    /// 32-bit `h = h * 31 + unit` hash over UTF-16 code units.
    ///
    /// Matches ids already persisted by earlier versions of the viewer.
    pub fn from_name(name: &str) -> Self {
        let hash = name
            .encode_utf16()
            .fold(0i32, |h, unit| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(unit as i32));
        Self(format!("photo_{:x}", (hash as i64).abs()))
    }

    /// Millisecond timestamp id, strictly increasing within the process.
    pub fn from_timestamp() -> Self {
        static LAST: AtomicU64 = AtomicU64::new(0);

        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let mut last = LAST.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match LAST.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return Self(next.to_string()),
                Err(actual) => last = actual,
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_vec3(self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl From<Vector3<f32>> for Position {
    fn from(v: Vector3<f32>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// A point of interest. A marker without a position is known but not placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: MarkerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
}

impl Marker {
    pub fn is_placed(&self) -> bool {
        self.position.is_some()
    }

    /// Name with any image extension removed.
    pub fn display_name(&self) -> &str {
        display_name(&self.name)
    }

    pub fn apply(&mut self, patch: MarkerPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(image_path) = patch.image_path {
            self.image_path = image_path;
        }
        if let Some(image_data) = patch.image_data {
            self.image_data = image_data;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
    }
}

pub fn display_name(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map_or(name, |ext| &name[..name.len() - ext.len()])
}

/// Input to [`MarkerStore::add`](super::MarkerStore::add). Without an id the
/// store assigns one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerDraft {
    pub id: Option<MarkerId>,
    pub name: String,
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub image_data: Option<String>,
    pub position: Option<Position>,
}

impl MarkerDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn into_marker(self, id: MarkerId) -> Marker {
        Marker {
            id,
            name: self.name,
            description: self.description,
            image_path: self.image_path,
            image_data: self.image_data,
            position: self.position,
        }
    }
}

/// Field updates; `None` leaves a field untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub image_path: Option<Option<String>>,
    pub image_data: Option<Option<String>>,
    pub position: Option<Option<Position>>,
}

impl MarkerPatch {
    pub fn position(position: Option<Position>) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_hash_matches_persisted_ids() {
        // "a" = 97 = 0x61
        assert_eq!(MarkerId::from_name("a").as_str(), "photo_61");
        // 97 * 31 + 98 = 3105
        assert_eq!(MarkerId::from_name("ab").as_str(), "photo_c21");
        assert_eq!(MarkerId::from_name("").as_str(), "photo_0");
    }

    #[test]
    fn name_hash_is_deterministic_for_cjk_names() {
        let a = MarkerId::from_name("圖書館.jpg");
        let b = MarkerId::from_name("圖書館.jpg");
        assert_eq!(a, b);
        assert_ne!(a, MarkerId::from_name("體育館.jpg"));
        assert!(a.as_str().starts_with("photo_"));
    }

    #[test]
    fn timestamp_ids_are_unique() {
        let ids: Vec<MarkerId> = (0..1000).map(|_| MarkerId::from_timestamp()).collect();
        let mut sorted = ids.clone();
        sorted.sort_by_key(|id| id.as_str().parse::<u64>().unwrap());
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }

    #[test]
    fn display_name_strips_image_extension() {
        assert_eq!(display_name("Library.JPG"), "Library");
        assert_eq!(display_name("gate.jpeg"), "gate");
        assert_eq!(display_name("Gym"), "Gym");
        assert_eq!(display_name("notes.txt"), "notes.txt");
    }

    #[test]
    fn record_shape_matches_storage_format() {
        let marker = MarkerDraft::named("Library")
            .at(Position::new(10.0, 0.0, 10.0))
            .into_marker(MarkerId::new("1700000000000"));
        let json = serde_json::to_value(&marker).unwrap();
        assert_eq!(json["id"], "1700000000000");
        assert_eq!(json["position"]["x"], 10.0);
        assert!(json.get("imagePath").is_none());

        let unplaced: Marker =
            serde_json::from_str(r#"{"id":"photo_1","name":"Gate.jpg","imagePath":"Gate.jpg","position":null}"#)
                .unwrap();
        assert!(!unplaced.is_placed());
        assert_eq!(unplaced.image_path.as_deref(), Some("Gate.jpg"));
    }

    #[test]
    fn patch_clears_and_sets() {
        let mut marker = MarkerDraft::named("Gym").at(Position::new(1.0, 2.0, 3.0)).into_marker(MarkerId::new("x"));
        marker.apply(MarkerPatch {
            description: Some(Some("Indoor courts".into())),
            position: Some(None),
            ..Default::default()
        });
        assert_eq!(marker.description.as_deref(), Some("Indoor courts"));
        assert!(!marker.is_placed());
        assert_eq!(marker.name, "Gym");
    }
}
