//! # Points of interest
//!
//! Two persisted marker collections share this module: photo markers keyed
//! by a hash of the photo name, and free pins keyed by creation time.
//! [`MarkerStore`] owns the data, [`SceneMarkers`] mirrors the placed ones
//! into the scene as clickable objects.

pub mod marker;
pub mod search;
pub mod storage;
pub mod store;
pub mod sync;
pub mod transfer;

pub use marker::{display_name, Marker, MarkerDraft, MarkerId, MarkerPatch, Position};
pub use search::search;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{IdScheme, ImportMode, MarkerStore};
pub use sync::SceneMarkers;
pub use transfer::{ExportBundle, ExportRecord};
