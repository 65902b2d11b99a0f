use std::collections::HashSet;

use serde_json::Value;

use crate::error::StoreError;

use super::marker::{Marker, MarkerDraft, MarkerId, MarkerPatch, Position};
use super::search::search;
use super::storage::KeyValueStorage;
use super::transfer::ExportBundle;

const DEFAULT_WARN_BYTES: usize = 8 * 1024 * 1024;

/// How a store derives ids for new markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScheme {
    /// `photo_<hex>` from the marker name. Ids are migrated on load.
    NameHash,
    /// Milliseconds since the epoch.
    Timestamp,
}

impl IdScheme {
    fn assign(self, name: &str) -> MarkerId {
        match self {
            IdScheme::NameHash => MarkerId::from_name(name),
            IdScheme::Timestamp => MarkerId::from_timestamp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Add records whose id is not present yet.
    Merge,
    /// Overwrite the whole collection.
    Replace,
}

/// A persisted marker collection under one storage key.
///
/// Every mutation is applied to a copy and written out before it is
/// committed, so a failed write leaves the collection as it was.
pub struct MarkerStore<S: KeyValueStorage> {
    storage: S,
    key: String,
    scheme: IdScheme,
    markers: Vec<Marker>,
    warn_bytes: usize,
}

impl<S: KeyValueStorage> MarkerStore<S> {
    pub fn open(storage: S, key: impl Into<String>, scheme: IdScheme) -> Self {
        let mut store = Self {
            storage,
            key: key.into(),
            scheme,
            markers: Vec::new(),
            warn_bytes: DEFAULT_WARN_BYTES,
        };
        store.reload();
        store
    }

    pub fn with_warn_bytes(mut self, warn_bytes: usize) -> Self {
        self.warn_bytes = warn_bytes;
        self
    }

    /// Re-reads the collection from storage, recovering from corrupt data.
    pub fn reload(&mut self) {
        let mut markers = self.read_records();
        let mut changed = false;

        if self.scheme == IdScheme::NameHash {
            for marker in &mut markers {
                let id = MarkerId::from_name(&marker.name);
                if marker.id != id {
                    log::info!("Migrating marker id {} -> {} ({})", marker.id, id, marker.name);
                    marker.id = id;
                    changed = true;
                }
            }
        }

        let before = markers.len();
        dedup_by_id(&mut markers);
        if markers.len() != before {
            log::warn!(
                "Dropped {} duplicate marker(s) from {}",
                before - markers.len(),
                self.key
            );
            changed = true;
        }

        if changed {
            if let Err(e) = self.persist(&markers) {
                log::warn!("Could not save migrated markers for {}: {}", self.key, e);
            }
        }
        self.markers = markers;
    }

    fn read_records(&mut self) -> Vec<Marker> {
        let text = match self.storage.get(&self.key) {
            Ok(Some(text)) => text,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("Could not read {}: {}", self.key, e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match serde_json::from_value::<Marker>(item) {
                    Ok(marker) => Some(marker),
                    Err(e) => {
                        log::warn!("Skipping invalid marker record in {}: {}", self.key, e);
                        None
                    }
                })
                .collect(),
            Ok(_) | Err(_) => {
                log::warn!("Stored markers under {} are corrupt, clearing", self.key);
                if let Err(e) = self.storage.remove(&self.key) {
                    log::warn!("Could not clear {}: {}", self.key, e);
                }
                Vec::new()
            }
        }
    }

    fn persist(&mut self, markers: &[Marker]) -> Result<(), StoreError> {
        let text = serde_json::to_string(markers)?;
        if text.len() > self.warn_bytes {
            log::warn!(
                "Marker data for {} is {:.1} MB and may exceed storage limits",
                self.key,
                text.len() as f64 / (1024.0 * 1024.0)
            );
        }
        self.storage.set(&self.key, &text)?;
        Ok(())
    }

    fn commit(&mut self, next: Vec<Marker>) -> Result<(), StoreError> {
        self.persist(&next)?;
        self.markers = next;
        Ok(())
    }

    fn index_of(&self, id: &MarkerId) -> Option<usize> {
        self.markers.iter().position(|m| &m.id == id)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn scheme(&self) -> IdScheme {
        self.scheme
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn get(&self, id: &MarkerId) -> Option<&Marker> {
        self.markers.iter().find(|m| &m.id == id)
    }

    pub fn contains(&self, id: &MarkerId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn list(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn placed(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter().filter(|m| m.is_placed())
    }

    pub fn add(&mut self, draft: MarkerDraft) -> Result<MarkerId, StoreError> {
        let id = draft
            .id
            .clone()
            .unwrap_or_else(|| self.scheme.assign(&draft.name));
        if self.contains(&id) {
            return Err(StoreError::DuplicateId(id));
        }

        let mut next = self.markers.clone();
        next.push(draft.into_marker(id.clone()));
        self.commit(next)?;
        log::debug!("Added marker {} to {}", id, self.key);
        Ok(id)
    }

    /// Applies `patch` and returns the updated marker, or `None` for an unknown id.
    ///
    /// Renaming a name-hash marker moves it to the id of its new name.
    pub fn update(&mut self, id: &MarkerId, patch: MarkerPatch) -> Result<Option<Marker>, StoreError> {
        let Some(index) = self.index_of(id) else {
            return Ok(None);
        };

        let mut next = self.markers.clone();
        let marker = &mut next[index];
        marker.apply(patch);
        if self.scheme == IdScheme::NameHash {
            let new_id = MarkerId::from_name(&marker.name);
            if &new_id != id {
                if self.contains(&new_id) {
                    return Err(StoreError::DuplicateId(new_id));
                }
                marker.id = new_id;
            }
        }
        let updated = marker.clone();
        self.commit(next)?;
        Ok(Some(updated))
    }

    pub fn delete(&mut self, id: &MarkerId) -> Result<Option<Marker>, StoreError> {
        let Some(index) = self.index_of(id) else {
            return Ok(None);
        };

        let mut next = self.markers.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        log::debug!("Deleted marker {} from {}", id, self.key);
        Ok(Some(removed))
    }

    /// Places or unplaces a marker. Returns false for an unknown id.
    pub fn set_position(&mut self, id: &MarkerId, position: Option<Position>) -> Result<bool, StoreError> {
        Ok(self.update(id, MarkerPatch::position(position))?.is_some())
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.commit(Vec::new())
    }

    /// Adds or replaces records in bulk. Returns how many records were stored.
    pub fn import(&mut self, records: Vec<Marker>, mode: ImportMode) -> Result<usize, StoreError> {
        let mut incoming = records;
        if self.scheme == IdScheme::NameHash {
            for marker in &mut incoming {
                marker.id = MarkerId::from_name(&marker.name);
            }
        }

        let next = match mode {
            ImportMode::Replace => {
                dedup_by_id(&mut incoming);
                incoming
            }
            ImportMode::Merge => {
                let mut next = self.markers.clone();
                next.extend(incoming);
                dedup_by_id(&mut next);
                next
            }
        };

        let added = match mode {
            ImportMode::Replace => next.len(),
            ImportMode::Merge => next.len() - self.markers.len(),
        };
        self.commit(next)?;
        log::info!("Imported {} marker(s) into {}", added, self.key);
        Ok(added)
    }

    /// Makes sure every name has a marker, adding unplaced ones as needed.
    ///
    /// Existing markers are matched by name and keep their position.
    pub fn ensure_named<I, N>(&mut self, names: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let mut next = self.markers.clone();
        let mut changed = 0;

        for name in names {
            let name = name.as_ref();
            let id = self.scheme.assign(name);
            match next.iter_mut().find(|m| m.name == name) {
                Some(existing) => {
                    if self.scheme == IdScheme::NameHash && existing.id != id {
                        existing.id = id;
                        changed += 1;
                    }
                }
                None => {
                    next.push(Marker {
                        id,
                        name: name.to_string(),
                        description: None,
                        image_path: Some(name.to_string()),
                        image_data: None,
                        position: None,
                    });
                    changed += 1;
                }
            }
        }

        if changed > 0 {
            dedup_by_id(&mut next);
            self.commit(next)?;
        }
        Ok(changed)
    }

    /// Placed markers whose display name contains `query`.
    pub fn search(&self, query: &str) -> Vec<&Marker> {
        search(&self.markers, query)
    }

    pub fn export(&self) -> ExportBundle {
        ExportBundle::new(self.markers.clone())
    }

    /// Copies positions from `bundle` onto matching markers.
    ///
    /// Records match by id first, then by name. Returns the number updated.
    pub fn import_positions(&mut self, bundle: &ExportBundle) -> Result<usize, StoreError> {
        let mut next = self.markers.clone();
        let updated = bundle.apply_positions(&mut next);
        if updated > 0 {
            self.commit(next)?;
        }
        log::info!("Imported {} marker position(s) into {}", updated, self.key);
        Ok(updated)
    }
}

/// Keeps the first marker for each id.
fn dedup_by_id(markers: &mut Vec<Marker>) {
    let mut seen = HashSet::new();
    markers.retain(|m| seen.insert(m.id.clone()));
}
