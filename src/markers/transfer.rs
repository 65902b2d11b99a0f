use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

use super::marker::{Marker, MarkerId, Position};

pub const EXPORT_VERSION: &str = "1.0";

/// Marker fields carried by an export file. Inline image data is left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    #[serde(default)]
    pub id: Option<MarkerId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
}

impl From<Marker> for ExportRecord {
    fn from(marker: Marker) -> Self {
        Self {
            id: Some(marker.id),
            name: marker.name,
            image_path: marker.image_path,
            position: marker.position,
        }
    }
}

/// Portable snapshot of a marker collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub markers: Vec<ExportRecord>,
}

impl ExportBundle {
    pub fn new(markers: Vec<Marker>) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            export_date: Utc::now(),
            markers: markers.into_iter().map(ExportRecord::from).collect(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context;
        std::fs::write(path, self.to_json()?).with_context(|| format!("writing {}", path.display()))
    }

    /// Default file name, dated by the export day.
    pub fn suggested_file_name(&self) -> String {
        format!("地圖標誌資料_{}.json", self.export_date.format("%Y-%m-%d"))
    }

    /// Copies positions onto `markers`, matching by id and then by name.
    ///
    /// Records without a position are ignored. Returns the number of markers updated.
    pub fn apply_positions(&self, markers: &mut [Marker]) -> usize {
        let mut updated = 0;
        for record in &self.markers {
            let Some(position) = record.position else {
                continue;
            };
            let by_id = record
                .id
                .as_ref()
                .and_then(|id| markers.iter().position(|m| &m.id == id));
            let index = by_id.or_else(|| markers.iter().position(|m| m.name == record.name));
            if let Some(index) = index {
                markers[index].position = Some(position);
                updated += 1;
            }
        }
        updated
    }
}
