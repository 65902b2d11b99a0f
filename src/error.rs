//! Error types shared across the viewer.
//!
//! Library modules return these typed errors; the application layer wraps
//! them with `anyhow` context where it needs to report them to the user.

use std::path::PathBuf;

use thiserror::Error;

use crate::markers::MarkerId;

/// Failure while loading mesh assets.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to parse OBJ {path}: {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("unsupported mesh format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("asset {0} contains no triangles")]
    Empty(PathBuf),

    #[error("no model assets could be loaded")]
    NothingLoaded,

    #[error("model loader thread exited before delivering results")]
    WorkerGone,
}

/// Failure of the underlying key-value storage.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage quota exceeded writing {key}: {size} bytes, limit {limit}")]
    QuotaExceeded {
        key: String,
        size: usize,
        limit: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a marker store operation.
///
/// A failed mutation never changes the in-memory collection.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("JSON error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("marker {0} already exists")]
    DuplicateId(MarkerId),
}

impl StoreError {
    /// True when the write was rejected because the store is full.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(
            self,
            StoreError::Storage(StorageError::QuotaExceeded { .. })
        )
    }
}

/// Failure reading viewer options.
#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid options file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize options: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Failure bringing up the GPU renderer.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("could not create a rendering surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible graphics adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("could not open graphics device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("could not acquire the next frame: {0}")]
    Frame(#[from] wgpu::SurfaceError),
}

/// Invalid street-view state transition.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("street view is already active")]
    AlreadyActive,

    #[error("street view is not active")]
    NotActive,
}
