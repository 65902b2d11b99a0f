//! # Model Pipeline
//!
//! Loads the map meshes, normalizes them into one shared frame and registers
//! each under its [`Role`].
//!
//! Loading is split in two so the window stays responsive:
//!
//! 1. [`spawn_load`] parses the files on a worker thread and hands the
//!    outcomes back through a one-shot channel ([`ModelLoadTask`]).
//! 2. [`install`] runs on the frame loop, computes the shared
//!    [`Normalization`] and inserts the objects into the [`Scene`].
//!
//! [`load_models`] does both in one blocking call.

pub mod loader;
pub mod normalize;

use std::path::PathBuf;

use futures::channel::oneshot;

use crate::error::LoadError;
use crate::gfx::geometry::synthesize_edges;
use crate::gfx::scene::{Mesh, Object, Role, Scene};
use crate::options::{AssetSpec, ModelOptions};

pub use loader::{load_asset, load_assets, AssetOutcome, RawAsset, RawMesh};
pub use normalize::Normalization;

/// What ended up in the scene after a load.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub loaded: Vec<Role>,
    /// Assets that failed, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
    pub normalization: Normalization,
}

impl LoadReport {
    pub fn has(&self, role: Role) -> bool {
        self.loaded.contains(&role)
    }
}

/// Loads and installs `assets` in one blocking call.
pub fn load_models(
    scene: &mut Scene,
    assets: &[AssetSpec],
    options: &ModelOptions,
) -> Result<LoadReport, LoadError> {
    let outcomes = load_assets(assets, options.default_color);
    install(scene, outcomes, options)
}

/// Normalizes parsed assets and inserts them into the scene.
///
/// Failed assets are logged and skipped; only an empty result is an error.
pub fn install(
    scene: &mut Scene,
    outcomes: Vec<AssetOutcome>,
    options: &ModelOptions,
) -> Result<LoadReport, LoadError> {
    let mut assets = Vec::new();
    let mut skipped = Vec::new();

    for (spec, outcome) in outcomes {
        match outcome {
            Ok(asset) => assets.push(asset),
            Err(e) => {
                log::warn!("Skipping {} asset {}: {}", spec.role.name(), spec.path.display(), e);
                skipped.push((spec.path, e.to_string()));
            }
        }
    }

    let normalization =
        Normalization::from_assets(&assets, options.target_size).ok_or(LoadError::NothingLoaded)?;

    let mut loaded = Vec::with_capacity(assets.len());
    for asset in assets {
        let role = asset.spec.role;
        if loaded.contains(&role) {
            log::warn!(
                "Second {} asset {} replaces the first",
                role.name(),
                asset.spec.path.display()
            );
        }

        let transform = normalization.transform_for(asset.spec.offset);
        let mut meshes = Vec::with_capacity(asset.meshes.len() * 2);
        for raw in asset.meshes {
            let outline = options
                .synthesize_edges
                .then(|| synthesize_edges(&raw.geometry, options.edge_threshold_degrees));
            meshes.push(Mesh::surface(raw.geometry, raw.material));
            if let Some(points) = outline.filter(|p| !p.is_empty()) {
                meshes.push(Mesh::edge_lines(points, options.edge_color));
            }
        }

        let mut object = Object::new(role.name(), meshes).with_transform(transform);
        object.enable_shadows();
        scene.add_role_object(role, object);
        if !loaded.contains(&role) {
            loaded.push(role);
        }
    }

    log::info!(
        "Loaded {} model(s) at scale {:.3}: {}",
        loaded.len(),
        normalization.scale,
        loaded.iter().map(|r| r.name()).collect::<Vec<_>>().join(", ")
    );

    Ok(LoadReport {
        loaded,
        skipped,
        normalization,
    })
}

/// Background parse of the model files.
pub struct ModelLoadTask {
    receiver: Option<oneshot::Receiver<Vec<AssetOutcome>>>,
}

impl ModelLoadTask {
    /// Non-blocking check for the parsed assets. Yields a value exactly once.
    pub fn poll(&mut self) -> Option<Result<Vec<AssetOutcome>, LoadError>> {
        let receiver = self.receiver.as_mut()?;
        match receiver.try_recv() {
            Ok(None) => None,
            Ok(Some(outcomes)) => {
                self.receiver = None;
                Some(Ok(outcomes))
            }
            Err(oneshot::Canceled) => {
                self.receiver = None;
                Some(Err(LoadError::WorkerGone))
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.receiver.is_some()
    }
}

/// Parses `assets` on a worker thread.
pub fn spawn_load(assets: Vec<AssetSpec>, default_color: [f32; 4]) -> ModelLoadTask {
    let (sender, receiver) = oneshot::channel();
    std::thread::spawn(move || {
        let outcomes = load_assets(&assets, default_color);
        if sender.send(outcomes).is_err() {
            log::debug!("Model load finished after the viewer went away");
        }
    });
    ModelLoadTask {
        receiver: Some(receiver),
    }
}

#[cfg(test)]
mod tests {
    use super::loader::tests::write_box_obj;
    use super::*;
    use crate::gfx::camera::ViewCamera;
    use cgmath::{Vector3, Zero};
    use std::time::{Duration, Instant};

    fn empty_scene() -> Scene {
        Scene::new(ViewCamera::new(Vector3::zero(), 0.0, 0.0, 1.0))
    }

    #[test]
    fn partial_load_proceeds_with_loaded_roles() {
        let dir = tempfile::tempdir().unwrap();
        let building = write_box_obj(dir.path(), "building.obj", [0.0, 0.0, 0.0], [90.0, 45.0, 20.0]);
        let mut scene = empty_scene();
        let assets = [
            AssetSpec::new(building, Role::Building),
            AssetSpec::new(dir.path().join("ground.obj"), Role::Ground),
        ];

        let report = load_models(&mut scene, &assets, &ModelOptions::default()).unwrap();
        assert_eq!(report.loaded, vec![Role::Building]);
        assert_eq!(report.skipped.len(), 1);
        assert!(scene.registry.get(Role::Ground).is_none());

        let bounds = scene.role_bounds(Role::Building).unwrap();
        assert!((bounds.size().x - 180.0).abs() < 1e-2);
        assert!(bounds.min.y.abs() < 1e-3);

        let building = scene.role_object(Role::Building).unwrap();
        assert!(building.meshes.iter().any(|m| !m.is_surface()));
        assert!(building.meshes.iter().filter(|m| m.is_surface()).all(|m| m.cast_shadows));
    }

    #[test]
    fn nothing_loaded_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = empty_scene();
        let assets = [AssetSpec::new(dir.path().join("nope.obj"), Role::Building)];
        let err = load_models(&mut scene, &assets, &ModelOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::NothingLoaded));
        assert_eq!(scene.object_count(), 0);
    }

    #[test]
    fn shared_frame_keeps_building_on_ground() {
        let dir = tempfile::tempdir().unwrap();
        let ground = write_box_obj(dir.path(), "ground.obj", [-50.0, -50.0, -1.0], [50.0, 50.0, 0.0]);
        let building = write_box_obj(dir.path(), "building.obj", [-10.0, -10.0, 0.0], [10.0, 10.0, 15.0]);
        let mut scene = empty_scene();
        let mut options = ModelOptions::default();
        options.synthesize_edges = false;

        load_models(
            &mut scene,
            &[AssetSpec::new(ground, Role::Ground), AssetSpec::new(building, Role::Building)],
            &options,
        )
        .unwrap();

        let g = scene.role_bounds(Role::Ground).unwrap();
        let b = scene.role_bounds(Role::Building).unwrap();
        // scale 1.8, ground top and building base coincide
        assert!((g.max.y - b.min.y).abs() < 1e-3);
        assert!((b.size().y - 27.0).abs() < 1e-2);
        assert!(b.center().x.abs() < 1e-3 && b.center().z.abs() < 1e-3);
    }

    #[test]
    fn background_load_delivers_once() {
        let dir = tempfile::tempdir().unwrap();
        let building = write_box_obj(dir.path(), "building.obj", [0.0; 3], [1.0; 3]);
        let mut task = spawn_load(vec![AssetSpec::new(building, Role::Building)], [1.0; 4]);

        let started = Instant::now();
        let outcomes = loop {
            if let Some(result) = task.poll() {
                break result.unwrap();
            }
            assert!(started.elapsed() < Duration::from_secs(10));
            std::thread::sleep(Duration::from_millis(5));
        };
        assert_eq!(outcomes.len(), 1);
        assert!(!task.is_pending());
        assert!(task.poll().is_none());
    }
}
