//! Mesh file parsing.
//!
//! Parsing is pure CPU work with no scene access, so it can run on the
//! loader thread; the results are installed into the scene on the frame loop.

use std::path::Path;

use crate::error::LoadError;
use crate::gfx::geometry::GeometryData;
use crate::gfx::picking::AABB;
use crate::gfx::scene::Material;
use crate::options::AssetSpec;

/// One primitive of a parsed asset, still in authored coordinates.
#[derive(Debug, Clone)]
pub struct RawMesh {
    pub name: String,
    pub geometry: GeometryData,
    pub material: Material,
}

/// A parsed asset before normalization.
#[derive(Debug, Clone)]
pub struct RawAsset {
    pub spec: AssetSpec,
    pub meshes: Vec<RawMesh>,
}

impl RawAsset {
    /// Bounds in the authored frame, including the asset's authored offset.
    pub fn authored_bounds(&self) -> Option<AABB> {
        let [ox, oy, oz] = self.spec.offset;
        let boxes: Vec<AABB> = self
            .meshes
            .iter()
            .filter(|m| !m.geometry.vertices.is_empty())
            .map(|m| {
                let b = m.geometry.bounds();
                let offset = cgmath::Vector3::new(ox, oy, oz);
                AABB::new(b.min + offset, b.max + offset)
            })
            .collect();
        AABB::union_all(&boxes)
    }
}

/// Result of attempting one asset.
pub type AssetOutcome = (AssetSpec, Result<RawAsset, LoadError>);

/// Loads every asset, keeping per-asset failures instead of stopping.
pub fn load_assets(specs: &[AssetSpec], default_color: [f32; 4]) -> Vec<AssetOutcome> {
    specs
        .iter()
        .map(|spec| (spec.clone(), load_asset(spec, default_color)))
        .collect()
}

pub fn load_asset(spec: &AssetSpec, default_color: [f32; 4]) -> Result<RawAsset, LoadError> {
    let extension = spec
        .path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("obj") => load_obj(spec, default_color),
        _ => Err(LoadError::UnsupportedFormat(spec.path.clone())),
    }
}

fn load_obj(spec: &AssetSpec, default_color: [f32; 4]) -> Result<RawAsset, LoadError> {
    let path: &Path = &spec.path;
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|source| LoadError::Obj {
        path: path.to_path_buf(),
        source,
    })?;

    let materials = materials.unwrap_or_else(|e| {
        log::warn!(
            "No usable MTL for {} ({}), using default material",
            path.display(),
            e
        );
        Vec::new()
    });

    let mut meshes = Vec::with_capacity(models.len());
    for model in models {
        let mesh = model.mesh;
        if mesh.indices.is_empty() {
            continue;
        }

        let vertices: Vec<[f32; 3]> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        let normals: Vec<[f32; 3]> = if mesh.normals.len() == mesh.positions.len() {
            mesh.normals
                .chunks_exact(3)
                .map(|n| [n[0], n[1], n[2]])
                .collect()
        } else {
            Vec::new()
        };

        let mut geometry = GeometryData {
            vertices,
            normals,
            indices: mesh.indices,
        };
        geometry.compute_normals();

        let material = mesh
            .material_id
            .and_then(|id| materials.get(id))
            .map(|mtl| {
                let diffuse = mtl.diffuse.unwrap_or([0.8, 0.8, 0.8]);
                Material::new([diffuse[0], diffuse[1], diffuse[2], mtl.dissolve.unwrap_or(1.0)])
            })
            .unwrap_or_else(|| Material::new(default_color));

        meshes.push(RawMesh {
            name: model.name,
            geometry,
            material,
        });
    }

    if meshes.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }

    log::debug!(
        "Parsed {} ({} primitives, {} triangles)",
        path.display(),
        meshes.len(),
        meshes.iter().map(|m| m.geometry.triangle_count()).sum::<usize>()
    );

    Ok(RawAsset {
        spec: spec.clone(),
        meshes,
    })
}
