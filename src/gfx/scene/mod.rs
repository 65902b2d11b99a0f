//! # Scene Management Module
//!
//! The scene owns the camera, the renderable objects and the role registry.
//!
//! - [`Scene`] - object storage, role lookup, ray casts and the fly-to animation
//! - [`Object`] / [`Mesh`] - CPU geometry with cached world-space triangles
//! - [`MeshRegistry`] - role → object mapping and the object metadata side table
//! - [`Vertex3D`] - GPU vertex layout

pub mod object;
pub mod registry;
pub mod scene;
pub mod vertex;

pub use object::{LabelSprite, Material, Mesh, Object, ObjectId, PrimitiveKind};
pub use registry::{MeshRegistry, ObjectTag, Role};
pub use scene::Scene;
pub use vertex::Vertex3D;
