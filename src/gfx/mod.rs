//! # Graphics Module
//!
//! Camera, scene, ray casting and GPU rendering for the map.
//!
//! - **Camera** ([`camera`]) - look-at camera, projection helpers and the fly-to animation
//! - **Geometry** ([`geometry`]) - CPU triangle data, primitives and edge outlines
//! - **Picking** ([`picking`]) - rays, bounding boxes and screen unprojection
//! - **Scene** ([`scene`]) - objects, the role registry and scene-level ray casts
//! - **Rendering** ([`rendering`]) - wgpu pipelines and per-frame drawing
//! - **Resources** ([`resources`]) - depth texture
//!
//! Everything except [`rendering`] and [`resources`] runs without a GPU.

pub mod camera;
pub mod geometry;
pub mod picking;
pub mod rendering;
pub mod resources;
pub mod scene;

pub use camera::ViewCamera;
pub use rendering::RenderEngine;
pub use scene::Scene;
