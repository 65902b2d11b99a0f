// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! Handles render pipelines, per-mesh GPU buffers, and frame rendering.

pub mod pipeline_manager;
pub mod render_engine;

pub use pipeline_manager::{DrawPass, PipelineConfig, PipelineManager};
pub use render_engine::{DrawUniform, RenderEngine};
