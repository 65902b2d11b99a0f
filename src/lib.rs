// src/lib.rs
//! Campus 3D
//!
//! An interactive 3D campus map built on wgpu and winit: orbit and pan
//! around the model, walk it in street view with collision, and place
//! photo markers and pins that persist between sessions.
//!
//! [`Viewer`] holds all the map state and is windowing-agnostic;
//! [`CampusApp`] hosts it in a winit window with an ImGui overlay.

pub mod app;
pub mod controls;
pub mod error;
pub mod gfx;
pub mod markers;
pub mod model;
pub mod options;
pub mod street_view;
pub mod ui;
pub mod viewer;

pub use app::CampusApp;
pub use error::{LoadError, OptionsError, RenderError, StorageError, StoreError, TransitionError};
pub use options::ViewerOptions;
pub use viewer::{Collection, Viewer, ViewerEvent};
