//! # User Interface Module
//!
//! Dear ImGui overlay for the map.
//!
//! - [`UiManager`] - ImGui integration with winit and wgpu, input capture
//! - [`MapPanels`] - toolbar, search, marker details and editor, labels
//!
//! When ImGui wants the mouse or keyboard, the event is not forwarded to the
//! viewer, so dragging a panel never moves the camera.

pub mod manager;
pub mod panels;

pub use manager::UiManager;
pub use panels::{label_positions, MapPanels, UiAction};
