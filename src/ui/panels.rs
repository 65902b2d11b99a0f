// src/ui/panels.rs
//! Map panels: toolbar, search, marker details, the marker editor and the
//! floating labels.
//!
//! Panels only read the viewer while the frame is built and return
//! [`UiAction`]s; the app applies them once rendering is done.

use std::path::PathBuf;

use cgmath::Matrix4;
use imgui::{Condition, TreeNodeFlags, Ui};

use crate::controls::{ControlResponse, ControlSchemeKind};
use crate::gfx::camera::camera_utils::{project_to_screen, Camera};
use crate::markers::{ExportBundle, KeyValueStorage, MarkerDraft, MarkerId, Position};
use crate::viewer::{Collection, Viewer, ViewerEvent};

/// Zoom step of the toolbar buttons.
pub const ZOOM_BUTTON_STEP: f32 = 8.0;

const LABEL_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 0.95];
const PLACED_COLOR: [f32; 4] = [0.16, 0.65, 0.27, 1.0];
const UNPLACED_COLOR: [f32; 4] = [0.86, 0.21, 0.27, 1.0];

/// A change requested from the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Zoom(f32),
    ResetView,
    SetStreetView(bool),
    SwitchControls(ControlSchemeKind),
    FlyTo(MarkerId),
    ClearSelection,
    /// Open the editor on a marker.
    Edit(Collection, MarkerId),
    /// Choose the marker's position with the next click on the map.
    StartPlacing(Collection, MarkerId),
    StopPicking,
    SetPosition(Collection, MarkerId, Option<Position>),
    AddPin {
        name: String,
        description: Option<String>,
    },
    Delete(Collection, MarkerId),
    Export(Collection, PathBuf),
    ImportPositions(Collection, PathBuf),
}

/// State of the map panels between frames.
#[derive(Debug, Default)]
pub struct MapPanels {
    search_query: String,
    editing: Option<(Collection, MarkerId)>,
    manual_position: [f32; 3],
    new_pin_name: String,
    new_pin_description: String,
    transfer_path: String,
    status: Option<String>,
    show_editor: bool,
}

impl MapPanels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn editing(&self) -> Option<&(Collection, MarkerId)> {
        self.editing.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Builds every panel for this frame.
    pub fn build<S: KeyValueStorage>(&mut self, ui: &Ui, viewer: &Viewer<S>) -> Vec<UiAction> {
        let mut actions = Vec::new();
        let display_size = ui.io().display_size;
        if display_size[0] <= 0.0 || display_size[1] <= 0.0 {
            return actions;
        }

        draw_labels(ui, viewer);

        if viewer.is_street_view() {
            self.street_view_help(ui, &mut actions);
            return actions;
        }

        self.toolbar(ui, viewer, display_size, &mut actions);
        self.search(ui, viewer, &mut actions);
        self.details(ui, viewer, display_size, &mut actions);
        if self.show_editor {
            self.editor(ui, viewer, &mut actions);
        }
        actions
    }

    fn toolbar<S: KeyValueStorage>(
        &mut self,
        ui: &Ui,
        viewer: &Viewer<S>,
        display_size: [f32; 2],
        actions: &mut Vec<UiAction>,
    ) {
        ui.window("Map")
            .position([display_size[0] - 300.0, display_size[1] - 260.0], Condition::FirstUseEver)
            .size([280.0, 240.0], Condition::FirstUseEver)
            .collapsible(true)
            .build(|| {
                if ui.button("+") {
                    actions.push(UiAction::Zoom(ZOOM_BUTTON_STEP));
                }
                ui.same_line();
                if ui.button("-") {
                    actions.push(UiAction::Zoom(-ZOOM_BUTTON_STEP));
                }
                ui.same_line();
                if ui.button("Reset view") {
                    actions.push(UiAction::ResetView);
                }

                if ui.button("Street view") {
                    actions.push(UiAction::SetStreetView(true));
                }
                ui.same_line();
                if ui.button("Markers") {
                    self.show_editor = !self.show_editor;
                }

                let current = viewer.control_kind();
                let names = ControlSchemeKind::ALL.map(|kind| kind.name());
                let mut index = ControlSchemeKind::ALL
                    .iter()
                    .position(|kind| *kind == current)
                    .unwrap_or(0);
                if ui.combo_simple_string("Controls", &mut index, &names) {
                    if let Some(kind) = ControlSchemeKind::ALL.get(index) {
                        actions.push(UiAction::SwitchControls(*kind));
                    }
                }

                if viewer.is_picking() {
                    ui.text_colored([1.0, 0.8, 0.2, 1.0], "Click the map to place");
                    if ui.button("Cancel") {
                        actions.push(UiAction::StopPicking);
                    }
                }
                if let Some(status) = &self.status {
                    ui.text_wrapped(status);
                }
            });
    }

    fn search<S: KeyValueStorage>(&mut self, ui: &Ui, viewer: &Viewer<S>, actions: &mut Vec<UiAction>) {
        ui.window("Search")
            .position([20.0, 20.0], Condition::FirstUseEver)
            .size([360.0, 0.0], Condition::FirstUseEver)
            .build(|| {
                ui.input_text("##search", &mut self.search_query)
                    .hint("Search places")
                    .build();

                if self.search_query.trim().is_empty() {
                    return;
                }
                let results = viewer.search(&self.search_query);
                if results.is_empty() {
                    ui.text_disabled("No matches");
                }
                let mut chosen = None;
                for (_, marker) in results {
                    let label = format!("{}##{}", marker.display_name(), marker.id);
                    if ui.selectable(label) {
                        chosen = Some(marker.id.clone());
                    }
                }
                if let Some(id) = chosen {
                    actions.push(UiAction::FlyTo(id));
                    self.search_query.clear();
                }
            });
    }

    /// Info panel for the selected marker.
    fn details<S: KeyValueStorage>(
        &mut self,
        ui: &Ui,
        viewer: &Viewer<S>,
        display_size: [f32; 2],
        actions: &mut Vec<UiAction>,
    ) {
        let Some((collection, marker)) = viewer.selected().and_then(|id| viewer.find_marker(id)) else {
            return;
        };
        ui.window("Place")
            .position([display_size[0] - 380.0, 20.0], Condition::FirstUseEver)
            .size([360.0, 0.0], Condition::FirstUseEver)
            .build(|| {
                ui.text(marker.display_name());
                ui.text_disabled(collection.name());
                if let Some(description) = &marker.description {
                    ui.text_wrapped(description);
                }
                if let Some(path) = &marker.image_path {
                    ui.text_disabled(format!("Photo: {}", path));
                }
                if marker.image_data.is_some() {
                    ui.text_disabled("Photo attached");
                }
                if ui.button("Edit") {
                    actions.push(UiAction::Edit(collection, marker.id.clone()));
                    self.show_editor = true;
                }
                ui.same_line();
                if ui.button("Close") {
                    actions.push(UiAction::ClearSelection);
                }
            });
    }

    fn editor<S: KeyValueStorage>(&mut self, ui: &Ui, viewer: &Viewer<S>, actions: &mut Vec<UiAction>) {
        let mut open = true;
        ui.window("Marker editor")
            .opened(&mut open)
            .position([20.0, 140.0], Condition::FirstUseEver)
            .size([460.0, 640.0], Condition::FirstUseEver)
            .build(|| {
                for collection in Collection::ALL {
                    self.marker_list(ui, viewer, collection, actions);
                }
                ui.separator();
                self.position_editor(ui, viewer, actions);
                ui.separator();
                self.new_pin(ui, actions);
                ui.separator();
                self.transfer(ui, actions);
            });
        self.show_editor = open;
    }

    fn marker_list<S: KeyValueStorage>(
        &mut self,
        ui: &Ui,
        viewer: &Viewer<S>,
        collection: Collection,
        actions: &mut Vec<UiAction>,
    ) {
        let store = viewer.store(collection);
        let header = format!("{} ({})", collection.name(), store.len());
        if !ui.collapsing_header(header, TreeNodeFlags::DEFAULT_OPEN) {
            return;
        }
        ui.child_window(collection.name())
            .size([0.0, 150.0])
            .border(true)
            .build(|| {
                if store.is_empty() {
                    ui.text_disabled("No markers");
                }
                for marker in store.list() {
                    let selected = self
                        .editing
                        .as_ref()
                        .is_some_and(|(c, id)| *c == collection && *id == marker.id);
                    let label = format!("{}##{}", marker.display_name(), marker.id);
                    if ui.selectable_config(label).selected(selected).build() {
                        actions.push(UiAction::Edit(collection, marker.id.clone()));
                    }
                    ui.same_line();
                    match marker.position {
                        Some(p) => ui.text_colored(PLACED_COLOR, format!("({:.1}, {:.1}, {:.1})", p.x, p.y, p.z)),
                        None => ui.text_colored(UNPLACED_COLOR, "not placed"),
                    }
                }
            });
    }

    fn position_editor<S: KeyValueStorage>(&mut self, ui: &Ui, viewer: &Viewer<S>, actions: &mut Vec<UiAction>) {
        let Some((collection, id)) = self.editing.clone() else {
            ui.text_disabled("Select a marker to edit it");
            return;
        };
        let Some(marker) = viewer.store(collection).get(&id) else {
            return;
        };
        ui.text(format!("Editing: {}", marker.display_name()));

        ui.input_float3("Position", &mut self.manual_position).build();
        if ui.button("Save position") {
            let [x, y, z] = self.manual_position;
            actions.push(UiAction::SetPosition(collection, id.clone(), Some(Position::new(x, y, z))));
        }
        ui.same_line();
        if ui.button("Pick on map") {
            actions.push(UiAction::StartPlacing(collection, id.clone()));
        }
        if marker.is_placed() {
            if ui.button("Remove from map") {
                actions.push(UiAction::SetPosition(collection, id.clone(), None));
            }
            ui.same_line();
            if ui.button("Go to") {
                actions.push(UiAction::FlyTo(id.clone()));
            }
        }
        if collection == Collection::Pins {
            ui.same_line();
            if ui.button("Delete") {
                actions.push(UiAction::Delete(collection, id));
            }
        }
    }

    fn new_pin(&mut self, ui: &Ui, actions: &mut Vec<UiAction>) {
        ui.text("New pin");
        ui.input_text("Name", &mut self.new_pin_name).build();
        ui.input_text("Description", &mut self.new_pin_description).build();
        if ui.button("Add pin") && !self.new_pin_name.trim().is_empty() {
            let description = self.new_pin_description.trim();
            actions.push(UiAction::AddPin {
                name: self.new_pin_name.trim().to_string(),
                description: (!description.is_empty()).then(|| description.to_string()),
            });
            self.new_pin_name.clear();
            self.new_pin_description.clear();
        }
    }

    fn transfer(&mut self, ui: &Ui, actions: &mut Vec<UiAction>) {
        ui.text("Import / export");
        ui.input_text("File", &mut self.transfer_path)
            .hint("markers.json")
            .build();
        let path = PathBuf::from(self.transfer_path.trim());
        for collection in Collection::ALL {
            if ui.button(format!("Export {}", collection.name())) {
                actions.push(UiAction::Export(collection, path.clone()));
            }
            ui.same_line();
            if ui.button(format!("Import {}", collection.name())) {
                actions.push(UiAction::ImportPositions(collection, path.clone()));
            }
        }
    }

    fn street_view_help(&mut self, ui: &Ui, actions: &mut Vec<UiAction>) {
        ui.window("Street view")
            .position([20.0, 20.0], Condition::FirstUseEver)
            .always_auto_resize(true)
            .build(|| {
                ui.text("W / S or Up / Down: walk");
                ui.text("A / D: step sideways");
                ui.text("Left / Right: turn");
                ui.text("Space: jump");
                ui.text("Esc: leave street view");
                if ui.button("Exit street view") {
                    actions.push(UiAction::SetStreetView(false));
                }
            });
    }

    /// Keeps the panels in step with what happened in the viewer.
    pub fn on_viewer_event(&mut self, event: &ViewerEvent) {
        match event {
            ViewerEvent::Ready => self.status = Some("Map loaded".to_string()),
            ViewerEvent::PositionPicked(p) => {
                self.manual_position = [p.x, p.y, p.z];
                self.status = Some("Position set".to_string());
            }
            ViewerEvent::StreetViewChanged(_) => self.status = None,
            ViewerEvent::MarkerSelected(_) | ViewerEvent::MarkerDeselected => {}
        }
    }

    /// Applies one action. The response carries any pointer-lock request.
    pub fn apply<S: KeyValueStorage>(&mut self, viewer: &mut Viewer<S>, action: UiAction) -> ControlResponse {
        log::debug!("UI action: {:?}", action);
        match action {
            UiAction::Zoom(delta) => viewer.apply_zoom(delta),
            UiAction::ResetView => viewer.reset_view(),
            UiAction::SetStreetView(enabled) => {
                return match viewer.set_street_view_mode(enabled) {
                    Ok(response) => response,
                    Err(e) => {
                        log::warn!("{}", e);
                        ControlResponse::IGNORED
                    }
                };
            }
            UiAction::SwitchControls(kind) => return viewer.switch_controls(kind),
            UiAction::FlyTo(id) => {
                if !viewer.on_marker_clicked(&id) {
                    self.status = Some("That place is not on the map yet".to_string());
                }
            }
            UiAction::ClearSelection => viewer.clear_selection(),
            UiAction::Edit(collection, id) => self.start_editing(viewer, collection, id),
            UiAction::StartPlacing(collection, id) => {
                self.start_editing(viewer, collection, id.clone());
                viewer.place_marker(collection, id);
                if viewer.is_picking() {
                    self.status = Some("Click the map to choose a position".to_string());
                }
            }
            UiAction::StopPicking => viewer.stop_position_picking(),
            UiAction::SetPosition(collection, id, position) => {
                match viewer.edit(collection, |store| store.set_position(&id, position)) {
                    Ok(true) => self.status = Some("Position saved".to_string()),
                    Ok(false) => self.status = Some("Marker no longer exists".to_string()),
                    Err(e) => self.report(e),
                }
            }
            UiAction::AddPin { name, description } => {
                let draft = MarkerDraft {
                    description,
                    ..MarkerDraft::named(name)
                };
                match viewer.edit(Collection::Pins, |store| store.add(draft)) {
                    Ok(id) => {
                        self.status = Some("Pin added; place it on the map".to_string());
                        self.start_editing(viewer, Collection::Pins, id);
                    }
                    Err(e) => self.report(e),
                }
            }
            UiAction::Delete(collection, id) => {
                match viewer.edit(collection, |store| store.delete(&id)) {
                    Ok(_) => {
                        if self.editing.as_ref().is_some_and(|(_, editing)| *editing == id) {
                            self.editing = None;
                        }
                        self.status = Some("Marker deleted".to_string());
                    }
                    Err(e) => self.report(e),
                }
            }
            UiAction::Export(collection, path) => {
                let bundle = viewer.store(collection).export();
                let path = resolve_export_path(path, &bundle);
                match bundle.write(&path) {
                    Ok(()) => {
                        log::info!("Exported {} marker(s) to {}", bundle.markers.len(), path.display());
                        self.status = Some(format!("Exported to {}", path.display()));
                    }
                    Err(e) => self.report(e),
                }
            }
            UiAction::ImportPositions(collection, path) => {
                let result = ExportBundle::read(&path).and_then(|bundle| {
                    viewer
                        .edit(collection, |store| store.import_positions(&bundle))
                        .map_err(anyhow::Error::from)
                });
                match result {
                    Ok(updated) => self.status = Some(format!("Updated {} marker(s)", updated)),
                    Err(e) => self.report(e),
                }
            }
        }
        ControlResponse::IGNORED
    }

    fn start_editing<S: KeyValueStorage>(&mut self, viewer: &Viewer<S>, collection: Collection, id: MarkerId) {
        if let Some(Position { x, y, z }) = viewer.store(collection).get(&id).and_then(|m| m.position) {
            self.manual_position = [x, y, z];
        }
        self.editing = Some((collection, id));
    }

    fn report(&mut self, error: impl std::fmt::Display) {
        log::error!("{}", error);
        self.status = Some(error.to_string());
    }
}

/// An empty path exports to the bundle's dated default name.
fn resolve_export_path(path: PathBuf, bundle: &ExportBundle) -> PathBuf {
    if path.as_os_str().is_empty() {
        PathBuf::from(bundle.suggested_file_name())
    } else {
        path
    }
}

/// Screen position and text of every visible label in front of the camera.
pub fn label_positions<S: KeyValueStorage>(viewer: &Viewer<S>) -> Vec<([f32; 2], String)> {
    let camera = &viewer.scene.camera;
    let view_proj: Matrix4<f32> = camera.build_view_projection_matrix();
    let viewport = viewer.viewport();

    viewer
        .scene
        .objects()
        .filter(|(_, object)| object.visible)
        .filter_map(|(_, object)| {
            let anchor = object.label_anchor()?;
            let text = object.label.as_ref()?.text.clone();
            let [x, y] = project_to_screen(&view_proj, anchor, viewport)?;
            let on_screen = (0.0..=viewport.width).contains(&x) && (0.0..=viewport.height).contains(&y);
            on_screen.then_some(([x, y], text))
        })
        .collect()
}

fn draw_labels<S: KeyValueStorage>(ui: &Ui, viewer: &Viewer<S>) {
    let draw_list = ui.get_background_draw_list();
    for ([x, y], text) in label_positions(viewer) {
        let width = ui.calc_text_size(&text)[0];
        draw_list.add_text([x - width * 0.5, y], LABEL_COLOR, &text);
    }
}
