//! # Viewer
//!
//! The core facade the UI shell talks to. It owns the scene, the control
//! schemes, the street-view engine and both marker collections, and decides
//! which of them sees each input event:
//!
//! 1. Street view, while active, takes the keyboard and nothing else moves
//!    the camera.
//! 2. A click (press and release within `click_tolerance`) either completes
//!    position picking or selects the marker under the cursor.
//! 3. Everything else goes to the active control scheme.
//!
//! Notifications for the shell are queued as [`ViewerEvent`]s and collected
//! with [`Viewer::drain_events`].

use std::time::Duration;

use cgmath::{Vector3, Zero};
use futures::channel::oneshot;

use crate::controls::{
    Capabilities, ControlContext, ControlManager, ControlResponse, ControlSchemeKind, InputEvent,
    InputModes, Key, PointerButton, TouchPhase,
};
use crate::error::{LoadError, StoreError, TransitionError};
use crate::gfx::camera::{CameraAnimation, ViewCamera, Viewport};
use crate::gfx::picking::screen_to_ray;
use crate::gfx::scene::{Role, Scene};
use crate::markers::{
    IdScheme, KeyValueStorage, Marker, MarkerId, MarkerStore, Position, SceneMarkers,
};
use crate::model::{self, AssetOutcome, LoadReport};
use crate::options::ViewerOptions;
use crate::street_view::{KeyOutcome, StreetView};

/// Longest ray used to pick a position on the map.
const PICK_RANGE: f32 = 10_000.0;

/// Called with the world position chosen in picking mode.
pub type PickCallback = Box<dyn FnOnce(Position)>;

/// Notification for the UI shell.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// The first model load finished.
    Ready,
    MarkerSelected(MarkerId),
    /// A click on empty space cleared the selection.
    MarkerDeselected,
    PositionPicked(Position),
    StreetViewChanged(bool),
}

/// Which marker collection an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Photo markers with name-derived ids.
    Photos,
    /// User pins with timestamp ids.
    Pins,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Photos, Collection::Pins];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Photos => "Photos",
            Collection::Pins => "Pins",
        }
    }
}

enum PickTarget {
    Callback(PickCallback),
    Marker(Collection, MarkerId),
}

/// A press that may still turn into a click.
#[derive(Debug, Clone, Copy)]
enum PendingClick {
    Mouse([f32; 2]),
    Touch { id: u64, at: [f32; 2] },
}

pub struct Viewer<S: KeyValueStorage> {
    options: ViewerOptions,
    pub scene: Scene,
    controls: ControlManager,
    street_view: StreetView,
    photos: MarkerStore<S>,
    pins: MarkerStore<S>,
    scene_markers: SceneMarkers,
    viewport: Viewport,
    scene_center: Vector3<f32>,
    picking: Option<PickTarget>,
    pending_click: Option<PendingClick>,
    active_touches: usize,
    pointer_locked: bool,
    selected: Option<MarkerId>,
    events: Vec<ViewerEvent>,
    ready_sender: Option<oneshot::Sender<()>>,
    ready_receiver: Option<oneshot::Receiver<()>>,
}

impl<S: KeyValueStorage> Viewer<S> {
    /// Opens both marker collections and seeds a marker for every known photo.
    pub fn new(
        options: ViewerOptions,
        caps: Capabilities,
        photo_storage: S,
        pin_storage: S,
    ) -> Result<Self, StoreError> {
        let viewport = Viewport::new(caps.width as f32, caps.height as f32);
        let camera = ViewCamera::from_options(&options.camera, viewport.width / viewport.height.max(1.0));
        let storage = &options.storage;

        let mut photos = MarkerStore::open(photo_storage, storage.photo_key.clone(), IdScheme::NameHash)
            .with_warn_bytes(storage.warn_bytes);
        let seeded = photos.ensure_named(&storage.known_photos)?;
        if seeded > 0 {
            log::info!("Seeded {} photo marker(s)", seeded);
        }
        let pins = MarkerStore::open(pin_storage, storage.pin_key.clone(), IdScheme::Timestamp)
            .with_warn_bytes(storage.warn_bytes);

        let (ready_sender, ready_receiver) = oneshot::channel();
        let mut viewer = Self {
            controls: ControlManager::for_capabilities(caps, options.controls.clone()),
            street_view: StreetView::new(options.street_view.clone()),
            scene: Scene::new(camera),
            options,
            photos,
            pins,
            scene_markers: SceneMarkers::new(),
            viewport,
            scene_center: Vector3::zero(),
            picking: None,
            pending_click: None,
            active_touches: 0,
            pointer_locked: false,
            selected: None,
            events: Vec::new(),
            ready_sender: Some(ready_sender),
            ready_receiver: Some(ready_receiver),
        };
        viewer.sync_markers();
        Ok(viewer)
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = Viewport::new(width as f32, height as f32);
        self.scene.resize(width, height);
    }

    /// Resolves once the first model load has been installed. Can be taken once.
    pub fn ready(&mut self) -> Option<oneshot::Receiver<()>> {
        self.ready_receiver.take()
    }

    pub fn is_ready(&self) -> bool {
        self.ready_sender.is_none()
    }

    pub fn drain_events(&mut self) -> Vec<ViewerEvent> {
        std::mem::take(&mut self.events)
    }

    // Models

    /// Loads the configured assets on the calling thread.
    pub fn load_models(&mut self) -> Result<LoadReport, LoadError> {
        let report = model::load_models(&mut self.scene, &self.options.models.assets, &self.options.models)?;
        self.on_models_loaded(&report);
        Ok(report)
    }

    /// Installs assets parsed by a background [`model::ModelLoadTask`].
    pub fn install_models(&mut self, outcomes: Vec<AssetOutcome>) -> Result<LoadReport, LoadError> {
        let report = model::install(&mut self.scene, outcomes, &self.options.models)?;
        self.on_models_loaded(&report);
        Ok(report)
    }

    pub fn on_models_loaded(&mut self, report: &LoadReport) {
        for (path, reason) in &report.skipped {
            log::warn!("Model {} unavailable: {}", path.display(), reason);
        }
        if let Some(bounds) = self.scene.map_bounds() {
            self.scene_center = bounds.center();
        }
        self.sync_markers();
        self.reset_view();

        if let Some(sender) = self.ready_sender.take() {
            if sender.send(()).is_err() {
                log::debug!("Nobody waiting on viewer readiness");
            }
            self.events.push(ViewerEvent::Ready);
        }
    }

    // Camera

    pub fn apply_zoom(&mut self, delta: f32) {
        if self.street_view.is_active() {
            return;
        }
        self.scene.cancel_animation();
        self.scene.camera.apply_zoom(delta);
    }

    /// Frames the whole map from the south, looking down at a fixed angle.
    pub fn reset_view(&mut self) {
        let camera_options = &self.options.camera;
        self.scene.cancel_animation();
        match self.scene.map_bounds() {
            Some(bounds) => {
                let center = bounds.center();
                let size = bounds.max_extent();
                self.scene.camera.position = Vector3::new(
                    center.x,
                    center.y + size * camera_options.reset_height_factor,
                    center.z + size * camera_options.reset_distance_factor,
                );
                self.scene.camera.set_orientation(0.0, camera_options.reset_pitch);
            }
            None => {
                let [x, y, z] = camera_options.initial_position;
                self.scene.camera.position = Vector3::new(x, y, z);
                self.scene.camera.set_orientation(0.0, camera_options.initial_pitch);
            }
        }
    }

    pub fn control_kind(&self) -> ControlSchemeKind {
        self.controls.active_kind()
    }

    pub fn switch_controls(&mut self, kind: ControlSchemeKind) -> ControlResponse {
        let response = self.controls.switch_to(kind);
        self.note_lock(response);
        response
    }

    pub fn is_pointer_locked(&self) -> bool {
        self.pointer_locked
    }

    // Street view

    pub fn is_street_view(&self) -> bool {
        self.street_view.is_active()
    }

    pub fn street_view(&self) -> &StreetView {
        &self.street_view
    }

    /// Enters or leaves street view. Entering suspends the control schemes and
    /// cancels position picking.
    pub fn set_street_view_mode(&mut self, enabled: bool) -> Result<ControlResponse, TransitionError> {
        let response = if enabled {
            self.street_view.activate(&mut self.scene)?;
            if self.picking.take().is_some() {
                log::info!("Position picking cancelled by street view");
            }
            self.pending_click = None;
            self.controls.suspend()
        } else {
            self.street_view.deactivate(&mut self.scene)?;
            self.controls.resume();
            ControlResponse::CONSUMED
        };
        self.note_lock(response);
        self.events.push(ViewerEvent::StreetViewChanged(enabled));
        Ok(response)
    }

    // Markers

    pub fn store(&self, collection: Collection) -> &MarkerStore<S> {
        match collection {
            Collection::Photos => &self.photos,
            Collection::Pins => &self.pins,
        }
    }

    /// Runs `edit` against a collection, then brings the scene in line with it.
    pub fn edit<R>(&mut self, collection: Collection, edit: impl FnOnce(&mut MarkerStore<S>) -> R) -> R {
        let store = match collection {
            Collection::Photos => &mut self.photos,
            Collection::Pins => &mut self.pins,
        };
        let result = edit(store);
        self.sync_markers();
        result
    }

    /// Which collection holds `id`, if any.
    pub fn find_marker(&self, id: &MarkerId) -> Option<(Collection, &Marker)> {
        Collection::ALL
            .into_iter()
            .find_map(|c| self.store(c).get(id).map(|m| (c, m)))
    }

    /// Placed markers from both collections matching `query`.
    pub fn search(&self, query: &str) -> Vec<(Collection, &Marker)> {
        let mut results: Vec<(Collection, &Marker)> = Collection::ALL
            .into_iter()
            .flat_map(|c| self.store(c).search(query).into_iter().map(move |m| (c, m)))
            .collect();
        results.truncate(crate::markers::search::MAX_RESULTS);
        results
    }

    pub fn selected(&self) -> Option<&MarkerId> {
        self.selected.as_ref()
    }

    pub fn placed_marker_count(&self) -> usize {
        self.scene_markers.len()
    }

    pub fn marker_object(&self, id: &MarkerId) -> Option<crate::gfx::scene::ObjectId> {
        self.scene_markers.object_of(id)
    }

    fn sync_markers(&mut self) {
        self.scene_markers
            .sync(&mut self.scene, self.photos.list().iter().chain(self.pins.list()));
        if let Some(id) = &self.selected {
            if self.scene_markers.object_of(id).is_none() {
                self.selected = None;
                self.events.push(ViewerEvent::MarkerDeselected);
            }
        }
    }

    /// Selects a placed marker and flies the camera toward it.
    pub fn on_marker_clicked(&mut self, id: &MarkerId) -> bool {
        let Some(target) = self
            .scene_markers
            .object_of(id)
            .and_then(|object| self.scene.object(object))
            .map(|object| object.origin())
        else {
            log::debug!("Marker {} is not placed", id);
            return false;
        };

        let camera = &self.options.camera;
        self.scene.start_animation(CameraAnimation::toward(
            &self.scene.camera,
            target,
            camera.fly_to_distance,
            Duration::from_millis(camera.fly_to_duration_ms),
        ));
        self.selected = Some(id.clone());
        self.events.push(ViewerEvent::MarkerSelected(id.clone()));
        true
    }

    pub fn clear_selection(&mut self) {
        if self.selected.take().is_some() {
            self.events.push(ViewerEvent::MarkerDeselected);
        }
    }

    // Position picking

    pub fn is_picking(&self) -> bool {
        self.picking.is_some()
    }

    /// The next click on the building or ground reports its world position
    /// to `callback`. Camera controls are blocked until then.
    pub fn start_position_picking(&mut self, callback: PickCallback) {
        self.begin_picking(PickTarget::Callback(callback));
    }

    /// Like [`Self::start_position_picking`], storing the result as the position
    /// of marker `id`.
    pub fn place_marker(&mut self, collection: Collection, id: MarkerId) {
        self.begin_picking(PickTarget::Marker(collection, id));
    }

    fn begin_picking(&mut self, target: PickTarget) {
        if self.street_view.is_active() {
            log::info!("Position picking is unavailable in street view");
            return;
        }
        self.scene.cancel_animation();
        self.picking = Some(target);
        log::info!("Click the map to choose a position");
    }

    pub fn stop_position_picking(&mut self) {
        if self.picking.take().is_some() {
            log::info!("Position picking stopped");
        }
    }

    fn pick_at(&mut self, x: f32, y: f32) {
        let ray = screen_to_ray((x, y), self.viewport, &self.scene.camera);
        let Some(hit) = self
            .scene
            .raycast_roles(&ray, PICK_RANGE, &[Role::Building, Role::Ground])
        else {
            log::info!("No building or ground under the cursor");
            return;
        };
        let Some(target) = self.picking.take() else {
            return;
        };

        let position = Position::from(hit.point);
        log::info!("Picked ({:.2}, {:.2}, {:.2})", position.x, position.y, position.z);
        match target {
            PickTarget::Callback(callback) => callback(position),
            PickTarget::Marker(collection, id) => {
                match self.edit(collection, |store| store.set_position(&id, Some(position))) {
                    Ok(true) => {}
                    Ok(false) => log::warn!("Marker {} vanished before it was placed", id),
                    Err(e) => log::error!("Could not save position of {}: {}", id, e),
                }
            }
        }
        self.events.push(ViewerEvent::PositionPicked(position));
    }

    // Input

    fn modes(&self) -> InputModes {
        InputModes {
            street_view: self.street_view.is_active(),
            position_picking: self.picking.is_some(),
        }
    }

    fn note_lock(&mut self, response: ControlResponse) {
        if let Some(locked) = response.pointer_lock {
            self.pointer_locked = locked;
        }
    }

    fn within_tolerance(&self, from: [f32; 2], to: [f32; 2]) -> bool {
        let dx = to[0] - from[0];
        let dy = to[1] - from[1];
        (dx * dx + dy * dy).sqrt() <= self.options.controls.click_tolerance
    }

    fn click(&mut self, x: f32, y: f32) {
        if self.street_view.is_active() {
            return;
        }
        // Under pointer lock the crosshair sits at the centre of the view.
        let (x, y) = if self.pointer_locked {
            (self.viewport.width * 0.5, self.viewport.height * 0.5)
        } else {
            (x, y)
        };

        if self.picking.is_some() {
            self.pick_at(x, y);
            return;
        }

        let ray = screen_to_ray((x, y), self.viewport, &self.scene.camera);
        match self.scene_markers.hit_test(&self.scene, &ray) {
            Some(id) => {
                self.on_marker_clicked(&id);
            }
            None => self.clear_selection(),
        }
    }

    /// Tracks presses and releases so a short tap reads as a click.
    fn track_click(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::PointerDown {
                button: PointerButton::Primary,
                x,
                y,
            } => self.pending_click = Some(PendingClick::Mouse([x, y])),
            InputEvent::PointerUp {
                button: PointerButton::Primary,
                x,
                y,
            } => {
                if let Some(PendingClick::Mouse(at)) = self.pending_click.take() {
                    if self.within_tolerance(at, [x, y]) {
                        self.click(x, y);
                    }
                }
            }
            InputEvent::Touch { id, phase, x, y } => match phase {
                TouchPhase::Started => {
                    self.active_touches += 1;
                    self.pending_click =
                        (self.active_touches == 1).then_some(PendingClick::Touch { id, at: [x, y] });
                }
                TouchPhase::Moved => {}
                TouchPhase::Ended | TouchPhase::Cancelled => {
                    self.active_touches = self.active_touches.saturating_sub(1);
                    if let Some(PendingClick::Touch { id: pending, at }) = self.pending_click {
                        if pending == id {
                            self.pending_click = None;
                            if phase == TouchPhase::Ended && self.within_tolerance(at, [x, y]) {
                                self.click(x, y);
                            }
                        }
                    }
                }
            },
            _ => {}
        }
    }

    /// Routes one input event. The response tells the host whether to grab
    /// or release the pointer.
    pub fn handle_input(&mut self, event: &InputEvent) -> ControlResponse {
        if self.street_view.is_active() {
            let (key, pressed) = match *event {
                InputEvent::KeyDown(key) => (key, true),
                InputEvent::KeyUp(key) => (key, false),
                _ => return ControlResponse::IGNORED,
            };
            return match self.street_view.handle_key(key, pressed) {
                KeyOutcome::Ignored => ControlResponse::IGNORED,
                KeyOutcome::Handled => ControlResponse::CONSUMED,
                KeyOutcome::Exit => self
                    .set_street_view_mode(false)
                    .unwrap_or(ControlResponse::IGNORED),
            };
        }

        if matches!(event, InputEvent::KeyDown(Key::Escape)) && self.picking.is_some() {
            self.stop_position_picking();
            return ControlResponse::CONSUMED;
        }

        match event {
            InputEvent::PointerDown { .. }
            | InputEvent::Touch {
                phase: TouchPhase::Started,
                ..
            } => self.scene.cancel_animation(),
            _ => {}
        }

        let modes = self.modes();
        let mut ctx = ControlContext {
            camera: &mut self.scene.camera,
            viewport: self.viewport,
            scene_center: self.scene_center,
            modes,
        };
        let response = self.controls.handle_event(event, &mut ctx);
        self.note_lock(response);

        self.track_click(event);
        response
    }

    /// Per-frame update: street view or the control scheme, then the fly-to
    /// animation and the camera uniform.
    pub fn frame(&mut self, dt: Duration) {
        if self.street_view.is_active() {
            self.street_view.update(dt, &mut self.scene);
        } else {
            let modes = self.modes();
            let mut ctx = ControlContext {
                camera: &mut self.scene.camera,
                viewport: self.viewport,
                scene_center: self.scene_center,
                modes,
            };
            self.controls.update(dt, &mut ctx);
        }
        self.scene.update(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::camera_utils::project_to_screen;
    use crate::gfx::geometry::generate_box;
    use crate::gfx::scene::{Material, Mesh, Object};
    use crate::markers::{MarkerDraft, MemoryStorage};
    use cgmath::InnerSpace;
    use std::cell::Cell;
    use std::rc::Rc;

    fn caps() -> Capabilities {
        Capabilities {
            touch: false,
            width: 1280,
            height: 800,
        }
    }

    fn viewer() -> Viewer<MemoryStorage> {
        let mut options = ViewerOptions::default();
        options.storage.known_photos.clear();
        Viewer::new(options, caps(), MemoryStorage::new(), MemoryStorage::new()).unwrap()
    }

    fn with_ground(viewer: &mut Viewer<MemoryStorage>) {
        let ground = Object::new(
            "ground",
            vec![Mesh::surface(generate_box([-200.0, -1.0, -200.0], [200.0, 0.0, 200.0]), Material::default())],
        );
        viewer.scene.add_role_object(Role::Ground, ground);
    }

    fn screen_of(viewer: &Viewer<MemoryStorage>, point: Vector3<f32>) -> [f32; 2] {
        let camera = &viewer.scene.camera;
        let view_proj = camera.projection_matrix() * camera.view_matrix();
        project_to_screen(&view_proj, point, viewer.viewport()).unwrap()
    }

    fn click(viewer: &mut Viewer<MemoryStorage>, [x, y]: [f32; 2]) {
        let button = PointerButton::Primary;
        viewer.handle_input(&InputEvent::PointerDown { button, x, y });
        viewer.handle_input(&InputEvent::PointerUp { button, x, y });
    }

    #[test]
    fn known_photos_are_seeded_unplaced() {
        let viewer = Viewer::new(ViewerOptions::default(), caps(), MemoryStorage::new(), MemoryStorage::new()).unwrap();
        assert_eq!(viewer.store(Collection::Photos).len(), 17);
        assert_eq!(viewer.placed_marker_count(), 0);
    }

    #[test]
    fn placing_a_marker_makes_it_clickable() {
        let mut viewer = viewer();
        let id = viewer
            .edit(Collection::Pins, |store| store.add(MarkerDraft::named("Library")))
            .unwrap();
        assert_eq!(viewer.placed_marker_count(), 0);

        let spot = Position::new(10.0, 0.0, 10.0);
        let placed = viewer.edit(Collection::Pins, |store| store.set_position(&id, Some(spot)));
        assert!(placed.unwrap());
        assert_eq!(viewer.placed_marker_count(), 1);
        let object = viewer.marker_object(&id).unwrap();
        assert_eq!(viewer.scene.object(object).unwrap().origin(), spot.to_vec3());

        let pixel = screen_of(&viewer, spot.to_vec3());
        click(&mut viewer, pixel);
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::MarkerSelected(id.clone())]);
        assert_eq!(viewer.selected(), Some(&id));
        assert!(viewer.scene.is_animating());
    }

    #[test]
    fn clicking_empty_space_deselects() {
        let mut viewer = viewer();
        let id = viewer
            .edit(Collection::Pins, |store| {
                store.add(MarkerDraft::named("Gym").at(Position::new(0.0, 0.0, 0.0)))
            })
            .unwrap();
        assert!(viewer.on_marker_clicked(&id));
        viewer.drain_events();

        // top-left corner looks at the sky
        click(&mut viewer, [1.0, 1.0]);
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::MarkerDeselected]);
        assert!(viewer.selected().is_none());
    }

    #[test]
    fn fly_to_ends_in_front_of_marker() {
        let mut viewer = viewer();
        let target = Position::new(20.0, 0.0, -10.0);
        let id = viewer
            .edit(Collection::Pins, |store| store.add(MarkerDraft::named("Gate").at(target)))
            .unwrap();
        viewer.on_marker_clicked(&id);
        for _ in 0..60 {
            viewer.frame(Duration::from_millis(16));
        }
        assert!(!viewer.scene.is_animating());
        let distance = (viewer.scene.camera.position - target.to_vec3()).magnitude();
        assert!((distance - 40.0).abs() < 1e-3);
        let aim = (target.to_vec3() - viewer.scene.camera.position).normalize();
        assert!((viewer.scene.camera.forward() - aim).magnitude() < 1e-4);
    }

    #[test]
    fn pointer_press_cancels_fly_to() {
        let mut viewer = viewer();
        let id = viewer
            .edit(Collection::Pins, |store| {
                store.add(MarkerDraft::named("Hall").at(Position::new(5.0, 0.0, 5.0)))
            })
            .unwrap();
        viewer.on_marker_clicked(&id);
        viewer.handle_input(&InputEvent::PointerDown {
            button: PointerButton::Secondary,
            x: 10.0,
            y: 10.0,
        });
        assert!(!viewer.scene.is_animating());
    }

    #[test]
    fn picking_waits_for_a_surface_hit() {
        let mut viewer = viewer();
        with_ground(&mut viewer);
        let picked = Rc::new(Cell::new(None));
        let sink = Rc::clone(&picked);
        viewer.start_position_picking(Box::new(move |p| sink.set(Some(p))));
        let camera_before = viewer.scene.camera.position;

        // sky: nothing happens, picking stays on
        click(&mut viewer, [640.0, 2.0]);
        assert!(viewer.is_picking());
        assert!(picked.get().is_none());

        // controls are blocked while picking
        viewer.handle_input(&InputEvent::Wheel { delta: 1.0 });
        assert_eq!(viewer.scene.camera.position, camera_before);

        click(&mut viewer, [640.0, 400.0]);
        let position = picked.get().unwrap();
        assert!(position.y.abs() < 1e-3);
        assert!(!viewer.is_picking());
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::PositionPicked(position)]);
    }

    #[test]
    fn placing_through_picking_updates_store() {
        let mut viewer = viewer();
        with_ground(&mut viewer);
        let id = viewer
            .edit(Collection::Pins, |store| store.add(MarkerDraft::named("Pool")))
            .unwrap();
        viewer.place_marker(Collection::Pins, id.clone());
        click(&mut viewer, [640.0, 400.0]);

        assert!(viewer.store(Collection::Pins).get(&id).unwrap().is_placed());
        assert_eq!(viewer.placed_marker_count(), 1);
    }

    #[test]
    fn drag_is_not_a_click() {
        let mut viewer = viewer();
        with_ground(&mut viewer);
        viewer.start_position_picking(Box::new(|_| {}));
        let button = PointerButton::Primary;
        viewer.handle_input(&InputEvent::PointerDown { button, x: 600.0, y: 400.0 });
        viewer.handle_input(&InputEvent::PointerUp { button, x: 660.0, y: 400.0 });
        assert!(viewer.is_picking());
    }

    #[test]
    fn street_view_takes_over_and_escape_leaves() {
        let mut viewer = viewer();
        with_ground(&mut viewer);
        viewer.set_street_view_mode(true).unwrap();
        assert!(viewer.is_street_view());
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::StreetViewChanged(true)]);

        let eye = viewer.scene.camera.position;
        let response = viewer.handle_input(&InputEvent::Wheel { delta: 1.0 });
        assert!(!response.consumed);
        viewer.apply_zoom(10.0);
        assert_eq!(viewer.scene.camera.position, eye);

        viewer.handle_input(&InputEvent::KeyDown(Key::W));
        viewer.frame(Duration::from_millis(16));
        assert!(viewer.scene.camera.position.z < eye.z);

        viewer.handle_input(&InputEvent::KeyDown(Key::Escape));
        assert!(!viewer.is_street_view());
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::StreetViewChanged(false)]);
        assert_eq!(
            viewer.set_street_view_mode(false),
            Err(TransitionError::NotActive)
        );
    }

    #[test]
    fn ready_fires_once() {
        let mut viewer = viewer();
        let mut ready = viewer.ready().unwrap();
        assert!(viewer.ready().is_none());
        with_ground(&mut viewer);
        let report = LoadReport {
            loaded: vec![Role::Ground],
            skipped: Vec::new(),
            normalization: crate::model::Normalization::from_bounds(
                viewer.scene.map_bounds().unwrap(),
                180.0,
            ),
        };

        viewer.on_models_loaded(&report);
        viewer.on_models_loaded(&report);
        assert_eq!(ready.try_recv(), Ok(Some(())));
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::Ready]);
        assert!(viewer.is_ready());
    }

    #[test]
    fn reset_view_frames_the_map() {
        let mut viewer = viewer();
        with_ground(&mut viewer);
        viewer.scene.camera.position = Vector3::new(1.0, 2.0, 3.0);
        viewer.reset_view();
        // bounds 400 x 1 x 400 centred at (0, -0.5, 0)
        let expected = Vector3::new(0.0, -0.5 + 40.0, 240.0);
        assert!((viewer.scene.camera.position - expected).magnitude() < 1e-3);
        assert_eq!(viewer.scene.camera.yaw(), 0.0);
        assert!((viewer.scene.camera.pitch() - -0.5).abs() < 1e-6);
    }

    #[test]
    fn deleting_the_selected_marker_deselects() {
        let mut viewer = viewer();
        let id = viewer
            .edit(Collection::Pins, |store| {
                store.add(MarkerDraft::named("Stage").at(Position::new(1.0, 0.0, 1.0)))
            })
            .unwrap();
        viewer.on_marker_clicked(&id);
        viewer.drain_events();
        viewer.edit(Collection::Pins, |store| store.delete(&id)).unwrap();
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::MarkerDeselected]);
        assert_eq!(viewer.placed_marker_count(), 0);
    }

    #[test]
    fn search_spans_collections() {
        let mut viewer = viewer();
        viewer
            .edit(Collection::Photos, |store| {
                store.add(MarkerDraft::named("圖書館.jpg").at(Position::new(0.0, 0.0, 0.0)))
            })
            .unwrap();
        viewer
            .edit(Collection::Pins, |store| {
                store.add(MarkerDraft::named("圖書館 entrance").at(Position::new(1.0, 0.0, 0.0)))
            })
            .unwrap();
        let results = viewer.search("圖書");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, Collection::Photos);
    }
}
