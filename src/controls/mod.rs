//! # Camera Controls
//!
//! Pointer, wheel, touch and keyboard input is normalized into
//! [`InputEvent`]s and routed to exactly one enabled [`ControlScheme`].
//!
//! ## Schemes
//!
//! - [`DesktopControls`]: left-drag pans, right-drag rotates, wheel zooms
//! - [`TouchControls`]: one finger pans, two fingers pinch-zoom or rotate
//! - [`OrbitControls`]: drag orbits the scene centre, wheel dollies toward it
//! - [`FirstPersonControls`]: pointer-lock look with WASD movement
//!
//! While street view or position picking is active every scheme ignores
//! input, so only one subsystem writes the camera at a time.

pub mod desktop;
pub mod first_person;
pub mod orbit;
pub mod touch;
pub mod winit_input;

use std::time::Duration;

use cgmath::Vector3;
use serde::{Deserialize, Serialize};

use crate::gfx::camera::{ViewCamera, Viewport};
use crate::options::ControlOptions;

pub use desktop::DesktopControls;
pub use first_person::FirstPersonControls;
pub use orbit::OrbitControls;
pub use touch::TouchControls;
pub use winit_input::WinitInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Started,
    Moved,
    Ended,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Space,
    Escape,
    Other,
}

/// Platform-neutral input. Pointer coordinates are physical pixels with the
/// origin at the top-left of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { button: PointerButton, x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerUp { button: PointerButton, x: f32, y: f32 },
    /// Unaccelerated mouse motion, delivered while the pointer is locked.
    RawMotion { dx: f32, dy: f32 },
    /// Scroll amount; positive scrolls away from the user (zoom in).
    Wheel { delta: f32 },
    Touch { id: u64, phase: TouchPhase, x: f32, y: f32 },
    KeyDown(Key),
    KeyUp(Key),
}

impl InputEvent {
    pub fn is_touch(&self) -> bool {
        matches!(self, InputEvent::Touch { .. })
    }
}

/// Viewer modes that take input away from the camera schemes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputModes {
    pub street_view: bool,
    pub position_picking: bool,
}

impl InputModes {
    pub fn blocks_camera(&self) -> bool {
        self.street_view || self.position_picking
    }
}

/// What a scheme may touch while handling input.
pub struct ControlContext<'a> {
    pub camera: &'a mut ViewCamera,
    pub viewport: Viewport,
    /// Centre of the loaded map, used as the orbit pivot.
    pub scene_center: Vector3<f32>,
    pub modes: InputModes,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlResponse {
    pub consumed: bool,
    /// `Some(true)` asks the host to grab the pointer, `Some(false)` to release it.
    pub pointer_lock: Option<bool>,
}

impl ControlResponse {
    pub const IGNORED: Self = Self {
        consumed: false,
        pointer_lock: None,
    };

    pub const CONSUMED: Self = Self {
        consumed: true,
        pointer_lock: None,
    };

    pub fn lock(locked: bool) -> Self {
        Self {
            consumed: true,
            pointer_lock: Some(locked),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlSchemeKind {
    Desktop,
    Touch,
    Orbit,
    FirstPerson,
}

impl ControlSchemeKind {
    pub const ALL: [ControlSchemeKind; 4] = [
        ControlSchemeKind::Desktop,
        ControlSchemeKind::Touch,
        ControlSchemeKind::Orbit,
        ControlSchemeKind::FirstPerson,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ControlSchemeKind::Desktop => "Desktop",
            ControlSchemeKind::Touch => "Touch",
            ControlSchemeKind::Orbit => "Orbit",
            ControlSchemeKind::FirstPerson => "First person",
        }
    }
}

/// One way of turning input into camera motion.
pub trait ControlScheme {
    fn kind(&self) -> ControlSchemeKind;

    fn enable(&mut self);

    /// Stops handling input and drops any drag or gesture in progress.
    fn disable(&mut self);

    fn is_enabled(&self) -> bool;

    fn handle_event(&mut self, event: &InputEvent, ctx: &mut ControlContext<'_>) -> ControlResponse;

    /// Per-frame work such as held-key movement.
    fn update(&mut self, _dt: Duration, _ctx: &mut ControlContext<'_>) {}

    fn holds_pointer_lock(&self) -> bool {
        false
    }
}

pub fn build_scheme(kind: ControlSchemeKind, options: &ControlOptions) -> Box<dyn ControlScheme> {
    match kind {
        ControlSchemeKind::Desktop => Box::new(DesktopControls::new(options)),
        ControlSchemeKind::Touch => Box::new(TouchControls::new(options)),
        ControlSchemeKind::Orbit => Box::new(OrbitControls::new(options)),
        ControlSchemeKind::FirstPerson => Box::new(FirstPersonControls::new(options)),
    }
}

/// Input hardware as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub touch: bool,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceClass {
    pub fn classify(caps: Capabilities) -> Self {
        if caps.touch && (caps.width < 768 || caps.height < 768) {
            DeviceClass::Mobile
        } else if caps.touch && caps.width < 1024 {
            DeviceClass::Tablet
        } else {
            DeviceClass::Desktop
        }
    }

    pub fn default_scheme(self) -> ControlSchemeKind {
        match self {
            DeviceClass::Desktop => ControlSchemeKind::Desktop,
            DeviceClass::Mobile | DeviceClass::Tablet => ControlSchemeKind::Touch,
        }
    }
}

/// Owns the single active control scheme.
pub struct ControlManager {
    active: Box<dyn ControlScheme>,
    options: ControlOptions,
    device: DeviceClass,
    suspended: bool,
}

impl ControlManager {
    pub fn new(device: DeviceClass, options: ControlOptions) -> Self {
        let mut active = build_scheme(device.default_scheme(), &options);
        active.enable();
        log::info!("Device class {:?}, using {} controls", device, active.kind().name());
        Self {
            active,
            options,
            device,
            suspended: false,
        }
    }

    /// Resolves the device class from `caps` unless the options force one.
    pub fn for_capabilities(caps: Capabilities, options: ControlOptions) -> Self {
        let device = options.device.unwrap_or_else(|| DeviceClass::classify(caps));
        Self::new(device, options)
    }

    pub fn device(&self) -> DeviceClass {
        self.device
    }

    pub fn active_kind(&self) -> ControlSchemeKind {
        self.active.kind()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Replaces the active scheme. The old one is disabled first.
    ///
    /// The response asks for the pointer to be released if the old scheme held it.
    pub fn switch_to(&mut self, kind: ControlSchemeKind) -> ControlResponse {
        if self.active.kind() == kind {
            return ControlResponse::IGNORED;
        }
        let released = self.active.holds_pointer_lock();
        self.active.disable();

        self.active = build_scheme(kind, &self.options);
        if !self.suspended {
            self.active.enable();
        }
        log::info!("Switched to {} controls", kind.name());

        ControlResponse {
            consumed: true,
            pointer_lock: released.then_some(false),
        }
    }

    /// Disables the active scheme while another subsystem drives the camera.
    pub fn suspend(&mut self) -> ControlResponse {
        if self.suspended {
            return ControlResponse::IGNORED;
        }
        self.suspended = true;
        let released = self.active.holds_pointer_lock();
        self.active.disable();
        ControlResponse {
            consumed: true,
            pointer_lock: released.then_some(false),
        }
    }

    pub fn resume(&mut self) {
        if self.suspended {
            self.suspended = false;
            self.active.enable();
        }
    }

    /// Routes `event` to the active scheme. The first touch switches to
    /// touch controls, and a pointer release from that switch is carried in
    /// the response even when the event itself is ignored.
    pub fn handle_event(&mut self, event: &InputEvent, ctx: &mut ControlContext<'_>) -> ControlResponse {
        let mut released = None;
        if event.is_touch() && self.active.kind() != ControlSchemeKind::Touch {
            log::info!("Touch input detected");
            released = self.switch_to(ControlSchemeKind::Touch).pointer_lock;
        }
        if self.suspended || ctx.modes.blocks_camera() || !self.active.is_enabled() {
            return ControlResponse {
                pointer_lock: released,
                ..ControlResponse::IGNORED
            };
        }
        let mut response = self.active.handle_event(event, ctx);
        response.pointer_lock = response.pointer_lock.or(released);
        response
    }

    pub fn update(&mut self, dt: Duration, ctx: &mut ControlContext<'_>) {
        if self.suspended || ctx.modes.blocks_camera() || !self.active.is_enabled() {
            return;
        }
        self.active.update(dt, ctx);
    }
}

/// Frame-rate independent scale for speeds tuned per frame at 60 fps.
pub(crate) fn frame_scale(dt: Duration) -> f32 {
    dt.as_secs_f32() * 60.0
}
