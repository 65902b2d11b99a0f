//! Viewer options with TOML file support.
//!
//! Every tunable constant of the viewer lives here. All sections use
//! `#[serde(default)]`, so a partial file only overrides what it names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::controls::DeviceClass;
use crate::error::OptionsError;
use crate::gfx::scene::registry::Role;

/// Top-level options container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ViewerOptions {
    pub window: WindowOptions,
    pub camera: CameraOptions,
    pub controls: ControlOptions,
    pub street_view: StreetViewOptions,
    pub models: ModelOptions,
    pub storage: StorageOptions,
}

impl ViewerOptions {
    pub fn from_toml_str(content: &str) -> Result<Self, OptionsError> {
        Ok(toml::from_str(content)?)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, OptionsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, OptionsError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    /// Linear RGB clear colour.
    pub background: [f32; 3],
    /// TTF used by the UI; needed to show CJK marker names.
    pub font_path: Option<PathBuf>,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "Campus 3D Map".to_string(),
            width: 1280,
            height: 800,
            vsync: true,
            background: [0.102, 0.102, 0.102],
            font_path: None,
        }
    }
}

/// Camera projection, start pose and fly-to animation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraOptions {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub initial_position: [f32; 3],
    pub initial_pitch: f32,
    pub fly_to_duration_ms: u64,
    /// How far in front of a fly-to target the camera comes to rest.
    pub fly_to_distance: f32,
    /// Fraction of the scene size used by `reset_view` for height.
    pub reset_height_factor: f32,
    /// Fraction of the scene size used by `reset_view` for the back-off.
    pub reset_distance_factor: f32,
    pub reset_pitch: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            znear: 0.1,
            zfar: 1000.0,
            initial_position: [0.0, 50.0, 100.0],
            initial_pitch: -0.5,
            fly_to_duration_ms: 800,
            fly_to_distance: 40.0,
            reset_height_factor: 0.1,
            reset_distance_factor: 0.6,
            reset_pitch: -0.5,
        }
    }
}

/// Input scheme tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControlOptions {
    /// Forces a device class instead of detecting it.
    pub device: Option<DeviceClass>,
    /// Radians of yaw/pitch per pixel of drag.
    pub rotate_speed: f32,
    /// Radians per pixel for the orbit scheme.
    pub orbit_rotate_speed: f32,
    /// World units dollied per wheel notch.
    pub zoom_step: f32,
    /// Radians per pixel of raw motion under pointer lock.
    pub pointer_lock_sensitivity: f32,
    /// Units per frame at 60 fps for first-person WASD movement.
    pub first_person_move_speed: f32,
    /// Relative finger-distance change that turns a two-finger drag into a pinch.
    pub pinch_threshold: f32,
    /// World units dollied per pixel of finger-distance change.
    pub pinch_zoom_scale: f32,
    pub orbit_min_distance: f32,
    /// Pointer travel in pixels below which a press/release is a click.
    pub click_tolerance: f32,
}

impl Default for ControlOptions {
    fn default() -> Self {
        Self {
            device: None,
            rotate_speed: 0.006,
            orbit_rotate_speed: 0.01,
            zoom_step: 30.0,
            pointer_lock_sensitivity: 0.002,
            first_person_move_speed: 0.5,
            pinch_threshold: 0.05,
            pinch_zoom_scale: 0.03,
            orbit_min_distance: 1.0,
            click_tolerance: 4.0,
        }
    }
}

/// Street-view locomotion and collision parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreetViewOptions {
    pub move_speed: f32,
    pub turn_speed: f32,
    pub eye_height: f32,
    pub jump_speed: f32,
    pub gravity: f32,
    pub collision_radius: f32,
    /// Longest collision probe cast per movement step.
    pub max_step: f32,
    /// Speeds are tuned per frame at this rate and scaled by `dt`.
    pub frame_rate_normalizer: f32,
    /// Vertical offsets below the eye at which wall probes are cast.
    pub probe_offsets: Vec<f32>,
    /// Strafe must exceed forward motion by this factor to slide along a wall.
    pub slide_ratio: f32,
    /// Shortened moves at or below this length are dropped.
    pub min_advance: f32,
    pub ceiling_probe_offset: f32,
    pub ceiling_clearance: f32,
    /// Ground height used when neither ground nor building is loaded.
    pub fallback_ground_height: f32,
    /// Start position offset along +Z as a fraction of the scene footprint.
    pub start_offset_factor: f32,
}

impl Default for StreetViewOptions {
    fn default() -> Self {
        let move_speed = 0.8;
        Self {
            move_speed,
            turn_speed: 0.025,
            eye_height: 6.0,
            jump_speed: 20.0,
            gravity: -50.0,
            collision_radius: 0.8,
            max_step: move_speed * 2.0,
            frame_rate_normalizer: 60.0,
            probe_offsets: vec![0.0, -0.5, -1.0, -1.5, -2.0, -2.5, -3.0],
            slide_ratio: 1.5,
            min_advance: 0.1,
            ceiling_probe_offset: 0.5,
            ceiling_clearance: 1.5,
            fallback_ground_height: 0.0,
            start_offset_factor: 0.3,
        }
    }
}

/// One mesh file to load and the role it plays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetSpec {
    pub path: PathBuf,
    pub role: Role,
    /// Authored placement of the asset before normalization.
    #[serde(default)]
    pub offset: [f32; 3],
}

impl AssetSpec {
    pub fn new(path: impl Into<PathBuf>, role: Role) -> Self {
        Self {
            path: path.into(),
            role,
            offset: [0.0; 3],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelOptions {
    /// Largest horizontal extent of the normalized scene.
    pub target_size: f32,
    pub synthesize_edges: bool,
    pub edge_threshold_degrees: f32,
    pub edge_color: [f32; 4],
    /// Diffuse colour used when an asset has no usable material.
    pub default_color: [f32; 4],
    pub assets: Vec<AssetSpec>,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            target_size: 180.0,
            synthesize_edges: true,
            edge_threshold_degrees: 1.0,
            edge_color: [0.0, 0.0, 0.0, 0.8],
            default_color: [0.361, 0.486, 0.980, 1.0],
            assets: vec![
                AssetSpec::new("models/building.obj", Role::Building),
                AssetSpec::new("models/ground.obj", Role::Ground),
                AssetSpec::new("models/building name.obj", Role::Label),
            ],
        }
    }
}

/// Where marker collections are persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageOptions {
    pub directory: PathBuf,
    pub photo_key: String,
    pub pin_key: String,
    /// Optional byte limit per entry, mirroring browser storage quotas.
    pub quota_bytes: Option<usize>,
    /// Entries larger than this log a warning.
    pub warn_bytes: usize,
    /// Directory the photo files live in; marker `imagePath`s are relative to it.
    pub photo_directory: PathBuf,
    /// Photos that always get a (possibly unplaced) marker.
    pub known_photos: Vec<String>,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("campus3d-data"),
            photo_key: "photoMarkers".to_string(),
            pin_key: "mapMarkers".to_string(),
            quota_bytes: None,
            warn_bytes: 8 * 1024 * 1024,
            photo_directory: PathBuf::from("images"),
            known_photos: [
                "中正樓.jpg",
                "中興堂.jpg",
                "南樓.jpg",
                "司令台.jpg",
                "國中部.jpg",
                "圖書館.jpg",
                "技藝館.jpg",
                "操場.jpg",
                "新北樓.jpg",
                "東樓.jpg",
                "校門.jpg",
                "樂教館.jpg",
                "淡水信義線第二出口.jpeg",
                "舊北樓.jpg",
                "西樓.jpg",
                "體育教學館.jpg",
                "體育館.jpg",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}
