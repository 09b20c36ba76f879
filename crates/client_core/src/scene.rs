//! Scene composer: turns an avatar and its garments into plain scene data.
//!
//! Nothing here touches a graphics context. Renderers consume
//! [`SceneDescription`] and decide how to draw boxes, lights and the grid.

use std::{fmt, str::FromStr};

use serde::Serialize;
use shared::domain::{Avatar, AvatarId, Garment, GarmentId, UnknownVariant};

use crate::selection::{Clock, SelectionStore};

pub type Vec3 = [f32; 3];

pub const CAMERA_TARGET: Vec3 = [0.0, 1.0, 0.0];
pub const CAMERA_FOV_DEGREES: f32 = 50.0;
pub const ORBIT_MIN_DISTANCE: f32 = 2.0;
pub const ORBIT_MAX_DISTANCE: f32 = 10.0;

const AVATAR_SIZE: Vec3 = [1.0, 2.0, 0.5];
const GARMENT_SIZE: Vec3 = [1.1, 0.3, 0.6];
const GARMENT_TOP_Y: f32 = 0.5;
const GARMENT_STEP_Y: f32 = 0.4;
const SWAY_FREQUENCY: f32 = 0.5;
const SWAY_AMPLITUDE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    /// `hue`, `saturation` and `lightness` are all in `0.0..=1.0`.
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let q = if lightness < 0.5 {
            lightness * (1.0 + saturation)
        } else {
            lightness + saturation - lightness * saturation
        };
        let p = 2.0 * lightness - q;
        let channel = |offset: f32| {
            let t = (hue + offset).rem_euclid(1.0);
            let value = if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            };
            (value.clamp(0.0, 1.0) * 255.0).round() as u8
        };
        Self {
            r: channel(1.0 / 3.0),
            g: channel(0.0),
            b: channel(-1.0 / 3.0),
        }
    }

    pub fn to_hex_string(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraPreset {
    #[default]
    Front,
    Side,
    Top,
}

impl CameraPreset {
    pub const ALL: [CameraPreset; 3] = [CameraPreset::Front, CameraPreset::Side, CameraPreset::Top];

    pub fn position(self) -> Vec3 {
        match self {
            CameraPreset::Front => [0.0, 1.0, 5.0],
            CameraPreset::Side => [5.0, 1.0, 0.0],
            CameraPreset::Top => [0.0, 3.0, 3.0],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CameraPreset::Front => "front",
            CameraPreset::Side => "side",
            CameraPreset::Top => "top",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CameraPreset::Front => "Front view",
            CameraPreset::Side => "Side view",
            CameraPreset::Top => "Top view",
        }
    }
}

impl fmt::Display for CameraPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraPreset {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CameraPreset::ALL
            .into_iter()
            .find(|preset| preset.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "camera preset",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackdropPreset {
    #[default]
    Studio,
    Outdoor,
    Indoor,
}

impl BackdropPreset {
    pub const ALL: [BackdropPreset; 3] = [
        BackdropPreset::Studio,
        BackdropPreset::Outdoor,
        BackdropPreset::Indoor,
    ];

    pub fn color(self) -> Rgb {
        match self {
            BackdropPreset::Studio => Rgb::from_hex(0xf0f0f0),
            BackdropPreset::Outdoor => Rgb::from_hex(0x87ceeb),
            BackdropPreset::Indoor => Rgb::from_hex(0x8b4513),
        }
    }

    /// Environment map name understood by the renderer.
    pub fn environment(self) -> &'static str {
        match self {
            BackdropPreset::Studio => "studio",
            BackdropPreset::Outdoor => "sunset",
            BackdropPreset::Indoor => "apartment",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackdropPreset::Studio => "studio",
            BackdropPreset::Outdoor => "outdoor",
            BackdropPreset::Indoor => "indoor",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BackdropPreset::Studio => "Studio",
            BackdropPreset::Outdoor => "Outdoor",
            BackdropPreset::Indoor => "Indoor",
        }
    }
}

impl fmt::Display for BackdropPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackdropPreset {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackdropPreset::ALL
            .into_iter()
            .find(|preset| preset.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "backdrop",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SceneOptions {
    pub camera: CameraPreset,
    pub backdrop: BackdropPreset,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Backdrop {
    pub preset: BackdropPreset,
    pub color: Rgb,
    pub environment: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Camera {
    pub preset: CameraPreset,
    pub position: Vec3,
    pub target: Vec3,
    pub fov_degrees: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrbitControls {
    pub enable_pan: bool,
    pub enable_zoom: bool,
    pub enable_rotate: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    pub target: Vec3,
}

impl OrbitControls {
    pub fn clamp_distance(&self, distance: f32) -> f32 {
        distance.clamp(self.min_distance, self.max_distance)
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            enable_pan: true,
            enable_zoom: true,
            enable_rotate: true,
            min_distance: ORBIT_MIN_DISTANCE,
            max_distance: ORBIT_MAX_DISTANCE,
            target: CAMERA_TARGET,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Light {
    Ambient {
        intensity: f32,
    },
    Directional {
        position: Vec3,
        intensity: f32,
        cast_shadow: bool,
    },
    Point {
        position: Vec3,
        intensity: f32,
    },
}

impl Light {
    pub fn intensity(&self) -> f32 {
        match self {
            Light::Ambient { intensity }
            | Light::Directional { intensity, .. }
            | Light::Point { intensity, .. } => *intensity,
        }
    }
}

/// The fixed three-light rig.
pub fn light_rig() -> Vec<Light> {
    vec![
        Light::Ambient { intensity: 0.4 },
        Light::Directional {
            position: [10.0, 10.0, 5.0],
            intensity: 1.0,
            cast_shadow: true,
        },
        Light::Point {
            position: [-10.0, -10.0, -5.0],
            intensity: 0.5,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub color: Rgb,
    pub roughness: f32,
    pub metalness: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MeshSource {
    Avatar(AvatarId),
    Garment(GarmentId),
}

/// Axis-aligned placeholder box centred on `position`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mesh {
    pub source: MeshSource,
    pub label: String,
    pub size: Vec3,
    pub position: Vec3,
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    pub size: f32,
    pub divisions: u32,
    pub center_color: Rgb,
    pub line_color: Rgb,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            size: 10.0,
            divisions: 10,
            center_color: Rgb::from_hex(0x888888),
            line_color: Rgb::from_hex(0xcccccc),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneDescription {
    pub backdrop: Backdrop,
    pub camera: Camera,
    pub controls: OrbitControls,
    pub lights: Vec<Light>,
    /// Avatar first, then one mesh per garment in selection order.
    pub meshes: Vec<Mesh>,
    pub grid: Grid,
}

impl SceneDescription {
    pub fn garment_meshes(&self) -> impl Iterator<Item = &Mesh> {
        self.meshes
            .iter()
            .filter(|mesh| matches!(mesh.source, MeshSource::Garment(_)))
    }
}

pub fn avatar_mesh(avatar: &Avatar) -> Mesh {
    Mesh {
        source: MeshSource::Avatar(avatar.id.clone()),
        label: avatar.display_name().to_string(),
        size: AVATAR_SIZE,
        position: [0.0, 0.0, 0.0],
        material: Material {
            color: Rgb::from_hex(0xf0f0f0),
            roughness: 0.7,
            metalness: 0.1,
        },
    }
}

/// Placeholder for the garment at `layer` in the selection, stacked downwards.
pub fn garment_mesh(garment: &Garment, layer: usize) -> Mesh {
    Mesh {
        source: MeshSource::Garment(garment.id.clone()),
        label: garment.name.clone(),
        size: GARMENT_SIZE,
        position: [0.0, GARMENT_TOP_Y - GARMENT_STEP_Y * layer as f32, 0.0],
        material: Material {
            color: garment_color(&garment.id),
            roughness: 0.8,
            metalness: 0.2,
        },
    }
}

/// Stable per-garment hue at saturation and lightness 0.5.
pub fn garment_color(garment_id: &GarmentId) -> Rgb {
    // FNV-1a; stable across runs and platforms.
    let hash = garment_id
        .as_str()
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        });
    let hue = (hash % 360) as f32 / 360.0;
    Rgb::from_hsl(hue, 0.5, 0.5)
}

pub fn compose_scene(avatar: &Avatar, garments: &[Garment], options: SceneOptions) -> SceneDescription {
    let meshes = std::iter::once(avatar_mesh(avatar))
        .chain(
            garments
                .iter()
                .enumerate()
                .map(|(layer, garment)| garment_mesh(garment, layer)),
        )
        .collect();

    SceneDescription {
        backdrop: Backdrop {
            preset: options.backdrop,
            color: options.backdrop.color(),
            environment: options.backdrop.environment(),
        },
        camera: Camera {
            preset: options.camera,
            position: options.camera.position(),
            target: CAMERA_TARGET,
            fov_degrees: CAMERA_FOV_DEGREES,
        },
        controls: OrbitControls::default(),
        lights: light_rig(),
        meshes,
        grid: Grid::default(),
    }
}

/// Scene for the store's current state; `None` until an avatar is chosen.
pub fn compose_from_store<C: Clock>(
    store: &SelectionStore<C>,
    options: SceneOptions,
) -> Option<SceneDescription> {
    store
        .avatar()
        .map(|avatar| compose_scene(avatar, store.selected(), options))
}

/// Idle yaw of the avatar group, in radians, after `elapsed_secs`.
pub fn sway_angle(elapsed_secs: f32) -> f32 {
    (elapsed_secs * SWAY_FREQUENCY).sin() * SWAY_AMPLITUDE
}

#[cfg(test)]
#[path = "tests/scene_tests.rs"]
mod tests;
