//! Value types exchanged with the rendering backend.

use std::f64::consts::FRAC_PI_2;

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::coord::WorldPoint;

/// Camera placement. Only position and pitch matter for map renders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    /// Camera position in world units.
    pub position: WorldPoint,
    /// Rotation around the x axis in radians; `-PI/2` looks straight down.
    pub pitch: f64,
}

impl CameraTransform {
    /// Camera looking straight down at `position`.
    pub fn top_down(position: WorldPoint) -> Self {
        Self {
            position,
            pitch: -FRAC_PI_2,
        }
    }
}

impl Default for CameraTransform {
    fn default() -> Self {
        Self::top_down(WorldPoint::default())
    }
}

/// Camera frustum in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Visible width in world units.
    pub width: f64,
    /// Visible height in world units.
    pub height: f64,
    pub near: f64,
    pub far: f64,
    /// False for orthographic projection.
    pub perspective: bool,
}

impl Frustum {
    /// Orthographic frustum deep enough for any terrain height.
    pub fn orthographic(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            near: -10000.0,
            far: 10000.0,
            perspective: false,
        }
    }
}

/// Normalized viewport rectangle (0..1 in both axes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// The whole render target.
    pub fn full() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::full()
    }
}

/// Everything the compositor saves and restores about the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub transform: CameraTransform,
    pub frustum: Frustum,
    pub viewport: Viewport,
}

impl CameraState {
    /// World extent shown by the camera, centred on its position.
    pub fn visible_bounds(&self) -> crate::coord::WorldBounds {
        crate::coord::WorldBounds::around(
            self.transform.position,
            self.frustum.width / 2.0,
            self.frustum.height / 2.0,
        )
    }
}

/// Which scene layers a render pass draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneFilter {
    pub landscape: bool,
    pub water: bool,
}

impl SceneFilter {
    /// Draw everything.
    pub fn all() -> Self {
        Self {
            landscape: true,
            water: true,
        }
    }

    /// Props and vegetation only.
    pub fn objects_only() -> Self {
        Self {
            landscape: false,
            water: false,
        }
    }
}

/// Depth comparison used for the landscape material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZTest {
    LessEqual,
    GreaterEqual,
    Always,
}

/// A coloured line segment in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredLine {
    pub from: WorldPoint,
    pub to: WorldPoint,
    pub color: Rgba<u8>,
}

impl ColoredLine {
    pub fn new(from: WorldPoint, to: WorldPoint, color: Rgba<u8>) -> Self {
        Self { from, to, color }
    }
}

/// Terrain bank files to load, already season-resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TerrainBanks {
    pub small_bank: String,
    pub far_bank: String,
    pub coarse_mesh: String,
    pub micro_vegetation: String,
    /// Postfix for tile textures and vegetable descriptors, e.g. `_sp`.
    pub tile_postfix: String,
}

impl TerrainBanks {
    /// All file names in load order.
    pub fn files(&self) -> [&str; 4] {
        [
            &self.coarse_mesh,
            &self.small_bank,
            &self.far_bank,
            &self.micro_vegetation,
        ]
    }
}

/// Terrain streaming tunables the compositor overrides during a tiled render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamingParams {
    /// Distance within which full-resolution tiles are used.
    pub tile_near: f64,
    /// Geometry refinement threshold.
    pub threshold: f64,
    /// When true the loader refines around the camera instead of the
    /// reference point set by the core.
    pub refine_center_auto: bool,
}

impl Default for StreamingParams {
    fn default() -> Self {
        Self {
            tile_near: 50.0,
            threshold: 0.0,
            refine_center_auto: true,
        }
    }
}

/// Static day lighting for the landscape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandscapeLight {
    pub direction: [f64; 3],
    pub ambient: [u8; 4],
    pub diffuse: [u8; 4],
    pub specular: [u8; 4],
}

impl Default for LandscapeLight {
    fn default() -> Self {
        Self {
            direction: [1.0, 0.0, -1.0],
            ambient: [64, 64, 64, 255],
            diffuse: [255, 255, 255, 255],
            specular: [255, 255, 255, 255],
        }
    }
}

/// Tile names reported by the terrain loader after a refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderDelta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Maximum draw distance for a décor instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawDistance {
    /// Always visible regardless of distance (engine value `-1`).
    Unlimited,
    /// Never drawn (engine value `0`).
    Culled,
    /// Drawn up to the given distance.
    Limited(f64),
}

impl DrawDistance {
    /// Engine encoding of the distance.
    pub fn as_engine_value(&self) -> f64 {
        match self {
            DrawDistance::Unlimited => -1.0,
            DrawDistance::Culled => 0.0,
            DrawDistance::Limited(d) => *d,
        }
    }

    /// Whether an instance with this distance can ever be drawn.
    pub fn is_visible(&self) -> bool {
        !matches!(self, DrawDistance::Culled)
    }
}

/// Opaque identity of an instance group inside the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupHandle(pub u64);

/// Collision border classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeClass {
    Block,
    Surmountable,
    Link,
    Waterline,
    Exterior,
    ExteriorDoor,
    Unknown(u8),
}

impl EdgeClass {
    /// Number of classes the overlay filter can toggle.
    pub const FILTERABLE: usize = 6;

    /// Decode the loader's numeric class.
    pub fn from_id(id: u8) -> Self {
        match id {
            0 => EdgeClass::Block,
            1 => EdgeClass::Surmountable,
            2 => EdgeClass::Link,
            3 => EdgeClass::Waterline,
            4 => EdgeClass::Exterior,
            5 => EdgeClass::ExteriorDoor,
            other => EdgeClass::Unknown(other),
        }
    }

    /// Numeric class id.
    pub fn id(&self) -> u8 {
        match self {
            EdgeClass::Block => 0,
            EdgeClass::Surmountable => 1,
            EdgeClass::Link => 2,
            EdgeClass::Waterline => 3,
            EdgeClass::Exterior => 4,
            EdgeClass::ExteriorDoor => 5,
            EdgeClass::Unknown(id) => *id,
        }
    }
}

/// A classified collision border segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderEdge {
    pub from: WorldPoint,
    pub to: WorldPoint,
    pub class: EdgeClass,
}
