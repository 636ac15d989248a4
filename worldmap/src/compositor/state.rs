//! Settings applied for a tiled render and the state they replace.

use crate::coord::ZONE_TILE_SIZE;
use crate::engine::{CameraState, Frustum, StreamingParams};

/// Refinement threshold used while rendering tiles.
pub const TILED_THRESHOLD: f64 = 0.00005;

/// Extra tiles streamed beyond the frustum on each side.
const VISION_MARGIN_TILES: f64 = 4.0;

/// Engine state that a tiled render changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositorState {
    pub camera: CameraState,
    pub streaming: StreamingParams,
    pub vision: f64,
}

/// Streaming and camera settings for one tiled render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiledRenderSettings {
    pub vision: f64,
    pub streaming: StreamingParams,
    pub frustum: Frustum,
}

impl TiledRenderSettings {
    /// Settings for a `viewport` sized render target at `scale` px per unit.
    ///
    /// `tile_near` replaces the derived near distance when set. Vision never
    /// drops below `min_vision`.
    pub fn new(
        viewport: (u32, u32),
        scale: f64,
        tile_near: Option<f64>,
        min_vision: Option<f64>,
    ) -> Self {
        let (vw, vh) = viewport;
        let vision = render_vision(vw.max(vh), scale).max(min_vision.unwrap_or(0.0));
        Self {
            vision,
            streaming: StreamingParams {
                tile_near: tile_near.unwrap_or(vision / 2.0),
                threshold: TILED_THRESHOLD,
                refine_center_auto: false,
            },
            frustum: Frustum::orthographic(vw as f64 / scale, vh as f64 / scale),
        }
    }
}

/// Vision radius covering a viewport of `max_side` pixels plus a margin,
/// rounded to whole tiles.
pub fn render_vision(max_side: u32, scale: f64) -> f64 {
    let extent = max_side as f64 / scale;
    (extent / ZONE_TILE_SIZE).ceil() * ZONE_TILE_SIZE / 2.0 + VISION_MARGIN_TILES * ZONE_TILE_SIZE
}
