//! Software rasterizer for an orthographic top-down camera.

use image::{Rgba, RgbaImage};
use tracing::trace;

use super::world::SharedWorld;
use crate::coord::{WorldPoint, ZoneTileKey};
use crate::engine::{
    CameraState, CameraTransform, ColoredLine, Frustum, RenderEngine, SceneFilter, Viewport,
    ZTest,
};
use crate::error::{MapError, MapResult};

/// Colour written under décor instances.
const MARKER_COLOR: Rgba<u8> = Rgba([32, 96, 32, 255]);

/// Half size of a décor marker in pixels.
const MARKER_HALF_SIZE: i64 = 1;

/// What the engine writes for visible ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelShader {
    /// Per-tile colour with season tint and décor markers.
    #[default]
    Terrain,
    /// Absolute pixel column and row encoded into RGB, see [`encode_world_pixel`].
    WorldCoordinates,
}

/// Encode an absolute raster column/row into an opaque pixel.
///
/// 12 bits of column and 12 bits of row, split across RGB. Alpha is always
/// 255 so an encoded pixel never matches a transparent fill.
pub fn encode_world_pixel(col: i64, row: i64) -> Rgba<u8> {
    let col = col.rem_euclid(1 << 12) as u32;
    let row = row.rem_euclid(1 << 12) as u32;
    Rgba([
        (col & 0xFF) as u8,
        (((col >> 8) & 0x0F) | ((row & 0x0F) << 4)) as u8,
        ((row >> 4) & 0xFF) as u8,
        255,
    ])
}

/// Inverse of [`encode_world_pixel`], modulo 4096.
pub fn decode_world_pixel(pixel: &Rgba<u8>) -> (u32, u32) {
    let [r, g, b, _] = pixel.0;
    let col = r as u32 | ((g as u32 & 0x0F) << 8);
    let row = (g as u32 >> 4) | ((b as u32) << 4);
    (col, row)
}

/// Headless [`RenderEngine`].
pub struct HeadlessEngine {
    world: SharedWorld,
    width: u32,
    height: u32,
    camera: CameraState,
    shader: PixelShader,
    frame: RgbaImage,
    z_test: ZTest,
    color_mask: bool,
    antialiasing: bool,
    time: f64,
    frames_presented: u64,
}

impl HeadlessEngine {
    /// Engine with a `width` x `height` render target, one world unit per pixel.
    pub fn new(world: SharedWorld, width: u32, height: u32) -> Self {
        Self {
            world,
            width,
            height,
            camera: CameraState {
                transform: CameraTransform::default(),
                frustum: Frustum::orthographic(width as f64, height as f64),
                viewport: Viewport::full(),
            },
            shader: PixelShader::default(),
            frame: RgbaImage::new(width, height),
            z_test: ZTest::LessEqual,
            color_mask: true,
            antialiasing: false,
            time: 0.0,
            frames_presented: 0,
        }
    }

    pub fn with_shader(mut self, shader: PixelShader) -> Self {
        self.shader = shader;
        self
    }

    pub fn antialiasing(&self) -> bool {
        self.antialiasing
    }

    pub fn landscape_z_test(&self) -> ZTest {
        self.z_test
    }

    /// Time passed to the last `animate` call.
    pub fn animation_time(&self) -> f64 {
        self.time
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// World position under the centre of pixel `(px, py)`.
    fn pixel_to_world(&self, px: u32, py: u32) -> WorldPoint {
        let cam = &self.camera;
        let left = cam.transform.position.x - cam.frustum.width / 2.0;
        let top = cam.transform.position.y + cam.frustum.height / 2.0;
        WorldPoint::flat(
            left + (px as f64 + 0.5) * cam.frustum.width / self.width as f64,
            top - (py as f64 + 0.5) * cam.frustum.height / self.height as f64,
        )
    }

    /// Pixel covering a world position, possibly outside the frame.
    fn world_to_pixel(&self, point: &WorldPoint) -> (i64, i64) {
        let cam = &self.camera;
        let left = cam.transform.position.x - cam.frustum.width / 2.0;
        let top = cam.transform.position.y + cam.frustum.height / 2.0;
        let px = (point.x - left) * self.width as f64 / cam.frustum.width;
        let py = (top - point.y) * self.height as f64 / cam.frustum.height;
        (px.floor() as i64, py.floor() as i64)
    }

    /// Pixels per world unit along x and y.
    fn pixels_per_unit(&self) -> (f64, f64) {
        (
            self.width as f64 / self.camera.frustum.width,
            self.height as f64 / self.camera.frustum.height,
        )
    }

    fn put_pixel_clipped(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height {
            self.frame.put_pixel(x as u32, y as u32, color);
        }
    }

    fn shade_landscape(&mut self) {
        let world = self.world.clone();
        let world = world.borrow();
        let (ppu_x, ppu_y) = self.pixels_per_unit();
        let tint = world
            .banks
            .as_ref()
            .map(|b| season_tint(&b.tile_postfix))
            .unwrap_or(0);

        for py in 0..self.height {
            for px in 0..self.width {
                let point = self.pixel_to_world(px, py);
                let color = match self.shader {
                    PixelShader::WorldCoordinates => encode_world_pixel(
                        (point.x * ppu_x).floor() as i64,
                        (-point.y * ppu_y).floor() as i64,
                    ),
                    PixelShader::Terrain => match ZoneTileKey::from_world(&point) {
                        Ok(tile) if world.is_loaded(&tile) => tile_color(&tile, tint),
                        _ => continue,
                    },
                };
                self.frame.put_pixel(px, py, color);
            }
        }
    }

    fn shade_decor(&mut self) {
        if self.shader != PixelShader::Terrain {
            return;
        }
        let markers: Vec<WorldPoint> = self.world.borrow().visible_markers().copied().collect();
        for marker in markers {
            let (cx, cy) = self.world_to_pixel(&marker);
            for dy in -MARKER_HALF_SIZE..=MARKER_HALF_SIZE {
                for dx in -MARKER_HALF_SIZE..=MARKER_HALF_SIZE {
                    self.put_pixel_clipped(cx + dx, cy + dy, MARKER_COLOR);
                }
            }
        }
    }
}

/// Deterministic checkerboard-ish colour per tile.
fn tile_color(tile: &ZoneTileKey, tint: u8) -> Rgba<u8> {
    let base = if (tile.row + tile.col) % 2 == 0 { 96 } else { 128 };
    Rgba([
        base + (tile.col % 16) as u8 * 4,
        base + tint,
        base + (tile.row % 16) as u8 * 4,
        255,
    ])
}

fn season_tint(postfix: &str) -> u8 {
    match postfix {
        "_su" => 16,
        "_au" => 32,
        "_wi" => 48,
        _ => 0,
    }
}

impl RenderEngine for HeadlessEngine {
    fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn camera(&self) -> CameraState {
        self.camera
    }

    fn set_camera(&mut self, camera: &CameraState) {
        self.camera = *camera;
    }

    fn animate(&mut self, time: f64) {
        self.time = time;
    }

    fn clear(&mut self, color: Rgba<u8>) {
        for pixel in self.frame.pixels_mut() {
            *pixel = color;
        }
    }

    fn render_scene(&mut self, filter: SceneFilter) {
        if !self.color_mask {
            return;
        }
        if filter.landscape {
            self.shade_landscape();
        }
        self.shade_decor();
    }

    fn set_landscape_z_test(&mut self, test: ZTest) {
        self.z_test = test;
    }

    fn set_color_mask(&mut self, enabled: bool) {
        self.color_mask = enabled;
    }

    fn draw_depth_quad(&mut self) {
        trace!("depth quad");
    }

    fn clear_depth(&mut self) {}

    fn draw_lines(&mut self, lines: &[ColoredLine]) {
        for line in lines {
            let (x0, y0) = self.world_to_pixel(&line.from);
            let (x1, y1) = self.world_to_pixel(&line.to);
            let steps = (x1 - x0).abs().max((y1 - y0).abs()).max(1);
            for i in 0..=steps {
                let t = i as f64 / steps as f64;
                let x = x0 as f64 + (x1 - x0) as f64 * t;
                let y = y0 as f64 + (y1 - y0) as f64 * t;
                self.put_pixel_clipped(x.round() as i64, y.round() as i64, line.color);
            }
        }
    }

    fn read_pixels(&mut self) -> MapResult<RgbaImage> {
        if self.frame.width() != self.width || self.frame.height() != self.height {
            return Err(MapError::Engine("frame buffer size mismatch".to_string()));
        }
        Ok(self.frame.clone())
    }

    fn swap_buffers(&mut self) {
        self.frames_presented += 1;
    }

    fn set_antialiasing(&mut self, enabled: bool) {
        self.antialiasing = enabled;
    }
}
