//! Tiled screenshot compositor.
//!
//! Renders an output raster far larger than the viewport by walking it in
//! viewport-sized cells. Each cell moves the camera, runs the normal frame
//! pipeline through a [`TilePipeline`] and copies the read-back pixels into
//! an accumulation buffer.
//!
//! # Seams
//!
//! Cell centres are computed from the region origin with the same formula
//! for every cell and the frustum spans exactly one viewport, so pixel `i`
//! of cell `c` covers the same world column as pixel `c * vw + i` of a
//! single huge render would.
//!
//! # State
//!
//! Camera, streaming parameters and vision are captured before the first
//! cell and restored before returning, whether the render finished, was
//! cancelled or failed.

mod region;
mod state;

pub use region::{Cell, GridPlan, RasterRegion};
pub use state::{render_vision, CompositorState, TiledRenderSettings, TILED_THRESHOLD};

use image::{Rgba, RgbaImage};
use tracing::{debug, info, warn};

use crate::abort::AbortPoll;
use crate::coord::WorldPoint;
use crate::error::{MapError, MapResult};

/// Fill value of pixels no cell has written.
pub const UNWRITTEN_PIXEL: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// The per-cell work the compositor drives.
pub trait TilePipeline {
    /// Render target size in pixels.
    fn viewport_size(&self) -> (u32, u32);

    fn capture_state(&self) -> CompositorState;

    fn restore_state(&mut self, state: &CompositorState);

    /// Apply tiled render settings before the first cell.
    fn configure(&mut self, settings: &TiledRenderSettings);

    /// Stream, render and read back one frame with the camera at `center`.
    fn render_cell(&mut self, center: WorldPoint) -> MapResult<RgbaImage>;
}

/// Progress after a cell was copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellProgress {
    pub done: usize,
    pub total: usize,
}

/// Result of a tiled render.
#[derive(Debug, Clone)]
pub struct CompositeOutcome {
    pub image: RgbaImage,
    /// False when the render was cancelled.
    pub completed: bool,
    pub cells_rendered: usize,
    pub cells_total: usize,
}

/// Walks a [`GridPlan`] and stitches the cells.
#[derive(Default)]
pub struct TiledCompositor {
    tile_near: Option<f64>,
    min_vision: Option<f64>,
    progress: Option<Box<dyn FnMut(CellProgress)>>,
}

impl TiledCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed tile near distance instead of half the vision.
    pub fn with_tile_near(mut self, tile_near: Option<f64>) -> Self {
        self.tile_near = tile_near;
        self
    }

    /// Never stream with a vision below `min_vision`.
    pub fn with_min_vision(mut self, min_vision: Option<f64>) -> Self {
        self.min_vision = min_vision;
        self
    }

    /// Observer called after every copied cell.
    pub fn with_progress(mut self, progress: impl FnMut(CellProgress) + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn set_tile_near(&mut self, tile_near: Option<f64>) {
        self.tile_near = tile_near;
    }

    pub fn set_min_vision(&mut self, min_vision: Option<f64>) {
        self.min_vision = min_vision;
    }

    pub fn set_progress(&mut self, progress: Option<Box<dyn FnMut(CellProgress)>>) {
        self.progress = progress;
    }

    /// Render `region` through `pipeline`.
    ///
    /// `abort` is polled before every cell. A cancelled render returns the
    /// partial image with `completed == false`; unwritten pixels stay
    /// [`UNWRITTEN_PIXEL`].
    pub fn render(
        &mut self,
        region: &RasterRegion,
        pipeline: &mut dyn TilePipeline,
        abort: &mut dyn AbortPoll,
    ) -> MapResult<CompositeOutcome> {
        let viewport = pipeline.viewport_size();
        let plan = GridPlan::new(*region, viewport.0, viewport.1)?;
        let settings =
            TiledRenderSettings::new(viewport, region.scale, self.tile_near, self.min_vision);
        info!(
            width = region.width_px,
            height = region.height_px,
            columns = plan.columns,
            rows = plan.rows,
            scale = region.scale,
            vision = settings.vision,
            "Rendering tiled screenshot"
        );

        let saved = pipeline.capture_state();
        pipeline.configure(&settings);
        let result = self.render_cells(&plan, region, pipeline, abort);
        pipeline.restore_state(&saved);
        result
    }

    fn render_cells(
        &mut self,
        plan: &GridPlan,
        region: &RasterRegion,
        pipeline: &mut dyn TilePipeline,
        abort: &mut dyn AbortPoll,
    ) -> MapResult<CompositeOutcome> {
        let mut image = RgbaImage::from_pixel(region.width_px, region.height_px, UNWRITTEN_PIXEL);
        let total = plan.len();
        let mut rendered = 0;

        for cell in plan.cells() {
            if abort.abort_requested() {
                warn!(
                    col = cell.col,
                    row = cell.row,
                    rendered = rendered,
                    total = total,
                    "Tiled render cancelled"
                );
                return Ok(CompositeOutcome {
                    image,
                    completed: false,
                    cells_rendered: rendered,
                    cells_total: total,
                });
            }

            debug!(col = cell.col, row = cell.row, center = %cell.center, "rendering cell");
            let frame = pipeline.render_cell(cell.center)?;
            blit(&mut image, &frame, &cell)?;
            rendered += 1;

            if let Some(progress) = self.progress.as_mut() {
                progress(CellProgress {
                    done: rendered,
                    total,
                });
            }
        }

        Ok(CompositeOutcome {
            image,
            completed: true,
            cells_rendered: rendered,
            cells_total: total,
        })
    }
}

/// Copy the top-left `cell.width x cell.height` pixels of `frame` into place.
fn blit(image: &mut RgbaImage, frame: &RgbaImage, cell: &Cell) -> MapResult<()> {
    if frame.width() < cell.width || frame.height() < cell.height {
        return Err(MapError::Engine(format!(
            "frame {}x{} smaller than cell {}x{}",
            frame.width(),
            frame.height(),
            cell.width,
            cell.height
        )));
    }
    for y in 0..cell.height {
        for x in 0..cell.width {
            image.put_pixel(cell.pixel_x + x, cell.pixel_y + y, *frame.get_pixel(x, y));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abort::NeverAbort;
    use crate::coord::WorldBounds;
    use crate::engine::headless::{decode_world_pixel, encode_world_pixel};
    use crate::engine::{CameraState, CameraTransform, Frustum, StreamingParams, Viewport};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Pipeline whose frames encode the absolute pixel under each position.
    struct CoordinatePipeline {
        viewport: (u32, u32),
        state: CompositorState,
        configured: Option<TiledRenderSettings>,
        centers: Vec<WorldPoint>,
        fail_at: Option<usize>,
    }

    impl CoordinatePipeline {
        fn new(vw: u32, vh: u32) -> Self {
            Self {
                viewport: (vw, vh),
                state: initial_state(),
                configured: None,
                centers: Vec::new(),
                fail_at: None,
            }
        }
    }

    fn initial_state() -> CompositorState {
        CompositorState {
            camera: CameraState {
                transform: CameraTransform::top_down(WorldPoint::new(1.0, -2.0, 3.0)),
                frustum: Frustum::orthographic(10.0, 10.0),
                viewport: Viewport::full(),
            },
            streaming: StreamingParams::default(),
            vision: 123.0,
        }
    }

    impl TilePipeline for CoordinatePipeline {
        fn viewport_size(&self) -> (u32, u32) {
            self.viewport
        }

        fn capture_state(&self) -> CompositorState {
            self.state
        }

        fn restore_state(&mut self, state: &CompositorState) {
            self.state = *state;
        }

        fn configure(&mut self, settings: &TiledRenderSettings) {
            self.configured = Some(*settings);
            self.state.vision = settings.vision;
            self.state.streaming = settings.streaming;
            self.state.camera.frustum = settings.frustum;
        }

        fn render_cell(&mut self, center: WorldPoint) -> MapResult<RgbaImage> {
            if self.fail_at == Some(self.centers.len()) {
                return Err(MapError::Engine("device lost".to_string()));
            }
            self.centers.push(center);
            self.state.camera.transform = CameraTransform::top_down(center);

            let settings = self.configured.unwrap();
            let (vw, vh) = self.viewport;
            let scale = vw as f64 / settings.frustum.width;
            let left = center.x - settings.frustum.width / 2.0;
            let top = center.y + settings.frustum.height / 2.0;
            Ok(RgbaImage::from_fn(vw, vh, |px, py| {
                let x = left + (px as f64 + 0.5) / scale;
                let y = top - (py as f64 + 0.5) / scale;
                encode_world_pixel((x * scale).floor() as i64, (-y * scale).floor() as i64)
            }))
        }
    }

    fn region(w: f64, h: f64, scale: f64) -> RasterRegion {
        RasterRegion::new(WorldBounds::from_corners(0.0, -h, w, 0.0), scale).unwrap()
    }

    fn assert_seamless(image: &RgbaImage) {
        for (x, y, pixel) in image.enumerate_pixels() {
            assert_ne!(*pixel, UNWRITTEN_PIXEL, "unwritten pixel at ({}, {})", x, y);
            assert_eq!(decode_world_pixel(pixel), (x, y), "wrong pixel at ({}, {})", x, y);
        }
    }

    #[test]
    fn test_scenario_two_by_two_with_tails() {
        let mut pipeline = CoordinatePipeline::new(200, 200);
        let outcome = TiledCompositor::new()
            .render(&region(320.0, 320.0, 1.0), &mut pipeline, &mut NeverAbort)
            .unwrap();

        assert!(outcome.completed);
        assert_eq!(outcome.cells_total, 4);
        assert_eq!(outcome.cells_rendered, 4);
        assert_eq!(outcome.image.dimensions(), (320, 320));
        assert_eq!(
            pipeline.centers,
            vec![
                WorldPoint::flat(100.0, -100.0),
                WorldPoint::flat(300.0, -100.0),
                WorldPoint::flat(100.0, -300.0),
                WorldPoint::flat(300.0, -300.0),
            ]
        );
        assert_seamless(&outcome.image);
    }

    #[test]
    fn test_seam_property_exact_grid() {
        let mut pipeline = CoordinatePipeline::new(64, 48);
        let outcome = TiledCompositor::new()
            .render(&region(192.0, 96.0, 1.0), &mut pipeline, &mut NeverAbort)
            .unwrap();
        assert_eq!(outcome.cells_total, 6);
        assert_seamless(&outcome.image);
    }

    #[test]
    fn test_seam_property_fractional_scale() {
        let mut pipeline = CoordinatePipeline::new(50, 30);
        let outcome = TiledCompositor::new()
            .render(&region(70.0, 40.0, 2.5), &mut pipeline, &mut NeverAbort)
            .unwrap();
        assert_eq!(outcome.image.dimensions(), (175, 100));
        assert_seamless(&outcome.image);
    }

    #[test]
    fn test_configure_and_restore() {
        let mut pipeline = CoordinatePipeline::new(200, 200);
        TiledCompositor::new()
            .with_tile_near(Some(50.0))
            .render(&region(320.0, 320.0, 1.0), &mut pipeline, &mut NeverAbort)
            .unwrap();

        let settings = pipeline.configured.unwrap();
        assert_eq!(settings.streaming.tile_near, 50.0);
        assert_eq!(settings.streaming.threshold, TILED_THRESHOLD);
        assert!(!settings.streaming.refine_center_auto);
        assert_eq!(pipeline.state, initial_state());
    }

    #[test]
    fn test_cancel_before_cell_one_one() {
        let mut pipeline = CoordinatePipeline::new(10, 10);
        let mut polls = 0;
        let mut abort = || {
            polls += 1;
            polls == 5
        };
        let outcome = TiledCompositor::new()
            .render(&region(30.0, 30.0, 1.0), &mut pipeline, &mut abort)
            .unwrap();

        assert!(!outcome.completed);
        assert_eq!(outcome.cells_rendered, 4);
        assert_eq!(outcome.cells_total, 9);
        assert_eq!(pipeline.state, initial_state());

        let image = &outcome.image;
        // rendered: row 0 and cell (0, 1)
        assert_eq!(decode_world_pixel(image.get_pixel(25, 5)), (25, 5));
        assert_eq!(decode_world_pixel(image.get_pixel(5, 15)), (5, 15));
        // not rendered: (1, 1) and everything after
        assert_eq!(*image.get_pixel(15, 15), UNWRITTEN_PIXEL);
        assert_eq!(*image.get_pixel(25, 25), UNWRITTEN_PIXEL);
    }

    #[test]
    fn test_error_restores_state() {
        let mut pipeline = CoordinatePipeline::new(10, 10);
        pipeline.fail_at = Some(2);
        let result =
            TiledCompositor::new().render(&region(30.0, 30.0, 1.0), &mut pipeline, &mut NeverAbort);
        assert!(matches!(result, Err(MapError::Engine(_))));
        assert_eq!(pipeline.centers.len(), 2);
        assert_eq!(pipeline.state, initial_state());
    }

    #[test]
    fn test_progress_reports_every_cell() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut pipeline = CoordinatePipeline::new(10, 10);
        TiledCompositor::new()
            .with_progress(move |p| sink.borrow_mut().push((p.done, p.total)))
            .render(&region(20.0, 10.0, 1.0), &mut pipeline, &mut NeverAbort)
            .unwrap();
        assert_eq!(*seen.borrow(), vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn test_min_vision_is_respected() {
        let mut pipeline = CoordinatePipeline::new(10, 10);
        TiledCompositor::new()
            .with_min_vision(Some(10000.0))
            .render(&region(10.0, 10.0, 1.0), &mut pipeline, &mut NeverAbort)
            .unwrap();
        let settings = pipeline.configured.unwrap();
        assert_eq!(settings.vision, 10000.0);
        assert_eq!(settings.streaming.tile_near, 5000.0);
    }
}
