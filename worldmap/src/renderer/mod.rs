//! The map renderer context.
//!
//! [`MapRenderer`] ties the pieces together: it owns the render engine, the
//! [`StreamingManager`], the [`ContinentRegistry`] and the view, and exposes
//! the operations a front end needs (load a continent, step an interactive
//! frame, render tiled maps to PNG).
//!
//! # Example
//!
//! ```ignore
//! use worldmap::{AbortFlag, ContinentRegistry, MapRenderer, RendererConfig};
//! use worldmap::engine::headless::HeadlessBackend;
//!
//! let (backend, _world) = HeadlessBackend::new(800, 800).into_backend();
//! let registry = ContinentRegistry::from_dir("sheets")?;
//! let mut renderer = MapRenderer::new(backend, registry, RendererConfig::default());
//!
//! let written = renderer.auto_render(&["fyros".to_string()], &mut AbortFlag::new())?;
//! ```

mod output;

pub use output::{save_png, unique_output_path};

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};
use tracing::{info, warn};

use crate::abort::AbortPoll;
use crate::compositor::{
    CellProgress, CompositeOutcome, CompositorState, RasterRegion, TiledCompositor,
    TiledRenderSettings, TilePipeline,
};
use crate::config::RendererConfig;
use crate::continent::{ContinentListing, ContinentRegistry, MapListing};
use crate::coord::WorldPoint;
use crate::engine::{
    Backend, CameraState, CameraTransform, Frustum, RenderEngine, SceneFilter, Viewport, ZTest,
};
use crate::error::{MapError, MapResult};
use crate::overlay::{cluster_lines, collision_lines, grid_lines, CollisionFilter};
use crate::season::Season;
use crate::streaming::{StreamingManager, ZoneDelta};
use crate::view::{ViewController, ViewStep};

/// Pause after each interactive frame in slow-down mode.
const SLOW_DOWN_DELAY: Duration = Duration::from_millis(50);

/// Per-frame render options taken from the config.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FrameOptions {
    background: Rgba<u8>,
    inverse_z: bool,
    grid: bool,
    clusters: bool,
    collision: Option<CollisionFilter>,
}

impl FrameOptions {
    fn from_config(config: &RendererConfig) -> Self {
        Self {
            background: config.background,
            inverse_z: config.inverse_z,
            grid: config.grid,
            clusters: config.clusters,
            collision: config.collision,
        }
    }
}

/// What one interactive frame did.
#[derive(Debug)]
pub struct FrameReport {
    pub frame: u64,
    pub view: ViewStep,
    pub delta: ZoneDelta,
    pub reference: WorldPoint,
}

/// Top-down map renderer.
pub struct MapRenderer {
    engine: Box<dyn RenderEngine>,
    manager: StreamingManager,
    registry: ContinentRegistry,
    config: RendererConfig,
    view: ViewController,
    compositor: TiledCompositor,
    vision: f64,
    started: Instant,
    frames: u64,
}

impl MapRenderer {
    /// Build a renderer over `backend`.
    ///
    /// The camera is set up for interactive use: top-down at the configured
    /// view centre, one world unit per pixel.
    pub fn new(backend: Backend, registry: ContinentRegistry, config: RendererConfig) -> Self {
        let (mut manager, mut engine) = StreamingManager::from_backend(backend);
        let viewport = engine.viewport_size();
        let vision = config.vision_for(viewport);

        let mut params = manager.streaming_params();
        params.tile_near = config.tile_near;
        manager.set_streaming_params(&params);
        manager.set_hide_vegetation(config.hide_trees);
        manager.set_update_lighting(config.light);
        if let Err(e) = manager.change_season(config.season) {
            // no continent is active yet, so nothing can fail to load
            warn!(error = %e, "Season change failed");
        }

        engine.set_antialiasing(config.fxaa);
        let view = ViewController::new(config.view_center);
        engine.set_camera(&CameraState {
            transform: CameraTransform::top_down(view.point()),
            frustum: Frustum::orthographic(viewport.0 as f64, viewport.1 as f64),
            viewport: Viewport::full(),
        });

        let compositor = TiledCompositor::new()
            .with_tile_near(config.tile_near_locked.then_some(config.tile_near));

        Self {
            engine,
            manager,
            registry,
            config,
            view,
            compositor,
            vision,
            started: Instant::now(),
            frames: 0,
        }
    }

    pub fn engine(&self) -> &dyn RenderEngine {
        self.engine.as_ref()
    }

    pub fn manager(&self) -> &StreamingManager {
        &self.manager
    }

    pub fn registry(&self) -> &ContinentRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn view(&self) -> &ViewController {
        &self.view
    }

    /// Interactive vision radius.
    pub fn vision(&self) -> f64 {
        self.vision
    }

    pub fn set_vision(&mut self, vision: f64) {
        self.vision = vision.max(0.0);
    }

    pub fn season(&self) -> Season {
        self.manager.season()
    }

    /// Interactive frames stepped so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Observer called after every cell of a tiled render.
    pub fn set_progress_observer(&mut self, observer: Option<Box<dyn FnMut(CellProgress)>>) {
        self.compositor.set_progress(observer);
    }

    /// Load a continent by sub-map, continent or selection name and move the
    /// view to its centre.
    pub fn load_continent(&mut self, name: &str) -> MapResult<()> {
        let descriptor = self.registry.lookup(name)?;
        let center = descriptor.center();
        self.manager.load_continent(descriptor)?;
        self.view.reset_to(center);
        Ok(())
    }

    pub fn unload_continent(&mut self) {
        self.manager.unload_continent();
    }

    /// Switch season by tag. Unknown tags fall back to spring.
    pub fn set_season(&mut self, tag: &str) -> MapResult<()> {
        self.manager.change_season(Season::parse_lossy(tag))
    }

    pub fn cycle_season(&mut self) -> MapResult<Season> {
        let next = self.manager.season().next();
        self.manager.change_season(next)?;
        Ok(next)
    }

    pub fn list_continents(&self) -> Vec<ContinentListing> {
        self.registry.continents()
    }

    pub fn list_maps(&self) -> Vec<MapListing> {
        self.registry.maps()
    }

    pub fn hide_vegetation(&self) -> bool {
        self.manager.hide_vegetation()
    }

    pub fn set_hide_vegetation(&mut self, hide: bool) {
        self.config.hide_trees = hide;
        self.manager.set_hide_vegetation(hide);
    }

    pub fn toggle_hide_vegetation(&mut self) -> bool {
        let hide = !self.manager.hide_vegetation();
        self.set_hide_vegetation(hide);
        hide
    }

    pub fn toggle_grid(&mut self) -> bool {
        self.config.grid = !self.config.grid;
        self.config.grid
    }

    pub fn toggle_inverse_z(&mut self) -> bool {
        self.config.inverse_z = !self.config.inverse_z;
        self.config.inverse_z
    }

    /// Outline the clusters of village and outpost décor.
    pub fn toggle_debug_clusters(&mut self) -> bool {
        self.config.clusters = !self.config.clusters;
        self.config.clusters
    }

    /// Turn landscape lighting updates on or off while streaming.
    pub fn toggle_lighting(&mut self) -> bool {
        self.config.light = !self.config.light;
        self.manager.set_update_lighting(self.config.light);
        self.config.light
    }

    /// Show or hide collision borders. The class filter is kept.
    pub fn set_collision_filter(&mut self, filter: Option<CollisionFilter>) {
        self.config.collision = filter;
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.view.move_to(x, y);
    }

    pub fn nudge(&mut self, dx: f64, dy: f64) {
        self.view.nudge(dx, dy);
    }

    /// Move the view back to the centre of the active continent.
    pub fn reset_view(&mut self) {
        if let Some(active) = self.manager.active_continent() {
            self.view.reset_to(active.center());
        }
    }

    /// Padded bounds of the active continent at the configured scale.
    pub fn current_region(&self) -> MapResult<RasterRegion> {
        let active = self.manager.active_continent().ok_or_else(|| {
            MapError::InvalidConfiguration("no continent is loaded".to_string())
        })?;
        RasterRegion::padded(active.bounds, self.config.padding, self.config.scale)
    }

    /// One interactive frame: follow the view into other continents, stream,
    /// render and present.
    pub fn step_frame(&mut self) -> FrameReport {
        let view = self
            .view
            .step(&self.registry, &mut self.manager, self.config.padding);

        let reference = self.view.point();
        let mut camera = self.engine.camera();
        camera.transform = CameraTransform::top_down(reference);
        self.engine.set_camera(&camera);
        self.engine.animate(self.started.elapsed().as_secs_f64());

        let options = FrameOptions::from_config(&self.config);
        let delta = render_frame(
            self.engine.as_mut(),
            &mut self.manager,
            &options,
            &reference,
            self.vision,
        );
        self.engine.swap_buffers();
        self.frames += 1;

        if self.config.slow_down {
            thread::sleep(SLOW_DOWN_DELAY);
        }

        FrameReport {
            frame: self.frames,
            view,
            delta,
            reference,
        }
    }

    /// Render `region` cell by cell into one image.
    ///
    /// Camera, streaming parameters and vision are restored afterwards. A
    /// cancelled render returns the partial image with `completed == false`.
    pub fn render_tiled_screenshot(
        &mut self,
        region: &RasterRegion,
        abort: &mut dyn AbortPoll,
    ) -> MapResult<CompositeOutcome> {
        let min_vision = self
            .manager
            .active_continent()
            .and_then(|active| active.sheet.min_render_vision);
        self.compositor.set_min_vision(min_vision);

        let options = FrameOptions::from_config(&self.config);
        let mut pipeline = FramePipeline {
            engine: self.engine.as_mut(),
            manager: &mut self.manager,
            vision: &mut self.vision,
            options,
        };
        self.compositor.render(region, &mut pipeline, abort)
    }

    /// Render each map to `<output_dir>/<map>.png`.
    ///
    /// Maps that fail to load are skipped with a warning. A cancellation
    /// ends the current map early: its partial image is still written, the
    /// abort is acknowledged and the batch moves on. Returns the written
    /// files.
    pub fn auto_render(
        &mut self,
        maps: &[String],
        abort: &mut dyn AbortPoll,
    ) -> MapResult<Vec<PathBuf>> {
        let mut written = Vec::new();
        for name in maps {
            if let Err(e) = self.load_continent(name) {
                warn!(map = %name, error = %e, "Skipping map");
                continue;
            }
            let map_name = self
                .manager
                .active_continent()
                .map(|active| active.map_name.clone())
                .unwrap_or_else(|| name.clone());

            let result = self
                .current_region()
                .and_then(|region| self.render_tiled_screenshot(&region, abort));
            self.manager.unload_continent();
            let outcome = result?;

            if !outcome.completed {
                warn!(
                    map = %map_name,
                    rendered = outcome.cells_rendered,
                    total = outcome.cells_total,
                    "Render cancelled, saving incomplete map"
                );
                abort.acknowledge();
            }

            let path = unique_output_path(&self.config.output_dir, &map_name);
            save_png(&outcome.image, &path)?;
            written.push(path);
        }
        info!(count = written.len(), "Automatic render finished");
        Ok(written)
    }

    /// Render one viewport at the view point and write it to `path`.
    ///
    /// The frustum uses the configured scale and stays that way afterwards.
    pub fn render_single_screenshot(&mut self, path: &Path) -> MapResult<RgbaImage> {
        let (vw, vh) = self.engine.viewport_size();
        let scale = self.config.scale;
        let mut camera = self.engine.camera();
        camera.frustum = Frustum::orthographic(vw as f64 / scale, vh as f64 / scale);
        camera.viewport = Viewport::full();
        self.engine.set_camera(&camera);

        let report = self.step_frame();
        if let ViewStep::SwitchFailed { name, error } = report.view {
            warn!(continent = %name, error = %error, "Rendering without continent");
        }
        let image = self.engine.read_pixels()?;
        save_png(&image, path)?;
        Ok(image)
    }
}

/// Stream around `center` and draw one frame with overlays.
fn render_frame(
    engine: &mut dyn RenderEngine,
    manager: &mut StreamingManager,
    options: &FrameOptions,
    center: &WorldPoint,
    vision: f64,
) -> ZoneDelta {
    let delta = manager.refresh(center, vision);

    engine.set_landscape_z_test(ZTest::LessEqual);
    engine.clear(options.background);
    engine.render_scene(SceneFilter::all());

    if options.inverse_z {
        // fill depth behind the landscape, then draw what the terrain hides
        engine.set_color_mask(false);
        engine.set_landscape_z_test(ZTest::GreaterEqual);
        engine.draw_depth_quad();
        engine.set_color_mask(true);
        engine.render_scene(SceneFilter::objects_only());
        engine.render_scene(SceneFilter::all());
        engine.set_landscape_z_test(ZTest::LessEqual);
    }

    if options.grid || options.clusters || options.collision.is_some() {
        engine.clear_depth();
        let bounds = engine.camera().visible_bounds();
        let mut lines = Vec::new();
        if options.grid {
            lines.extend(grid_lines(&bounds));
        }
        if options.clusters {
            lines.extend(cluster_lines(&manager.cluster_bounds()));
        }
        if let Some(filter) = &options.collision {
            lines.extend(collision_lines(&manager.collision_edges(&bounds), filter));
        }
        engine.draw_lines(&lines);
    }
    delta
}

/// Renders compositor cells through the interactive frame path.
struct FramePipeline<'a> {
    engine: &'a mut dyn RenderEngine,
    manager: &'a mut StreamingManager,
    vision: &'a mut f64,
    options: FrameOptions,
}

impl TilePipeline for FramePipeline<'_> {
    fn viewport_size(&self) -> (u32, u32) {
        self.engine.viewport_size()
    }

    fn capture_state(&self) -> CompositorState {
        CompositorState {
            camera: self.engine.camera(),
            streaming: self.manager.streaming_params(),
            vision: *self.vision,
        }
    }

    fn restore_state(&mut self, state: &CompositorState) {
        self.engine.set_camera(&state.camera);
        self.manager.set_streaming_params(&state.streaming);
        *self.vision = state.vision;
    }

    fn configure(&mut self, settings: &TiledRenderSettings) {
        let mut camera = self.engine.camera();
        camera.frustum = settings.frustum;
        camera.viewport = Viewport::full();
        self.engine.set_camera(&camera);
        self.manager.set_streaming_params(&settings.streaming);
        *self.vision = settings.vision;
    }

    fn render_cell(&mut self, center: WorldPoint) -> MapResult<RgbaImage> {
        let mut camera = self.engine.camera();
        camera.transform = CameraTransform::top_down(center);
        self.engine.set_camera(&camera);
        self.engine.animate(0.0);

        render_frame(
            &mut *self.engine,
            &mut *self.manager,
            &self.options,
            &center,
            *self.vision,
        );
        let frame = self.engine.read_pixels()?;
        self.engine.swap_buffers();
        Ok(frame)
    }
}
