//! Rendering backend interfaces.
//!
//! The map renderer never rasterizes or parses terrain data itself. It drives
//! a backend through the traits below:
//!
//! - [`RenderEngine`] - camera, render passes, line drawing, pixel readback
//! - [`TerrainLoader`] - zone tile streaming around a reference point
//! - [`DecorScene`] / [`InstanceGroup`] - décor instance groups
//! - [`CollisionLoader`] / [`CollisionDataset`] - collision border data
//!
//! The [`headless`] module implements all of them in software so the whole
//! pipeline can run without a GPU.
//!
//! # Design Principles
//!
//! - **Single-threaded**: traits take `&mut self`, nothing is `Send`
//! - **Fallible loads**: asset loads return [`MapResult`], draw calls do not
//! - **Capability queries**: optional features are exposed through methods
//!   returning `Option`, never through downcasting

pub mod headless;
mod types;

pub use types::{
    BorderEdge, CameraState, CameraTransform, ColoredLine, DrawDistance, EdgeClass, Frustum,
    GroupHandle, LandscapeLight, LoaderDelta, SceneFilter, StreamingParams, TerrainBanks,
    Viewport, ZTest,
};

use image::{Rgba, RgbaImage};

use crate::coord::{WorldBounds, WorldPoint, ZoneTileKey};
use crate::error::MapResult;
use crate::season::Season;

/// Frame-level rendering operations.
pub trait RenderEngine {
    /// Render target size in pixels.
    fn viewport_size(&self) -> (u32, u32);

    /// Current camera.
    fn camera(&self) -> CameraState;

    /// Replace the camera transform, frustum and viewport.
    fn set_camera(&mut self, camera: &CameraState);

    /// Advance animated scene elements to `time` seconds.
    fn animate(&mut self, time: f64);

    /// Clear colour and depth.
    fn clear(&mut self, color: Rgba<u8>);

    /// Draw the scene layers selected by `filter`.
    fn render_scene(&mut self, filter: SceneFilter);

    /// Depth test used by the landscape material.
    fn set_landscape_z_test(&mut self, test: ZTest);

    /// Enable or disable colour writes.
    fn set_color_mask(&mut self, enabled: bool);

    /// Draw a full-screen quad that only writes depth.
    fn draw_depth_quad(&mut self);

    /// Clear the depth buffer only.
    fn clear_depth(&mut self);

    /// Draw world-space line segments over the frame.
    fn draw_lines(&mut self, lines: &[ColoredLine]);

    /// Read back the current frame.
    fn read_pixels(&mut self) -> MapResult<RgbaImage>;

    /// Present the frame.
    fn swap_buffers(&mut self);

    /// Toggle full-screen antialiasing.
    fn set_antialiasing(&mut self, enabled: bool);
}

/// Streams zone tiles in and out around a reference point.
pub trait TerrainLoader {
    /// Load terrain banks. Every file is mandatory.
    fn load_banks(&mut self, banks: &TerrainBanks) -> MapResult<()>;

    /// Blocking refresh of the tiles visible from `center`.
    ///
    /// Returns the names of tiles that were added and removed by this call.
    fn refresh_around(&mut self, center: &WorldPoint, radius: f64) -> LoaderDelta;

    /// Drop every loaded tile.
    fn remove_all(&mut self);

    /// Name of the zone under `point`, if one is loaded there.
    fn zone_name_at(&self, point: &WorldPoint) -> Option<String>;

    fn streaming_params(&self) -> StreamingParams;

    fn set_streaming_params(&mut self, params: &StreamingParams);

    /// Point around which geometry is refined when auto refinement is off.
    fn set_refine_center(&mut self, center: &WorldPoint);

    fn setup_static_light(&mut self, light: &LandscapeLight);

    /// Recompute lightmaps for newly loaded tiles.
    fn update_lighting(&mut self) {}
}

/// Per-cluster visibility control of an instance group.
pub trait ClusterControl {
    fn cluster_count(&self) -> usize;

    /// Make every cluster visible whenever its parent is.
    fn force_visible_from_parent(&mut self);

    /// World rectangle of each cluster, for debug drawing.
    fn cluster_bounds(&self) -> Vec<WorldBounds>;
}

/// A placed group of décor instances.
pub trait InstanceGroup {
    fn handle(&self) -> GroupHandle;

    fn name(&self) -> &str;

    fn instance_count(&self) -> usize;

    fn instance_name(&self, index: usize) -> String;

    /// World position of an instance, including the group offset.
    fn instance_position(&self, index: usize) -> WorldPoint;

    /// Move the whole group.
    fn set_position(&mut self, position: WorldPoint);

    /// Set the maximum draw distance of an instance and of its coarse mesh.
    fn set_distances(&mut self, index: usize, instance: DrawDistance, coarse_mesh: DrawDistance);

    /// Cluster visibility control, for groups that have clusters.
    fn clusters(&mut self) -> Option<&mut dyn ClusterControl> {
        None
    }
}

/// Scene-side décor management.
pub trait DecorScene {
    /// Load a named instance group. The group is not in the scene yet.
    fn instantiate(&mut self, name: &str) -> MapResult<Box<dyn InstanceGroup>>;

    fn add_to_scene(&mut self, group: &mut dyn InstanceGroup);

    fn remove_from_scene(&mut self, group: &mut dyn InstanceGroup);

    /// Prepare the landscape zone groups of a continent for `season`.
    fn init_zone_groups(&mut self, landscape_groups: &str, season: Season) -> MapResult<()>;

    /// Load and attach the zone groups of the given tiles.
    fn load_zone_groups(&mut self, tiles: &[ZoneTileKey]);

    /// Detach and free the zone groups of the given tiles.
    fn unload_zone_groups(&mut self, tiles: &[ZoneTileKey]);

    /// Detach every zone group and forget the landscape group file.
    fn reset_zone_groups(&mut self);

    /// Zone group of an attached tile.
    fn zone_group(&mut self, tile: &ZoneTileKey) -> Option<&mut dyn InstanceGroup>;

    /// Tiles whose zone groups are currently attached.
    fn attached_zone_tiles(&self) -> Vec<ZoneTileKey>;
}

/// Builds collision datasets. Datasets are released when dropped.
pub trait CollisionLoader {
    fn build(
        &mut self,
        retriever_bank: &str,
        global_retriever: &str,
    ) -> MapResult<Box<dyn CollisionDataset>>;
}

/// Loaded collision data for one continent.
pub trait CollisionDataset {
    /// Border segments inside `bounds`.
    fn border_edges(&self, bounds: &WorldBounds) -> Vec<BorderEdge>;

    /// Stream collision surfaces around `center`.
    fn refresh_around(&mut self, center: &WorldPoint, radius: f64);
}

/// The backend collaborators a renderer is built from.
pub struct Backend {
    pub engine: Box<dyn RenderEngine>,
    pub terrain: Box<dyn TerrainLoader>,
    pub decor: Box<dyn DecorScene>,
    pub collision: Box<dyn CollisionLoader>,
}
