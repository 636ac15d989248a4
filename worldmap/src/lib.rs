//! worldmap - Tiled top-down map rendering for streamed terrain
//!
//! This library renders orthographic maps of a tile-streamed open world,
//! one continent at a time. Output images can be far larger than the render
//! target: the compositor renders them cell by cell and stitches the cells
//! without seams.
//!
//! # Modules
//!
//! - [`coord`] - world positions and the zone tile grid
//! - [`continent`] - world and continent sheets, name and position lookup
//! - [`streaming`] - terrain, décor and collision streaming
//! - [`compositor`] - tiled rendering into one raster
//! - [`view`] - reference point control and continent switching
//! - [`renderer`] - the [`MapRenderer`] context tying everything together
//! - [`engine`] - backend traits and a headless software backend

pub mod abort;
pub mod compositor;
pub mod config;
pub mod continent;
pub mod coord;
pub mod engine;
pub mod error;
pub mod overlay;
pub mod renderer;
pub mod season;
pub mod streaming;
pub mod view;

pub use abort::{AbortFlag, AbortPoll, NeverAbort};
pub use compositor::{CompositeOutcome, RasterRegion, TiledCompositor};
pub use config::{ConfigError, RendererConfig};
pub use continent::{ContinentDescriptor, ContinentRegistry};
pub use coord::{WorldBounds, WorldPoint, ZoneTileKey};
pub use error::{MapError, MapResult};
pub use renderer::{FrameReport, MapRenderer};
pub use season::Season;
pub use streaming::StreamingManager;
pub use view::{ViewController, ViewStep};
