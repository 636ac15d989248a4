//! Software backend.
//!
//! Implements every backend trait against a shared in-memory world so the
//! renderer runs end-to-end without a GPU or game data. The engine can write
//! either tile colours or encoded world pixel coordinates, the latter being
//! what stitching tests compare against.

mod collision;
mod decor;
mod render;
mod terrain;
mod world;

pub use collision::HeadlessCollision;
pub use decor::{GroupTemplate, HeadlessDecor, HeadlessGroup, HeadlessInstance};
pub use render::{decode_world_pixel, encode_world_pixel, HeadlessEngine, PixelShader};
pub use terrain::HeadlessTerrain;
pub use world::{DecorMarker, HeadlessWorld, SharedWorld};

use crate::continent::{
    ContinentLocation, ContinentSheet, InMemorySheetSource, Outpost, SheetRect, SubMap, Village,
    VillageGroup, WorldSheet,
};
use crate::coord::{WorldPoint, ZoneTileKey};
use crate::engine::{Backend, BorderEdge, EdgeClass, LandscapeLight};
use crate::streaming::RUINS_GROUP;

/// The headless collaborators, before they are boxed into a [`Backend`].
///
/// Fields are public so callers can swap in customised parts before
/// converting.
pub struct HeadlessBackend {
    pub world: SharedWorld,
    pub engine: HeadlessEngine,
    pub terrain: HeadlessTerrain,
    pub decor: HeadlessDecor,
    pub collision: HeadlessCollision,
}

impl HeadlessBackend {
    /// Empty world: every tile streams, any décor name yields an empty group,
    /// no collision data.
    pub fn new(width: u32, height: u32) -> Self {
        let world = HeadlessWorld::shared();
        Self {
            engine: HeadlessEngine::new(world.clone(), width, height),
            terrain: HeadlessTerrain::new(world.clone()),
            decor: HeadlessDecor::new(world.clone()).permissive(),
            collision: HeadlessCollision::new(),
            world,
        }
    }

    /// Backend populated with the décor and collision of [`demo_sheets`].
    pub fn demo(width: u32, height: u32) -> Self {
        let mut backend = Self::new(width, height);
        backend.decor = demo_decor(backend.world.clone());
        backend.collision = demo_collision();
        backend
    }

    pub fn with_shader(mut self, shader: PixelShader) -> Self {
        self.engine = self.engine.with_shader(shader);
        self
    }

    /// Box the parts, keeping a handle to the shared world.
    pub fn into_backend(self) -> (Backend, SharedWorld) {
        let backend = Backend {
            engine: Box::new(self.engine),
            terrain: Box::new(self.terrain),
            decor: Box::new(self.decor),
            collision: Box::new(self.collision),
        };
        (backend, self.world)
    }
}

/// Tile holding the demo outpost.
pub const DEMO_OUTPOST_TILE: &str = "3_AC";

/// A small two-continent world.
///
/// - `alpha`: tiles `1_AA`..`4_AD`, world rect (0,-640)-(640,0), a village,
///   an outpost on `3_AC` and collision data. Sub-map `alpha_town`.
/// - `beta`: tiles `1_AF`..`4_AI`, world rect (800,-640)-(1440,0), no
///   collision data. Sub-map `beta_flat` has a degenerate rectangle.
/// - `gamma`: listed in the world sheet without a continent sheet.
pub fn demo_sheets() -> InMemorySheetSource {
    let world = WorldSheet {
        continents: vec![
            location("alpha", "alpha_sel", SheetRect::new(0.0, -640.0, 640.0, 0.0)),
            location("beta", "beta_sel", SheetRect::new(800.0, -640.0, 1440.0, 0.0)),
            location("gamma", "gamma_sel", SheetRect::new(1600.0, -640.0, 2000.0, 0.0)),
        ],
        maps: vec![
            SubMap {
                name: "alpha_town".to_string(),
                continent_name: "alpha_sel".to_string(),
                bitmap_name: "alpha_town_map.tga".to_string(),
                rect: Some(SheetRect::new(100.0, -500.0, 400.0, -200.0)),
            },
            SubMap {
                name: "beta_flat".to_string(),
                continent_name: "beta_sel".to_string(),
                bitmap_name: String::new(),
                rect: Some(SheetRect::new(900.0, -300.0, 900.0, -100.0)),
            },
            SubMap {
                name: "world".to_string(),
                continent_name: String::new(),
                bitmap_name: "world_map.tga".to_string(),
                rect: Some(SheetRect::new(0.0, -40960.0, 108160.0, 0.0)),
            },
        ],
    };

    let alpha = ContinentSheet {
        villages: vec![Village {
            zone: "2_AB".to_string(),
            groups: vec![VillageGroup {
                ig_name: "alpha_village.ig".to_string(),
                parent_name: String::new(),
            }],
        }],
        outposts: vec![Outpost {
            zone: DEMO_OUTPOST_TILE.to_string(),
            enable_ruins: true,
        }],
        pacs_rbank: "alpha.rbank".to_string(),
        pacs_gr: "alpha.gr".to_string(),
        ..continent("alpha", "4_AA", "1_AD")
    };
    let beta = ContinentSheet {
        pacs_rbank: "beta.rbank".to_string(),
        pacs_gr: "beta.gr".to_string(),
        ..continent("beta", "4_AF", "1_AI")
    };

    InMemorySheetSource::new(world)
        .with_continent(alpha)
        .with_continent(beta)
}

fn location(name: &str, selection: &str, rect: SheetRect) -> ContinentLocation {
    ContinentLocation {
        continent_name: name.to_string(),
        selection_name: selection.to_string(),
        rect,
    }
}

fn continent(name: &str, zone_min: &str, zone_max: &str) -> ContinentSheet {
    ContinentSheet {
        name: name.to_string(),
        zone_min: zone_min.to_string(),
        zone_max: zone_max.to_string(),
        small_bank: format!("{}.smallbank", name),
        far_bank: format!("{}.farbank", name),
        coarse_mesh_map: format!("{}_cm.tga", name),
        micro_veget: format!("{}_mv.tga", name),
        landscape_ig: format!("{}.ig", name),
        pacs_rbank: String::new(),
        pacs_gr: String::new(),
        light: LandscapeLight::default(),
        villages: Vec::new(),
        outposts: Vec::new(),
        min_render_vision: None,
    }
}

fn demo_decor(world: SharedWorld) -> HeadlessDecor {
    // 3_AC
    let outpost_tile = ZoneTileKey { row: 3, col: 2 };
    HeadlessDecor::new(world)
        .with_group(
            "alpha_village",
            GroupTemplate::new()
                .instance("hut.shape", 200.0, -200.0)
                .instance("fy_tree_01.plant", 220.0, -220.0)
                .with_clusters(2),
        )
        .with_group(
            RUINS_GROUP,
            GroupTemplate::new()
                .instance("ruin_wall.shape", 0.0, 0.0)
                .instance("ruin_ivy.plant", 4.0, -4.0),
        )
        .with_zone_group(
            outpost_tile,
            GroupTemplate::new()
                .instance("bat_zc_01", 350.0, -350.0)
                .instance("bat_zc_02", 450.0, -450.0)
                .instance("flag_zc", 400.0, -400.0)
                .instance("fy_bush.plant", 340.0, -460.0),
        )
}

fn demo_collision() -> HeadlessCollision {
    let edge = |x0: f64, y0: f64, x1: f64, y1: f64, class: u8| BorderEdge {
        from: WorldPoint::flat(x0, y0),
        to: WorldPoint::flat(x1, y1),
        class: EdgeClass::from_id(class),
    };
    HeadlessCollision::new().with_dataset(
        "alpha.rbank",
        vec![
            edge(100.0, -100.0, 200.0, -100.0, 0),
            edge(200.0, -100.0, 200.0, -200.0, 2),
            edge(300.0, -300.0, 340.0, -340.0, 3),
        ],
    )
}
