//! Zone and décor streaming.
//!
//! [`StreamingManager`] owns the terrain loader, the décor scene and the
//! collision dataset of the active continent. It keeps them consistent as
//! the reference point moves:
//!
//! 1. the terrain loader reports which tiles it added and removed
//! 2. zone groups and tile-bound décor follow that delta
//! 3. the [`StreamingWindow`] records the resulting tile set
//!
//! Continent switches validate the incoming descriptor before anything of
//! the previous continent is released.

mod decor;
mod window;

pub use decor::{
    apply_distance_policy, distances_for, outpost_anchors, AttachmentScope, DecorAttachment,
    OUTPOST_ANCHOR_PREFIX, RUINS_GROUP,
};
pub use window::{StreamingWindow, ZoneDelta};

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::continent::{zone_bounds, ContinentDescriptor};
use crate::coord::{WorldBounds, WorldPoint, ZoneTileKey};
use crate::engine::{
    Backend, BorderEdge, CollisionDataset, CollisionLoader, DecorScene, RenderEngine,
    StreamingParams, TerrainBanks, TerrainLoader,
};
use crate::error::MapResult;
use crate::season::Season;

/// Owns the streamed state of the active continent.
pub struct StreamingManager {
    terrain: Box<dyn TerrainLoader>,
    decor: Box<dyn DecorScene>,
    collision_loader: Box<dyn CollisionLoader>,
    collision: Option<Box<dyn CollisionDataset>>,
    active: Option<ContinentDescriptor>,
    season: Season,
    window: StreamingWindow,
    villages: Vec<DecorAttachment>,
    outposts: BTreeMap<ZoneTileKey, DecorAttachment>,
    hide_vegetation: bool,
    update_lighting: bool,
}

impl StreamingManager {
    pub fn new(
        terrain: Box<dyn TerrainLoader>,
        decor: Box<dyn DecorScene>,
        collision_loader: Box<dyn CollisionLoader>,
    ) -> Self {
        Self {
            terrain,
            decor,
            collision_loader,
            collision: None,
            active: None,
            season: Season::default(),
            window: StreamingWindow::new(),
            villages: Vec::new(),
            outposts: BTreeMap::new(),
            hide_vegetation: false,
            update_lighting: false,
        }
    }

    /// Split a backend, returning the manager and the render engine.
    pub fn from_backend(backend: Backend) -> (Self, Box<dyn RenderEngine>) {
        let manager = Self::new(backend.terrain, backend.decor, backend.collision);
        (manager, backend.engine)
    }

    pub fn active_continent(&self) -> Option<&ContinentDescriptor> {
        self.active.as_ref()
    }

    pub fn season(&self) -> Season {
        self.season
    }

    pub fn window(&self) -> &StreamingWindow {
        &self.window
    }

    pub fn has_collision(&self) -> bool {
        self.collision.is_some()
    }

    pub fn hide_vegetation(&self) -> bool {
        self.hide_vegetation
    }

    /// Recompute lightmaps after every refresh.
    pub fn set_update_lighting(&mut self, enabled: bool) {
        self.update_lighting = enabled;
    }

    pub fn update_lighting(&self) -> bool {
        self.update_lighting
    }

    pub fn streaming_params(&self) -> StreamingParams {
        self.terrain.streaming_params()
    }

    pub fn set_streaming_params(&mut self, params: &StreamingParams) {
        self.terrain.set_streaming_params(params);
    }

    /// Name of the loaded zone under `point`.
    pub fn zone_name_at(&self, point: &WorldPoint) -> Option<String> {
        self.terrain.zone_name_at(point)
    }

    /// Collision borders inside `bounds`; empty without collision data.
    pub fn collision_edges(&self, bounds: &WorldBounds) -> Vec<BorderEdge> {
        self.collision
            .as_ref()
            .map(|c| c.border_edges(bounds))
            .unwrap_or_default()
    }

    /// Cluster rectangles of the village and outpost groups in the scene.
    pub fn cluster_bounds(&mut self) -> Vec<WorldBounds> {
        let mut bounds = Vec::new();
        for village in &mut self.villages {
            bounds.extend(village.cluster_bounds());
        }
        for outpost in self.outposts.values_mut() {
            bounds.extend(outpost.cluster_bounds());
        }
        bounds
    }

    /// Tiles whose outpost décor is currently in the scene.
    pub fn materialized_outposts(&self) -> Vec<ZoneTileKey> {
        self.outposts
            .iter()
            .filter(|(_, a)| a.is_materialized())
            .map(|(tile, _)| *tile)
            .collect()
    }

    /// Tiles with an outpost binding, materialized or not.
    pub fn outpost_bindings(&self) -> Vec<ZoneTileKey> {
        self.outposts.keys().copied().collect()
    }

    /// Number of village groups in the scene.
    pub fn village_group_count(&self) -> usize {
        self.villages.iter().map(|v| v.group_count()).sum()
    }

    /// Make `descriptor` the active continent.
    ///
    /// The descriptor is validated before the previous continent is touched,
    /// so a bad descriptor leaves the current state intact. A missing terrain
    /// bank is reported after the previous continent was released; no
    /// continent is active afterwards.
    pub fn load_continent(&mut self, descriptor: ContinentDescriptor) -> MapResult<()> {
        let sheet = &descriptor.sheet;
        zone_bounds(&sheet.zone_min, &sheet.zone_max)?;

        self.unload_continent();
        info!(
            continent = %descriptor.name,
            map = %descriptor.map_name,
            season = %self.season,
            "Loading continent"
        );

        for village in &descriptor.sheet.villages {
            for group in &village.groups {
                let mut attachment = DecorAttachment::new(
                    group.ig_name.clone(),
                    group.parent_name.clone(),
                    AttachmentScope::Continent,
                );
                attachment.materialize(self.decor.as_mut(), self.hide_vegetation);
                self.villages.push(attachment);
            }
        }

        for outpost in &descriptor.sheet.outposts {
            match outpost.zone.parse::<ZoneTileKey>() {
                Ok(tile) => {
                    self.outposts.insert(
                        tile,
                        DecorAttachment::new(RUINS_GROUP, "", AttachmentScope::Tile(tile)),
                    );
                }
                // some continents carry outpost records of their neighbours
                Err(e) => warn!(zone = %outpost.zone, error = %e, "Skipping outpost record"),
            }
        }

        self.collision = match self
            .collision_loader
            .build(&descriptor.sheet.pacs_rbank, &descriptor.sheet.pacs_gr)
        {
            Ok(dataset) => Some(dataset),
            Err(e) => {
                warn!(
                    continent = %descriptor.name,
                    error = %e,
                    "Collision data unavailable"
                );
                None
            }
        };

        self.active = Some(descriptor);
        if let Err(e) = self.load_season_assets() {
            self.unload_continent();
            return Err(e);
        }
        Ok(())
    }

    /// Release everything of the active continent: décor, collision,
    /// zone groups and terrain tiles.
    pub fn unload_continent(&mut self) {
        for village in &mut self.villages {
            village.detach(self.decor.as_mut());
        }
        self.villages.clear();

        for outpost in self.outposts.values_mut() {
            outpost.detach(self.decor.as_mut());
        }
        self.outposts.clear();

        self.collision = None;
        self.decor.reset_zone_groups();
        self.terrain.remove_all();
        self.window.clear();

        if let Some(previous) = self.active.take() {
            debug!(continent = %previous.name, "continent unloaded");
        }
    }

    /// Switch the season variant of the active continent.
    ///
    /// Zone groups and terrain tiles are dropped and reloaded from the
    /// season's banks. Collision and continent décor stay; outpost bindings
    /// stay but their groups are detached until their tiles load again.
    pub fn change_season(&mut self, season: Season) -> MapResult<()> {
        self.season = season;
        if self.active.is_none() {
            return Ok(());
        }
        info!(season = %season, "Changing season");

        self.decor.reset_zone_groups();
        for outpost in self.outposts.values_mut() {
            outpost.detach(self.decor.as_mut());
        }
        self.terrain.remove_all();
        self.window.clear();

        self.load_season_assets()
    }

    fn load_season_assets(&mut self) -> MapResult<()> {
        let Some(active) = &self.active else {
            return Ok(());
        };
        let sheet = &active.sheet;
        let banks = TerrainBanks {
            small_bank: sheet.small_bank.clone(),
            far_bank: self.season.with_suffix(&sheet.far_bank),
            coarse_mesh: self.season.with_suffix(&sheet.coarse_mesh_map),
            micro_vegetation: self.season.with_suffix(&sheet.micro_veget),
            tile_postfix: self.season.tile_postfix(),
        };
        self.terrain.load_banks(&banks)?;

        if let Err(e) = self
            .decor
            .init_zone_groups(&sheet.landscape_ig, self.season)
        {
            warn!(file = %sheet.landscape_ig, error = %e, "Landscape instance groups unavailable");
        }
        Ok(())
    }

    /// Toggle vegetation and re-apply the distance policy everywhere.
    pub fn set_hide_vegetation(&mut self, hide: bool) {
        self.hide_vegetation = hide;
        for village in &mut self.villages {
            village.apply_policy(hide);
        }
        for outpost in self.outposts.values_mut() {
            outpost.apply_policy(hide);
        }
        for tile in self.decor.attached_zone_tiles() {
            if let Some(group) = self.decor.zone_group(&tile) {
                apply_distance_policy(group, hide);
            }
        }
    }

    /// Stream terrain and décor around `center`.
    ///
    /// The returned delta is exactly what the loader reported, minus names
    /// that are not tile keys.
    pub fn refresh(&mut self, center: &WorldPoint, vision: f64) -> ZoneDelta {
        if let Some(collision) = self.collision.as_mut() {
            collision.refresh_around(center, vision);
        }

        let loader_delta = self.terrain.refresh_around(center, vision);
        let delta = ZoneDelta {
            added: parse_tiles(&loader_delta.added),
            removed: parse_tiles(&loader_delta.removed),
        };

        if !delta.removed.is_empty() {
            self.decor.unload_zone_groups(&delta.removed);
            for tile in &delta.removed {
                if let Some(outpost) = self.outposts.get_mut(tile) {
                    outpost.detach(self.decor.as_mut());
                }
            }
        }

        if !delta.added.is_empty() {
            self.decor.load_zone_groups(&delta.added);
            for tile in &delta.added {
                self.attach_tile_decor(tile);
            }
        }

        self.window.apply(&delta, *center, vision);
        if !delta.is_empty() {
            debug!(
                added = delta.added.len(),
                removed = delta.removed.len(),
                loaded = self.window.len(),
                "zone delta"
            );
        }

        self.terrain.set_refine_center(center);
        if let Some(active) = &self.active {
            self.terrain.setup_static_light(&active.sheet.light);
        }
        if self.update_lighting {
            self.terrain.update_lighting();
        }
        delta
    }

    fn attach_tile_decor(&mut self, tile: &ZoneTileKey) {
        let hide = self.hide_vegetation;
        let Some(zone_group) = self.decor.zone_group(tile) else {
            return;
        };
        apply_distance_policy(&mut *zone_group, hide);
        let anchors = outpost_anchors(zone_group);

        if let Some(outpost) = self.outposts.get_mut(tile) {
            if !outpost.is_materialized() {
                outpost.materialize_at(self.decor.as_mut(), &anchors, hide);
            }
        }
    }
}

/// Parse loader tile names, skipping anything that is not a tile key.
fn parse_tiles(names: &[String]) -> Vec<ZoneTileKey> {
    names
        .iter()
        .filter_map(|name| match name.parse::<ZoneTileKey>() {
            Ok(tile) => Some(tile),
            Err(e) => {
                warn!(name = %name, error = %e, "Ignoring unknown zone name");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::continent::ContinentRegistry;
    use crate::engine::headless::{demo_sheets, HeadlessBackend, HeadlessTerrain, SharedWorld};
    use crate::engine::LoaderDelta;

    fn manager() -> (StreamingManager, ContinentRegistry, SharedWorld) {
        let (backend, world) = HeadlessBackend::demo(64, 64).into_backend();
        let (manager, _engine) = StreamingManager::from_backend(backend);
        let registry = ContinentRegistry::load(Box::new(demo_sheets())).unwrap();
        (manager, registry, world)
    }

    fn key(name: &str) -> ZoneTileKey {
        name.parse().unwrap()
    }

    #[test]
    fn test_load_continent_sets_up_assets() {
        let (mut manager, registry, world) = manager();
        manager.load_continent(registry.lookup("alpha").unwrap()).unwrap();

        assert!(manager.active_continent().unwrap().is_named("ALPHA"));
        assert!(manager.has_collision());
        assert_eq!(manager.village_group_count(), 1);
        assert_eq!(manager.outpost_bindings(), vec![key("3_AC")]);
        assert!(manager.materialized_outposts().is_empty());

        let banks = world.borrow().banks.clone().unwrap();
        assert_eq!(banks.far_bank, "alpha_sp.farbank");
        assert_eq!(banks.small_bank, "alpha.smallbank");
        assert_eq!(banks.tile_postfix, "_sp");
    }

    #[test]
    fn test_cluster_bounds_of_village_groups() {
        let (mut manager, registry, _world) = manager();
        assert!(manager.cluster_bounds().is_empty());

        manager.load_continent(registry.lookup("alpha").unwrap()).unwrap();
        // the ruins group has no clusters
        manager.refresh(&WorldPoint::flat(400.0, -400.0), 10.0);
        let bounds = manager.cluster_bounds();
        assert_eq!(bounds.len(), 2);
        assert_eq!(bounds[0].center(), WorldPoint::flat(200.0, -200.0));
        assert_eq!(bounds[1].center(), WorldPoint::flat(220.0, -220.0));

        manager.unload_continent();
        assert!(manager.cluster_bounds().is_empty());
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let (mut manager, registry, _world) = manager();
        manager.load_continent(registry.lookup("alpha").unwrap()).unwrap();
        let center = WorldPoint::flat(400.0, -400.0);

        let first = manager.refresh(&center, 200.0);
        assert!(!first.added.is_empty());
        let loaded: Vec<ZoneTileKey> = manager.window().tiles().copied().collect();

        let second = manager.refresh(&center, 200.0);
        assert!(second.is_empty());
        let again: Vec<ZoneTileKey> = manager.window().tiles().copied().collect();
        assert_eq!(loaded, again);
        assert_eq!(manager.materialized_outposts(), vec![key("3_AC")]);
    }

    #[test]
    fn test_outpost_follows_tile() {
        let (mut manager, registry, world) = manager();
        manager.load_continent(registry.lookup("alpha").unwrap()).unwrap();

        manager.refresh(&WorldPoint::flat(400.0, -400.0), 10.0);
        assert!(manager.window().contains(&key("3_AC")));
        assert_eq!(manager.materialized_outposts(), vec![key("3_AC")]);
        // village + zone group + two ruins
        assert_eq!(world.borrow().attached_group_count(), 4);

        manager.refresh(&WorldPoint::flat(80.0, -80.0), 10.0);
        assert!(!manager.window().contains(&key("3_AC")));
        assert!(manager.materialized_outposts().is_empty());
        assert_eq!(manager.outpost_bindings(), vec![key("3_AC")]);
        assert_eq!(world.borrow().attached_group_count(), 1);
    }

    #[test]
    fn test_hide_vegetation_culls_plants() {
        let (mut manager, registry, world) = manager();
        manager.load_continent(registry.lookup("alpha").unwrap()).unwrap();
        manager.refresh(&WorldPoint::flat(400.0, -400.0), 10.0);
        let visible = world.borrow().visible_markers().count();

        manager.set_hide_vegetation(true);
        // village tree, zone bush and one ivy per ruin
        assert_eq!(world.borrow().visible_markers().count(), visible - 4);

        manager.set_hide_vegetation(false);
        assert_eq!(world.borrow().visible_markers().count(), visible);
        assert!(!world.borrow().forced_clusters.is_empty());
    }

    #[test]
    fn test_missing_collision_is_not_fatal() {
        let (mut manager, registry, _world) = manager();
        manager.load_continent(registry.lookup("beta").unwrap()).unwrap();
        assert!(!manager.has_collision());
        let bounds = WorldBounds::from_corners(800.0, -640.0, 1440.0, 0.0);
        assert!(manager.collision_edges(&bounds).is_empty());
    }

    #[test]
    fn test_switch_unloads_previous_continent() {
        let (mut manager, registry, world) = manager();
        manager.load_continent(registry.lookup("alpha").unwrap()).unwrap();
        manager.refresh(&WorldPoint::flat(400.0, -400.0), 10.0);

        manager.load_continent(registry.lookup("beta").unwrap()).unwrap();
        assert!(manager.window().is_empty());
        assert!(manager.outpost_bindings().is_empty());
        assert_eq!(world.borrow().attached_group_count(), 0);
        assert!(world.borrow().loaded_tiles.is_empty());
    }

    #[test]
    fn test_invalid_descriptor_keeps_previous_continent() {
        let (mut manager, registry, world) = manager();
        manager.load_continent(registry.lookup("alpha").unwrap()).unwrap();
        manager.refresh(&WorldPoint::flat(400.0, -400.0), 200.0);
        let tiles: Vec<ZoneTileKey> = manager.window().tiles().copied().collect();
        let loaded = world.borrow().loaded_tiles.clone();
        let outposts = manager.materialized_outposts();
        assert!(!tiles.is_empty());

        let mut broken = registry.lookup("beta").unwrap();
        broken.sheet.zone_min = "not_a_zone".to_string();
        assert!(manager.load_continent(broken).is_err());

        assert!(manager.active_continent().unwrap().is_named("alpha"));
        let after: Vec<ZoneTileKey> = manager.window().tiles().copied().collect();
        assert_eq!(after, tiles);
        assert_eq!(world.borrow().loaded_tiles, loaded);
        assert_eq!(manager.materialized_outposts(), outposts);
        assert!(manager.has_collision());
    }

    #[test]
    fn test_refresh_updates_lighting_when_enabled() {
        let (mut manager, registry, world) = manager();
        manager.load_continent(registry.lookup("alpha").unwrap()).unwrap();
        let center = WorldPoint::flat(400.0, -400.0);

        manager.refresh(&center, 10.0);
        assert_eq!(world.borrow().lighting_updates, 0);

        manager.set_update_lighting(true);
        manager.refresh(&center, 10.0);
        manager.refresh(&center, 10.0);
        assert_eq!(world.borrow().lighting_updates, 2);

        manager.set_update_lighting(false);
        manager.refresh(&center, 10.0);
        assert_eq!(world.borrow().lighting_updates, 2);
    }

    #[test]
    fn test_missing_bank_leaves_nothing_active() {
        let mut headless = HeadlessBackend::demo(64, 64);
        headless.terrain =
            HeadlessTerrain::new(headless.world.clone()).with_missing_file("beta_sp.farbank");
        let (backend, _world) = headless.into_backend();
        let (mut manager, _engine) = StreamingManager::from_backend(backend);
        let registry = ContinentRegistry::load(Box::new(demo_sheets())).unwrap();

        manager.load_continent(registry.lookup("alpha").unwrap()).unwrap();
        let err = manager
            .load_continent(registry.lookup("beta").unwrap())
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(manager.active_continent().is_none());
    }

    #[test]
    fn test_change_season_keeps_bindings_and_collision() {
        let (mut manager, registry, world) = manager();
        manager.load_continent(registry.lookup("alpha").unwrap()).unwrap();
        manager.refresh(&WorldPoint::flat(400.0, -400.0), 10.0);

        manager.change_season(Season::Winter).unwrap();
        assert!(manager.window().is_empty());
        assert!(manager.materialized_outposts().is_empty());
        assert_eq!(manager.outpost_bindings(), vec![key("3_AC")]);
        assert!(manager.has_collision());
        assert_eq!(manager.village_group_count(), 1);
        assert_eq!(
            world.borrow().banks.as_ref().unwrap().far_bank,
            "alpha_wi.farbank"
        );

        // tiles stream back in with the outpost
        manager.refresh(&WorldPoint::flat(400.0, -400.0), 10.0);
        assert_eq!(manager.materialized_outposts(), vec![key("3_AC")]);
    }

    #[test]
    fn test_parse_tiles_skips_garbage() {
        let delta = LoaderDelta {
            added: vec!["12_AB.zonel".to_string(), "garbage".to_string()],
            removed: vec![],
        };
        assert_eq!(parse_tiles(&delta.added), vec![key("12_AB")]);
    }
}
