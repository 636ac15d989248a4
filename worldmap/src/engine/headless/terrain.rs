//! Headless terrain loader.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use super::world::SharedWorld;
use crate::coord::{tiles_in_bounds, WorldBounds, WorldPoint, ZoneTileKey};
use crate::engine::{LandscapeLight, LoaderDelta, StreamingParams, TerrainBanks, TerrainLoader};
use crate::error::{MapError, MapResult, ResourceKind};

/// Streams every available tile whose square intersects the vision circle.
pub struct HeadlessTerrain {
    world: SharedWorld,
    /// Tiles that exist on disk; `None` means the whole grid.
    available: Option<BTreeSet<ZoneTileKey>>,
    missing_files: HashSet<String>,
    params: StreamingParams,
    refine_center: Option<WorldPoint>,
}

impl HeadlessTerrain {
    pub fn new(world: SharedWorld) -> Self {
        Self {
            world,
            available: None,
            missing_files: HashSet::new(),
            params: StreamingParams::default(),
            refine_center: None,
        }
    }

    /// Restrict streaming to the given tiles.
    pub fn with_available_tiles(mut self, tiles: impl IntoIterator<Item = ZoneTileKey>) -> Self {
        self.available = Some(tiles.into_iter().collect());
        self
    }

    /// Make a bank file fail to load.
    pub fn with_missing_file(mut self, name: impl Into<String>) -> Self {
        self.missing_files.insert(name.into());
        self
    }

    pub fn refine_center(&self) -> Option<WorldPoint> {
        self.refine_center
    }

    fn wanted_tiles(&self, center: &WorldPoint, radius: f64) -> BTreeSet<ZoneTileKey> {
        let bounds = WorldBounds::around(*center, radius, radius);
        tiles_in_bounds(&bounds)
            .into_iter()
            .filter(|t| t.intersects_circle(center, radius))
            .filter(|t| self.available.as_ref().map_or(true, |a| a.contains(t)))
            .collect()
    }
}

impl TerrainLoader for HeadlessTerrain {
    fn load_banks(&mut self, banks: &TerrainBanks) -> MapResult<()> {
        if let Some(missing) = banks.files().iter().find(|f| self.missing_files.contains(**f)) {
            return Err(MapError::not_found(ResourceKind::TerrainBank, *missing));
        }
        self.world.borrow_mut().banks = Some(banks.clone());
        Ok(())
    }

    fn refresh_around(&mut self, center: &WorldPoint, radius: f64) -> LoaderDelta {
        let wanted = self.wanted_tiles(center, radius);
        let mut world = self.world.borrow_mut();
        world.refresh_count += 1;

        let added: Vec<String> = wanted
            .difference(&world.loaded_tiles)
            .map(|t| t.name())
            .collect();
        let removed: Vec<String> = world
            .loaded_tiles
            .difference(&wanted)
            .map(|t| t.name())
            .collect();
        debug!(added = added.len(), removed = removed.len(), "terrain refresh");

        world.loaded_tiles = wanted;
        LoaderDelta { added, removed }
    }

    fn remove_all(&mut self) {
        self.world.borrow_mut().loaded_tiles.clear();
    }

    fn zone_name_at(&self, point: &WorldPoint) -> Option<String> {
        let tile = ZoneTileKey::from_world(point).ok()?;
        self.world.borrow().is_loaded(&tile).then(|| tile.name())
    }

    fn streaming_params(&self) -> StreamingParams {
        self.params
    }

    fn set_streaming_params(&mut self, params: &StreamingParams) {
        self.params = *params;
    }

    fn set_refine_center(&mut self, center: &WorldPoint) {
        self.refine_center = Some(*center);
    }

    fn setup_static_light(&mut self, light: &LandscapeLight) {
        self.world.borrow_mut().light = Some(*light);
    }

    fn update_lighting(&mut self) {
        self.world.borrow_mut().lighting_updates += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::headless::world::HeadlessWorld;

    #[test]
    fn test_refresh_reports_delta_once() {
        let world = HeadlessWorld::shared();
        let mut terrain = HeadlessTerrain::new(world.clone());
        let center = WorldPoint::flat(240.0, -240.0);

        let first = terrain.refresh_around(&center, 10.0);
        assert_eq!(first.added, vec!["2_AB".to_string()]);
        assert!(first.removed.is_empty());

        let second = terrain.refresh_around(&center, 10.0);
        assert!(second.added.is_empty() && second.removed.is_empty());
        assert_eq!(world.borrow().refresh_count, 2);
    }

    #[test]
    fn test_refresh_respects_available_tiles() {
        let world = HeadlessWorld::shared();
        let only: ZoneTileKey = "1_AB".parse().unwrap();
        let mut terrain = HeadlessTerrain::new(world).with_available_tiles([only]);
        let delta = terrain.refresh_around(&WorldPoint::flat(160.0, -160.0), 50.0);
        assert_eq!(delta.added, vec!["1_AB".to_string()]);
    }

    #[test]
    fn test_missing_bank_fails() {
        let mut terrain =
            HeadlessTerrain::new(HeadlessWorld::shared()).with_missing_file("far_sp.bank");
        let banks = TerrainBanks {
            far_bank: "far_sp.bank".to_string(),
            ..Default::default()
        };
        let err = terrain.load_banks(&banks).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_zone_name_at() {
        let world = HeadlessWorld::shared();
        let mut terrain = HeadlessTerrain::new(world);
        let point = WorldPoint::flat(80.0, -80.0);
        assert_eq!(terrain.zone_name_at(&point), None);
        terrain.refresh_around(&point, 1.0);
        assert_eq!(terrain.zone_name_at(&point), Some("1_AA".to_string()));
    }
}
