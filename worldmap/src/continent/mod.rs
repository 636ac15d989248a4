//! Continent registry.
//!
//! Resolves world coordinates and user-facing names (sub-map, continent,
//! selection alias) to continent descriptors.
//!
//! # Example
//!
//! ```ignore
//! use worldmap::continent::{ContinentRegistry, JsonSheetSource};
//!
//! let registry = ContinentRegistry::load(Box::new(JsonSheetSource::new("sheets")))?;
//! let descriptor = registry.lookup("fyros_pyr")?;
//! println!("{} covers {}", descriptor.name, descriptor.bounds);
//! ```

mod sheet;
mod source;

pub use sheet::{
    ContinentLocation, ContinentSheet, Outpost, SheetRect, SubMap, Village, VillageGroup,
    WorldSheet,
};
pub use source::{InMemorySheetSource, JsonSheetSource, SheetSource, WORLD_SHEET_FILE};

use std::path::Path;

use tracing::{debug, info};

use crate::coord::{CoordError, WorldBounds, WorldPoint, ZoneTileKey, ZONE_TILE_SIZE};
use crate::error::MapResult;

/// Name of the world-wide map, excluded from map listings.
const WORLD_MAP_NAME: &str = "world";

/// How a name query matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    SubMap,
    Continent,
    Selection,
    /// Nothing matched; the query is used as a continent sheet name.
    Unmatched,
}

/// Outcome of a name query.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Continent sheet name.
    pub continent: String,
    /// Output map name.
    pub map_name: String,
    /// Rectangle from the matching sub-map, if it had a usable one.
    pub bounds: Option<WorldBounds>,
    pub matched: MatchKind,
}

/// A fully resolved, immutable continent.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinentDescriptor {
    /// Continent sheet name.
    pub name: String,
    /// Selection alias from the world sheet, empty when unknown.
    pub selection_name: String,
    /// Output map name.
    pub map_name: String,
    /// Area to render and to keep the view in, without padding.
    pub bounds: WorldBounds,
    /// Bounding box of the continent's tiles.
    pub zone_bounds: WorldBounds,
    pub sheet: ContinentSheet,
}

impl ContinentDescriptor {
    /// Build a descriptor, validating the sheet's zone names.
    pub fn new(
        sheet: ContinentSheet,
        selection_name: &str,
        map_name: &str,
        bounds: Option<WorldBounds>,
    ) -> MapResult<Self> {
        let zone_bounds = zone_bounds(&sheet.zone_min, &sheet.zone_max)?;
        let bounds = bounds.unwrap_or(zone_bounds);
        info!(
            continent = %sheet.name,
            map = map_name,
            zone_min = %sheet.zone_min,
            zone_max = %sheet.zone_max,
            bounds = %bounds,
            "continent resolved"
        );
        Ok(Self {
            name: sheet.name.clone(),
            selection_name: selection_name.to_string(),
            map_name: map_name.to_string(),
            bounds,
            zone_bounds,
            sheet,
        })
    }

    /// Centre of the render bounds.
    pub fn center(&self) -> WorldPoint {
        self.bounds.center()
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Bounding box of two corner tiles, extended by one tile on the max side.
pub fn zone_bounds(zone_min: &str, zone_max: &str) -> MapResult<WorldBounds> {
    let a = zone_min.parse::<ZoneTileKey>()?.origin();
    let b = zone_max.parse::<ZoneTileKey>()?.origin();
    Ok(WorldBounds::from_corners(
        a.x.min(b.x),
        a.y.min(b.y),
        a.x.max(b.x) + ZONE_TILE_SIZE,
        a.y.max(b.y) + ZONE_TILE_SIZE,
    ))
}

/// A continent with the sub-maps of its selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinentListing {
    pub name: String,
    pub selection_name: String,
    pub maps: Vec<String>,
}

/// A sub-map with its owning continent.
#[derive(Debug, Clone, PartialEq)]
pub struct MapListing {
    pub name: String,
    pub bitmap_name: String,
    pub bounds: Option<WorldBounds>,
    pub continent: Option<String>,
}

/// Read-only view over the world sheet plus on-demand continent sheets.
pub struct ContinentRegistry {
    world: WorldSheet,
    source: Box<dyn SheetSource>,
}

impl ContinentRegistry {
    /// Read the world sheet from `source`.
    pub fn load(source: Box<dyn SheetSource>) -> MapResult<Self> {
        let world = source.world()?;
        debug!(
            continents = world.continents.len(),
            maps = world.maps.len(),
            "world sheet loaded"
        );
        Ok(Self { world, source })
    }

    /// Registry over JSON sheets in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> MapResult<Self> {
        Self::load(Box::new(JsonSheetSource::new(dir.as_ref())))
    }

    pub fn world(&self) -> &WorldSheet {
        &self.world
    }

    /// First continent whose rectangle strictly contains the point.
    pub fn resolve(&self, point: &WorldPoint) -> Option<&ContinentLocation> {
        self.world
            .continents
            .iter()
            .find(|c| c.bounds().contains_exclusive(point.x, point.y))
    }

    /// Like [`resolve`](Self::resolve) but as an error for callers that need one.
    pub fn resolve_or_err(&self, point: &WorldPoint) -> Result<&ContinentLocation, CoordError> {
        self.resolve(point).ok_or(CoordError::NoContinent {
            x: point.x,
            y: point.y,
        })
    }

    fn selection(&self, selection: &str) -> Option<&ContinentLocation> {
        self.world
            .continents
            .iter()
            .find(|c| c.selection_name.eq_ignore_ascii_case(selection))
    }

    /// Resolve a name: sub-map, then continent, then selection alias.
    pub fn find(&self, name: &str) -> Option<Resolution> {
        if let Some(map) = self
            .world
            .maps
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
        {
            let continent = self
                .selection(&map.continent_name)
                .map(|c| c.continent_name.clone())
                .unwrap_or_else(|| map.continent_name.clone());
            return Some(Resolution {
                continent,
                map_name: output_name(&map.bitmap_name, name),
                bounds: usable_rect(map),
                matched: MatchKind::SubMap,
            });
        }

        if let Some(location) = self
            .world
            .continents
            .iter()
            .find(|c| c.continent_name.eq_ignore_ascii_case(name))
        {
            return Some(Resolution {
                continent: location.continent_name.clone(),
                map_name: name.to_string(),
                bounds: None,
                matched: MatchKind::Continent,
            });
        }

        let location = self.selection(name)?;
        let first_map = self
            .world
            .maps
            .iter()
            .find(|m| m.continent_name.eq_ignore_ascii_case(&location.selection_name));
        Some(Resolution {
            continent: location.continent_name.clone(),
            map_name: first_map
                .map(|m| output_name(&m.bitmap_name, name))
                .unwrap_or_else(|| name.to_string()),
            bounds: first_map.and_then(usable_rect),
            matched: MatchKind::Selection,
        })
    }

    /// Load and validate the continent sheet behind a resolution.
    pub fn descriptor(&self, resolution: &Resolution) -> MapResult<ContinentDescriptor> {
        let sheet = self.source.continent(&resolution.continent)?;
        let selection_name = self
            .world
            .continents
            .iter()
            .find(|c| c.continent_name.eq_ignore_ascii_case(&resolution.continent))
            .map(|c| c.selection_name.clone())
            .unwrap_or_default();
        ContinentDescriptor::new(
            sheet,
            &selection_name,
            &resolution.map_name,
            resolution.bounds,
        )
    }

    /// [`find`](Self::find) followed by [`descriptor`](Self::descriptor).
    ///
    /// Unmatched names are tried as continent sheet names directly.
    pub fn lookup(&self, name: &str) -> MapResult<ContinentDescriptor> {
        let resolution = self.find(name).unwrap_or_else(|| Resolution {
            continent: name.to_string(),
            map_name: name.to_string(),
            bounds: None,
            matched: MatchKind::Unmatched,
        });
        self.descriptor(&resolution)
    }

    /// Continents with the sub-maps of their selection.
    pub fn continents(&self) -> Vec<ContinentListing> {
        self.world
            .continents
            .iter()
            .map(|c| ContinentListing {
                name: c.continent_name.to_lowercase(),
                selection_name: c.selection_name.clone(),
                maps: self
                    .world
                    .maps
                    .iter()
                    .filter(|m| m.continent_name.eq_ignore_ascii_case(&c.selection_name))
                    .map(|m| m.name.clone())
                    .collect(),
            })
            .collect()
    }

    /// Sub-maps except the world map.
    pub fn maps(&self) -> Vec<MapListing> {
        self.world
            .maps
            .iter()
            .filter(|m| !m.name.eq_ignore_ascii_case(WORLD_MAP_NAME))
            .map(|m| MapListing {
                name: m.name.to_lowercase(),
                bitmap_name: m.bitmap_name.to_lowercase(),
                bounds: m.rect.map(|r| r.bounds()),
                continent: self
                    .selection(&m.continent_name)
                    .map(|c| c.continent_name.to_lowercase()),
            })
            .collect()
    }

    pub fn continent_names(&self) -> Vec<String> {
        self.world
            .continents
            .iter()
            .map(|c| c.continent_name.clone())
            .collect()
    }

    pub fn map_names(&self) -> Vec<String> {
        self.world.maps.iter().map(|m| m.name.clone()).collect()
    }
}

fn usable_rect(map: &SubMap) -> Option<WorldBounds> {
    map.rect.filter(|r| r.is_usable()).map(|r| r.bounds())
}

/// Lowercase bitmap stem, or the query when the map has no bitmap.
fn output_name(bitmap_name: &str, query: &str) -> String {
    let stem = Path::new(bitmap_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if stem.is_empty() {
        query.to_string()
    } else {
        stem
    }
}
