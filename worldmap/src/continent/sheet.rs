//! World and continent sheet records.
//!
//! Sheets are plain serde records. The world sheet lists continent
//! rectangles and in-game sub-maps; a continent sheet carries everything
//! needed to stream one continent.

use serde::{Deserialize, Serialize};

use crate::coord::WorldBounds;
use crate::engine::LandscapeLight;

/// Rectangle as stored in sheets. Corners may be swapped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SheetRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl SheetRect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Normalized bounds.
    pub fn bounds(&self) -> WorldBounds {
        WorldBounds::from_corners(self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Finite and non-degenerate.
    pub fn is_usable(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && !self.bounds().is_empty()
    }
}

/// A continent's rectangle in the world sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinentLocation {
    /// Continent sheet name, e.g. `fyros`.
    pub continent_name: String,
    /// Alias used by sub-maps, e.g. `r2_desert`.
    pub selection_name: String,
    #[serde(flatten)]
    pub rect: SheetRect,
}

impl ContinentLocation {
    pub fn bounds(&self) -> WorldBounds {
        self.rect.bounds()
    }
}

/// An in-game map. `continent_name` holds the continent's selection name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubMap {
    pub name: String,
    #[serde(default)]
    pub continent_name: String,
    #[serde(default)]
    pub bitmap_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<SheetRect>,
}

/// The world sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSheet {
    #[serde(default)]
    pub continents: Vec<ContinentLocation>,
    #[serde(default)]
    pub maps: Vec<SubMap>,
}

/// One instance group of a village.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VillageGroup {
    pub ig_name: String,
    #[serde(default)]
    pub parent_name: String,
}

/// Villages, camps, bridges and water placed by absolute coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Village {
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub groups: Vec<VillageGroup>,
}

/// An outpost bound to a zone tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outpost {
    /// Tile name, e.g. `153_EO`.
    pub zone: String,
    #[serde(default = "default_true")]
    pub enable_ruins: bool,
}

fn default_true() -> bool {
    true
}

/// A continent sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinentSheet {
    pub name: String,
    /// South-west-most tile name.
    pub zone_min: String,
    /// North-east-most tile name.
    pub zone_max: String,
    pub small_bank: String,
    pub far_bank: String,
    pub coarse_mesh_map: String,
    pub micro_veget: String,
    pub landscape_ig: String,
    #[serde(default)]
    pub pacs_rbank: String,
    #[serde(default)]
    pub pacs_gr: String,
    #[serde(default)]
    pub light: LandscapeLight,
    #[serde(default)]
    pub villages: Vec<Village>,
    #[serde(default)]
    pub outposts: Vec<Outpost>,
    /// Vision the tiled renderer must not go below.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_render_vision: Option<f64>,
}
