//! Scene state shared between the headless collaborators.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use crate::coord::{WorldPoint, ZoneTileKey};
use crate::engine::{GroupHandle, LandscapeLight, TerrainBanks};

/// Handle to the world shared by engine, terrain and décor.
pub type SharedWorld = Rc<RefCell<HeadlessWorld>>;

/// A décor instance as the engine sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecorMarker {
    pub position: WorldPoint,
    pub visible: bool,
}

/// What is currently loaded and attached.
#[derive(Debug, Default)]
pub struct HeadlessWorld {
    /// Tiles the terrain loader has streamed in.
    pub loaded_tiles: BTreeSet<ZoneTileKey>,
    /// Markers of every group in the scene, by group.
    pub attached: HashMap<GroupHandle, Vec<DecorMarker>>,
    /// Groups whose clusters were forced visible.
    pub forced_clusters: HashSet<GroupHandle>,
    /// Banks from the last successful load.
    pub banks: Option<TerrainBanks>,
    /// Light from the last static light setup.
    pub light: Option<LandscapeLight>,
    /// Refresh calls received by the terrain loader.
    pub refresh_count: usize,
    /// Lightmap updates requested from the terrain loader.
    pub lighting_updates: usize,
}

impl HeadlessWorld {
    /// Create an empty shared world.
    pub fn shared() -> SharedWorld {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn is_loaded(&self, tile: &ZoneTileKey) -> bool {
        self.loaded_tiles.contains(tile)
    }

    /// Number of groups in the scene.
    pub fn attached_group_count(&self) -> usize {
        self.attached.len()
    }

    /// Visible markers across all attached groups.
    pub fn visible_markers(&self) -> impl Iterator<Item = &WorldPoint> {
        self.attached
            .values()
            .flatten()
            .filter(|m| m.visible)
            .map(|m| &m.position)
    }
}
