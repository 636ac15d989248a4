//! The loaded tile window.

use std::collections::BTreeSet;

use crate::coord::{WorldPoint, ZoneTileKey};

/// Tiles added and removed by one loader refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneDelta {
    pub added: Vec<ZoneTileKey>,
    pub removed: Vec<ZoneTileKey>,
}

impl ZoneDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// The set of loaded tiles and the reference that produced it.
///
/// Only ever updated from loader deltas, never recomputed from geometry, so
/// it mirrors exactly what the loader holds.
#[derive(Debug, Clone, Default)]
pub struct StreamingWindow {
    tiles: BTreeSet<ZoneTileKey>,
    reference: Option<WorldPoint>,
    vision: f64,
}

impl StreamingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a loader delta produced at `reference` with `vision`.
    pub fn apply(&mut self, delta: &ZoneDelta, reference: WorldPoint, vision: f64) {
        for tile in &delta.removed {
            self.tiles.remove(tile);
        }
        self.tiles.extend(delta.added.iter().copied());
        self.reference = Some(reference);
        self.vision = vision;
    }

    /// Forget every tile, e.g. after the loader dropped them all.
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.reference = None;
        self.vision = 0.0;
    }

    pub fn contains(&self, tile: &ZoneTileKey) -> bool {
        self.tiles.contains(tile)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Loaded tiles in key order.
    pub fn tiles(&self) -> impl Iterator<Item = &ZoneTileKey> {
        self.tiles.iter()
    }

    pub fn reference(&self) -> Option<WorldPoint> {
        self.reference
    }

    pub fn vision(&self) -> f64 {
        self.vision
    }
}
