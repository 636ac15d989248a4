//! Headless collision loader.

use std::collections::HashMap;

use crate::coord::{WorldBounds, WorldPoint};
use crate::engine::{BorderEdge, CollisionDataset, CollisionLoader};
use crate::error::{MapError, MapResult, ResourceKind};

/// Serves border edges registered per retriever bank name.
#[derive(Debug, Default)]
pub struct HeadlessCollision {
    datasets: HashMap<String, Vec<BorderEdge>>,
}

impl HeadlessCollision {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the edges served for `retriever_bank`.
    pub fn with_dataset(mut self, retriever_bank: &str, edges: Vec<BorderEdge>) -> Self {
        self.datasets.insert(retriever_bank.to_lowercase(), edges);
        self
    }
}

impl CollisionLoader for HeadlessCollision {
    fn build(
        &mut self,
        retriever_bank: &str,
        global_retriever: &str,
    ) -> MapResult<Box<dyn CollisionDataset>> {
        if global_retriever.is_empty() {
            return Err(MapError::not_found(ResourceKind::Collision, global_retriever));
        }
        let edges = self
            .datasets
            .get(&retriever_bank.to_lowercase())
            .cloned()
            .ok_or_else(|| MapError::not_found(ResourceKind::Collision, retriever_bank))?;
        Ok(Box::new(HeadlessDataset {
            edges,
            last_refresh: None,
        }))
    }
}

struct HeadlessDataset {
    edges: Vec<BorderEdge>,
    last_refresh: Option<(WorldPoint, f64)>,
}

impl CollisionDataset for HeadlessDataset {
    fn border_edges(&self, bounds: &WorldBounds) -> Vec<BorderEdge> {
        self.edges
            .iter()
            .filter(|e| segment_touches(bounds, &e.from, &e.to))
            .copied()
            .collect()
    }

    fn refresh_around(&mut self, center: &WorldPoint, radius: f64) {
        self.last_refresh = Some((*center, radius));
    }
}

/// Whether the segment `a`-`b` has any point inside `bounds`.
///
/// Liang-Barsky clipping against the closed rectangle.
fn segment_touches(bounds: &WorldBounds, a: &WorldPoint, b: &WorldPoint) -> bool {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    let checks = [
        (-dx, a.x - bounds.min.x),
        (dx, bounds.max.x - a.x),
        (-dy, a.y - bounds.min.y),
        (dy, bounds.max.y - a.y),
    ];
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return false;
            }
        } else {
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
            if t0 > t1 {
                return false;
            }
        }
    }
    true
}
