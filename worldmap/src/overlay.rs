//! Debug overlays: the zone tile grid, décor clusters and collision borders.

use image::Rgba;

use crate::coord::{WorldBounds, WorldPoint, ZONE_TILE_SIZE};
use crate::engine::{BorderEdge, ColoredLine, EdgeClass};

/// Grid line colour.
pub const GRID_COLOR: Rgba<u8> = Rgba([100, 100, 100, 255]);

/// Tile grid lines covering `bounds`, snapped to tile edges.
pub fn grid_lines(bounds: &WorldBounds) -> Vec<ColoredLine> {
    let left = (bounds.min.x / ZONE_TILE_SIZE).floor() * ZONE_TILE_SIZE;
    let right = (bounds.max.x / ZONE_TILE_SIZE).ceil() * ZONE_TILE_SIZE;
    let bottom = (bounds.min.y / ZONE_TILE_SIZE).floor() * ZONE_TILE_SIZE;
    let top = (bounds.max.y / ZONE_TILE_SIZE).ceil() * ZONE_TILE_SIZE;
    let columns = ((right - left) / ZONE_TILE_SIZE).round() as usize;
    let rows = ((top - bottom) / ZONE_TILE_SIZE).round() as usize;

    let mut lines = Vec::with_capacity(columns + rows + 2);
    for i in 0..=rows {
        let y = bottom + i as f64 * ZONE_TILE_SIZE;
        lines.push(ColoredLine::new(
            WorldPoint::flat(left, y),
            WorldPoint::flat(right, y),
            GRID_COLOR,
        ));
    }
    for i in 0..=columns {
        let x = left + i as f64 * ZONE_TILE_SIZE;
        lines.push(ColoredLine::new(
            WorldPoint::flat(x, bottom),
            WorldPoint::flat(x, top),
            GRID_COLOR,
        ));
    }
    lines
}

/// Décor cluster outline colour.
pub const CLUSTER_COLOR: Rgba<u8> = Rgba([0, 255, 255, 255]);

/// Outline of each cluster rectangle.
pub fn cluster_lines(clusters: &[WorldBounds]) -> Vec<ColoredLine> {
    let mut lines = Vec::with_capacity(clusters.len() * 4);
    for rect in clusters {
        let corners = [
            WorldPoint::flat(rect.min.x, rect.min.y),
            WorldPoint::flat(rect.max.x, rect.min.y),
            WorldPoint::flat(rect.max.x, rect.max.y),
            WorldPoint::flat(rect.min.x, rect.max.y),
        ];
        for i in 0..4 {
            lines.push(ColoredLine::new(corners[i], corners[(i + 1) % 4], CLUSTER_COLOR));
        }
    }
    lines
}

/// Colour of a collision border class.
pub fn edge_color(class: EdgeClass) -> Rgba<u8> {
    match class {
        EdgeClass::Block => Rgba([255, 0, 0, 255]),
        EdgeClass::Surmountable => Rgba([0, 255, 0, 255]),
        EdgeClass::Link => Rgba([255, 255, 0, 255]),
        EdgeClass::Waterline => Rgba([0, 0, 255, 255]),
        EdgeClass::Exterior => Rgba([255, 0, 255, 255]),
        EdgeClass::ExteriorDoor => Rgba([127, 127, 127, 255]),
        EdgeClass::Unknown(_) => Rgba([255, 100, 100, 255]),
    }
}

/// Which collision border classes are drawn.
///
/// Unknown classes are never drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionFilter {
    enabled: [bool; EdgeClass::FILTERABLE],
}

impl CollisionFilter {
    /// Filter showing exactly the given class ids. Ids out of range are ignored.
    pub fn from_ids(ids: &[u8]) -> Self {
        let mut enabled = [false; EdgeClass::FILTERABLE];
        for &id in ids {
            if let Some(slot) = enabled.get_mut(id as usize) {
                *slot = true;
            }
        }
        Self { enabled }
    }

    /// Every filterable class.
    pub fn all() -> Self {
        Self {
            enabled: [true; EdgeClass::FILTERABLE],
        }
    }

    pub fn toggle(&mut self, id: u8) {
        if let Some(slot) = self.enabled.get_mut(id as usize) {
            *slot = !*slot;
        }
    }

    pub fn allows(&self, class: EdgeClass) -> bool {
        self.enabled
            .get(class.id() as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Enabled class ids in ascending order.
    pub fn ids(&self) -> Vec<u8> {
        (0..EdgeClass::FILTERABLE as u8)
            .filter(|&id| self.enabled[id as usize])
            .collect()
    }
}

impl Default for CollisionFilter {
    /// Blocking borders and links.
    fn default() -> Self {
        Self::from_ids(&[0, 2])
    }
}

/// Coloured lines for the borders the filter allows.
pub fn collision_lines(edges: &[BorderEdge], filter: &CollisionFilter) -> Vec<ColoredLine> {
    edges
        .iter()
        .filter(|edge| filter.allows(edge.class))
        .map(|edge| ColoredLine::new(edge.from, edge.to, edge_color(edge.class)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_lines_snap_to_tiles() {
        let bounds = WorldBounds::from_corners(100.0, -300.0, 300.0, -100.0);
        let lines = grid_lines(&bounds);
        // x: 0..320 (3 lines), y: -320..0 (3 lines)
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0].from, WorldPoint::flat(0.0, -320.0));
        assert_eq!(lines[0].to, WorldPoint::flat(320.0, -320.0));
        assert_eq!(lines[5].from, WorldPoint::flat(320.0, -320.0));
        assert_eq!(lines[5].to, WorldPoint::flat(320.0, 0.0));
        assert!(lines.iter().all(|l| l.color == GRID_COLOR));
    }

    #[test]
    fn test_cluster_lines_outline_rects() {
        let rects = [
            WorldBounds::from_corners(0.0, -10.0, 20.0, 0.0),
            WorldBounds::from_corners(50.0, -60.0, 55.0, -50.0),
        ];
        let lines = cluster_lines(&rects);
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0].from, WorldPoint::flat(0.0, -10.0));
        assert_eq!(lines[0].to, WorldPoint::flat(20.0, -10.0));
        assert_eq!(lines[3].to, WorldPoint::flat(0.0, -10.0));
        assert_eq!(lines[4].from, WorldPoint::flat(50.0, -60.0));
        assert!(lines.iter().all(|l| l.color == CLUSTER_COLOR));
        assert!(cluster_lines(&[]).is_empty());
    }

    #[test]
    fn test_default_filter() {
        let filter = CollisionFilter::default();
        assert_eq!(filter.ids(), vec![0, 2]);
        assert!(filter.allows(EdgeClass::Block));
        assert!(!filter.allows(EdgeClass::Waterline));
        assert!(!filter.allows(EdgeClass::Unknown(9)));
    }

    #[test]
    fn test_filter_toggle_and_ids() {
        let mut filter = CollisionFilter::from_ids(&[1, 9]);
        assert_eq!(filter.ids(), vec![1]);
        filter.toggle(1);
        filter.toggle(3);
        filter.toggle(42);
        assert_eq!(filter.ids(), vec![3]);
        assert_eq!(CollisionFilter::all().ids(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_collision_lines_filtered_and_coloured() {
        let edge = |class: u8| BorderEdge {
            from: WorldPoint::flat(0.0, 0.0),
            to: WorldPoint::flat(10.0, 0.0),
            class: EdgeClass::from_id(class),
        };
        let edges = [edge(0), edge(1), edge(2), edge(7)];
        let lines = collision_lines(&edges, &CollisionFilter::default());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].color, Rgba([255, 0, 0, 255]));
        assert_eq!(lines[1].color, Rgba([255, 255, 0, 255]));
    }
}
