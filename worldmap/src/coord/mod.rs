//! Coordinate conversion module
//!
//! Provides conversions between world positions and the zone tile grid used
//! by the terrain loader.
//!
//! The grid is fixed: tiles are 160 world units square, columns are named
//! `AA`..`ZZ` from x = 0 eastward and rows count southward from y = 0.

mod types;

pub use types::{
    CoordError, WorldBounds, WorldPoint, ZoneTileKey, COLUMN_RADIX, MAX_COLUMN, MAX_ROW,
    WORLD_MAX_X, WORLD_MAX_Y, ZONE_TILE_SIZE,
};

/// Converts a world position to the zone tile that contains it.
///
/// # Arguments
///
/// * `x` - East coordinate, `0 <= x < WORLD_MAX_X`
/// * `y` - North coordinate, `-WORLD_MAX_Y <= y <= 0`
///
/// # Returns
///
/// The tile whose half-open square `[origin, origin + 160)` holds the point.
#[inline]
pub fn to_zone_tile(x: f64, y: f64) -> Result<ZoneTileKey, CoordError> {
    if !(0.0..WORLD_MAX_X).contains(&x) {
        return Err(CoordError::InvalidX(x));
    }
    if !(-WORLD_MAX_Y..=0.0).contains(&y) {
        return Err(CoordError::InvalidY(y));
    }

    let col = (x / ZONE_TILE_SIZE).floor() as u32;
    // -floor(y / size) is the southward row; 0.0 maps to row 0
    let row = (-(y / ZONE_TILE_SIZE).floor()) as u32;

    ZoneTileKey::new(row, col)
}

impl ZoneTileKey {
    /// Tile containing a world point. See [`to_zone_tile`].
    pub fn from_world(point: &WorldPoint) -> Result<Self, CoordError> {
        to_zone_tile(point.x, point.y)
    }

    /// South-west corner of the tile.
    pub fn origin(&self) -> WorldPoint {
        WorldPoint::flat(
            self.col as f64 * ZONE_TILE_SIZE,
            -(self.row as f64) * ZONE_TILE_SIZE,
        )
    }

    /// Center of the tile.
    pub fn center(&self) -> WorldPoint {
        let origin = self.origin();
        WorldPoint::flat(
            origin.x + ZONE_TILE_SIZE / 2.0,
            origin.y + ZONE_TILE_SIZE / 2.0,
        )
    }

    /// The tile's square as bounds.
    pub fn bounds(&self) -> WorldBounds {
        let origin = self.origin();
        WorldBounds::from_corners(
            origin.x,
            origin.y,
            origin.x + ZONE_TILE_SIZE,
            origin.y + ZONE_TILE_SIZE,
        )
    }

    /// Whether the tile square intersects a circle on the ground plane.
    pub fn intersects_circle(&self, center: &WorldPoint, radius: f64) -> bool {
        let b = self.bounds();
        let dx = center.x.clamp(b.min.x, b.max.x) - center.x;
        let dy = center.y.clamp(b.min.y, b.max.y) - center.y;
        dx * dx + dy * dy <= radius * radius
    }
}

/// Tiles whose squares overlap `bounds`, clipped to the world grid.
///
/// Returned in row-major order, north to south, west to east.
pub fn tiles_in_bounds(bounds: &WorldBounds) -> Vec<ZoneTileKey> {
    let first_col = (bounds.min.x / ZONE_TILE_SIZE).floor().max(0.0) as i64;
    let last_col = ((bounds.max.x / ZONE_TILE_SIZE).ceil() as i64 - 1).min(MAX_COLUMN as i64);
    let first_row = (-(bounds.max.y / ZONE_TILE_SIZE).ceil()).max(0.0) as i64;
    let last_row = ((-(bounds.min.y / ZONE_TILE_SIZE).floor()) as i64).min(MAX_ROW as i64);

    let mut tiles = Vec::new();
    for row in first_row..=last_row {
        for col in first_col..=last_col {
            if let Ok(key) = ZoneTileKey::new(row as u32, col as u32) {
                if key.bounds().max.y > bounds.min.y && key.origin().y < bounds.max.y {
                    tiles.push(key);
                }
            }
        }
    }
    tiles
}

/// Largest x that still maps to a zone tile.
const LAST_TILE_X: f64 = WORLD_MAX_X - WORLD_MAX_X * f64::EPSILON;

/// Clamp a point to the navigable world extent.
///
/// The result always has a zone tile.
pub fn clamp_to_world(point: WorldPoint) -> WorldPoint {
    WorldPoint::new(
        point.x.clamp(0.0, LAST_TILE_X),
        point.y.clamp(-WORLD_MAX_Y, 0.0),
        point.z,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pyr_area_tile() {
        // Pyr city gate
        let tile = to_zone_tile(18886.0, -24346.0).unwrap();
        assert_eq!(tile.col, 118);
        assert_eq!(tile.row, 153);
        assert_eq!(tile.name(), "153_EO");
    }

    #[test]
    fn test_origin_of_first_tile() {
        let tile: ZoneTileKey = "1_AA".parse().unwrap();
        assert_eq!(tile.origin(), WorldPoint::flat(0.0, -160.0));
        assert_eq!(tile.center(), WorldPoint::flat(80.0, -80.0));
    }

    #[test]
    fn test_tile_edges_are_half_open() {
        // x = 160 belongs to the second column
        assert_eq!(to_zone_tile(160.0, -1.0).unwrap().col, 1);
        assert_eq!(to_zone_tile(159.999, -1.0).unwrap().col, 0);
        // y = -160 is the origin of row 1
        assert_eq!(to_zone_tile(1.0, -160.0).unwrap().row, 1);
        assert_eq!(to_zone_tile(1.0, -160.001).unwrap().row, 2);
    }

    #[test]
    fn test_invalid_coordinates() {
        assert!(matches!(to_zone_tile(-1.0, -1.0), Err(CoordError::InvalidX(_))));
        assert!(matches!(to_zone_tile(WORLD_MAX_X, -1.0), Err(CoordError::InvalidX(_))));
        assert!(matches!(to_zone_tile(1.0, 5.0), Err(CoordError::InvalidY(_))));
    }

    #[test]
    fn test_intersects_circle() {
        let tile: ZoneTileKey = "2_AC".parse().unwrap(); // x 320..480, y -320..-160
        assert!(tile.intersects_circle(&WorldPoint::flat(400.0, -240.0), 1.0));
        assert!(tile.intersects_circle(&WorldPoint::flat(300.0, -240.0), 20.0));
        assert!(!tile.intersects_circle(&WorldPoint::flat(300.0, -240.0), 19.0));
    }

    #[test]
    fn test_tiles_in_bounds() {
        let bounds = WorldBounds::from_corners(0.0, -320.0, 320.0, 0.0);
        let names: Vec<String> = tiles_in_bounds(&bounds).iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["1_AA", "1_AB", "2_AA", "2_AB"]);
    }

    #[test]
    fn test_clamp_to_world() {
        let p = clamp_to_world(WorldPoint::new(-5.0, 10.0, 3.0));
        assert_eq!(p, WorldPoint::new(0.0, 0.0, 3.0));
        let p = clamp_to_world(WorldPoint::new(1e9, -1e9, 0.0));
        assert!(p.x < WORLD_MAX_X && p.x > WORLD_MAX_X - 1.0);
        assert_eq!(p.y, -WORLD_MAX_Y);
    }

    #[test]
    fn test_clamped_east_edge_has_tile() {
        let p = clamp_to_world(WorldPoint::flat(WORLD_MAX_X, -1.0));
        let tile = ZoneTileKey::from_world(&p).unwrap();
        assert_eq!(tile.col, MAX_COLUMN);
        assert_eq!(tile.row, 1);

        let p = clamp_to_world(WorldPoint::flat(1e9, -1e9));
        let tile = ZoneTileKey::from_world(&p).unwrap();
        assert_eq!((tile.row, tile.col), (MAX_ROW, MAX_COLUMN));
    }

    proptest! {
        #[test]
        fn prop_from_world_then_origin_contains_point(
            x in 0.0..WORLD_MAX_X,
            y in -WORLD_MAX_Y..0.0,
        ) {
            let key = to_zone_tile(x, y).unwrap();
            let origin = key.origin();
            prop_assert!(origin.x <= x && x < origin.x + ZONE_TILE_SIZE);
            prop_assert!(origin.y <= y && y < origin.y + ZONE_TILE_SIZE);
        }

        #[test]
        fn prop_name_roundtrip(row in 0u32..=MAX_ROW, col in 0u32..=MAX_COLUMN) {
            let key = ZoneTileKey::new(row, col).unwrap();
            let parsed: ZoneTileKey = key.name().parse().unwrap();
            prop_assert_eq!(parsed, key);
        }
    }
}
