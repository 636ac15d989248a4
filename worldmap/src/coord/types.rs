//! Coordinate types for world positions and zone tiles.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Zone tile width/height in world units (`AA_01.zonel` covers 160×160).
pub const ZONE_TILE_SIZE: f64 = 160.0;

/// Number of letters in one column digit (`A`..`Z`).
pub const COLUMN_RADIX: u32 = 26;

/// Highest column index (`ZZ`).
pub const MAX_COLUMN: u32 = COLUMN_RADIX * COLUMN_RADIX - 1;

/// Highest row index reachable in the world grid.
pub const MAX_ROW: u32 = 256;

/// Eastern world limit: columns `AA`..`ZZ` (108160 units).
pub const WORLD_MAX_X: f64 = (COLUMN_RADIX * COLUMN_RADIX) as f64 * ZONE_TILE_SIZE;

/// Southern world limit as a positive distance (rows grow southward).
pub const WORLD_MAX_Y: f64 = MAX_ROW as f64 * ZONE_TILE_SIZE;

/// Errors produced by coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// X coordinate lies outside the zone grid.
    #[error("x coordinate {0} outside world extent [0, {max})", max = WORLD_MAX_X)]
    InvalidX(f64),

    /// Y coordinate lies outside the zone grid.
    #[error("y coordinate {0} outside world extent [-{max}, 0]", max = WORLD_MAX_Y)]
    InvalidY(f64),

    /// Zone tile name does not match `{row}_{XY}`.
    #[error("invalid zone tile name '{0}'")]
    InvalidZoneName(String),

    /// Point is not inside any known continent.
    #[error("no continent contains ({x:.1}, {y:.1})")]
    NoContinent { x: f64, y: f64 },
}

/// A position in world units.
///
/// The world grows east along `x` from 0 and south along negative `y`;
/// `z` is height and only matters for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl WorldPoint {
    /// Create a new point.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Create a point on the ground plane.
    pub fn flat(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Distance on the ground plane, ignoring height.
    pub fn distance_2d(&self, other: &WorldPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl fmt::Display for WorldPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:.1}, {:.1}, {:.1}}}", self.x, self.y, self.z)
    }
}

/// Axis-aligned rectangle on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    /// South-west corner.
    pub min: WorldPoint,
    /// North-east corner.
    pub max: WorldPoint,
}

impl WorldBounds {
    /// Create bounds from two corners in any order.
    pub fn from_corners(ax: f64, ay: f64, bx: f64, by: f64) -> Self {
        Self {
            min: WorldPoint::flat(ax.min(bx), ay.min(by)),
            max: WorldPoint::flat(ax.max(bx), ay.max(by)),
        }
    }

    /// Width along x.
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height along y.
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// True when the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Center of the rectangle (z = 0).
    pub fn center(&self) -> WorldPoint {
        WorldPoint::flat(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Strict containment; points on the border are outside.
    pub fn contains_exclusive(&self, x: f64, y: f64) -> bool {
        x > self.min.x && x < self.max.x && y > self.min.y && y < self.max.y
    }

    /// Grow the rectangle by `padding` on every side.
    pub fn padded(&self, padding: f64) -> Self {
        Self {
            min: WorldPoint::flat(self.min.x - padding, self.min.y - padding),
            max: WorldPoint::flat(self.max.x + padding, self.max.y + padding),
        }
    }

    /// Rectangle centred on `center` with the given half extents.
    pub fn around(center: WorldPoint, half_width: f64, half_height: f64) -> Self {
        Self {
            min: WorldPoint::flat(center.x - half_width, center.y - half_height),
            max: WorldPoint::flat(center.x + half_width, center.y + half_height),
        }
    }
}

impl fmt::Display for WorldBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.0}, {:.0})-({:.0}, {:.0})",
            self.min.x, self.min.y, self.max.x, self.max.y
        )
    }
}

/// Canonical terrain tile identifier.
///
/// Tiles are 160×160 world units. The name format is `{row}_{XY}` where
/// `row = -floor(y / 160)` counts southward and `XY` is the column in two
/// base-26 letters, e.g. `151_DB`. A tile covers the half-open square
/// `[origin, origin + 160)` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneTileKey {
    /// Southward row index.
    pub row: u32,
    /// Eastward column index (`AA` = 0, `ZZ` = 675).
    pub col: u32,
}

impl ZoneTileKey {
    /// Create a key, validating the grid range.
    pub fn new(row: u32, col: u32) -> Result<Self, CoordError> {
        if col > MAX_COLUMN {
            return Err(CoordError::InvalidX(col as f64 * ZONE_TILE_SIZE));
        }
        if row > MAX_ROW {
            return Err(CoordError::InvalidY(-(row as f64) * ZONE_TILE_SIZE));
        }
        Ok(Self { row, col })
    }

    /// Column letters, e.g. `"DB"`.
    pub fn column_letters(&self) -> String {
        let hi = (b'A' + (self.col / COLUMN_RADIX) as u8) as char;
        let lo = (b'A' + (self.col % COLUMN_RADIX) as u8) as char;
        format!("{}{}", hi, lo)
    }

    /// The canonical tile name.
    pub fn name(&self) -> String {
        format!("{}_{}", self.row, self.column_letters())
    }
}

impl fmt::Display for ZoneTileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.row, self.column_letters())
    }
}

/// Zone name pattern: `<row>_<letter><letter>` with an optional extension.
fn zone_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{1,3})_([A-Za-z])([A-Za-z])(?:\.[A-Za-z0-9]+)?$")
            .expect("zone name pattern is valid")
    })
}

impl FromStr for ZoneTileKey {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoordError::InvalidZoneName(s.to_string());
        let captures = zone_name_pattern().captures(s.trim()).ok_or_else(invalid)?;

        let row = captures[1].parse::<u32>().map_err(|_| invalid())?;
        let hi = captures[2].to_ascii_uppercase().as_bytes()[0] - b'A';
        let lo = captures[3].to_ascii_uppercase().as_bytes()[0] - b'A';
        let col = hi as u32 * COLUMN_RADIX + lo as u32;

        ZoneTileKey::new(row, col).map_err(|_| invalid())
    }
}
