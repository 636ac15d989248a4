//! Error types for map rendering.
//!
//! Missing optional assets (décor groups, collision data) never surface here;
//! they are logged and the renderer carries on with reduced fidelity. The
//! variants below are the failures callers have to act on.

use std::fmt;

use thiserror::Error;

use crate::coord::CoordError;

/// Result type for map operations.
pub type MapResult<T> = Result<T, MapError>;

/// Kind of asset that could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// World sheet listing continents and maps.
    WorldSheet,
    /// Continent descriptor sheet.
    Continent,
    /// Terrain bank or texture file.
    TerrainBank,
    /// Landscape zone instance-group file.
    LandscapeGroups,
    /// Collision retriever bank or global retriever.
    Collision,
    /// Décor instance group.
    Decor,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::WorldSheet => "world sheet",
            ResourceKind::Continent => "continent",
            ResourceKind::TerrainBank => "terrain bank",
            ResourceKind::LandscapeGroups => "landscape instance groups",
            ResourceKind::Collision => "collision dataset",
            ResourceKind::Decor => "décor group",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while loading continents or rendering maps.
#[derive(Debug, Error)]
pub enum MapError {
    /// A named asset does not exist.
    #[error("{kind} not found: {name}")]
    ResourceNotFound { kind: ResourceKind, name: String },

    /// A coordinate is outside the world grid or every continent.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(#[from] CoordError),

    /// Rejected settings (scale, region, config values).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The rendering backend failed.
    #[error("engine error: {0}")]
    Engine(String),

    /// Output could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl MapError {
    /// Shorthand for [`MapError::ResourceNotFound`].
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        MapError::ResourceNotFound {
            kind,
            name: name.into(),
        }
    }

    /// Whether the error only means an asset was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MapError::ResourceNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = MapError::not_found(ResourceKind::Continent, "fyros.continent");
        assert_eq!(err.to_string(), "continent not found: fyros.continent");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_from_coord_error() {
        let err: MapError = CoordError::InvalidX(-1.0).into();
        assert!(matches!(err, MapError::InvalidCoordinate(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_invalid_configuration_display() {
        let err = MapError::InvalidConfiguration("scale must be positive".to_string());
        assert!(err.to_string().contains("scale must be positive"));
    }
}
