//! Renderer configuration.
//!
//! Settings live in an INI file with three sections:
//!
//! ```ini
//! [paths]
//! sheets = ./sheets
//! output = ./maps
//!
//! [render]
//! background = 255,0,255,255
//! maps = fyros,tryker
//! scale = 2:1
//! hide_trees = false
//! fxaa = false
//! padding = 0
//! inverse_z = false
//! grid = false
//! clusters = false
//! collision = 0,2
//! slow_down = false
//! light = false
//!
//! [landscape]
//! tile_near = 50
//! vision = 500
//! season = sp
//! view_center = 18886,-24346,400
//! ```
//!
//! Every key is optional. A `tile_near` in the file locks the near distance
//! for tiled renders; `collision` enables the border overlay with the listed
//! class ids.

use std::path::{Path, PathBuf};

use image::Rgba;
use ini::Ini;
use thiserror::Error;
use tracing::warn;

use crate::coord::WorldPoint;
use crate::overlay::CollisionFilter;
use crate::season::Season;

/// Smallest accepted scale, one pixel per ten metres.
pub const MIN_SCALE: f64 = 0.1;

/// Default tile near distance.
pub const DEFAULT_TILE_NEAR: f64 = 50.0;

const SECTION_PATHS: &str = "paths";
const SECTION_RENDER: &str = "render";
const SECTION_LANDSCAPE: &str = "landscape";

/// Errors reading or writing a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("invalid scale '{0}', expected 'px:m' with positive numbers")]
    InvalidScale(String),
}

/// All renderer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Directory holding `world.json` and continent sheets.
    pub sheets_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Colour of ground without loaded tiles.
    pub background: Rgba<u8>,
    /// Maps rendered by an automatic run.
    pub maps: Vec<String>,
    /// Pixels per world unit.
    pub scale: f64,
    pub hide_trees: bool,
    pub fxaa: bool,
    pub tile_near: f64,
    /// Tiled renders keep `tile_near` instead of deriving it from the vision.
    pub tile_near_locked: bool,
    /// World units added around continent bounds.
    pub padding: f64,
    pub season: Season,
    /// Interactive vision radius; derived from the viewport when unset.
    pub vision: Option<f64>,
    pub view_center: WorldPoint,
    /// Second render pass with an inverted landscape depth test.
    pub inverse_z: bool,
    pub grid: bool,
    /// Outline décor clusters.
    pub clusters: bool,
    /// Collision border overlay, off when `None`.
    pub collision: Option<CollisionFilter>,
    /// Sleep after every interactive frame.
    pub slow_down: bool,
    /// Recompute landscape lighting while streaming.
    pub light: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            sheets_dir: PathBuf::from("sheets"),
            output_dir: PathBuf::from("maps"),
            background: Rgba([255, 0, 255, 255]),
            maps: Vec::new(),
            scale: 1.0,
            hide_trees: false,
            fxaa: false,
            tile_near: DEFAULT_TILE_NEAR,
            tile_near_locked: false,
            padding: 0.0,
            season: Season::Spring,
            vision: None,
            view_center: WorldPoint::new(18886.0, -24346.0, 400.0),
            inverse_z: false,
            grid: false,
            clusters: false,
            collision: None,
            slow_down: false,
            light: false,
        }
    }
}

impl RendererConfig {
    /// Read settings from an INI file on top of the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Read settings from INI text on top of the defaults.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            source: ini::Error::Parse(e),
        })?;
        Self::from_ini(&ini)
    }

    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(paths) = ini.section(Some(SECTION_PATHS)) {
            if let Some(dir) = paths.get("sheets") {
                config.sheets_dir = PathBuf::from(dir);
            }
            if let Some(dir) = paths.get("output") {
                config.output_dir = PathBuf::from(dir);
            }
        }

        if let Some(render) = ini.section(Some(SECTION_RENDER)) {
            let value = |key: &str| render.get(key).map(str::trim);
            if let Some(v) = value("background") {
                config.background = parse_color(v).ok_or_else(|| {
                    invalid(SECTION_RENDER, "background", v, "expected r,g,b,a")
                })?;
            }
            if let Some(v) = value("maps") {
                config.maps = parse_list(v);
            }
            if let Some(v) = value("scale") {
                config.set_scale(parse_scale(v)?);
            }
            if let Some(v) = value("hide_trees") {
                config.hide_trees = parse_bool(SECTION_RENDER, "hide_trees", v)?;
            }
            if let Some(v) = value("fxaa") {
                config.fxaa = parse_bool(SECTION_RENDER, "fxaa", v)?;
            }
            if let Some(v) = value("padding") {
                config.padding = parse_number(SECTION_RENDER, "padding", v)?;
            }
            if let Some(v) = value("inverse_z") {
                config.inverse_z = parse_bool(SECTION_RENDER, "inverse_z", v)?;
            }
            if let Some(v) = value("grid") {
                config.grid = parse_bool(SECTION_RENDER, "grid", v)?;
            }
            if let Some(v) = value("clusters") {
                config.clusters = parse_bool(SECTION_RENDER, "clusters", v)?;
            }
            if let Some(v) = value("collision") {
                config.collision = Some(parse_collision_filter(v).ok_or_else(|| {
                    invalid(SECTION_RENDER, "collision", v, "expected comma separated ids")
                })?);
            }
            if let Some(v) = value("slow_down") {
                config.slow_down = parse_bool(SECTION_RENDER, "slow_down", v)?;
            }
            if let Some(v) = value("light") {
                config.light = parse_bool(SECTION_RENDER, "light", v)?;
            }
        }

        if let Some(landscape) = ini.section(Some(SECTION_LANDSCAPE)) {
            let value = |key: &str| landscape.get(key).map(str::trim);
            if let Some(v) = value("tile_near") {
                config.lock_tile_near(parse_number(SECTION_LANDSCAPE, "tile_near", v)?);
            }
            if let Some(v) = value("vision") {
                config.vision = Some(parse_number(SECTION_LANDSCAPE, "vision", v)?);
            }
            if let Some(v) = value("season") {
                config.season = Season::parse_lossy(v);
            }
            if let Some(v) = value("view_center") {
                config.view_center = parse_point(v).ok_or_else(|| {
                    invalid(SECTION_LANDSCAPE, "view_center", v, "expected x,y,z")
                })?;
            }
        }

        Ok(config)
    }

    /// Write every setting to an INI file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.to_ini()
            .write_to_file(path)
            .map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some(SECTION_PATHS))
            .set("sheets", self.sheets_dir.to_string_lossy())
            .set("output", self.output_dir.to_string_lossy());

        let [r, g, b, a] = self.background.0;
        ini.with_section(Some(SECTION_RENDER))
            .set("background", format!("{},{},{},{}", r, g, b, a))
            .set("maps", self.maps.join(","))
            .set("scale", format_scale(self.scale))
            .set("hide_trees", self.hide_trees.to_string())
            .set("fxaa", self.fxaa.to_string())
            .set("padding", self.padding.to_string())
            .set("inverse_z", self.inverse_z.to_string())
            .set("grid", self.grid.to_string())
            .set("clusters", self.clusters.to_string())
            .set("slow_down", self.slow_down.to_string())
            .set("light", self.light.to_string());
        if let Some(filter) = &self.collision {
            let ids: Vec<String> = filter.ids().iter().map(|id| id.to_string()).collect();
            ini.with_section(Some(SECTION_RENDER))
                .set("collision", ids.join(","));
        }

        let c = &self.view_center;
        ini.with_section(Some(SECTION_LANDSCAPE))
            .set("season", self.season.code())
            .set("view_center", format!("{},{},{}", c.x, c.y, c.z));
        if self.tile_near_locked {
            ini.with_section(Some(SECTION_LANDSCAPE))
                .set("tile_near", self.tile_near.to_string());
        }
        if let Some(vision) = self.vision {
            ini.with_section(Some(SECTION_LANDSCAPE))
                .set("vision", vision.to_string());
        }
        ini
    }

    /// Set the scale, raising it to [`MIN_SCALE`] with a warning.
    pub fn set_scale(&mut self, scale: f64) {
        if scale < MIN_SCALE {
            warn!(scale = scale, min = MIN_SCALE, "Scale should be at least 1:10");
            self.scale = MIN_SCALE;
        } else {
            self.scale = scale;
        }
    }

    /// Use a fixed tile near distance for tiled renders.
    pub fn lock_tile_near(&mut self, tile_near: f64) {
        self.tile_near = tile_near;
        self.tile_near_locked = true;
    }

    /// Interactive vision for a viewport when none is configured.
    pub fn vision_for(&self, viewport: (u32, u32)) -> f64 {
        self.vision
            .unwrap_or_else(|| (viewport.0.max(viewport.1) as f64 + 160.0) / 2.0)
    }
}

/// Parse a `px:m` scale such as `2:1` (two pixels per metre).
///
/// Both sides are positive numbers; decimals such as `1:1.5` are accepted.
pub fn parse_scale(value: &str) -> Result<f64, ConfigError> {
    let err = || ConfigError::InvalidScale(value.to_string());
    let (px, m) = value.trim().split_once(':').ok_or_else(err)?;
    let px: f64 = px.trim().parse().map_err(|_| err())?;
    let m: f64 = m.trim().parse().map_err(|_| err())?;
    let valid = |v: f64| v.is_finite() && v > 0.0;
    if !valid(px) || !valid(m) || !valid(px / m) {
        return Err(err());
    }
    Ok(px / m)
}

/// Inverse of [`parse_scale`]. Prefers `1:n` for exact fractions.
fn format_scale(scale: f64) -> String {
    if scale < 1.0 {
        let metres = (1.0 / scale).round();
        if 1.0 / metres == scale {
            return format!("1:{}", metres);
        }
    }
    format!("{}:1", scale)
}

/// Split a comma separated list, dropping empty items.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_color(value: &str) -> Option<Rgba<u8>> {
    let parts: Vec<u8> = value
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [r, g, b] => Some(Rgba([*r, *g, *b, 255])),
        [r, g, b, a] => Some(Rgba([*r, *g, *b, *a])),
        _ => None,
    }
}

/// Parse `x,y,z`.
pub fn parse_point(value: &str) -> Option<WorldPoint> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [x, y, z] if parts.iter().all(|v| v.is_finite()) => Some(WorldPoint::new(*x, *y, *z)),
        _ => None,
    }
}

/// Parse comma separated collision class ids. Empty means every class.
pub fn parse_collision_filter(value: &str) -> Option<CollisionFilter> {
    if value.trim().is_empty() {
        return Some(CollisionFilter::all());
    }
    let ids: Vec<u8> = value
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    Some(CollisionFilter::from_ids(&ids))
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "expected true or false")),
    }
}

fn parse_number(section: &str, key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| invalid(section, key, value, "expected a non-negative number"))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.background, Rgba([255, 0, 255, 255]));
        assert_eq!(config.scale, 1.0);
        assert_eq!(config.tile_near, 50.0);
        assert!(!config.tile_near_locked);
        assert!(!config.light);
        assert!(!config.clusters);
        assert_eq!(config.season, Season::Spring);
        assert_eq!(config.view_center, WorldPoint::new(18886.0, -24346.0, 400.0));
        assert_eq!(config.vision_for((800, 600)), 480.0);
    }

    #[test]
    fn test_parse_scale() {
        assert_eq!(parse_scale("2:1").unwrap(), 2.0);
        assert_eq!(parse_scale(" 1 : 4 ").unwrap(), 0.25);
        assert!(matches!(parse_scale("2"), Err(ConfigError::InvalidScale(_))));
        assert!(parse_scale("0:1").is_err());
        assert!(parse_scale("1:0").is_err());
        assert!(parse_scale("a:b").is_err());
        assert!(parse_scale("-1:2").is_err());
        assert!(parse_scale("inf:1").is_err());
        assert_eq!(parse_scale("1:1.5").unwrap(), 1.0 / 1.5);
        assert_eq!(parse_scale("2.5:1").unwrap(), 2.5);
    }

    #[test]
    fn test_scale_text_round_trips() {
        for text in ["2:3", "5:2", "1:2", "1:10", "3:7", "7:1"] {
            let scale = parse_scale(text).unwrap();
            let written = format_scale(scale);
            assert_eq!(parse_scale(&written).unwrap(), scale, "{} -> {}", text, written);
        }
        assert_eq!(format_scale(0.25), "1:4");
        assert_eq!(format_scale(2.0), "2:1");
    }

    #[test]
    fn test_save_and_load_fractional_scales() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("worldmap.ini");
        for text in ["2:3", "5:2"] {
            let mut config = RendererConfig::default();
            config.set_scale(parse_scale(text).unwrap());
            config.save(&path).unwrap();

            let loaded = RendererConfig::load(&path).unwrap();
            assert_eq!(loaded.scale, config.scale, "{}", text);
        }
    }

    #[test]
    fn test_small_scale_is_raised() {
        let config = RendererConfig::parse("[render]\nscale = 1:20\n").unwrap();
        assert_eq!(config.scale, MIN_SCALE);
    }

    #[test]
    fn test_parse_sections() {
        let text = "\
[paths]
sheets = /data/sheets
output = /data/maps

[render]
background = 0,0,0
maps = fyros, tryker,,
scale = 2:1
hide_trees = yes
padding = 160
collision = 0,3
clusters = true
light = on

[landscape]
tile_near = 80
season = winter
view_center = 100,-200,5
";
        let config = RendererConfig::parse(text).unwrap();
        assert_eq!(config.sheets_dir, PathBuf::from("/data/sheets"));
        assert_eq!(config.output_dir, PathBuf::from("/data/maps"));
        assert_eq!(config.background, Rgba([0, 0, 0, 255]));
        assert_eq!(config.maps, vec!["fyros", "tryker"]);
        assert_eq!(config.scale, 2.0);
        assert!(config.hide_trees);
        assert_eq!(config.padding, 160.0);
        assert_eq!(config.collision.unwrap().ids(), vec![0, 3]);
        assert!(config.clusters);
        assert!(config.light);
        assert_eq!(config.tile_near, 80.0);
        assert!(config.tile_near_locked);
        assert_eq!(config.season, Season::Winter);
        assert_eq!(config.view_center, WorldPoint::new(100.0, -200.0, 5.0));
    }

    #[test]
    fn test_unknown_season_falls_back() {
        let config = RendererConfig::parse("[landscape]\nseason = monsoon\n").unwrap();
        assert_eq!(config.season, Season::Spring);
    }

    #[test]
    fn test_invalid_values() {
        let err = RendererConfig::parse("[render]\ngrid = maybe\n").unwrap_err();
        assert!(err.to_string().contains("[render] grid"));

        assert!(RendererConfig::parse("[render]\nbackground = 1,2\n").is_err());
        assert!(RendererConfig::parse("[landscape]\nview_center = 1,2\n").is_err());
        assert!(RendererConfig::parse("[landscape]\nvision = -5\n").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("worldmap.ini");

        let mut config = RendererConfig {
            maps: vec!["alpha".to_string(), "beta_flat".to_string()],
            scale: 0.5,
            grid: true,
            clusters: true,
            light: true,
            collision: Some(CollisionFilter::default()),
            vision: Some(640.0),
            season: Season::Autumn,
            ..RendererConfig::default()
        };
        config.lock_tile_near(30.0);
        config.save(&path).unwrap();

        let loaded = RendererConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = RendererConfig::load(&dir.path().join("absent.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
