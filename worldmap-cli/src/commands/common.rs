//! Shared arguments and renderer setup.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use tracing::info;
use worldmap::config::{parse_collision_filter, parse_point, parse_scale, RendererConfig};
use worldmap::continent::ContinentRegistry;
use worldmap::engine::headless::{demo_sheets, HeadlessBackend};
use worldmap::{AbortFlag, MapRenderer, Season};

use crate::error::CliError;

/// Config file read when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG_FILE: &str = "worldmap.ini";

/// Render target size used by the headless backend.
pub const DEFAULT_VIEWPORT: &str = "800x800";

/// Season selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum SeasonArg {
    Sp,
    Su,
    Au,
    Wi,
}

impl From<SeasonArg> for Season {
    fn from(arg: SeasonArg) -> Self {
        match arg {
            SeasonArg::Sp => Season::Spring,
            SeasonArg::Su => Season::Summer,
            SeasonArg::Au => Season::Autumn,
            SeasonArg::Wi => Season::Winter,
        }
    }
}

/// Where settings and sheets come from.
#[derive(Debug, Clone)]
pub struct Context {
    pub config_file: Option<PathBuf>,
    pub sheets: Option<PathBuf>,
    pub demo: bool,
}

impl Context {
    /// Config file settings, or defaults when there is no file.
    pub fn load_config(&self) -> Result<RendererConfig, CliError> {
        let mut config = match &self.config_file {
            Some(path) => RendererConfig::load(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                RendererConfig::load(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => RendererConfig::default(),
        };
        if let Some(sheets) = &self.sheets {
            config.sheets_dir = sheets.clone();
        }
        Ok(config)
    }

    pub fn registry(&self, config: &RendererConfig) -> Result<ContinentRegistry, CliError> {
        if self.demo {
            return Ok(ContinentRegistry::load(Box::new(demo_sheets()))?);
        }
        info!(dir = %config.sheets_dir.display(), "Loading sheets");
        Ok(ContinentRegistry::from_dir(&config.sheets_dir)?)
    }

    /// Renderer over the headless backend.
    pub fn renderer(
        &self,
        config: RendererConfig,
        viewport: (u32, u32),
    ) -> Result<MapRenderer, CliError> {
        let registry = self.registry(&config)?;
        let headless = if self.demo {
            HeadlessBackend::demo(viewport.0, viewport.1)
        } else {
            HeadlessBackend::new(viewport.0, viewport.1)
        };
        let (backend, _world) = headless.into_backend();
        Ok(MapRenderer::new(backend, registry, config))
    }
}

/// Render settings that override the config file.
#[derive(Debug, Clone, Args)]
pub struct RenderOptions {
    /// Pixel/metre scale, e.g. '2:1' is 2 px per metre
    #[arg(long, value_name = "PX:M")]
    pub scale: Option<String>,

    /// Season variant
    #[arg(long, value_enum)]
    pub season: Option<SeasonArg>,

    /// Hide trees and other vegetation
    #[arg(long)]
    pub no_trees: bool,

    /// Second pass with an inverted landscape depth test
    #[arg(long)]
    pub inverse_z: bool,

    /// Enable antialiasing
    #[arg(long)]
    pub fxaa: bool,

    /// Draw the zone tile grid
    #[arg(long)]
    pub grid: bool,

    /// Outline village and outpost décor clusters
    #[arg(long)]
    pub clusters: bool,

    /// Recompute landscape lighting as tiles stream in
    #[arg(long)]
    pub light: bool,

    /// Draw collision borders; optional comma separated class ids
    #[arg(long, value_name = "IDS", num_args = 0..=1, default_missing_value = "")]
    pub pacs: Option<String>,

    /// Landscape vision radius in metres
    #[arg(long)]
    pub vision: Option<f64>,

    /// Landscape tile near distance in metres
    #[arg(long)]
    pub tilenear: Option<f64>,

    /// Metres added around continent bounds
    #[arg(long)]
    pub padding: Option<f64>,

    /// Render target size
    #[arg(long, value_name = "WxH", default_value = DEFAULT_VIEWPORT)]
    pub viewport: String,

    /// Write the effective settings to this INI file before rendering
    #[arg(long, value_name = "PATH")]
    pub save_config: Option<PathBuf>,
}

impl RenderOptions {
    /// Apply the options on top of `config`.
    pub fn apply(&self, config: &mut RendererConfig) -> Result<(), CliError> {
        if let Some(scale) = &self.scale {
            let scale = parse_scale(scale)?;
            if scale < worldmap::config::MIN_SCALE {
                return Err(CliError::Config(
                    "scale should be at least 1:10".to_string(),
                ));
            }
            config.scale = scale;
        }
        if let Some(season) = self.season {
            config.season = season.into();
        }
        config.hide_trees |= self.no_trees;
        config.inverse_z |= self.inverse_z;
        config.fxaa |= self.fxaa;
        config.grid |= self.grid;
        config.clusters |= self.clusters;
        config.light |= self.light;
        if let Some(ids) = &self.pacs {
            config.collision = Some(parse_collision_filter(ids).ok_or_else(|| {
                CliError::Config(format!("invalid collision ids '{}'", ids))
            })?);
        }
        if let Some(vision) = self.vision {
            config.vision = Some(vision);
        }
        if let Some(tile_near) = self.tilenear {
            config.lock_tile_near(tile_near);
        }
        if let Some(padding) = self.padding {
            config.padding = padding;
        }
        Ok(())
    }

    pub fn viewport(&self) -> Result<(u32, u32), CliError> {
        parse_viewport(&self.viewport)
    }

    /// Write `config` to the `--save-config` path, if one was given.
    pub fn save_config(&self, config: &RendererConfig) -> Result<(), CliError> {
        if let Some(path) = &self.save_config {
            config.save(path)?;
            info!(path = %path.display(), "Saved settings");
        }
        Ok(())
    }
}

/// Raise the returned flag on Ctrl+C.
pub fn install_abort_handler(message: &'static str) -> Result<AbortFlag, CliError> {
    let abort = AbortFlag::new();
    let handler_flag = abort.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("{}", message);
        handler_flag.raise();
    })
    .map_err(|e| CliError::Signal(e.to_string()))?;
    Ok(abort)
}

/// Parse `WIDTHxHEIGHT`.
pub fn parse_viewport(value: &str) -> Result<(u32, u32), CliError> {
    let err = || CliError::Config(format!("invalid viewport '{}', expected WxH", value));
    let (w, h) = value.split_once(['x', 'X']).ok_or_else(err)?;
    let w: u32 = w.trim().parse().map_err(|_| err())?;
    let h: u32 = h.trim().parse().map_err(|_| err())?;
    if w == 0 || h == 0 {
        return Err(err());
    }
    Ok((w, h))
}

/// Parse a `--pos x,y,z` argument into the config's view centre.
pub fn apply_position(config: &mut RendererConfig, pos: Option<&str>) -> Result<(), CliError> {
    if let Some(pos) = pos {
        config.view_center = parse_point(pos).ok_or_else(|| {
            CliError::Config(format!(
                "pos requires 3 numbers (ie --pos 18886,-24346,50), got '{}'",
                pos
            ))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> RenderOptions {
        RenderOptions {
            scale: None,
            season: None,
            no_trees: false,
            inverse_z: false,
            fxaa: false,
            grid: false,
            clusters: false,
            light: false,
            pacs: None,
            vision: None,
            tilenear: None,
            padding: None,
            viewport: DEFAULT_VIEWPORT.to_string(),
            save_config: None,
        }
    }

    #[test]
    fn test_parse_viewport() {
        assert_eq!(parse_viewport("800x600").unwrap(), (800, 600));
        assert_eq!(parse_viewport("64X32").unwrap(), (64, 32));
        assert!(parse_viewport("0x10").is_err());
        assert!(parse_viewport("800").is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = RendererConfig::default();
        let opts = RenderOptions {
            scale: Some("2:1".to_string()),
            season: Some(SeasonArg::Wi),
            no_trees: true,
            light: true,
            clusters: true,
            pacs: Some(String::new()),
            tilenear: Some(20.0),
            ..options()
        };
        opts.apply(&mut config).unwrap();
        assert_eq!(config.scale, 2.0);
        assert_eq!(config.season, Season::Winter);
        assert!(config.hide_trees);
        assert_eq!(config.collision.unwrap().ids(), vec![0, 1, 2, 3, 4, 5]);
        assert!(config.tile_near_locked);
        assert!(config.light);
        assert!(config.clusters);
    }

    #[test]
    fn test_save_config_writes_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("saved.ini");
        let mut config = RendererConfig::default();
        let opts = RenderOptions {
            scale: Some("5:2".to_string()),
            light: true,
            save_config: Some(path.clone()),
            ..options()
        };
        opts.apply(&mut config).unwrap();
        opts.save_config(&config).unwrap();

        let saved = RendererConfig::load(&path).unwrap();
        assert_eq!(saved.scale, 2.5);
        assert!(saved.light);
        assert_eq!(saved, config);

        // nothing is written without a path
        options().save_config(&config).unwrap();
    }

    #[test]
    fn test_apply_rejects_tiny_scale() {
        let mut config = RendererConfig::default();
        let opts = RenderOptions {
            scale: Some("1:20".to_string()),
            ..options()
        };
        assert!(opts.apply(&mut config).is_err());
    }

    #[test]
    fn test_load_config_with_sheet_override() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("worldmap.ini");
        std::fs::write(&path, "[render]\nscale = 2:1\n[paths]\nsheets = data\n").unwrap();

        let ctx = Context {
            config_file: Some(path),
            sheets: Some(PathBuf::from("other")),
            demo: false,
        };
        let config = ctx.load_config().unwrap();
        assert_eq!(config.scale, 2.0);
        assert_eq!(config.sheets_dir, PathBuf::from("other"));
    }

    #[test]
    fn test_demo_renderer_lists_maps() {
        let ctx = Context {
            config_file: None,
            sheets: None,
            demo: true,
        };
        let renderer = ctx.renderer(RendererConfig::default(), (32, 32)).unwrap();
        assert!(renderer
            .list_maps()
            .iter()
            .any(|map| map.name == "alpha_town"));
    }

    #[test]
    fn test_apply_position() {
        let mut config = RendererConfig::default();
        apply_position(&mut config, Some("1,-2,3")).unwrap();
        assert_eq!(config.view_center.y, -2.0);
        assert!(apply_position(&mut config, Some("1,2")).is_err());
    }
}
