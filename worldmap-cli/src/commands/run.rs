//! Headless interactive loop.

use clap::Args;
use tracing::{debug, info, warn};
use worldmap::{MapRenderer, ViewStep};

use super::common::{apply_position, install_abort_handler, Context, RenderOptions};
use crate::error::CliError;

/// Arguments for the run command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Number of frames to render (0 runs until Ctrl+C)
    #[arg(long, default_value_t = 0)]
    pub frames: u64,

    /// Start position as x,y,z
    #[arg(long, allow_hyphen_values = true)]
    pub pos: Option<String>,

    /// Per-frame view movement as dx,dy
    #[arg(long, allow_hyphen_values = true)]
    pub pan: Option<String>,

    #[command(flatten)]
    pub options: RenderOptions,
}

/// Step frames, following the view across continents.
pub fn run(ctx: &Context, args: RunArgs) -> Result<(), CliError> {
    let mut config = ctx.load_config()?;
    args.options.apply(&mut config)?;
    apply_position(&mut config, args.pos.as_deref())?;
    let pan = args.pan.as_deref().map(parse_pan).transpose()?;
    let viewport = args.options.viewport()?;
    args.options.save_config(&config)?;

    let mut renderer = ctx.renderer(config, viewport)?;
    let abort = install_abort_handler("Received interrupt, stopping...")?;

    let summary = drive(&mut renderer, args.frames, pan, || abort.is_raised());
    println!(
        "Rendered {} frames, {} continent switches, travelled {:.0} m, ending in zone {}",
        renderer.frames(),
        summary.switches,
        summary.travelled,
        summary.zone.as_deref().unwrap_or("none")
    );
    Ok(())
}

/// What a run of frames did.
#[derive(Debug, Default)]
struct RunSummary {
    switches: u32,
    /// View distance covered, in metres.
    travelled: f64,
    /// Loaded zone under the final view point.
    zone: Option<String>,
}

/// Step frames until `frames` were rendered (0 = no limit) or `stop` says so.
fn drive(
    renderer: &mut MapRenderer,
    frames: u64,
    pan: Option<(f64, f64)>,
    mut stop: impl FnMut() -> bool,
) -> RunSummary {
    let mut summary = RunSummary::default();
    let mut last = renderer.view().point();
    while !stop() && (frames == 0 || renderer.frames() < frames) {
        if let Some((dx, dy)) = pan {
            renderer.nudge(dx, dy);
        }
        let report = renderer.step_frame();
        summary.travelled += last.distance_2d(&report.reference);
        last = report.reference;
        match &report.view {
            ViewStep::Switched { from, to } => {
                summary.switches += 1;
                info!(from = ?from, to = %to, "Continent switched");
            }
            ViewStep::SwitchFailed { name, error } => {
                warn!(continent = %name, error = %error, "Continent switch failed");
            }
            _ => {}
        }
        debug!(
            frame = report.frame,
            x = report.reference.x,
            y = report.reference.y,
            added = report.delta.added.len(),
            removed = report.delta.removed.len(),
            "Frame"
        );
        if report.frame % 100 == 0 {
            let zone = renderer.manager().zone_name_at(&report.reference);
            info!(frame = report.frame, zone = zone.as_deref().unwrap_or("-"), "Running");
        }
    }
    summary.zone = renderer.manager().zone_name_at(&last);
    summary
}

/// Parse `dx,dy`.
fn parse_pan(value: &str) -> Result<(f64, f64), CliError> {
    let err = || {
        CliError::Config(format!(
            "pan requires 2 numbers (ie --pan 10,-5), got '{}'",
            value
        ))
    };
    let (dx, dy) = value.split_once(',').ok_or_else(err)?;
    let dx: f64 = dx.trim().parse().map_err(|_| err())?;
    let dy: f64 = dy.trim().parse().map_err(|_| err())?;
    Ok((dx, dy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use worldmap::RendererConfig;

    #[test]
    fn test_parse_pan() {
        assert_eq!(parse_pan("10,-5").unwrap(), (10.0, -5.0));
        assert!(parse_pan("10").is_err());
        assert!(parse_pan("a,b").is_err());
    }

    #[test]
    fn test_drive_reports_travel_and_zone() {
        let ctx = Context {
            config_file: None,
            sheets: None,
            demo: true,
        };
        let config = RendererConfig {
            view_center: worldmap::WorldPoint::flat(300.0, -300.0),
            ..RendererConfig::default()
        };
        let mut renderer = ctx.renderer(config, (32, 32)).unwrap();

        let summary = drive(&mut renderer, 5, Some((10.0, 0.0)), || false);

        assert_eq!(renderer.frames(), 5);
        assert_eq!(summary.switches, 1);
        assert!((summary.travelled - 50.0).abs() < 1e-9);
        // (350, -300) lies in row 2, third column
        assert_eq!(summary.zone.as_deref(), Some("2_AC"));
    }

    #[test]
    fn test_drive_stops_on_request() {
        let ctx = Context {
            config_file: None,
            sheets: None,
            demo: true,
        };
        let mut renderer = ctx.renderer(RendererConfig::default(), (32, 32)).unwrap();
        let mut polls = 0;
        let summary = drive(&mut renderer, 0, None, || {
            polls += 1;
            polls > 3
        });
        assert_eq!(renderer.frames(), 3);
        assert_eq!(summary.travelled, 0.0);
    }
}
