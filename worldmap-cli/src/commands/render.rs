//! Automatic tiled rendering of whole maps.

use std::path::PathBuf;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use worldmap::compositor::CellProgress;

use super::common::{install_abort_handler, Context, RenderOptions};
use crate::error::CliError;

/// Arguments for the render command.
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Sub-map or continent names to render (defaults to the config's maps)
    pub maps: Vec<String>,

    /// Render every sub-map of the world sheet
    #[arg(long, conflicts_with = "all_continents")]
    pub all_maps: bool,

    /// Render every continent
    #[arg(long)]
    pub all_continents: bool,

    /// Output directory for the PNG files
    #[arg(long, short)]
    pub outdir: Option<PathBuf>,

    #[command(flatten)]
    pub options: RenderOptions,
}

/// Run the render command.
pub fn run(ctx: &Context, args: RenderArgs) -> Result<(), CliError> {
    let mut config = ctx.load_config()?;
    args.options.apply(&mut config)?;
    if let Some(outdir) = &args.outdir {
        config.output_dir = outdir.clone();
    }
    let viewport = args.options.viewport()?;
    args.options.save_config(&config)?;
    let configured_maps = config.maps.clone();
    let mut renderer = ctx.renderer(config, viewport)?;

    let maps = if args.all_maps {
        renderer.registry().map_names()
    } else if args.all_continents {
        renderer.registry().continent_names()
    } else if !args.maps.is_empty() {
        args.maps
    } else {
        configured_maps
    };
    if maps.is_empty() {
        return Err(CliError::Config(
            "no maps to render, name some or use --all-maps".to_string(),
        ));
    }

    let mut abort =
        install_abort_handler("Received interrupt, saving the current map incomplete...")?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} cells {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    let observer = bar.clone();
    renderer.set_progress_observer(Some(Box::new(move |progress: CellProgress| {
        if observer.length() != Some(progress.total as u64) {
            observer.set_length(progress.total as u64);
        }
        observer.set_position(progress.done as u64);
    })));

    info!(count = maps.len(), "Rendering maps");
    let written = renderer.auto_render(&maps, &mut abort);
    bar.finish_and_clear();
    let written = written?;

    for path in &written {
        println!("Wrote {}", path.display());
    }
    if written.len() < maps.len() {
        println!("Skipped {} of {} maps", maps.len() - written.len(), maps.len());
    }
    Ok(())
}
