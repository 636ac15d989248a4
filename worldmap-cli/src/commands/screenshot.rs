//! Single viewport screenshot.

use std::path::PathBuf;

use clap::Args;

use super::common::{apply_position, Context, RenderOptions};
use crate::error::CliError;

/// Arguments for the screenshot command.
#[derive(Debug, Args)]
pub struct ScreenshotArgs {
    /// Output PNG path
    pub output: PathBuf,

    /// View position as x,y,z
    #[arg(long, allow_hyphen_values = true)]
    pub pos: Option<String>,

    #[command(flatten)]
    pub options: RenderOptions,
}

/// Render one viewport at the view position.
pub fn run(ctx: &Context, args: ScreenshotArgs) -> Result<(), CliError> {
    let mut config = ctx.load_config()?;
    args.options.apply(&mut config)?;
    apply_position(&mut config, args.pos.as_deref())?;
    let viewport = args.options.viewport()?;
    args.options.save_config(&config)?;

    let mut renderer = ctx.renderer(config, viewport)?;
    let image = renderer.render_single_screenshot(&args.output)?;

    let continent = renderer
        .manager()
        .active_continent()
        .map(|active| active.name.as_str())
        .unwrap_or("none");
    println!(
        "Wrote {} ({}x{}, continent {})",
        args.output.display(),
        image.width(),
        image.height(),
        continent
    );
    Ok(())
}
