//! worldmap - render top-down maps of streamed continents
//!
//! Drives the `worldmap` library over its headless backend: list maps and
//! continents, render whole maps to PNG, take single screenshots, or step
//! the interactive frame loop.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::common::Context;
use commands::render::RenderArgs;
use commands::run::RunArgs;
use commands::screenshot::ScreenshotArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "worldmap")]
#[command(version, about = "Render top-down maps of streamed continents")]
struct Cli {
    /// Config file (defaults to ./worldmap.ini when present)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the world and continent sheets
    #[arg(long, global = true)]
    sheets: Option<PathBuf>,

    /// Use the built-in demo world instead of sheet files
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the sub-maps of the world sheet
    ListMaps,

    /// List the continents of the world sheet
    ListContinents,

    /// Render whole maps to PNG files, cell by cell
    Render(RenderArgs),

    /// Render one viewport at a position
    Screenshot(ScreenshotArgs),

    /// Step interactive frames, following the view across continents
    Run(RunArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let ctx = Context {
        config_file: cli.config,
        sheets: cli.sheets,
        demo: cli.demo,
    };

    let result: Result<(), CliError> = match cli.command {
        Commands::ListMaps => commands::list::maps(&ctx),
        Commands::ListContinents => commands::list::continents(&ctx),
        Commands::Render(args) => commands::render::run(&ctx, args),
        Commands::Screenshot(args) => commands::screenshot::run(&ctx, args),
        Commands::Run(args) => commands::run::run(&ctx, args),
    };

    if let Err(e) = result {
        e.exit();
    }
}
