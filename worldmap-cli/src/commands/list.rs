//! Listing commands.

use worldmap::continent::ContinentRegistry;

use super::common::Context;
use crate::error::CliError;

/// Print every sub-map with its owning continent and bounds.
pub fn maps(ctx: &Context) -> Result<(), CliError> {
    let registry = load(ctx)?;
    let maps = registry.maps();
    println!("{} maps", maps.len());
    for map in maps {
        let continent = map.continent.as_deref().unwrap_or("-");
        match map.bounds {
            Some(b) => println!(
                "  {:<24} {:<16} ({:.0}, {:.0}) - ({:.0}, {:.0})",
                map.name, continent, b.min.x, b.min.y, b.max.x, b.max.y
            ),
            None => println!("  {:<24} {:<16} zone bounds", map.name, continent),
        }
    }
    Ok(())
}

/// Print every continent with its selection name and sub-maps.
pub fn continents(ctx: &Context) -> Result<(), CliError> {
    let registry = load(ctx)?;
    let continents = registry.continents();
    println!("{} continents", continents.len());
    for continent in continents {
        println!("  {:<16} {}", continent.name, continent.selection_name);
        if !continent.maps.is_empty() {
            println!("    maps: {}", continent.maps.join(", "));
        }
    }
    Ok(())
}

fn load(ctx: &Context) -> Result<ContinentRegistry, CliError> {
    let config = ctx.load_config()?;
    ctx.registry(&config)
}
