//! Season variants for terrain and décor assets.
//!
//! A season selects an alternate asset set by filename suffix: far banks,
//! coarse mesh textures and micro-vegetation textures get `_{code}` inserted
//! before the extension, tile textures get a `_{code}` postfix and zone
//! instance groups are loaded for the season.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;
use tracing::info;

/// Logical season tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Season {
    #[default]
    Spring,
    Summer,
    Autumn,
    Winter,
}

/// Unknown season tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid season '{0}', expected one of sp, su, au, wi")]
pub struct SeasonParseError(pub String);

impl Season {
    /// All seasons in cycling order.
    pub const ALL: [Season; 4] = [
        Season::Spring,
        Season::Summer,
        Season::Autumn,
        Season::Winter,
    ];

    /// Two-letter asset code.
    pub fn code(&self) -> &'static str {
        match self {
            Season::Spring => "sp",
            Season::Summer => "su",
            Season::Autumn => "au",
            Season::Winter => "wi",
        }
    }

    /// Parse a tag, falling back to spring for anything unknown.
    ///
    /// Only the first two letters matter, so `"winter"` and `"WI"` both work.
    pub fn parse_lossy(tag: &str) -> Season {
        match tag.parse() {
            Ok(season) => season,
            Err(_) => {
                info!(tag = tag, "Invalid season, falling back to 'sp'");
                Season::Spring
            }
        }
    }

    /// The following season, wrapping winter back to spring.
    pub fn next(&self) -> Season {
        match self {
            Season::Spring => Season::Summer,
            Season::Summer => Season::Autumn,
            Season::Autumn => Season::Winter,
            Season::Winter => Season::Spring,
        }
    }

    /// Postfix appended to tile texture and vegetable descriptor names.
    pub fn tile_postfix(&self) -> String {
        format!("_{}", self.code())
    }

    /// Insert the season suffix before the file extension.
    ///
    /// `"fyros_far.bank"` becomes `"fyros_far_sp.bank"`. Directory components
    /// are dropped because the asset registry resolves bare names.
    pub fn with_suffix(&self, filename: &str) -> String {
        let path = Path::new(filename);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        match path.extension() {
            Some(ext) => format!("{}_{}.{}", stem, self.code(), ext.to_string_lossy()),
            None => format!("{}_{}", stem, self.code()),
        }
    }
}

impl FromStr for Season {
    type Err = SeasonParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let prefix: String = s.trim().chars().take(2).collect::<String>().to_lowercase();
        match prefix.as_str() {
            "sp" => Ok(Season::Spring),
            "su" => Ok(Season::Summer),
            "au" => Ok(Season::Autumn),
            "wi" => Ok(Season::Winter),
            _ => Err(SeasonParseError(s.to_string())),
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_letter_codes() {
        assert_eq!("sp".parse::<Season>().unwrap(), Season::Spring);
        assert_eq!("SU".parse::<Season>().unwrap(), Season::Summer);
        assert_eq!("autumn".parse::<Season>().unwrap(), Season::Autumn);
        assert_eq!("winter".parse::<Season>().unwrap(), Season::Winter);
    }

    #[test]
    fn test_parse_lossy_falls_back_to_spring() {
        assert_eq!(Season::parse_lossy("monsoon"), Season::Spring);
        assert_eq!(Season::parse_lossy(""), Season::Spring);
        assert_eq!(Season::parse_lossy("wi"), Season::Winter);
    }

    #[test]
    fn test_next_cycles() {
        let mut season = Season::Spring;
        for expected in [Season::Summer, Season::Autumn, Season::Winter, Season::Spring] {
            season = season.next();
            assert_eq!(season, expected);
        }
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(Season::Spring.with_suffix("fyros_far.bank"), "fyros_far_sp.bank");
        assert_eq!(Season::Winter.with_suffix("data/coarse.tga"), "coarse_wi.tga");
        assert_eq!(Season::Autumn.with_suffix("noext"), "noext_au");
    }

    #[test]
    fn test_tile_postfix() {
        assert_eq!(Season::Summer.tile_postfix(), "_su");
    }
}
