//! Sheet sources.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::sheet::{ContinentSheet, WorldSheet};
use crate::error::{MapError, MapResult, ResourceKind};

/// File name of the world sheet inside a sheet directory.
pub const WORLD_SHEET_FILE: &str = "world.json";

/// Asset registry serving world and continent sheets.
pub trait SheetSource {
    fn world(&self) -> MapResult<WorldSheet>;

    /// Continent sheet by name, case-insensitive.
    fn continent(&self, name: &str) -> MapResult<ContinentSheet>;
}

/// Reads sheets as JSON files from a directory.
///
/// The world sheet is `world.json`, continents are `<name>.continent.json`.
#[derive(Debug, Clone)]
pub struct JsonSheetSource {
    dir: PathBuf,
}

impl JsonSheetSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a continent sheet.
    pub fn continent_path(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.continent.json", name.to_lowercase()))
    }

    fn read<T: serde::de::DeserializeOwned>(
        &self,
        path: &Path,
        kind: ResourceKind,
        name: &str,
    ) -> MapResult<T> {
        debug!(path = %path.display(), "reading sheet");
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MapError::not_found(kind, name));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|e| {
            MapError::InvalidConfiguration(format!("{}: {}", path.display(), e))
        })
    }
}

impl SheetSource for JsonSheetSource {
    fn world(&self) -> MapResult<WorldSheet> {
        let path = self.dir.join(WORLD_SHEET_FILE);
        self.read(&path, ResourceKind::WorldSheet, WORLD_SHEET_FILE)
    }

    fn continent(&self, name: &str) -> MapResult<ContinentSheet> {
        let path = self.continent_path(name);
        self.read(&path, ResourceKind::Continent, &format!("{}.continent", name))
    }
}

/// Sheets held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySheetSource {
    world: WorldSheet,
    continents: HashMap<String, ContinentSheet>,
}

impl InMemorySheetSource {
    pub fn new(world: WorldSheet) -> Self {
        Self {
            world,
            continents: HashMap::new(),
        }
    }

    /// Add a continent sheet, keyed by its name.
    pub fn with_continent(mut self, sheet: ContinentSheet) -> Self {
        self.continents.insert(sheet.name.to_lowercase(), sheet);
        self
    }

    /// Write every sheet as JSON into `dir`, in the layout [`JsonSheetSource`] reads.
    pub fn write_to_dir(&self, dir: &Path) -> MapResult<()> {
        fs::create_dir_all(dir)?;
        write_json(&dir.join(WORLD_SHEET_FILE), &self.world)?;
        for (name, sheet) in &self.continents {
            write_json(&dir.join(format!("{}.continent.json", name)), sheet)?;
        }
        Ok(())
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> MapResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| MapError::InvalidConfiguration(format!("{}: {}", path.display(), e)))?;
    fs::write(path, text)?;
    Ok(())
}

impl SheetSource for InMemorySheetSource {
    fn world(&self) -> MapResult<WorldSheet> {
        Ok(self.world.clone())
    }

    fn continent(&self, name: &str) -> MapResult<ContinentSheet> {
        self.continents
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| {
                MapError::not_found(ResourceKind::Continent, format!("{}.continent", name))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::headless::demo_sheets;
    use tempfile::TempDir;

    #[test]
    fn test_json_source_roundtrip_through_dir() {
        let temp = TempDir::new().unwrap();
        let memory = demo_sheets();
        memory.write_to_dir(temp.path()).unwrap();

        let json = JsonSheetSource::new(temp.path());
        assert_eq!(json.world().unwrap(), memory.world().unwrap());
        assert_eq!(
            json.continent("ALPHA").unwrap(),
            memory.continent("alpha").unwrap()
        );
    }

    #[test]
    fn test_json_source_missing_files() {
        let temp = TempDir::new().unwrap();
        let json = JsonSheetSource::new(temp.path());

        let err = json.world().unwrap_err();
        assert!(matches!(
            err,
            MapError::ResourceNotFound {
                kind: ResourceKind::WorldSheet,
                ..
            }
        ));
        assert!(json.continent("nowhere").unwrap_err().is_not_found());
    }

    #[test]
    fn test_json_source_malformed_sheet() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(WORLD_SHEET_FILE), "{ not json").unwrap();
        let err = JsonSheetSource::new(temp.path()).world().unwrap_err();
        assert!(matches!(err, MapError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_in_memory_missing_continent() {
        let source = InMemorySheetSource::default();
        let err = source.continent("gamma").unwrap_err();
        assert_eq!(err.to_string(), "continent not found: gamma.continent");
    }
}
