//! PNG output.

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::info;

use crate::error::MapResult;

/// `<dir>/<name>.png`, or the first free `<dir>/<name>_NNN.png`.
///
/// Existing files are never overwritten.
pub fn unique_output_path(dir: &Path, name: &str) -> PathBuf {
    let first = dir.join(format!("{}.png", name));
    if !first.exists() {
        return first;
    }
    let mut counter: u32 = 1;
    loop {
        let candidate = dir.join(format!("{}_{:03}.png", name, counter));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Write `image` as a 24-bit PNG, creating parent directories.
pub fn save_png(image: &RgbaImage, path: &Path) -> MapResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            info!(dir = %parent.display(), "Creating output directory");
            fs::create_dir_all(parent)?;
        }
    }
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    rgb.save_with_format(path, ImageFormat::Png)?;
    info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "Saved map"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    #[test]
    fn test_unique_output_path() {
        let dir = TempDir::new().unwrap();
        let first = unique_output_path(dir.path(), "fyros");
        assert_eq!(first, dir.path().join("fyros.png"));

        fs::write(&first, b"x").unwrap();
        let second = unique_output_path(dir.path(), "fyros");
        assert_eq!(second, dir.path().join("fyros_001.png"));

        fs::write(&second, b"x").unwrap();
        assert_eq!(
            unique_output_path(dir.path(), "fyros"),
            dir.path().join("fyros_002.png")
        );
    }

    #[test]
    fn test_save_png_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out/map.png");
        let image = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));

        save_png(&image, &path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(loaded.dimensions(), (3, 2));
        assert_eq!(loaded.get_pixel(2, 1).0, [10, 20, 30]);
    }
}
