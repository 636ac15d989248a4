//! Output raster geometry and its partition into viewport cells.

use crate::coord::{WorldBounds, WorldPoint};
use crate::error::{MapError, MapResult};

/// World area to rasterize and its resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterRegion {
    pub bounds: WorldBounds,
    /// Pixels per world unit.
    pub scale: f64,
    pub width_px: u32,
    pub height_px: u32,
}

impl RasterRegion {
    /// Validate bounds and scale and derive the pixel size.
    pub fn new(bounds: WorldBounds, scale: f64) -> MapResult<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(MapError::InvalidConfiguration(format!(
                "scale must be a positive number, got {}",
                scale
            )));
        }
        let finite = [bounds.min.x, bounds.min.y, bounds.max.x, bounds.max.y]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(MapError::InvalidConfiguration(format!(
                "region bounds must be finite, got {}",
                bounds
            )));
        }

        let width = (bounds.width() * scale).floor();
        let height = (bounds.height() * scale).floor();
        if width < 1.0 || height < 1.0 {
            return Err(MapError::InvalidConfiguration(format!(
                "region {} at scale {} is empty",
                bounds, scale
            )));
        }
        if width > u32::MAX as f64 || height > u32::MAX as f64 {
            return Err(MapError::InvalidConfiguration(format!(
                "region {} at scale {} is too large",
                bounds, scale
            )));
        }

        Ok(Self {
            bounds,
            scale,
            width_px: width as u32,
            height_px: height as u32,
        })
    }

    /// Region for continent bounds grown by `padding` world units.
    pub fn padded(bounds: WorldBounds, padding: f64, scale: f64) -> MapResult<Self> {
        Self::new(bounds.padded(padding), scale)
    }
}

/// One viewport-sized cell of the output raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub col: u32,
    pub row: u32,
    /// Top-left pixel of the cell in the output.
    pub pixel_x: u32,
    pub pixel_y: u32,
    /// Pixels to copy; smaller than the viewport on the last column/row.
    pub width: u32,
    pub height: u32,
    /// Camera position that renders this cell.
    pub center: WorldPoint,
}

/// Partition of a region into viewport cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPlan {
    region: RasterRegion,
    viewport_width: u32,
    viewport_height: u32,
    pub columns: u32,
    pub rows: u32,
}

impl GridPlan {
    pub fn new(region: RasterRegion, viewport_width: u32, viewport_height: u32) -> MapResult<Self> {
        if viewport_width == 0 || viewport_height == 0 {
            return Err(MapError::InvalidConfiguration(format!(
                "viewport {}x{} is empty",
                viewport_width, viewport_height
            )));
        }
        Ok(Self {
            region,
            viewport_width,
            viewport_height,
            columns: region.width_px.div_ceil(viewport_width),
            rows: region.height_px.div_ceil(viewport_height),
        })
    }

    pub fn len(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell at grid position `(col, row)`.
    ///
    /// The centre is computed from the region origin, never accumulated, so
    /// neighbouring cells meet without drift.
    pub fn cell(&self, col: u32, row: u32) -> Cell {
        let (vw, vh) = (self.viewport_width, self.viewport_height);
        let pixel_x = col * vw;
        let pixel_y = row * vh;
        let scale = self.region.scale;
        let bounds = &self.region.bounds;
        Cell {
            col,
            row,
            pixel_x,
            pixel_y,
            width: vw.min(self.region.width_px - pixel_x),
            height: vh.min(self.region.height_px - pixel_y),
            center: WorldPoint::flat(
                bounds.min.x + (pixel_x as f64 + vw as f64 / 2.0) / scale,
                bounds.max.y - (pixel_y as f64 + vh as f64 / 2.0) / scale,
            ),
        }
    }

    /// Cells row-major, top to bottom, left to right.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.columns).map(move |col| self.cell(col, row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(w: f64, h: f64, scale: f64) -> RasterRegion {
        RasterRegion::new(WorldBounds::from_corners(0.0, -h, w, 0.0), scale).unwrap()
    }

    #[test]
    fn test_region_size() {
        let r = region(320.0, 320.0, 1.0);
        assert_eq!((r.width_px, r.height_px), (320, 320));

        let r = region(100.5, 10.0, 2.0);
        assert_eq!((r.width_px, r.height_px), (201, 20));
    }

    #[test]
    fn test_region_rejects_bad_input() {
        let bounds = WorldBounds::from_corners(0.0, -10.0, 10.0, 0.0);
        assert!(RasterRegion::new(bounds, 0.0).is_err());
        assert!(RasterRegion::new(bounds, -1.0).is_err());
        assert!(RasterRegion::new(bounds, f64::NAN).is_err());
        assert!(RasterRegion::new(WorldBounds::from_corners(0.0, 0.0, 10.0, 0.0), 1.0).is_err());
        assert!(RasterRegion::new(bounds, 0.05).is_err());
    }

    #[test]
    fn test_grid_with_partial_tail_cells() {
        let plan = GridPlan::new(region(320.0, 320.0, 1.0), 200, 200).unwrap();
        assert_eq!((plan.columns, plan.rows), (2, 2));

        let cells: Vec<Cell> = plan.cells().collect();
        assert_eq!(cells.len(), 4);
        assert_eq!((cells[0].width, cells[0].height), (200, 200));
        assert_eq!((cells[1].pixel_x, cells[1].width), (200, 120));
        assert_eq!((cells[2].pixel_y, cells[2].height), (200, 120));
        assert_eq!((cells[3].width, cells[3].height), (120, 120));
    }

    #[test]
    fn test_cell_centers() {
        let plan = GridPlan::new(region(320.0, 320.0, 1.0), 200, 200).unwrap();
        assert_eq!(plan.cell(0, 0).center, WorldPoint::flat(100.0, -100.0));
        assert_eq!(plan.cell(1, 0).center, WorldPoint::flat(300.0, -100.0));
        assert_eq!(plan.cell(1, 1).center, WorldPoint::flat(300.0, -300.0));

        let plan = GridPlan::new(region(100.0, 100.0, 2.0), 50, 50).unwrap();
        assert_eq!(plan.cell(3, 0).center, WorldPoint::flat(87.5, -12.5));
    }

    #[test]
    fn test_row_major_order() {
        let plan = GridPlan::new(region(30.0, 20.0, 1.0), 10, 10).unwrap();
        let order: Vec<(u32, u32)> = plan.cells().map(|c| (c.col, c.row)).collect();
        assert_eq!(order, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn test_zero_viewport() {
        assert!(GridPlan::new(region(10.0, 10.0, 1.0), 0, 10).is_err());
    }
}
