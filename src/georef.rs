use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::types::CoordinateGrid;

/// Affine pixel-to-world transform in GDAL coefficient order
/// `[xoff, a, b, yoff, d, e]`.
///
/// `b` and `d` are rotation terms and are zero for north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    pub fn new(xoff: f64, a: f64, b: f64, yoff: f64, d: f64, e: f64) -> Self {
        Self([xoff, a, b, yoff, d, e])
    }

    pub fn identity() -> Self {
        Self([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    /// (lon, lat) of pixel `(row, col)`.
    pub fn pixel_to_world(&self, col: usize, row: usize) -> (f64, f64) {
        let t = &self.0;
        let x = t[1] * col as f64 + t[2] * row as f64 + t[0];
        let y = t[4] * col as f64 + t[5] * row as f64 + t[3];
        (x, y)
    }

    pub fn coordinate_grid(&self, rows: usize, cols: usize) -> CoordinateGrid {
        let mut lon = Array2::<f64>::zeros((rows, cols));
        let mut lat = Array2::<f64>::zeros((rows, cols));

        for row in 0..rows {
            for col in 0..cols {
                let (x, y) = self.pixel_to_world(col, row);
                lon[[row, col]] = x;
                lat[[row, col]] = y;
            }
        }

        CoordinateGrid { lon, lat }
    }
}

impl From<[f64; 6]> for GeoTransform {
    fn from(coefficients: [f64; 6]) -> Self {
        Self(coefficients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_grid_maps_to_col_row() {
        let grid = GeoTransform::identity().coordinate_grid(3, 4);
        assert_eq!(grid.shape(), (3, 4));
        for row in 0..3 {
            for col in 0..4 {
                assert_eq!(grid.lon[[row, col]], col as f64);
                assert_eq!(grid.lat[[row, col]], row as f64);
            }
        }
    }

    #[test]
    fn test_north_up_transform() {
        // 0.01 degree pixels, upper-left corner at (-13.5, 10.0)
        let transform = GeoTransform::new(-13.5, 0.01, 0.0, 10.0, 0.0, -0.01);
        let grid = transform.coordinate_grid(2, 2);
        assert_eq!(grid.lon[[0, 0]], -13.5);
        assert_eq!(grid.lat[[0, 0]], 10.0);
        assert_eq!(grid.lon[[1, 1]], 0.01 + -13.5);
        assert_eq!(grid.lat[[1, 1]], -0.01 + 10.0);
    }

    #[test]
    fn test_rotation_terms_are_applied() {
        let transform = GeoTransform::new(1.0, 2.0, 0.5, 3.0, 0.25, -1.0);
        let (x, y) = transform.pixel_to_world(4, 2);
        assert_eq!(x, 2.0 * 4.0 + 0.5 * 2.0 + 1.0);
        assert_eq!(y, 0.25 * 4.0 + -1.0 * 2.0 + 3.0);
    }
}
