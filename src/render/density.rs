use ndarray::Array2;

use super::figure::{DensityGrid, Frame};

/// Bandwidth as a fraction of each axis' standard deviation.
const BANDWIDTH_FACTOR: f64 = 0.2;
pub const GRID_RESOLUTION: usize = 100;

/// Gaussian kernel density of `points` (plane coordinates) sampled on a
/// `GRID_RESOLUTION²` grid over the frame's plot area, log1p scaled.
///
/// Uses a product kernel with per-axis bandwidths. Needs at least two points.
pub fn kde_grid(points: &[[f64; 2]], frame: &Frame) -> Option<DensityGrid> {
    if points.len() < 2 {
        return None;
    }
    let hx = bandwidth(points.iter().map(|p| p[0]));
    let hy = bandwidth(points.iter().map(|p| p[1]));
    let norm = 1.0 / (points.len() as f64 * 2.0 * std::f64::consts::PI * hx * hy);

    let area = frame.area;
    let (cell_w, cell_h) = (
        area.width() / GRID_RESOLUTION as f64,
        area.height() / GRID_RESOLUTION as f64,
    );

    let values = Array2::from_shape_fn((GRID_RESOLUTION, GRID_RESOLUTION), |(row, col)| {
        let center = frame.to_plane([
            area.left + (col as f64 + 0.5) * cell_w,
            area.top + (row as f64 + 0.5) * cell_h,
        ]);
        let density: f64 = points
            .iter()
            .map(|p| {
                let u = (center[0] - p[0]) / hx;
                let v = (center[1] - p[1]) / hy;
                (-0.5 * (u * u + v * v)).exp()
            })
            .sum::<f64>()
            * norm;
        density.ln_1p()
    });

    Some(DensityGrid { area, values })
}

fn bandwidth(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let n = values.clone().count() as f64;
    let mean = values.clone().sum::<f64>() / n;
    let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0).max(1.0);
    let h = BANDWIDTH_FACTOR * var.sqrt();
    if h > 0.0 && h.is_finite() {
        h
    } else {
        BANDWIDTH_FACTOR
    }
}
