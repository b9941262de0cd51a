use std::ops::Range;
use std::path::Path;

use ndarray::Array2;

use super::{html, svg, OutputFormat};
use crate::color::{Color, Theme};
use crate::error::RenderError;

/// Axis-aligned rectangle in pixel space (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn contains(&self, p: [f64; 2]) -> bool {
        p[0] >= self.left && p[0] <= self.right && p[1] >= self.top && p[1] <= self.bottom
    }
}

// ---------------------------------------------------------------------------
// Plane → pixel mapping
// ---------------------------------------------------------------------------

/// Linear map from plane coordinates onto the plot area, y flipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub area: Rect,
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    /// Fit the bounding box of `points`, padded by 5% per side.
    pub fn fit(points: &[[f64; 2]], area: Rect) -> Self {
        let (mut x_min, mut x_max, mut y_min, mut y_max) =
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
        for p in points {
            x_min = x_min.min(p[0]);
            x_max = x_max.max(p[0]);
            y_min = y_min.min(p[1]);
            y_max = y_max.max(p[1]);
        }
        let (x_min, x_max) = padded(x_min, x_max);
        let (y_min, y_max) = padded(y_min, y_max);
        Self {
            area,
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    pub fn to_pixel(&self, p: [f64; 2]) -> [f64; 2] {
        let tx = (p[0] - self.x_min) / (self.x_max - self.x_min);
        let ty = (p[1] - self.y_min) / (self.y_max - self.y_min);
        [
            self.area.left + tx * self.area.width(),
            self.area.bottom - ty * self.area.height(),
        ]
    }

    /// Plane x interval shown across the plot area.
    pub fn x_range(&self) -> Range<f64> {
        self.x_min..self.x_max
    }

    pub fn y_range(&self) -> Range<f64> {
        self.y_min..self.y_max
    }

    pub fn to_plane(&self, px: [f64; 2]) -> [f64; 2] {
        let tx = (px[0] - self.area.left) / self.area.width();
        let ty = (self.area.bottom - px[1]) / self.area.height();
        [
            self.x_min + tx * (self.x_max - self.x_min),
            self.y_min + ty * (self.y_max - self.y_min),
        ]
    }
}

fn padded(min: f64, max: f64) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        return (-1.0, 1.0);
    }
    let span = max - min;
    if span <= f64::EPSILON * max.abs().max(1.0) {
        return (min - 1.0, max + 1.0);
    }
    (min - 0.05 * span, max + 0.05 * span)
}

// ---------------------------------------------------------------------------
// Figure parts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PlotPoint {
    pub token: String,
    /// Pixel position.
    pub position: [f64; 2],
    /// Distance towards the viewer (3-D only, 0 for 2-D).
    pub depth: f64,
    pub color: Color,
    pub highlighted: bool,
    /// Cluster or group name, shown in tooltips.
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    /// Index into [`Figure::points`].
    pub point: usize,
    pub text: String,
    /// Pixel position of the labelled point.
    pub anchor: [f64; 2],
    /// Offset of the label centre from the anchor after layout.
    pub offset: [f64; 2],
    pub bold: bool,
}

impl Label {
    /// Pixel position of the label centre.
    pub fn center(&self) -> [f64; 2] {
        [self.anchor[0] + self.offset[0], self.anchor[1] + self.offset[1]]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub name: String,
    pub color: Color,
}

/// log1p-scaled kernel density sampled on a regular pixel grid covering the
/// plot area. Row 0 is the top of the plot.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    pub area: Rect,
    pub values: Array2<f64>,
}

impl DensityGrid {
    pub fn range(&self) -> (f64, f64) {
        self.values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

/// Outcome of label placement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutReport {
    pub labels: usize,
    /// Repulsion passes run, 0 when de-overlap was disabled.
    pub iterations: usize,
    /// Label pairs whose boxes still intersect.
    pub overlapping_pairs: usize,
}

impl LayoutReport {
    pub fn is_degraded(&self) -> bool {
        self.overlapping_pairs > 0
    }
}

// ---------------------------------------------------------------------------
// Figure
// ---------------------------------------------------------------------------

/// A rendered labelled scatter plot, independent of output format.
///
/// Points are stored in draw order (far to near for 3-D projections).
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub width: u32,
    pub height: u32,
    pub title: Option<String>,
    pub theme: Theme,
    pub grid: bool,
    pub font_size: f64,
    pub point_radius: f64,
    pub frame: Frame,
    pub points: Vec<PlotPoint>,
    pub labels: Vec<Label>,
    pub legend: Vec<LegendEntry>,
    /// Cluster centres in pixel space.
    pub centers: Vec<[f64; 2]>,
    pub density: Option<DensityGrid>,
    pub layout: LayoutReport,
}

impl Figure {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, token: &str) -> Option<&PlotPoint> {
        self.points.iter().find(|p| p.token == token)
    }

    pub fn label_for(&self, point: usize) -> Option<&Label> {
        self.labels.iter().find(|l| l.point == point)
    }

    /// Position of a point in plane coordinates.
    pub fn plane_position(&self, index: usize) -> Option<[f64; 2]> {
        self.points.get(index).map(|p| self.frame.to_plane(p.position))
    }

    /// The `n` points closest to `index` in the plotted plane, nearest
    /// first, with their plane distances.
    pub fn nearest(&self, index: usize, n: usize) -> Vec<(usize, f64)> {
        let Some(origin) = self.plane_position(index) else {
            return Vec::new();
        };
        let mut others: Vec<(usize, f64)> = self
            .points
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(i, p)| {
                let q = self.frame.to_plane(p.position);
                let (dx, dy) = (q[0] - origin[0], q[1] - origin[1]);
                (i, (dx * dx + dy * dy).sqrt())
            })
            .collect();
        others.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        others.truncate(n);
        others
    }

    pub fn to_svg(&self) -> Result<String, RenderError> {
        svg::to_svg(self)
    }

    pub fn to_html(&self) -> Result<String, RenderError> {
        html::to_html(self)
    }

    /// Write the figure, choosing the format from the file extension.
    pub fn save(&self, path: &Path) -> Result<(), RenderError> {
        let contents = match OutputFormat::from_path(path)? {
            OutputFormat::Svg => self.to_svg()?,
            OutputFormat::Html => self.to_html()?,
        };
        std::fs::write(path, contents).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area() -> Rect {
        Rect {
            left: 10.0,
            top: 10.0,
            right: 110.0,
            bottom: 210.0,
        }
    }

    #[test]
    fn frame_maps_bounds_inside_area_with_y_flipped() {
        let frame = Frame::fit(&[[0.0, 0.0], [10.0, 20.0]], area());
        let lo = frame.to_pixel([0.0, 0.0]);
        let hi = frame.to_pixel([10.0, 20.0]);
        assert!(area().contains(lo) && area().contains(hi));
        assert!(lo[0] < hi[0]);
        assert!(lo[1] > hi[1]);

        let back = frame.to_plane(hi);
        assert!((back[0] - 10.0).abs() < 1e-9 && (back[1] - 20.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_frames_stay_finite() {
        for points in [&[][..], &[[3.0, 3.0]][..]] {
            let frame = Frame::fit(points, area());
            let px = frame.to_pixel([3.0, 3.0]);
            assert!(px.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn layout_report_degradation() {
        assert!(!LayoutReport::default().is_degraded());
        let report = LayoutReport {
            labels: 2,
            iterations: 10,
            overlapping_pairs: 1,
        };
        assert!(report.is_degraded());
    }
}
