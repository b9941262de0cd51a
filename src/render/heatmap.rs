use std::path::{Path, PathBuf};

use image::{ImageError, ImageFormat, RgbImage};
use log::info;
use ndarray::Array2;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::Color as _;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::svg::{draw_error, font, px};
use crate::color::{to_rgb, Color, Theme, ThemeName};
use crate::error::RenderError;
use crate::similarity::DistanceMetric;

const FONT_SIZE: f64 = 10.0;
const COLORBAR_WIDTH: f64 = 16.0;
const COLORBAR_STEPS: usize = 64;
/// Cells smaller than this get no value annotation.
const MIN_ANNOTATED_CELL: u32 = 24;
/// Largest cell grid edge, in pixels.
pub const MAX_GRID_SIDE: u32 = 16_384;

#[derive(Debug, Clone)]
pub struct HeatmapSpec {
    pub metric: DistanceMetric,
    pub theme: ThemeName,
    pub title: Option<String>,
    /// Edge length of one cell in pixels.
    pub cell_size: u32,
    /// Print the distance inside each cell (large enough cells only).
    pub annotate: bool,
    /// `.svg` or `.png`.
    pub output: Option<PathBuf>,
}

impl Default for HeatmapSpec {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Cosine,
            theme: ThemeName::Light1,
            title: None,
            cell_size: 24,
            annotate: true,
            output: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatmapFormat {
    Svg,
    Png,
}

impl HeatmapFormat {
    pub fn from_path(path: &Path) -> Result<Self, RenderError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            _ => Err(RenderError::UnsupportedFormat(format!(
                "'{}' (heatmaps are written as .svg or .png)",
                path.display()
            ))),
        }
    }
}

/// Pairwise distance matrix drawn as a coloured grid, tokens on both axes.
#[derive(Debug, Clone)]
pub struct Heatmap {
    pub tokens: Vec<String>,
    pub distances: Array2<f64>,
    pub theme: Theme,
    pub title: String,
    pub cell_size: u32,
    pub annotate: bool,
    range: (f64, f64),
}

impl Heatmap {
    pub fn new(
        tokens: Vec<String>,
        distances: Array2<f64>,
        spec: &HeatmapSpec,
    ) -> Result<Self, RenderError> {
        if spec.cell_size == 0 {
            return Err(RenderError::InvalidOption(
                "heatmap cell size must be positive".to_string(),
            ));
        }
        if distances.nrows() != distances.ncols() || distances.nrows() != tokens.len() {
            return Err(RenderError::InvalidOption(format!(
                "{} tokens for a {}x{} distance matrix",
                tokens.len(),
                distances.nrows(),
                distances.ncols()
            )));
        }
        let range = finite_range(&distances);
        Ok(Self {
            tokens,
            distances,
            range,
            theme: Theme::get(spec.theme),
            title: spec
                .title
                .clone()
                .unwrap_or_else(|| "Word Embedding Similarity Heatmap".to_string()),
            cell_size: spec.cell_size,
            annotate: spec.annotate,
        })
    }

    /// Smallest and largest finite distance.
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Scale colour for a cell; undefined distances use the grid colour.
    pub fn color_at(&self, row: usize, col: usize) -> Color {
        let v = self.distances[[row, col]];
        if !v.is_finite() {
            return self.theme.grid;
        }
        let (lo, hi) = self.range;
        let t = if hi > lo { (v - lo) / (hi - lo) } else { 0.0 };
        self.theme.scale.sample(t)
    }

    /// Edge length of the cell grid in pixels.
    pub fn grid_side(&self) -> Result<u32, RenderError> {
        u32::try_from(self.tokens.len())
            .ok()
            .and_then(|n| n.checked_mul(self.cell_size))
            .filter(|&side| side <= MAX_GRID_SIDE)
            .ok_or_else(|| {
                RenderError::InvalidOption(format!(
                    "{} tokens at {} px per cell exceed the {MAX_GRID_SIDE} px heatmap limit",
                    self.tokens.len(),
                    self.cell_size
                ))
            })
    }

    /// Vector rendering with token names on both axes, value annotations
    /// and a colour bar.
    pub fn to_svg(&self) -> Result<String, RenderError> {
        let grid = self.grid_side()?;
        let longest = self.tokens.iter().map(|t| t.chars().count()).max().unwrap_or(0);
        let margin = (longest as f64 * FONT_SIZE * 0.6 + 10.0).round() as u32;
        let top = margin + (FONT_SIZE * 3.0) as u32;
        let width = margin + grid + (COLORBAR_WIDTH * 5.0) as u32;
        let height = top + grid + 10;

        let mut out = String::new();
        {
            let root = SVGBackend::with_string(&mut out, (width, height)).into_drawing_area();
            root.fill(&to_rgb(self.theme.background)).map_err(draw_error)?;
            self.draw_cells(&root, (margin as i32, top as i32))?;
            self.draw_text(&root, margin as f64, top as f64, grid as f64, width as f64)?;
            root.present().map_err(draw_error)?;
        }
        Ok(out)
    }

    /// Raster rendering: one `cell_size` square per matrix entry, no text.
    pub fn to_image(&self) -> Result<RgbImage, RenderError> {
        let side = self.grid_side()?;
        let mut buffer = vec![0u8; side as usize * side as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (side, side)).into_drawing_area();
            self.draw_cells(&root, (0, 0))?;
            root.present().map_err(draw_error)?;
        }
        RgbImage::from_raw(side, side, buffer)
            .ok_or_else(|| RenderError::Draw("heatmap buffer has the wrong size".to_string()))
    }

    fn draw_cells<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        origin: (i32, i32),
    ) -> Result<(), RenderError> {
        let cell = self.cell_size as i32;
        for (row, col) in self.distances.indexed_iter().map(|(idx, _)| idx) {
            let (x, y) = (origin.0 + col as i32 * cell, origin.1 + row as i32 * cell);
            root.draw(&Rectangle::new(
                [(x, y), (x + cell, y + cell)],
                to_rgb(self.color_at(row, col)).filled(),
            ))
            .map_err(draw_error)?;
        }
        Ok(())
    }

    fn draw_text<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        margin: f64,
        top: f64,
        grid: f64,
        width: f64,
    ) -> Result<(), RenderError> {
        let text = to_rgb(self.theme.text);
        let cell = self.cell_size as f64;
        let style = |size: f64, bold: bool, h: HPos| {
            font(size, bold).color(&text).pos(Pos::new(h, VPos::Center))
        };

        root.draw(&Text::new(
            self.title.as_str(),
            px([width / 2.0, FONT_SIZE * 1.8]),
            style(FONT_SIZE * 1.3, true, HPos::Center),
        ))
        .map_err(draw_error)?;

        for (i, token) in self.tokens.iter().enumerate() {
            let c = i as f64 * cell + cell / 2.0;
            root.draw(&Text::new(
                token.as_str(),
                px([margin - 4.0, top + c]),
                style(FONT_SIZE, false, HPos::Right),
            ))
            .map_err(draw_error)?;
            root.draw(&Text::new(
                token.as_str(),
                px([margin + c, top - 4.0]),
                style(FONT_SIZE, false, HPos::Left).transform(FontTransform::Rotate270),
            ))
            .map_err(draw_error)?;
        }

        if self.annotate && self.cell_size >= MIN_ANNOTATED_CELL {
            for ((row, col), &v) in self.distances.indexed_iter() {
                if !v.is_finite() {
                    continue;
                }
                let center = [margin + (col as f64 + 0.5) * cell, top + (row as f64 + 0.5) * cell];
                root.draw(&Text::new(
                    format!("{v:.2}"),
                    px(center),
                    style(FONT_SIZE * 0.8, false, HPos::Center),
                ))
                .map_err(draw_error)?;
            }
        }

        // Colour bar, high values on top.
        let (lo, hi) = self.range();
        let bar_x = margin + grid + COLORBAR_WIDTH;
        let step = grid / COLORBAR_STEPS as f64;
        for i in 0..COLORBAR_STEPS {
            let t = 1.0 - (i as f64 + 0.5) / COLORBAR_STEPS as f64;
            let y = top + i as f64 * step;
            root.draw(&Rectangle::new(
                [px([bar_x, y]), px([bar_x + COLORBAR_WIDTH, y + step])],
                to_rgb(self.theme.scale.sample(t)).filled(),
            ))
            .map_err(draw_error)?;
        }
        let label_x = bar_x + COLORBAR_WIDTH + 4.0;
        for (value, y) in [(hi, top + FONT_SIZE / 2.0), (lo, top + grid - FONT_SIZE / 2.0)] {
            root.draw(&Text::new(
                format!("{value:.2}"),
                px([label_x, y]),
                style(FONT_SIZE, false, HPos::Left),
            ))
            .map_err(draw_error)?;
        }
        root.draw(&Text::new(
            "Distance",
            px([bar_x, top - 6.0 - FONT_SIZE / 2.0]),
            style(FONT_SIZE, false, HPos::Left),
        ))
        .map_err(draw_error)?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), RenderError> {
        match HeatmapFormat::from_path(path)? {
            HeatmapFormat::Svg => {
                std::fs::write(path, self.to_svg()?).map_err(|source| RenderError::Io {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            HeatmapFormat::Png => self
                .to_image()?
                .save_with_format(path, ImageFormat::Png)
                .map_err(|err| match err {
                    ImageError::IoError(source) => RenderError::Io {
                        path: path.to_path_buf(),
                        source,
                    },
                    source => RenderError::Image {
                        path: path.to_path_buf(),
                        source,
                    },
                })?,
        }
        info!("Wrote {}x{} heatmap to {}", self.tokens.len(), self.tokens.len(), path.display());
        Ok(())
    }
}

fn finite_range(distances: &Array2<f64>) -> (f64, f64) {
    let (lo, hi) = distances
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo.is_finite() {
        (lo, hi)
    } else {
        (0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn heatmap() -> Heatmap {
        Heatmap::new(
            vec!["cat".into(), "dog".into()],
            array![[0.0, 0.4], [0.4, 0.0]],
            &HeatmapSpec::default(),
        )
        .unwrap()
    }

    #[test]
    fn colours_follow_the_scale() {
        let h = heatmap();
        assert_eq!(h.range(), (0.0, 0.4));
        assert_eq!(h.color_at(0, 0), h.theme.scale.sample(0.0));
        assert_eq!(h.color_at(0, 1), h.theme.scale.sample(1.0));
    }

    #[test]
    fn svg_labels_tokens_and_annotates_cells() {
        let svg = heatmap().to_svg().unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Word Embedding Similarity Heatmap"));
        assert!(svg.contains(">cat<") && svg.contains(">dog<"));
        assert_eq!(svg.matches(">0.40<").count(), 3);
    }

    #[test]
    fn image_size_matches_cells() {
        let h = heatmap();
        let img = h.to_image().unwrap();
        assert_eq!(img.dimensions(), (48, 48));
        let far = h.color_at(0, 1);
        assert_eq!(img.get_pixel(36, 12).0, [far.red, far.green, far.blue]);
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let spec = HeatmapSpec {
            cell_size: u32::MAX,
            ..HeatmapSpec::default()
        };
        let h = Heatmap::new(vec!["a".into(), "b".into()], array![[0.0, 1.0], [1.0, 0.0]], &spec)
            .unwrap();
        assert!(matches!(h.grid_side(), Err(RenderError::InvalidOption(_))));
        assert!(matches!(h.to_image(), Err(RenderError::InvalidOption(_))));
        assert!(matches!(h.to_svg(), Err(RenderError::InvalidOption(_))));
    }

    #[test]
    fn rejects_mismatched_matrix_and_bad_extension() {
        let err = Heatmap::new(vec!["a".into()], array![[0.0, 1.0], [1.0, 0.0]], &HeatmapSpec::default());
        assert!(matches!(err, Err(RenderError::InvalidOption(_))));
        assert!(matches!(
            HeatmapFormat::from_path(Path::new("x.jpg")),
            Err(RenderError::UnsupportedFormat(_))
        ));
    }
}
