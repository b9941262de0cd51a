//! Figure construction and output.
//!
//! ```text
//!  ProjectionResult ──► select tokens ──► view (3-D → plane) ──► colour
//!        │                                                        │
//!        │        Figure ◄── label layout ◄── density ◄── frame ◄─┘
//!        │          │
//!        │          ├── .svg / .html file
//!        │          └── desktop viewer (Backend::Window)
//! ```

pub mod density;
pub mod figure;
pub mod heatmap;
pub mod html;
pub mod layout;
pub mod spec;
pub mod svg;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::{debug, info, warn};
use ndarray::{Array2, ArrayView1, Axis};

use crate::clustering::{select_sparse_labels, KMeans, KMeansConfig};
use crate::color::{generate_palette, Color, GroupColorMap, Theme};
use crate::error::RenderError;
use crate::projection::ProjectionResult;

pub use figure::{Figure, LayoutReport};
pub use spec::{Backend, Coloring, LabelMode, PlotSpec, ViewAngle};

const MARGIN: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Html,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, RenderError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "svg" => Ok(Self::Svg),
            "html" | "htm" => Ok(Self::Html),
            _ => Err(RenderError::UnsupportedFormat(format!(
                "'{}' (figures are written as .svg or .html)",
                path.display()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Build a labelled scatter plot of `projection` according to `spec`,
/// write it to `spec.output` if set and open the viewer for
/// [`Backend::Window`].
pub fn render(projection: &ProjectionResult, spec: &PlotSpec) -> Result<Figure, RenderError> {
    validate(spec)?;
    if let Some(path) = &spec.output {
        OutputFormat::from_path(path)?;
    }

    let theme = Theme::get(spec.theme);
    let selected = select_points(projection, spec.tokens.as_deref());
    let coords = projection.coords().select(Axis(0), &selected);
    let tokens: Vec<&str> = selected
        .iter()
        .map(|&i| projection.tokens()[i].as_str())
        .collect();
    debug!("Rendering {} of {} projected tokens", tokens.len(), projection.len());

    let placed: Vec<([f64; 2], f64)> = coords
        .rows()
        .into_iter()
        .map(|r| to_plane(r, spec.view))
        .collect();
    let plane: Vec<[f64; 2]> = placed.iter().map(|(p, _)| *p).collect();

    let highlight: HashSet<&str> = spec.highlight.iter().map(String::as_str).collect();
    let colors = colorize(&coords, &tokens, &highlight, spec, &theme)?;

    let area = figure::Rect {
        left: MARGIN,
        top: MARGIN + if spec.title.is_some() { spec.font_size * 2.0 } else { 0.0 },
        right: (spec.width as f64 - MARGIN).max(MARGIN + 1.0),
        bottom: (spec.height as f64 - MARGIN).max(MARGIN + spec.font_size * 2.0 + 1.0),
    };
    let frame = figure::Frame::fit(&plane, area);

    // Far points first so nearer ones are drawn on top.
    let mut order: Vec<usize> = (0..tokens.len()).collect();
    order.sort_by(|&a, &b| placed[a].1.total_cmp(&placed[b].1).then(a.cmp(&b)));

    let points: Vec<figure::PlotPoint> = order
        .iter()
        .map(|&i| figure::PlotPoint {
            token: tokens[i].to_string(),
            position: frame.to_pixel(plane[i]),
            depth: placed[i].1,
            color: colors.point_colors[i],
            highlighted: highlight.contains(tokens[i]),
            group: colors.groups.as_ref().and_then(|g| g[i].clone()),
        })
        .collect();

    let labelled = labelled_points(&coords, &tokens, spec);
    let mut labels: Vec<figure::Label> = order
        .iter()
        .enumerate()
        .filter(|(_, i)| labelled.contains(*i))
        .map(|(drawn, &i)| figure::Label {
            point: drawn,
            text: tokens[i].to_string(),
            anchor: points[drawn].position,
            offset: [0.0, 0.0],
            bold: points[drawn].highlighted,
        })
        .collect();

    let pixel_points: Vec<[f64; 2]> = points.iter().map(|p| p.position).collect();
    let layout_report = layout::place_labels(
        &mut labels,
        &pixel_points,
        spec.point_radius,
        spec.font_size,
        figure::Rect {
            left: 0.0,
            top: 0.0,
            right: spec.width as f64,
            bottom: spec.height as f64,
        },
        spec.avoid_overlap,
    );

    let density = if spec.density {
        density::kde_grid(&plane, &frame)
    } else {
        None
    };

    let figure = Figure {
        width: spec.width,
        height: spec.height,
        title: spec.title.clone(),
        theme,
        grid: spec.grid,
        font_size: spec.font_size,
        point_radius: spec.point_radius,
        frame,
        centers: colors
            .centers
            .iter()
            .map(|&c| frame.to_pixel(c))
            .collect(),
        legend: colors.legend,
        points,
        labels,
        density,
        layout: layout_report,
    };

    if let Some(path) = &spec.output {
        figure.save(path)?;
        info!("Wrote {}-point figure to {}", figure.len(), path.display());
    }

    if spec.backend == Backend::Window {
        show_window(&figure)?;
    }

    Ok(figure)
}

fn validate(spec: &PlotSpec) -> Result<(), RenderError> {
    let invalid = |msg: String| Err(RenderError::InvalidOption(msg));
    if spec.width == 0 || spec.height == 0 {
        return invalid(format!("canvas must be non-empty, got {}x{}", spec.width, spec.height));
    }
    if spec.font_size.is_nan() || spec.font_size <= 0.0 {
        return invalid(format!("font size must be positive, got {}", spec.font_size));
    }
    if spec.point_radius.is_nan() || spec.point_radius <= 0.0 {
        return invalid(format!("point radius must be positive, got {}", spec.point_radius));
    }
    if !spec.view.azimuth.is_finite() || !spec.view.elevation.is_finite() {
        return invalid("view angles must be finite".to_string());
    }
    if let Coloring::Clusters { k: 0, .. } = spec.coloring {
        return invalid("cluster count must be at least 1".to_string());
    }
    Ok(())
}

/// Indices into the projection, in drawing order before depth sorting.
fn select_points(projection: &ProjectionResult, tokens: Option<&[String]>) -> Vec<usize> {
    let Some(tokens) = tokens else {
        return (0..projection.len()).collect();
    };
    let index: HashMap<&str, usize> = projection
        .tokens()
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();

    let mut seen = HashSet::new();
    let mut selected = Vec::with_capacity(tokens.len());
    let mut unknown = Vec::new();
    for token in tokens {
        match index.get(token.as_str()) {
            Some(&i) => {
                if seen.insert(i) {
                    selected.push(i);
                }
            }
            None => unknown.push(token.as_str()),
        }
    }
    if !unknown.is_empty() {
        warn!("Skipping {} token(s) not in the projection: {}", unknown.len(), unknown.join(", "));
    }
    selected
}

/// Orthographic view of a 2-D or 3-D coordinate: plane position and depth
/// towards the viewer.
pub fn to_plane(coords: ArrayView1<'_, f64>, view: ViewAngle) -> ([f64; 2], f64) {
    if coords.len() < 3 {
        return ([coords[0], coords[1]], 0.0);
    }
    let (az, el) = (view.azimuth.to_radians(), view.elevation.to_radians());
    let (x, y, z) = (coords[0], coords[1], coords[2]);
    let right = [-az.sin(), az.cos(), 0.0];
    let up = [-el.sin() * az.cos(), -el.sin() * az.sin(), el.cos()];
    let toward = [el.cos() * az.cos(), el.cos() * az.sin(), el.sin()];
    let dot = |v: [f64; 3]| v[0] * x + v[1] * y + v[2] * z;
    ([dot(right), dot(up)], dot(toward))
}

struct Colors {
    point_colors: Vec<Color>,
    /// Group name per point, when coloured by cluster or group.
    groups: Option<Vec<Option<String>>>,
    legend: Vec<figure::LegendEntry>,
    /// Plane coordinates.
    centers: Vec<[f64; 2]>,
}

fn colorize(
    coords: &Array2<f64>,
    tokens: &[&str],
    highlight: &HashSet<&str>,
    spec: &PlotSpec,
    theme: &Theme,
) -> Result<Colors, RenderError> {
    let base = |token: &str| {
        if highlight.contains(token) {
            theme.target
        } else {
            theme.points
        }
    };

    match &spec.coloring {
        Coloring::Uniform => Ok(Colors {
            point_colors: tokens.iter().map(|t| base(t)).collect(),
            groups: None,
            legend: Vec::new(),
            centers: Vec::new(),
        }),
        Coloring::Clusters { k, show_centers } => {
            if tokens.is_empty() {
                return Ok(Colors {
                    point_colors: Vec::new(),
                    groups: None,
                    legend: Vec::new(),
                    centers: Vec::new(),
                });
            }
            let config = KMeansConfig {
                seed: spec.seed,
                ..KMeansConfig::default()
            };
            let clustering = KMeans::new(config)
                .fit(coords.view(), *k)
                .map_err(|e| RenderError::InvalidOption(e.to_string()))?;
            let palette = generate_palette(clustering.k());
            let name = |c: usize| format!("Cluster {}", c + 1);

            Ok(Colors {
                point_colors: clustering.assignments.iter().map(|&c| palette[c]).collect(),
                groups: Some(clustering.assignments.iter().map(|&c| Some(name(c))).collect()),
                legend: palette
                    .iter()
                    .enumerate()
                    .map(|(c, &color)| figure::LegendEntry {
                        name: name(c),
                        color,
                    })
                    .collect(),
                centers: if *show_centers {
                    clustering
                        .centers
                        .rows()
                        .into_iter()
                        .map(|c| to_plane(c, spec.view).0)
                        .collect()
                } else {
                    Vec::new()
                },
            })
        }
        Coloring::Groups(assignment) => {
            let present: Vec<&str> = tokens
                .iter()
                .filter_map(|t| assignment.get(*t).map(String::as_str))
                .collect();
            let map = GroupColorMap::new(present, theme.points);
            Ok(Colors {
                point_colors: tokens
                    .iter()
                    .map(|t| match assignment.get(*t) {
                        Some(group) => map.color_for(group),
                        None => base(t),
                    })
                    .collect(),
                groups: Some(tokens.iter().map(|t| assignment.get(*t).cloned()).collect()),
                legend: map
                    .legend_entries()
                    .into_iter()
                    .map(|(name, color)| figure::LegendEntry { name, color })
                    .collect(),
                centers: Vec::new(),
            })
        }
    }
}

/// Indices (into the selection) of points that get a label.
fn labelled_points(coords: &Array2<f64>, tokens: &[&str], spec: &PlotSpec) -> HashSet<usize> {
    match &spec.labels {
        LabelMode::All => (0..tokens.len()).collect(),
        LabelMode::None => HashSet::new(),
        LabelMode::Sparse(n) => select_sparse_labels(coords.view(), *n, spec.seed)
            .into_iter()
            .collect(),
        LabelMode::Tokens(wanted) => {
            let wanted: HashSet<&str> = wanted.iter().map(String::as_str).collect();
            tokens
                .iter()
                .enumerate()
                .filter(|(_, t)| wanted.contains(**t))
                .map(|(i, _)| i)
                .collect()
        }
    }
}

#[cfg(feature = "viewer")]
fn show_window(figure: &Figure) -> Result<(), RenderError> {
    crate::app::show(figure.clone()).map_err(|e| RenderError::Backend(e.to_string()))
}

#[cfg(not(feature = "viewer"))]
fn show_window(_figure: &Figure) -> Result<(), RenderError> {
    Err(RenderError::Backend(
        "built without the `viewer` feature".to_string(),
    ))
}
