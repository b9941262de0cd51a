use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::color::ThemeName;

/// Which points get a text label.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelMode {
    #[default]
    All,
    None,
    /// `n` labels spread over the plot (points nearest to k-means centres).
    Sparse(usize),
    /// Only these tokens.
    Tokens(Vec<String>),
}

/// How point colours are chosen.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coloring {
    /// Theme point colour; highlighted tokens get the theme target colour.
    #[default]
    Uniform,
    /// k-means over the projected coordinates, one colour per cluster.
    Clusters {
        k: usize,
        #[serde(default)]
        show_centers: bool,
    },
    /// Explicit token → group name assignment; unassigned tokens keep the
    /// theme point colour.
    Groups(BTreeMap<String, String>),
}

/// Camera for 3-D projections, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewAngle {
    pub azimuth: f64,
    pub elevation: f64,
}

impl Default for ViewAngle {
    fn default() -> Self {
        Self {
            azimuth: -60.0,
            elevation: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Build the figure in memory and optionally write it to `output`.
    #[default]
    Static,
    /// Additionally open the interactive desktop viewer.
    Window,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "window" | "interactive" => Ok(Self::Window),
            other => Err(format!("unknown backend '{other}' (static|window)")),
        }
    }
}

/// Every option the renderer understands.
///
/// Deserializes from JSON with every field optional, e.g.
/// `{"labels": {"sparse": 20}, "theme": "dark1", "output": "plot.svg"}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlotSpec {
    /// Tokens to draw, in order. `None` draws every projected token;
    /// `Some(vec![])` draws nothing.
    pub tokens: Option<Vec<String>>,
    pub labels: LabelMode,
    /// Drawn in the theme target colour with bold labels.
    pub highlight: Vec<String>,
    pub coloring: Coloring,
    pub title: Option<String>,
    pub theme: ThemeName,
    pub grid: bool,
    /// Push labels apart until they stop overlapping.
    pub avoid_overlap: bool,
    /// Kernel density underlay.
    pub density: bool,
    pub width: u32,
    pub height: u32,
    pub point_radius: f64,
    pub font_size: f64,
    pub view: ViewAngle,
    pub backend: Backend,
    /// `.svg` or `.html`; `None` keeps the figure in memory only.
    pub output: Option<PathBuf>,
    /// Seeds k-means for cluster colouring and sparse labels.
    pub seed: u64,
}

impl Default for PlotSpec {
    fn default() -> Self {
        Self {
            tokens: None,
            labels: LabelMode::All,
            highlight: Vec::new(),
            coloring: Coloring::Uniform,
            title: None,
            theme: ThemeName::Light1,
            grid: true,
            avoid_overlap: true,
            density: false,
            width: 1000,
            height: 800,
            point_radius: 4.0,
            font_size: 11.0,
            view: ViewAngle::default(),
            backend: Backend::Static,
            output: None,
            seed: 0,
        }
    }
}
