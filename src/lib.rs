//! Load word embeddings, project them to 2-D/3-D and render labelled
//! scatter plots.
//!
//! ```no_run
//! use wordviz::{load_embeddings, project, render, LoadOptions, PlotSpec, ProjectionConfig};
//!
//! # fn main() -> wordviz::Result<()> {
//! let mapping = load_embeddings("vectors.txt", &LoadOptions::default())?;
//! let projection = project(&mapping, &ProjectionConfig::default())?;
//! let spec = PlotSpec {
//!     output: Some("words.svg".into()),
//!     ..PlotSpec::default()
//! };
//! let figure = render(&projection, &spec)?;
//! println!("{} points", figure.len());
//! # Ok(())
//! # }
//! ```

pub mod clustering;
pub mod color;
pub mod data;
pub mod error;
pub mod projection;
pub mod render;
pub mod similarity;
pub mod viz;

#[cfg(feature = "viewer")]
pub mod app;
#[cfg(feature = "viewer")]
pub mod state;
#[cfg(feature = "viewer")]
mod ui;

pub use data::cache::EmbeddingCache;
pub use data::loader::{load_embeddings, EmbeddingFormat, EmbeddingSource, LoadOptions, MissingPolicy};
pub use data::model::VocabularyMapping;
pub use data::subset::{subset, SubsetStrategy};
pub use error::{ClusterError, Error, LoadError, ProjectionError, RenderError, Result, SimilarityError};
pub use projection::{project, ProjectionConfig, ProjectionMethod, ProjectionResult};
pub use render::heatmap::{Heatmap, HeatmapSpec};
pub use render::{render, Backend, Coloring, Figure, LabelMode, LayoutReport, PlotSpec, ViewAngle};
pub use similarity::{most_similar, pairwise_distances, word_distance, DistanceMetric, Neighbor};
pub use viz::{plot_clusters, plot_embeddings, plot_similarity, plot_topography, similarity_heatmap};
