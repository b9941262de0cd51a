use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Component errors
// ---------------------------------------------------------------------------

/// Failure to turn a model source into a [`VocabularyMapping`](crate::VocabularyMapping).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("embedding file {0} does not exist")]
    NotFound(PathBuf),

    #[error("unsupported embedding format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed embedding source at record {record}: {reason}")]
    Malformed { record: usize, reason: String },

    #[error("token '{token}' has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        token: String,
        expected: usize,
        found: usize,
    },

    #[error("embedding source contains no vectors")]
    Empty,

    #[error("token(s) not in vocabulary: {}", .0.join(", "))]
    MissingTokens(Vec<String>),
}

/// Degenerate numeric input or an invalid projection request.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("projection dimensionality must be 2 or 3, got {0}")]
    InvalidDimensions(usize),

    #[error("cannot project to {dims} dimensions from {distinct} distinct vector(s)")]
    TooFewDistinct { distinct: usize, dims: usize },

    #[error("vector for '{0}' contains a non-finite value")]
    NonFinite(String),

    #[error("vector for '{token}' has zero norm or variance, undefined under the {metric} metric")]
    ZeroVector { token: String, metric: String },

    #[error("invalid projection option: {0}")]
    InvalidOption(String),

    #[error("{metric} distance between '{a}' and '{b}' is not finite")]
    NonFiniteDistance { a: String, b: String, metric: String },

    #[error("neighbourhood graph ({neighbors} neighbours) has {components} disconnected components")]
    DisconnectedGraph { components: usize, neighbors: usize },
}

/// Bad output target or unsupported figure option.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unsupported output format '{0}'")]
    UnsupportedFormat(String),

    #[error("cannot write figure to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid plot option: {0}")]
    InvalidOption(String),

    #[error("plot backend failed: {0}")]
    Backend(String),

    #[error("drawing failed: {0}")]
    Draw(String),
}

#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("word(s) not in vocabulary: {}", .0.join(", "))]
    UnknownTokens(Vec<String>),

    #[error("vocabulary is empty")]
    EmptyVocabulary,
}

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cannot form {k} cluster(s) from {n} point(s)")]
    InvalidClusterCount { k: usize, n: usize },
}

// ---------------------------------------------------------------------------
// Umbrella error for the high-level helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Similarity(#[from] SimilarityError),
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
