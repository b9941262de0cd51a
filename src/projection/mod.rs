//! Dimensionality reduction of embedding vectors to 2-D or 3-D.
//!
//! ## Method selection
//! - **PCA** (default): fast and deterministic, keeps the directions of
//!   largest variance. Global layout is faithful, local neighbourhoods are not.
//! - **t-SNE**: keeps local neighbourhoods, so clusters of related words
//!   stand out, at O(n²) cost per iteration. Distances between clusters are
//!   not meaningful. Seeded, so repeatable.
//! - **MDS**: classical scaling of a pairwise distance matrix under any
//!   [`DistanceMetric`]; keeps large-scale distances, O(n²) memory.
//! - **Isomap**: MDS over shortest paths through the k-nearest-neighbour
//!   graph, so words spread along a curved manifold are unrolled. Fails
//!   with [`ProjectionError::DisconnectedGraph`] when `neighbors` is too
//!   small to link every point.

mod eigen;
pub mod isomap;
pub mod mds;
pub mod pca;
pub mod tsne;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use log::{debug, info};
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::Deserialize;

use crate::data::model::VocabularyMapping;
use crate::error::ProjectionError;
use crate::similarity::{pairwise, DistanceMetric};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMethod {
    /// Variance-based (principal component analysis).
    #[default]
    Pca,
    /// Neighbourhood-based (t-distributed stochastic neighbour embedding).
    Tsne,
    /// Distance-preserving (classical multidimensional scaling).
    Mds,
    /// Geodesic distance-preserving (MDS over a neighbourhood graph).
    Isomap,
}

impl FromStr for ProjectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pca" | "variance" => Ok(Self::Pca),
            "tsne" | "t-sne" | "neighborhood" | "neighbourhood" => Ok(Self::Tsne),
            "mds" => Ok(Self::Mds),
            "isomap" => Ok(Self::Isomap),
            other => Err(format!(
                "unknown projection method '{other}' (pca|tsne|mds|isomap)"
            )),
        }
    }
}

impl fmt::Display for ProjectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pca => "PCA",
            Self::Tsne => "t-SNE",
            Self::Mds => "MDS",
            Self::Isomap => "Isomap",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProjectionConfig {
    /// Target dimensionality, 2 or 3.
    pub dims: usize,
    pub method: ProjectionMethod,
    /// Seeds every random choice (power-iteration start vectors, t-SNE init).
    pub seed: u64,
    /// Input-space distance for t-SNE, MDS and Isomap. PCA ignores it.
    pub metric: DistanceMetric,
    /// Isomap neighbour count per point.
    pub neighbors: usize,
    /// t-SNE effective neighbour count.
    pub perplexity: f64,
    /// t-SNE gradient steps.
    pub iterations: usize,
    /// t-SNE step size, `None` for automatic.
    pub learning_rate: Option<f64>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            dims: 2,
            method: ProjectionMethod::Pca,
            seed: 42,
            metric: DistanceMetric::Euclidean,
            neighbors: 5,
            perplexity: 30.0,
            iterations: 1000,
            learning_rate: None,
        }
    }
}

impl ProjectionConfig {
    pub fn new(dims: usize, method: ProjectionMethod) -> Self {
        Self {
            dims,
            method,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }
}

// ---------------------------------------------------------------------------
// ProjectionResult
// ---------------------------------------------------------------------------

/// Ordered `(token, coordinates)` pairs with 2 or 3 coordinates each.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionResult {
    tokens: Vec<String>,
    coords: Array2<f64>,
    method: ProjectionMethod,
    explained_variance_ratio: Option<Vec<f64>>,
}

impl ProjectionResult {
    /// Wrap precomputed coordinates, one row per token.
    pub fn new(
        tokens: Vec<String>,
        coords: Array2<f64>,
        method: ProjectionMethod,
    ) -> Result<Self, ProjectionError> {
        let dims = coords.ncols();
        if dims != 2 && dims != 3 {
            return Err(ProjectionError::InvalidDimensions(dims));
        }
        if tokens.len() != coords.nrows() {
            return Err(ProjectionError::InvalidOption(format!(
                "{} tokens but {} coordinate rows",
                tokens.len(),
                coords.nrows()
            )));
        }
        Ok(Self {
            tokens,
            coords,
            method,
            explained_variance_ratio: None,
        })
    }

    pub fn dims(&self) -> usize {
        self.coords.ncols()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn coords(&self) -> ArrayView2<'_, f64> {
        self.coords.view()
    }

    pub fn method(&self) -> ProjectionMethod {
        self.method
    }

    /// Fraction of total variance per component (PCA only).
    pub fn explained_variance_ratio(&self) -> Option<&[f64]> {
        self.explained_variance_ratio.as_deref()
    }

    pub fn get(&self, token: &str) -> Option<ArrayView1<'_, f64>> {
        self.tokens
            .iter()
            .position(|t| t == token)
            .map(|i| self.coords.row(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ArrayView1<'_, f64>)> {
        self.tokens
            .iter()
            .map(String::as_str)
            .zip(self.coords.rows())
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Project every vector of `mapping` to `config.dims` dimensions.
pub fn project(
    mapping: &VocabularyMapping,
    config: &ProjectionConfig,
) -> Result<ProjectionResult, ProjectionError> {
    validate(mapping, config)?;

    let x = mapping.vectors().mapv(f64::from);
    info!(
        "Projecting {mapping} to {}-D with {}",
        config.dims, config.method
    );

    let (mut coords, explained_variance_ratio) = if config.method == ProjectionMethod::Pca {
        let (coords, ratio) = pca::fit(&x, config.dims, config.seed);
        debug!("PCA explained variance ratio: {ratio:?}");
        (coords, Some(ratio))
    } else {
        let distances = checked_distances(mapping, &x, config.metric)?;
        let euclidean = config.metric == DistanceMetric::Euclidean;
        let coords = match config.method {
            ProjectionMethod::Tsne => {
                let params = tsne::TsneParams {
                    perplexity: config.perplexity,
                    iterations: config.iterations,
                    learning_rate: config.learning_rate,
                    metric: config.metric,
                    seed: config.seed,
                };
                tsne::fit(&distances, config.dims, &params)
            }
            ProjectionMethod::Isomap => {
                let neighbors = config.neighbors.min(mapping.len() - 1);
                isomap::fit(&distances, config.dims, neighbors, config.seed)?
            }
            ProjectionMethod::Mds | ProjectionMethod::Pca => {
                mds::fit(&distances, config.dims, euclidean, config.seed)
            }
        };
        (coords, None)
    };

    if config.method != ProjectionMethod::Tsne {
        normalize_signs(&mut coords);
    }

    Ok(ProjectionResult {
        tokens: mapping.tokens().to_vec(),
        coords,
        method: config.method,
        explained_variance_ratio,
    })
}

fn validate(mapping: &VocabularyMapping, config: &ProjectionConfig) -> Result<(), ProjectionError> {
    if config.dims != 2 && config.dims != 3 {
        return Err(ProjectionError::InvalidDimensions(config.dims));
    }

    for (token, v) in mapping.iter() {
        if v.iter().any(|x| !x.is_finite()) {
            return Err(ProjectionError::NonFinite(token.to_string()));
        }
    }

    let distinct: HashSet<Vec<u32>> = mapping
        .vectors()
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|x| x.to_bits()).collect())
        .collect();
    if distinct.len() < config.dims {
        return Err(ProjectionError::TooFewDistinct {
            distinct: distinct.len(),
            dims: config.dims,
        });
    }

    if config.method == ProjectionMethod::Pca {
        return Ok(());
    }

    if config.metric.can_be_negative() {
        return Err(ProjectionError::InvalidOption(format!(
            "{} cannot drive {}: distances must be non-negative",
            config.metric, config.method
        )));
    }
    for (token, v) in mapping.iter() {
        if config.metric.distance(v, v).is_nan() {
            return Err(ProjectionError::ZeroVector {
                token: token.to_string(),
                metric: config.metric.to_string(),
            });
        }
    }
    if config.method == ProjectionMethod::Isomap && config.neighbors == 0 {
        return Err(ProjectionError::InvalidOption(
            "Isomap needs at least one neighbour".to_string(),
        ));
    }
    if config.method == ProjectionMethod::Tsne {
        if config.perplexity.is_nan() || config.perplexity <= 0.0 {
            return Err(ProjectionError::InvalidOption(format!(
                "perplexity must be positive, got {}",
                config.perplexity
            )));
        }
        if config.iterations == 0 {
            return Err(ProjectionError::InvalidOption(
                "t-SNE needs at least one iteration".to_string(),
            ));
        }
    }
    Ok(())
}

/// Pairwise distances under `metric`, rejecting any pair the metric cannot
/// measure (Bray-Curtis between opposite vectors, for one).
fn checked_distances(
    mapping: &VocabularyMapping,
    x: &Array2<f64>,
    metric: DistanceMetric,
) -> Result<Array2<f64>, ProjectionError> {
    let distances = pairwise(x.view(), metric);
    if let Some(((i, j), _)) = distances.indexed_iter().find(|(_, d)| !d.is_finite()) {
        return Err(ProjectionError::NonFiniteDistance {
            a: mapping.tokens()[i].clone(),
            b: mapping.tokens()[j].clone(),
            metric: metric.to_string(),
        });
    }
    Ok(distances)
}

/// Flip each axis so its largest-magnitude coordinate is positive, making
/// eigenvector-based output independent of the solver's sign choice.
fn normalize_signs(coords: &mut Array2<f64>) {
    for mut column in coords.columns_mut() {
        let pivot = column
            .iter()
            .copied()
            .max_by(|a, b| a.abs().total_cmp(&b.abs()))
            .unwrap_or(0.0);
        if pivot < 0.0 {
            column.mapv_inplace(|v| -v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> VocabularyMapping {
        VocabularyMapping::from_pairs(vec![
            ("a".to_string(), vec![1.0, 0.0, 0.0, 0.0]),
            ("b".to_string(), vec![0.0, 1.0, 0.0, 0.0]),
            ("c".to_string(), vec![0.0, 0.0, 1.0, 0.0]),
        ])
        .unwrap()
    }

    fn grid(n: usize) -> VocabularyMapping {
        VocabularyMapping::from_pairs((0..n).map(|i| {
            let f = i as f32;
            (
                format!("w{i}"),
                vec![f.sin(), f.cos(), (f * 0.5).sin() + 1.5, (i % 3) as f32 + 0.1],
            )
        }))
        .unwrap()
    }

    #[test]
    fn pca_keeps_token_order_and_shape() {
        let p = project(&abc(), &ProjectionConfig::default()).unwrap();
        assert_eq!(p.dims(), 2);
        assert_eq!(p.tokens(), &["a", "b", "c"]);
        assert_eq!(p.method(), ProjectionMethod::Pca);
        let ratio = p.explained_variance_ratio().unwrap();
        assert!((ratio.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn every_method_is_deterministic() {
        let m = grid(12);
        for method in [
            ProjectionMethod::Pca,
            ProjectionMethod::Tsne,
            ProjectionMethod::Mds,
            ProjectionMethod::Isomap,
        ] {
            let mut config = ProjectionConfig::new(2, method).with_seed(9);
            config.iterations = 200;
            config.neighbors = 8;
            let a = project(&m, &config).unwrap();
            let b = project(&m, &config).unwrap();
            assert_eq!(a.coords(), b.coords(), "{method} not deterministic");
        }
    }

    #[test]
    fn three_dimensional_projection() {
        let p = project(&grid(8), &ProjectionConfig::new(3, ProjectionMethod::Mds)).unwrap();
        assert_eq!(p.dims(), 3);
        assert_eq!(p.get("w3").unwrap().len(), 3);
    }

    #[test]
    fn rejects_unsupported_dimensions() {
        let err = project(&abc(), &ProjectionConfig::new(4, ProjectionMethod::Pca)).unwrap_err();
        assert!(matches!(err, ProjectionError::InvalidDimensions(4)));
    }

    #[test]
    fn too_few_distinct_vectors() {
        let dupes = VocabularyMapping::from_pairs(vec![
            ("x".to_string(), vec![1.0, 2.0]),
            ("y".to_string(), vec![1.0, 2.0]),
            ("z".to_string(), vec![1.0, 2.0]),
        ])
        .unwrap();
        let err = project(&dupes, &ProjectionConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::TooFewDistinct { distinct: 1, dims: 2 }
        ));

        let (two, _) = abc().select(&["a", "b"]);
        let err = project(&two, &ProjectionConfig::new(3, ProjectionMethod::Pca)).unwrap_err();
        assert!(matches!(err, ProjectionError::TooFewDistinct { distinct: 2, dims: 3 }));
    }

    #[test]
    fn zero_vector_under_cosine_is_rejected() {
        let m = VocabularyMapping::from_pairs(vec![
            ("a".to_string(), vec![1.0, 0.0]),
            ("b".to_string(), vec![0.0, 1.0]),
            ("zero".to_string(), vec![0.0, 0.0]),
        ])
        .unwrap();
        let config =
            ProjectionConfig::new(2, ProjectionMethod::Mds).with_metric(DistanceMetric::Cosine);
        let err = project(&m, &config).unwrap_err();
        assert!(matches!(err, ProjectionError::ZeroVector { ref token, .. } if token == "zero"));

        // PCA has no metric and handles the zero vector fine.
        assert!(project(&m, &ProjectionConfig::default()).is_ok());
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let m = VocabularyMapping::from_pairs(vec![
            ("a".to_string(), vec![1.0, f32::NAN]),
            ("b".to_string(), vec![0.0, 1.0]),
        ])
        .unwrap();
        assert!(matches!(
            project(&m, &ProjectionConfig::default()),
            Err(ProjectionError::NonFinite(_))
        ));
    }

    #[test]
    fn dot_metric_cannot_drive_tsne() {
        let config =
            ProjectionConfig::new(2, ProjectionMethod::Tsne).with_metric(DistanceMetric::Dot);
        assert!(matches!(
            project(&grid(5), &config),
            Err(ProjectionError::InvalidOption(_))
        ));
    }

    #[test]
    fn opposite_vectors_under_bray_curtis_are_rejected() {
        let m = VocabularyMapping::from_pairs(vec![
            ("up".to_string(), vec![1.0, 2.0]),
            ("down".to_string(), vec![-1.0, -2.0]),
            ("side".to_string(), vec![2.0, 1.0]),
        ])
        .unwrap();
        let config =
            ProjectionConfig::new(2, ProjectionMethod::Mds).with_metric(DistanceMetric::BrayCurtis);
        let err = project(&m, &config).unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::NonFiniteDistance { ref a, ref b, .. } if a == "up" && b == "down"
        ));
    }

    #[test]
    fn isomap_rejects_a_disconnected_neighbourhood() {
        let m = VocabularyMapping::from_pairs(vec![
            ("a".to_string(), vec![0.0, 0.0]),
            ("b".to_string(), vec![0.1, 0.0]),
            ("c".to_string(), vec![9.0, 9.0]),
            ("d".to_string(), vec![9.1, 9.0]),
        ])
        .unwrap();
        let mut config = ProjectionConfig::new(2, ProjectionMethod::Isomap);
        config.neighbors = 1;
        assert!(matches!(
            project(&m, &config),
            Err(ProjectionError::DisconnectedGraph { components: 2, .. })
        ));

        config.neighbors = 3;
        assert_eq!(project(&m, &config).unwrap().len(), 4);

        config.neighbors = 0;
        assert!(matches!(
            project(&m, &config),
            Err(ProjectionError::InvalidOption(_))
        ));
    }

    #[test]
    fn method_names_parse() {
        assert_eq!("isomap".parse::<ProjectionMethod>(), Ok(ProjectionMethod::Isomap));
        assert_eq!("t-SNE".parse::<ProjectionMethod>(), Ok(ProjectionMethod::Tsne));
        assert!("umap".parse::<ProjectionMethod>().is_err());
    }

    #[test]
    fn signs_are_normalized() {
        let mut coords = ndarray::array![[1.0, -3.0], [-2.0, 1.0]];
        normalize_signs(&mut coords);
        assert_eq!(coords, ndarray::array![[-1.0, 3.0], [2.0, -1.0]]);
    }

    #[test]
    fn result_constructor_validates_shape() {
        let coords = Array2::<f64>::zeros((2, 2));
        assert!(ProjectionResult::new(vec!["a".into()], coords, ProjectionMethod::Pca).is_err());
        let empty = ProjectionResult::new(Vec::new(), Array2::zeros((0, 2)), ProjectionMethod::Pca)
            .unwrap();
        assert!(empty.is_empty());
    }
}
