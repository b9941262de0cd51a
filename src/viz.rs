//! One-call plots combining projection, similarity, clustering and rendering.

use log::{info, warn};

use crate::data::model::VocabularyMapping;
use crate::error::Result;
use crate::projection::{project, ProjectionConfig};
use crate::render::heatmap::{Heatmap, HeatmapSpec};
use crate::render::{render, Coloring, Figure, PlotSpec};
use crate::similarity::{most_similar, pairwise_distances, DistanceMetric};

/// Heatmaps above this many tokens get slow and unreadable.
pub const HEATMAP_WARN_TOKENS: usize = 500;

/// Project every token of `mapping` and render it.
pub fn plot_embeddings(
    mapping: &VocabularyMapping,
    config: &ProjectionConfig,
    spec: &PlotSpec,
) -> Result<Figure> {
    let projection = project(mapping, config)?;
    Ok(render(&projection, spec)?)
}

/// Plot `target` together with its `n` nearest tokens under `metric`.
///
/// Only these tokens are projected; the target is highlighted.
pub fn plot_similarity(
    mapping: &VocabularyMapping,
    target: &str,
    metric: DistanceMetric,
    n: usize,
    config: &ProjectionConfig,
    spec: &PlotSpec,
) -> Result<Figure> {
    let neighbors = most_similar(mapping, target, metric, n)?;
    let mut tokens = Vec::with_capacity(neighbors.len() + 1);
    tokens.push(target.to_string());
    tokens.extend(neighbors.into_iter().map(|nb| nb.token));
    info!("Plotting '{target}' with {} neighbours", tokens.len() - 1);

    let (subset, _) = mapping.select(&tokens);
    let projection = project(&subset, config)?;

    let mut spec = spec.clone();
    spec.tokens = None;
    if !spec.highlight.iter().any(|t| t == target) {
        spec.highlight.push(target.to_string());
    }
    spec.title
        .get_or_insert_with(|| format!("Top {n} words similar to '{target}'"));
    Ok(render(&projection, &spec)?)
}

/// k-means coloured plot with a legend, optionally marking the centres.
pub fn plot_clusters(
    mapping: &VocabularyMapping,
    k: usize,
    show_centers: bool,
    config: &ProjectionConfig,
    spec: &PlotSpec,
) -> Result<Figure> {
    let projection = project(mapping, config)?;
    let spec = PlotSpec {
        coloring: Coloring::Clusters { k, show_centers },
        ..spec.clone()
    };
    Ok(render(&projection, &spec)?)
}

/// Scatter plot over a kernel density map of the projected points.
///
/// Distance-preserving projections (MDS) give the most faithful terrain.
pub fn plot_topography(
    mapping: &VocabularyMapping,
    config: &ProjectionConfig,
    spec: &PlotSpec,
) -> Result<Figure> {
    let projection = project(mapping, config)?;
    let mut spec = spec.clone();
    spec.density = true;
    spec.title
        .get_or_insert_with(|| "Word Embedding Topography".to_string());
    Ok(render(&projection, &spec)?)
}

/// Pairwise distance heatmap of every token in `mapping`, written to
/// `spec.output` when set.
pub fn similarity_heatmap(mapping: &VocabularyMapping, spec: &HeatmapSpec) -> Result<Heatmap> {
    if let Some(message) = heatmap_size_warning(mapping.len()) {
        warn!("{message}");
    }
    let distances = pairwise_distances(mapping, spec.metric);
    let heatmap = Heatmap::new(mapping.tokens().to_vec(), distances, spec)?;
    if let Some(path) = &spec.output {
        heatmap.save(path)?;
    }
    Ok(heatmap)
}

fn heatmap_size_warning(tokens: usize) -> Option<String> {
    (tokens > HEATMAP_WARN_TOKENS).then(|| {
        format!(
            "Heatmap of {tokens} tokens will be large and slow; consider subsetting below {HEATMAP_WARN_TOKENS}"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::projection::ProjectionMethod;

    fn mapping() -> VocabularyMapping {
        VocabularyMapping::from_pairs(vec![
            ("king".to_string(), vec![0.9, 0.8, 0.1]),
            ("queen".to_string(), vec![0.85, 0.82, 0.15]),
            ("prince".to_string(), vec![0.8, 0.7, 0.2]),
            ("apple".to_string(), vec![0.1, 0.2, 0.9]),
            ("pear".to_string(), vec![0.15, 0.1, 0.95]),
            ("plum".to_string(), vec![0.2, 0.15, 0.85]),
        ])
        .unwrap()
    }

    #[test]
    fn similarity_plot_highlights_target() {
        let fig = plot_similarity(
            &mapping(),
            "king",
            DistanceMetric::Cosine,
            2,
            &ProjectionConfig::default(),
            &PlotSpec::default(),
        )
        .unwrap();
        assert_eq!(fig.len(), 3);
        assert!(fig.point("king").unwrap().highlighted);
        assert!(fig.point("queen").is_some());
        assert!(fig.point("apple").is_none());
        assert_eq!(fig.title.as_deref(), Some("Top 2 words similar to 'king'"));
    }

    #[test]
    fn similarity_plot_unknown_target() {
        let err = plot_similarity(
            &mapping(),
            "emperor",
            DistanceMetric::Cosine,
            2,
            &ProjectionConfig::default(),
            &PlotSpec::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Similarity(_)));
    }

    #[test]
    fn clusters_and_topography() {
        let config = ProjectionConfig::default();
        let fig = plot_clusters(&mapping(), 2, true, &config, &PlotSpec::default()).unwrap();
        assert_eq!(fig.legend.len(), 2);
        assert_eq!(fig.centers.len(), 2);

        let config = ProjectionConfig::new(2, ProjectionMethod::Mds);
        let fig = plot_topography(&mapping(), &config, &PlotSpec::default()).unwrap();
        assert!(fig.density.is_some());
        assert_eq!(fig.title.as_deref(), Some("Word Embedding Topography"));
    }

    #[test]
    fn heatmap_is_square_over_the_vocabulary() {
        let heatmap = similarity_heatmap(&mapping(), &HeatmapSpec::default()).unwrap();
        assert_eq!(heatmap.distances.dim(), (6, 6));
        assert!(heatmap.distances[[0, 0]].abs() < 1e-6);
    }

    #[test]
    fn large_heatmaps_warn_but_still_render() {
        assert!(heatmap_size_warning(HEATMAP_WARN_TOKENS).is_none());
        let message = heatmap_size_warning(HEATMAP_WARN_TOKENS + 1).unwrap();
        assert!(message.contains("501 tokens"));

        let big = VocabularyMapping::from_pairs((0..=HEATMAP_WARN_TOKENS).map(|i| {
            let t = i as f32 * 0.01;
            (format!("w{i}"), vec![t.cos(), t.sin() + 2.0])
        }))
        .unwrap();
        let spec = HeatmapSpec {
            cell_size: 1,
            annotate: false,
            ..HeatmapSpec::default()
        };
        let heatmap = similarity_heatmap(&big, &spec).unwrap();
        assert_eq!(heatmap.distances.dim(), (501, 501));
        assert_eq!(heatmap.grid_side().unwrap(), 501);
    }
}
