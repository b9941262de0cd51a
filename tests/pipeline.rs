use std::io::Write;

use wordviz::{
    load_embeddings, project, render, similarity_heatmap, EmbeddingCache, EmbeddingSource,
    HeatmapSpec, LabelMode, LoadOptions, PlotSpec, ProjectionConfig, ProjectionMethod,
    RenderError,
};

fn abc_pairs() -> Vec<(String, Vec<f32>)> {
    vec![
        ("a".to_string(), vec![1.0, 0.0, 0.0, 0.0]),
        ("b".to_string(), vec![0.0, 1.0, 0.0, 0.0]),
        ("c".to_string(), vec![0.0, 0.0, 1.0, 0.0]),
    ]
}

fn write_word2vec(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("vectors.txt");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "6 3").unwrap();
    for (token, v) in [
        ("king", [0.9, 0.8, 0.1]),
        ("queen", [0.85, 0.82, 0.15]),
        ("prince", [0.8, 0.7, 0.2]),
        ("apple", [0.1, 0.2, 0.9]),
        ("pear", [0.15, 0.1, 0.95]),
        ("plum", [0.2, 0.15, 0.85]),
    ] {
        writeln!(f, "{token} {} {} {}", v[0], v[1], v[2]).unwrap();
    }
    path
}

#[test]
fn three_tokens_give_three_labelled_points() {
    let mapping = load_embeddings(EmbeddingSource::Pairs(abc_pairs()), &LoadOptions::default())
        .unwrap();
    let projection = project(&mapping, &ProjectionConfig::default()).unwrap();
    let figure = render(&projection, &PlotSpec::default()).unwrap();

    assert_eq!(figure.len(), 3);
    assert_eq!(figure.labels.len(), 3);
    let mut labels: Vec<&str> = figure.labels.iter().map(|l| l.text.as_str()).collect();
    labels.sort_unstable();
    assert_eq!(labels, ["a", "b", "c"]);
}

#[test]
fn empty_selection_renders_an_empty_figure() {
    let mapping = load_embeddings(EmbeddingSource::Pairs(abc_pairs()), &LoadOptions::default())
        .unwrap();
    let projection = project(&mapping, &ProjectionConfig::default()).unwrap();
    let spec = PlotSpec {
        tokens: Some(Vec::new()),
        ..PlotSpec::default()
    };
    let figure = render(&projection, &spec).unwrap();
    assert!(figure.is_empty());
    assert!(!figure.layout.is_degraded());
}

#[test]
fn file_to_svg_and_html() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_word2vec(dir.path());
    let mapping = load_embeddings(input.as_path(), &LoadOptions::default()).unwrap();
    assert_eq!(mapping.dim(), 3);

    let config = ProjectionConfig::new(2, ProjectionMethod::Mds);
    let projection = project(&mapping, &config).unwrap();

    for name in ["words.svg", "words.html"] {
        let output = dir.path().join(name);
        let spec = PlotSpec {
            output: Some(output.clone()),
            labels: LabelMode::Sparse(3),
            title: Some("Fruit & royalty".to_string()),
            ..PlotSpec::default()
        };
        let figure = render(&projection, &spec).unwrap();
        assert!((1..=3).contains(&figure.labels.len()));

        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.contains("<svg"));
        assert!(written.contains("Fruit &amp; royalty"));
        assert_eq!(written.matches("<circle cx").count(), 6);
    }
}

#[test]
fn unsupported_and_unwritable_outputs() {
    let projection = project(
        &load_embeddings(EmbeddingSource::Pairs(abc_pairs()), &LoadOptions::default()).unwrap(),
        &ProjectionConfig::default(),
    )
    .unwrap();

    let spec = PlotSpec {
        output: Some("figure.png".into()),
        ..PlotSpec::default()
    };
    assert!(matches!(
        render(&projection, &spec),
        Err(RenderError::UnsupportedFormat(_))
    ));

    let dir = tempfile::tempdir().unwrap();
    let spec = PlotSpec {
        output: Some(dir.path().join("missing").join("figure.svg")),
        ..PlotSpec::default()
    };
    assert!(matches!(render(&projection, &spec), Err(RenderError::Io { .. })));
}

#[test]
fn three_dimensional_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_word2vec(dir.path());
    let mapping = load_embeddings(input.as_path(), &LoadOptions::default()).unwrap();
    let projection = project(&mapping, &ProjectionConfig::new(3, ProjectionMethod::Pca)).unwrap();
    let figure = render(&projection, &PlotSpec::default()).unwrap();
    assert_eq!(figure.len(), 6);
    assert!(figure.points.windows(2).all(|w| w[0].depth <= w[1].depth));
}

#[test]
fn cached_model_feeds_heatmap() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_word2vec(dir.path());

    let mut cache = EmbeddingCache::new();
    let first = cache.get_or_load(&input, None).unwrap();
    let second = cache.get_or_load(&input, None).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    let output = dir.path().join("heatmap.png");
    let spec = HeatmapSpec {
        output: Some(output.clone()),
        ..HeatmapSpec::default()
    };
    let heatmap = similarity_heatmap(&first, &spec).unwrap();
    assert_eq!(heatmap.tokens.len(), 6);
    let img = image::open(&output).unwrap();
    assert_eq!(img.width(), 6 * spec.cell_size);
}
