use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use wordviz::color::ThemeName;
use wordviz::{
    load_embeddings, most_similar, plot_clusters, plot_embeddings, plot_similarity,
    plot_topography, similarity_heatmap, subset, word_distance, Backend, DistanceMetric,
    EmbeddingFormat, EmbeddingSource, HeatmapSpec, LabelMode, LoadOptions, MissingPolicy,
    PlotSpec, ProjectionConfig, ProjectionMethod, SubsetStrategy, VocabularyMapping,
};

#[derive(Parser)]
#[command(name = "wordviz", version, about = "Visualize word embeddings")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Project a model to 2-D/3-D and draw a labelled scatter plot.
    Plot(PlotArgs),
    /// List the nearest tokens to a word.
    Similar {
        #[command(flatten)]
        model: ModelArgs,
        word: String,
        #[arg(short, default_value_t = 10)]
        n: usize,
        #[arg(long, default_value = "cosine")]
        metric: DistanceMetric,
    },
    /// Distance between two words.
    Distance {
        #[command(flatten)]
        model: ModelArgs,
        word1: String,
        word2: String,
        #[arg(long, default_value = "cosine")]
        metric: DistanceMetric,
    },
    /// Pairwise distance heatmap (.svg or .png).
    Heatmap {
        #[command(flatten)]
        model: ModelArgs,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value = "cosine")]
        metric: DistanceMetric,
        #[arg(long, default_value = "light1")]
        theme: ThemeName,
        #[arg(long)]
        title: Option<String>,
    },
}

#[derive(Args)]
struct ModelArgs {
    /// Embedding file (.txt, .vec, .bin, .json, .parquet).
    input: PathBuf,
    /// Override the format inferred from the extension.
    #[arg(long)]
    format: Option<EmbeddingFormat>,
    /// Read only the first N vectors.
    #[arg(long)]
    limit: Option<usize>,
    /// Comma-separated tokens to keep.
    #[arg(long, value_delimiter = ',')]
    tokens: Option<Vec<String>>,
    /// Skip requested tokens missing from the model instead of failing.
    #[arg(long)]
    skip_missing: bool,
    /// Text models whose tokens contain spaces (`new york 0.1 0.2 ...`).
    #[arg(long)]
    spaced_tokens: bool,
    /// Keep N tokens after loading.
    #[arg(long)]
    subset: Option<usize>,
    /// Pick the subset at random with this seed instead of taking the first N.
    #[arg(long)]
    subset_seed: Option<u64>,
}

impl ModelArgs {
    fn load(&self) -> anyhow::Result<VocabularyMapping> {
        let options = LoadOptions {
            tokens: self.tokens.clone(),
            on_missing: if self.skip_missing {
                MissingPolicy::Skip
            } else {
                MissingPolicy::Error
            },
            limit: self.limit,
            spaced_tokens: self.spaced_tokens,
        };
        let mapping = load_embeddings(EmbeddingSource::file(&self.input, self.format), &options)
            .with_context(|| format!("Failed to load {}", self.input.display()))?;
        log::info!("Loaded {mapping} from {}", self.input.display());

        Ok(match self.subset {
            Some(n) => {
                let strategy = match self.subset_seed {
                    Some(seed) => SubsetStrategy::Random { seed: Some(seed) },
                    None => SubsetStrategy::First,
                };
                subset(&mapping, n, strategy)
            }
            None => mapping,
        })
    }
}

#[derive(Args)]
struct PlotArgs {
    #[command(flatten)]
    model: ModelArgs,
    /// JSON file with plot options; flags below override it.
    #[arg(long)]
    spec: Option<PathBuf>,
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// pca, tsne, mds or isomap. Defaults to isomap for --density plots,
    /// pca otherwise.
    #[arg(long)]
    method: Option<ProjectionMethod>,
    #[arg(long, default_value_t = 2)]
    dims: usize,
    /// Input-space distance for t-SNE, MDS and Isomap.
    #[arg(long, default_value = "euclidean")]
    metric: DistanceMetric,
    /// Isomap neighbour count.
    #[arg(long)]
    neighbors: Option<usize>,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long)]
    perplexity: Option<f64>,
    #[arg(long)]
    iterations: Option<usize>,
    /// all, none, or a number of spread-out labels.
    #[arg(long, value_parser = parse_labels)]
    labels: Option<LabelMode>,
    #[arg(long)]
    theme: Option<ThemeName>,
    #[arg(long)]
    title: Option<String>,
    /// Colour by k-means clusters.
    #[arg(long)]
    clusters: Option<usize>,
    #[arg(long, requires = "clusters")]
    show_centers: bool,
    /// Kernel density underlay.
    #[arg(long)]
    density: bool,
    /// Plot this word and its nearest neighbours only.
    #[arg(long)]
    similar_to: Option<String>,
    #[arg(long, default_value_t = 10, requires = "similar_to")]
    top: usize,
    /// Metric ranking the neighbours of --similar-to.
    #[arg(long, default_value = "cosine", requires = "similar_to")]
    similarity_metric: DistanceMetric,
    /// Open the interactive viewer.
    #[arg(long)]
    window: bool,
}

fn parse_labels(s: &str) -> Result<LabelMode, String> {
    match s.to_ascii_lowercase().as_str() {
        "all" => Ok(LabelMode::All),
        "none" => Ok(LabelMode::None),
        n => n
            .parse()
            .map(LabelMode::Sparse)
            .map_err(|_| format!("expected all, none or a count, got '{s}'")),
    }
}

impl PlotArgs {
    fn plot_spec(&self) -> anyhow::Result<PlotSpec> {
        let mut spec = match &self.spec {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Invalid plot spec {}", path.display()))?
            }
            None => PlotSpec::default(),
        };
        if let Some(output) = &self.output {
            spec.output = Some(output.clone());
        }
        if let Some(labels) = &self.labels {
            spec.labels = labels.clone();
        }
        if let Some(theme) = self.theme {
            spec.theme = theme;
        }
        if let Some(title) = &self.title {
            spec.title = Some(title.clone());
        }
        if self.density {
            spec.density = true;
        }
        if self.window {
            spec.backend = Backend::Window;
        }
        spec.seed = self.seed;
        Ok(spec)
    }

    fn method(&self) -> ProjectionMethod {
        let topography = self.density && self.similar_to.is_none() && self.clusters.is_none();
        match self.method {
            Some(method) => method,
            None if topography => ProjectionMethod::Isomap,
            None => ProjectionMethod::Pca,
        }
    }

    fn projection_config(&self) -> ProjectionConfig {
        let mut config = ProjectionConfig::new(self.dims, self.method())
            .with_seed(self.seed)
            .with_metric(self.metric);
        if let Some(p) = self.perplexity {
            config.perplexity = p;
        }
        if let Some(i) = self.iterations {
            config.iterations = i;
        }
        if let Some(k) = self.neighbors {
            config.neighbors = k;
        }
        config
    }
}

fn run_plot(args: &PlotArgs) -> anyhow::Result<()> {
    let mapping = args.model.load()?;
    let spec = args.plot_spec()?;
    let config = args.projection_config();

    let figure = if let Some(word) = &args.similar_to {
        plot_similarity(
            &mapping,
            word,
            args.similarity_metric,
            args.top,
            &config,
            &spec,
        )?
    } else if let Some(k) = args.clusters {
        plot_clusters(&mapping, k, args.show_centers, &config, &spec)?
    } else if args.density {
        plot_topography(&mapping, &config, &spec)?
    } else {
        plot_embeddings(&mapping, &config, &spec)?
    };

    if figure.layout.is_degraded() {
        log::warn!(
            "{} label pair(s) still overlap; try fewer labels or a larger canvas",
            figure.layout.overlapping_pairs
        );
    }
    match &spec.output {
        Some(path) => println!("Wrote {} points to {}", figure.len(), path.display()),
        None if spec.backend == Backend::Static => {
            print!("{}", figure.to_svg()?);
        }
        None => {}
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Plot(args) => run_plot(&args)?,
        Command::Similar {
            model,
            word,
            n,
            metric,
        } => {
            let mapping = model.load()?;
            for neighbor in most_similar(&mapping, &word, metric, n)? {
                println!("{}\t{:.6}", neighbor.token, neighbor.distance);
            }
        }
        Command::Distance {
            model,
            word1,
            word2,
            metric,
        } => {
            let mapping = model.load()?;
            println!("{:.6}", word_distance(&mapping, &word1, &word2, metric)?);
        }
        Command::Heatmap {
            model,
            output,
            metric,
            theme,
            title,
        } => {
            let mapping = model.load()?;
            let spec = HeatmapSpec {
                metric,
                theme,
                title,
                output: Some(output.clone()),
                ..HeatmapSpec::default()
            };
            similarity_heatmap(&mapping, &spec)?;
            println!("Wrote {}x{} heatmap to {}", mapping.len(), mapping.len(), output.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plot_args(args: &[&str]) -> PlotArgs {
        let argv = ["wordviz", "plot", "model.txt"].iter().chain(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Plot(args) => args,
            _ => panic!("expected the plot command"),
        }
    }

    #[test]
    fn similarity_metric_defaults_to_cosine() {
        let args = plot_args(&["--similar-to", "king"]);
        assert_eq!(args.similarity_metric, DistanceMetric::Cosine);

        let args = plot_args(&["--similar-to", "king", "--similarity-metric", "euclidean"]);
        assert_eq!(args.similarity_metric, DistanceMetric::Euclidean);
        // The projection metric is independent of the neighbour metric.
        assert_eq!(args.projection_config().metric, DistanceMetric::Euclidean);
        assert_eq!(plot_args(&["--metric", "cosine"]).similarity_metric, DistanceMetric::Cosine);
    }

    #[test]
    fn topography_defaults_to_isomap() {
        assert_eq!(plot_args(&[]).method(), ProjectionMethod::Pca);
        assert_eq!(plot_args(&["--density"]).method(), ProjectionMethod::Isomap);
        assert_eq!(
            plot_args(&["--density", "--method", "mds"]).method(),
            ProjectionMethod::Mds
        );

        let config = plot_args(&["--density", "--neighbors", "8"]).projection_config();
        assert_eq!(config.neighbors, 8);
    }
}
