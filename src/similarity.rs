//! Distances between word vectors and nearest-neighbour queries.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::Deserialize;

use crate::data::model::VocabularyMapping;
use crate::error::SimilarityError;

/// Distance metric between two vectors. Smaller means more similar for
/// every variant, including the correlation and dot-product ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    BrayCurtis,
    Canberra,
    Chebyshev,
    #[default]
    Cosine,
    /// Negated dot product.
    Dot,
    Euclidean,
    Manhattan,
    /// `1 - r` (Pearson correlation).
    Pearson,
    /// `1 - ρ` (Spearman rank correlation).
    Spearman,
}

impl DistanceMetric {
    pub const ALL: [Self; 9] = [
        Self::BrayCurtis,
        Self::Canberra,
        Self::Chebyshev,
        Self::Cosine,
        Self::Dot,
        Self::Euclidean,
        Self::Manhattan,
        Self::Pearson,
        Self::Spearman,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::BrayCurtis => "braycurtis",
            Self::Canberra => "canberra",
            Self::Chebyshev => "chebyshev",
            Self::Cosine => "cosine",
            Self::Dot => "dot",
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
            Self::Pearson => "pearson",
            Self::Spearman => "spearman",
        }
    }

    /// Whether the metric can be negative (and so is unusable as a squared
    /// distance by the projection methods).
    pub fn can_be_negative(self) -> bool {
        matches!(self, Self::Dot)
    }

    /// Distance between `a` and `b`. Undefined cases (zero norm, zero
    /// variance) yield `NaN`.
    pub fn distance<T>(self, a: ArrayView1<'_, T>, b: ArrayView1<'_, T>) -> f64
    where
        T: Copy + Into<f64>,
    {
        let pairs = || {
            a.iter()
                .zip(b.iter())
                .map(|(&x, &y)| (Into::<f64>::into(x), Into::<f64>::into(y)))
        };

        match self {
            Self::BrayCurtis => {
                let (num, den) = pairs().fold((0.0, 0.0), |(n, d), (x, y): (f64, f64)| {
                    (n + (x - y).abs(), d + (x + y).abs())
                });
                num / den
            }
            Self::Canberra => pairs()
                .map(|(x, y): (f64, f64)| {
                    let den = x.abs() + y.abs();
                    if den == 0.0 {
                        0.0
                    } else {
                        (x - y).abs() / den
                    }
                })
                .sum(),
            Self::Chebyshev => pairs()
                .map(|(x, y): (f64, f64)| (x - y).abs())
                .fold(0.0, f64::max),
            Self::Cosine => {
                let (dot, na, nb) = pairs().fold((0.0, 0.0, 0.0), |(d, na, nb), (x, y)| {
                    (d + x * y, na + x * x, nb + y * y)
                });
                1.0 - dot / (na.sqrt() * nb.sqrt())
            }
            Self::Dot => -pairs().map(|(x, y): (f64, f64)| x * y).sum::<f64>(),
            Self::Euclidean => pairs()
                .map(|(x, y): (f64, f64)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt(),
            Self::Manhattan => pairs().map(|(x, y): (f64, f64)| (x - y).abs()).sum(),
            Self::Pearson => {
                let (xs, ys) = unzip(pairs());
                1.0 - correlation(&xs, &ys)
            }
            Self::Spearman => {
                let (xs, ys) = unzip(pairs());
                1.0 - correlation(&ranks(&xs), &ranks(&ys))
            }
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let lower = match lower.as_str() {
            "cityblock" | "l1" => "manhattan",
            "l2" => "euclidean",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|m| m.name() == lower)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|m| m.name()).collect();
                format!("unknown distance '{s}' (valid: {})", names.join(", "))
            })
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn unzip(pairs: impl Iterator<Item = (f64, f64)>) -> (Vec<f64>, Vec<f64>) {
    pairs.unzip()
}

/// Pearson correlation coefficient.
fn correlation(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (&x, &y) in xs.iter().zip(ys) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx) * (x - mx);
        syy += (y - my) * (y - my);
    }
    sxy / (sxx.sqrt() * syy.sqrt())
}

/// 1-based ranks, ties get the average of their positions.
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let avg = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = avg;
        }
        start = end;
    }
    ranks
}

// ---------------------------------------------------------------------------
// Vocabulary-level queries
// ---------------------------------------------------------------------------

/// A token and its distance to a query token.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub token: String,
    pub distance: f64,
}

fn require<'a>(
    mapping: &'a VocabularyMapping,
    words: &[&str],
) -> Result<Vec<ArrayView1<'a, f32>>, SimilarityError> {
    if mapping.is_empty() {
        return Err(SimilarityError::EmptyVocabulary);
    }
    let missing: Vec<String> = words
        .iter()
        .filter(|w| !mapping.contains(w))
        .map(|w| w.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SimilarityError::UnknownTokens(missing));
    }
    Ok(words.iter().filter_map(|w| mapping.get(w)).collect())
}

/// Distance between two vocabulary words.
pub fn word_distance(
    mapping: &VocabularyMapping,
    word1: &str,
    word2: &str,
    metric: DistanceMetric,
) -> Result<f64, SimilarityError> {
    let vecs = require(mapping, &[word1, word2])?;
    Ok(metric.distance(vecs[0], vecs[1]))
}

/// The `n` tokens closest to `target` (excluding it), nearest first.
///
/// Ties keep vocabulary order; undefined distances sort last.
pub fn most_similar(
    mapping: &VocabularyMapping,
    target: &str,
    metric: DistanceMetric,
    n: usize,
) -> Result<Vec<Neighbor>, SimilarityError> {
    let target_vec = require(mapping, &[target])?[0];

    let mut scored: Vec<(usize, f64)> = mapping
        .iter()
        .enumerate()
        .filter(|(_, (token, _))| *token != target)
        .map(|(i, (_, v))| (i, metric.distance(target_vec, v)))
        .collect();

    scored.sort_by(|a, b| cmp_distance(a.1, b.1).then(a.0.cmp(&b.0)));
    scored.truncate(n);

    Ok(scored
        .into_iter()
        .map(|(i, distance)| Neighbor {
            token: mapping.tokens()[i].clone(),
            distance,
        })
        .collect())
}

/// Symmetric `n × n` distance matrix between the rows of `rows`.
pub fn pairwise<T>(rows: ArrayView2<'_, T>, metric: DistanceMetric) -> Array2<f64>
where
    T: Copy + Into<f64>,
{
    let n = rows.nrows();
    let mut out = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in i..n {
            let d = metric.distance(rows.row(i), rows.row(j));
            out[[i, j]] = d;
            out[[j, i]] = d;
        }
    }
    out
}

/// Pairwise distances between every token of `mapping`, in token order.
pub fn pairwise_distances(mapping: &VocabularyMapping, metric: DistanceMetric) -> Array2<f64> {
    pairwise(mapping.vectors(), metric)
}

/// Order two distances with undefined values last.
fn cmp_distance(a: f64, b: f64) -> Ordering {
    let key = |d: f64| if d.is_nan() { f64::INFINITY } else { d };
    key(a).total_cmp(&key(b))
}
