use std::str::FromStr;

use log::warn;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::model::VocabularyMapping;

// ---------------------------------------------------------------------------
// Subset selection: which rows of a large model to keep
// ---------------------------------------------------------------------------

/// How [`subset`] chooses rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubsetStrategy {
    /// The first `n` tokens in model order (most frequent, for most models).
    #[default]
    First,
    /// `n` tokens sampled without replacement. `None` draws a fresh seed.
    Random { seed: Option<u64> },
}

impl FromStr for SubsetStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "random" => Ok(Self::Random { seed: None }),
            other => Err(format!("strategy has to be 'first' or 'random', got '{other}'")),
        }
    }
}

/// Return the row indices `subset` would keep.
///
/// Random sampling preserves model order among the chosen rows.
pub fn subset_indices(len: usize, n: usize, strategy: SubsetStrategy) -> Vec<usize> {
    if n > len {
        warn!("n ({n}) is larger than the vocabulary ({len}); keeping all tokens");
    }
    let n = n.min(len);

    match strategy {
        SubsetStrategy::First => (0..n).collect(),
        SubsetStrategy::Random { seed } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let mut indices = rand::seq::index::sample(&mut rng, len, n).into_vec();
            indices.sort_unstable();
            indices
        }
    }
}

/// Keep `n` tokens of `mapping`, useful for speeding up plots of large
/// vocabularies.
pub fn subset(mapping: &VocabularyMapping, n: usize, strategy: SubsetStrategy) -> VocabularyMapping {
    mapping.select_indices(&subset_indices(mapping.len(), n, strategy))
}
