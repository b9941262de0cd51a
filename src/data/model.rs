use std::collections::HashMap;
use std::fmt;

use log::warn;
use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::LoadError;

// ---------------------------------------------------------------------------
// VocabularyMapping – the loaded embedding model
// ---------------------------------------------------------------------------

/// Token → vector mapping with one fixed dimensionality.
///
/// Rows of `vectors` follow `tokens` order, which is the order the source
/// listed them in. The mapping is never mutated after construction; derived
/// mappings are built with [`select`](Self::select) or
/// [`select_indices`](Self::select_indices).
#[derive(Debug, Clone)]
pub struct VocabularyMapping {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
    vectors: Array2<f32>,
}

impl VocabularyMapping {
    /// Build a mapping from `(token, vector)` pairs.
    ///
    /// Every vector must have the same length. Duplicate tokens keep their
    /// first occurrence.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        let mut tokens = Vec::new();
        let mut index = HashMap::new();
        let mut flat: Vec<f32> = Vec::new();
        let mut dim: Option<usize> = None;
        let mut duplicates = 0usize;

        for (token, vector) in pairs {
            let expected = *dim.get_or_insert(vector.len());
            if vector.len() != expected {
                return Err(LoadError::DimensionMismatch {
                    token,
                    expected,
                    found: vector.len(),
                });
            }
            if index.contains_key(&token) {
                duplicates += 1;
                continue;
            }
            index.insert(token.clone(), tokens.len());
            tokens.push(token);
            flat.extend_from_slice(&vector);
        }

        if duplicates > 0 {
            warn!("{duplicates} duplicate token(s) ignored, first occurrence kept");
        }

        let dim = dim.ok_or(LoadError::Empty)?;
        if dim == 0 {
            return Err(LoadError::Malformed {
                record: 0,
                reason: "vectors have zero dimensions".to_string(),
            });
        }
        let vectors = Array2::from_shape_vec((tokens.len(), dim), flat).map_err(|e| {
            LoadError::Malformed {
                record: 0,
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            tokens,
            index,
            vectors,
        })
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Shared vector dimensionality.
    pub fn dim(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The embedding matrix, one row per token.
    pub fn vectors(&self) -> ArrayView2<'_, f32> {
        self.vectors.view()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    pub fn position(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Vector for `token`, if present.
    pub fn get(&self, token: &str) -> Option<ArrayView1<'_, f32>> {
        self.position(token).map(|i| self.vectors.row(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ArrayView1<'_, f32>)> {
        self.tokens
            .iter()
            .zip(self.vectors.rows())
            .map(|(t, v)| (t.as_str(), v))
    }

    /// Sub-mapping with the rows at `indices`, in that order.
    ///
    /// Out-of-range and repeated indices are ignored.
    pub fn select_indices(&self, indices: &[usize]) -> Self {
        let mut seen = vec![false; self.len()];
        let kept: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.len() && !std::mem::replace(&mut seen[i], true))
            .collect();

        let tokens: Vec<String> = kept.iter().map(|&i| self.tokens[i].clone()).collect();
        let index = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        let vectors = self.vectors.select(ndarray::Axis(0), &kept);

        Self {
            tokens,
            index,
            vectors,
        }
    }

    /// Sub-mapping restricted to `tokens`, in the requested order.
    ///
    /// Returns the tokens that were not found alongside the mapping so the
    /// caller can apply its own missing-token policy.
    pub fn select<S: AsRef<str>>(&self, tokens: &[S]) -> (Self, Vec<String>) {
        let mut indices = Vec::with_capacity(tokens.len());
        let mut missing = Vec::new();
        for token in tokens {
            match self.position(token.as_ref()) {
                Some(i) => indices.push(i),
                None => missing.push(token.as_ref().to_string()),
            }
        }
        (self.select_indices(&indices), missing)
    }
}

impl fmt::Display for VocabularyMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tokens × {} dims", self.len(), self.dim())
    }
}
