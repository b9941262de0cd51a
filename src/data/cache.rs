use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use log::debug;

use super::loader::{load_embeddings, EmbeddingFormat, EmbeddingSource, LoadOptions};
use super::model::VocabularyMapping;
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Source identity
// ---------------------------------------------------------------------------

/// Identity of a model file. A file rewritten in place gets a new key
/// because its length or modification time changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub path: PathBuf,
    pub format: Option<EmbeddingFormat>,
    pub len: u64,
    pub modified: Option<SystemTime>,
    /// Text models parse differently with multi-word tokens.
    pub spaced_tokens: bool,
}

impl SourceKey {
    pub fn for_file(path: &Path, format: Option<EmbeddingFormat>) -> Result<Self, LoadError> {
        let path = path
            .canonicalize()
            .map_err(|_| LoadError::NotFound(path.to_path_buf()))?;
        let meta = std::fs::metadata(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            format,
            len: meta.len(),
            modified: meta.modified().ok(),
            spaced_tokens: false,
        })
    }
}

// ---------------------------------------------------------------------------
// EmbeddingCache
// ---------------------------------------------------------------------------

/// Explicit cache of full (unfiltered) models.
///
/// Owned by the caller; nothing is cached unless the caller goes through
/// this type. Token filtering from [`LoadOptions`] is applied per call on
/// top of the cached model.
#[derive(Debug, Default)]
pub struct EmbeddingCache {
    entries: HashMap<SourceKey, Arc<VocabularyMapping>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached model for `path`, loading it on first use.
    pub fn get_or_load(
        &mut self,
        path: &Path,
        format: Option<EmbeddingFormat>,
    ) -> Result<Arc<VocabularyMapping>, LoadError> {
        self.fetch(SourceKey::for_file(path, format)?)
    }

    fn fetch(&mut self, key: SourceKey) -> Result<Arc<VocabularyMapping>, LoadError> {
        if let Some(hit) = self.entries.get(&key) {
            debug!("Embedding cache hit for {}", key.path.display());
            return Ok(Arc::clone(hit));
        }

        // Stale entries for the same path (older length/mtime) are dropped.
        self.entries.retain(|k, _| {
            k.path != key.path || k.format != key.format || k.spaced_tokens != key.spaced_tokens
        });

        let options = LoadOptions {
            spaced_tokens: key.spaced_tokens,
            ..LoadOptions::default()
        };
        let mapping = Arc::new(load_embeddings(
            EmbeddingSource::file(&key.path, key.format),
            &options,
        )?);
        self.entries.insert(key, Arc::clone(&mapping));
        Ok(mapping)
    }

    /// Load through the cache, then apply `limit`, `tokens` and `on_missing`.
    pub fn load(
        &mut self,
        path: &Path,
        format: Option<EmbeddingFormat>,
        options: &LoadOptions,
    ) -> Result<VocabularyMapping, LoadError> {
        let key = SourceKey {
            spaced_tokens: options.spaced_tokens,
            ..SourceKey::for_file(path, format)?
        };
        let full = self.fetch(key)?;
        if options.tokens.is_none() && options.limit.is_none() {
            return Ok(full.as_ref().clone());
        }
        let pairs: Vec<(String, Vec<f32>)> = full
            .iter()
            .map(|(t, v)| (t.to_string(), v.to_vec()))
            .collect();
        load_embeddings(pairs, options)
    }

    /// Drop every entry for `path`. Returns whether anything was removed.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let before = self.entries.len();
        self.entries.retain(|k, _| k.path != path);
        before != self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
