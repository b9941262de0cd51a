/// Data layer: embedding model types, loading, subsetting and caching.
///
/// Architecture:
/// ```text
///  .txt / .vec / .bin / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → VocabularyMapping
///   └──────────┘
///        │
///        ▼
///   ┌───────────────────┐
///   │ VocabularyMapping │  tokens, token index, n × dim matrix
///   └───────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  subset   │  first / random n rows → smaller mapping
///   └──────────┘
/// ```
///
/// `cache` keeps loaded mappings alive across calls, keyed by file identity.

pub mod cache;
pub mod loader;
pub mod model;
pub mod subset;
