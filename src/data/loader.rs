use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{
    Array, AsArray, FixedSizeListArray, Float32Array, Float64Array, LargeListArray, ListArray,
};
use arrow::datatypes::DataType;
use log::{debug, info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::model::VocabularyMapping;
use crate::error::LoadError;

type Pairs = Vec<(String, Vec<f32>)>;

// ---------------------------------------------------------------------------
// Source description and options
// ---------------------------------------------------------------------------

/// On-disk embedding formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingFormat {
    /// word2vec text: optional `count dim` header, then `token v1 v2 ...`.
    Word2Vec,
    /// word2vec binary: `count dim\n`, then `token<space>` + `dim` LE f32.
    Word2VecBinary,
    /// GloVe text: like word2vec text without a header.
    Glove,
    /// fastText `.vec` text export. Native `.bin` models are not supported.
    FastText,
    /// `[{"token": .., "vector": [..]}, ..]` or `{"token": [..], ..}`.
    Json,
    /// Parquet with a `token` string column and a `vector` list column.
    Parquet,
}

impl FromStr for EmbeddingFormat {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "word2vec" | "w2v" => Ok(Self::Word2Vec),
            "word2vec-bin" | "word2vecbinary" | "bin" => Ok(Self::Word2VecBinary),
            "glove" => Ok(Self::Glove),
            "fasttext" => Ok(Self::FastText),
            "json" => Ok(Self::Json),
            "parquet" | "pq" => Ok(Self::Parquet),
            other => Err(LoadError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for EmbeddingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Word2Vec => "word2vec",
            Self::Word2VecBinary => "word2vec-bin",
            Self::Glove => "glove",
            Self::FastText => "fasttext",
            Self::Json => "json",
            Self::Parquet => "parquet",
        };
        f.write_str(name)
    }
}

/// What to do with requested tokens the model does not contain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Drop them and log a warning.
    Skip,
    /// Fail with [`LoadError::MissingTokens`].
    #[default]
    Error,
}

impl FromStr for MissingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown missing-token policy '{other}' (skip|error)")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Keep only these tokens, in this order.
    pub tokens: Option<Vec<String>>,
    pub on_missing: MissingPolicy,
    /// Read at most this many vectors from the source.
    pub limit: Option<usize>,
    /// Text formats: treat every field before the last `dim` values as part
    /// of the token (`new york 0.1 0.2`). Off by default, so rows with extra
    /// fields are malformed.
    pub spaced_tokens: bool,
}

/// Where a model comes from.
#[derive(Debug, Clone)]
pub enum EmbeddingSource {
    File {
        path: PathBuf,
        /// Inferred from the extension when `None`.
        format: Option<EmbeddingFormat>,
    },
    Pairs(Pairs),
}

impl EmbeddingSource {
    pub fn file(path: impl Into<PathBuf>, format: Option<EmbeddingFormat>) -> Self {
        Self::File {
            path: path.into(),
            format,
        }
    }
}

impl From<&Path> for EmbeddingSource {
    fn from(path: &Path) -> Self {
        Self::file(path, None)
    }
}

impl From<&str> for EmbeddingSource {
    fn from(path: &str) -> Self {
        Self::file(path, None)
    }
}

impl From<PathBuf> for EmbeddingSource {
    fn from(path: PathBuf) -> Self {
        Self::file(path, None)
    }
}

impl From<Pairs> for EmbeddingSource {
    fn from(pairs: Pairs) -> Self {
        Self::Pairs(pairs)
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an embedding model into a [`VocabularyMapping`].
///
/// Supported formats:
/// * `.txt` – word2vec text (header sniffed) or GloVe
/// * `.vec` – fastText / word2vec text
/// * `.bin` – word2vec binary
/// * `.json` – records or token → vector object
/// * `.parquet` – `token` + `vector` columns
pub fn load_embeddings(
    source: impl Into<EmbeddingSource>,
    options: &LoadOptions,
) -> Result<VocabularyMapping, LoadError> {
    let mapping = match source.into() {
        EmbeddingSource::Pairs(mut pairs) => {
            if let Some(limit) = options.limit {
                pairs.truncate(limit);
            }
            VocabularyMapping::from_pairs(pairs)?
        }
        EmbeddingSource::File { path, format } => {
            let format = resolve_format(&path, format)?;
            debug!("Loading {} as {format}", path.display());
            let pairs = match format {
                EmbeddingFormat::Word2Vec | EmbeddingFormat::Glove | EmbeddingFormat::FastText => {
                    load_text(&path, options.limit, options.spaced_tokens)?
                }
                EmbeddingFormat::Word2VecBinary => load_word2vec_binary(&path, options.limit)?,
                EmbeddingFormat::Json => load_json(&path, options.limit)?,
                EmbeddingFormat::Parquet => load_parquet(&path, options.limit)?,
            };
            let mapping = VocabularyMapping::from_pairs(pairs)?;
            info!("Embedding loaded from {}: {mapping}", path.display());
            mapping
        }
    };

    apply_token_filter(mapping, options)
}

fn apply_token_filter(
    mapping: VocabularyMapping,
    options: &LoadOptions,
) -> Result<VocabularyMapping, LoadError> {
    let Some(wanted) = &options.tokens else {
        return Ok(mapping);
    };

    let mut seen = HashSet::new();
    let wanted: Vec<&str> = wanted
        .iter()
        .map(String::as_str)
        .filter(|t| seen.insert(*t))
        .collect();

    let (subset, missing) = mapping.select(&wanted);
    if !missing.is_empty() {
        match options.on_missing {
            MissingPolicy::Error => return Err(LoadError::MissingTokens(missing)),
            MissingPolicy::Skip => warn!(
                "Skipping {} token(s) not in vocabulary: {}",
                missing.len(),
                missing.join(", ")
            ),
        }
    }
    Ok(subset)
}

/// Pick the concrete format from an explicit choice and the file extension.
fn resolve_format(
    path: &Path,
    explicit: Option<EmbeddingFormat>,
) -> Result<EmbeddingFormat, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match (explicit, ext.as_str()) {
        (Some(EmbeddingFormat::FastText), "bin") => Err(LoadError::UnsupportedFormat(
            "native fastText .bin models (export to .vec first)".to_string(),
        )),
        (Some(EmbeddingFormat::Word2Vec), "bin") => Ok(EmbeddingFormat::Word2VecBinary),
        (Some(format), _) => Ok(format),
        (None, "txt") => Ok(EmbeddingFormat::Word2Vec),
        (None, "vec") => Ok(EmbeddingFormat::FastText),
        (None, "bin") => Ok(EmbeddingFormat::Word2VecBinary),
        (None, "json") => Ok(EmbeddingFormat::Json),
        (None, "parquet" | "pq") => Ok(EmbeddingFormat::Parquet),
        (None, other) => Err(LoadError::UnsupportedFormat(format!(
            "extension .{other} (valid: .txt, .vec, .bin, .json, .parquet)"
        ))),
    }
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Text loader (word2vec / GloVe / fastText .vec)
// ---------------------------------------------------------------------------

/// Space-separated text. A first line of exactly two integers is a
/// `count dim` header; without one the dimension comes from the first row.
/// Every row must hold a token and `dim` values, unless `spaced_tokens` lets
/// the token absorb the leading fields.
fn load_text(path: &Path, limit: Option<usize>, spaced_tokens: bool) -> Result<Pairs, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(BufReader::new(open(path)?));

    let mut declared: Option<(usize, usize)> = None;
    let mut dim: Option<usize> = None;
    let mut pairs = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        if limit.is_some_and(|l| pairs.len() >= l) {
            break;
        }
        let record = result.map_err(|e| LoadError::Malformed {
            record: row_no,
            reason: e.to_string(),
        })?;
        let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();
        if fields.is_empty() {
            continue;
        }

        if row_no == 0 && fields.len() == 2 {
            if let (Ok(count), Ok(d)) = (fields[0].parse::<usize>(), fields[1].parse::<usize>()) {
                declared = Some((count, d));
                dim = Some(d);
                continue;
            }
        }

        let d = *dim.get_or_insert(fields.len().saturating_sub(1));
        let fits = if spaced_tokens {
            fields.len() > d
        } else {
            fields.len() == d + 1
        };
        if d == 0 || !fits {
            return Err(LoadError::Malformed {
                record: row_no,
                reason: format!("expected a token and {d} values, got {} fields", fields.len()),
            });
        }

        let split = fields.len() - d;
        let token = fields[..split].join(" ");
        let vector = fields[split..]
            .iter()
            .enumerate()
            .map(|(j, tok)| {
                tok.parse::<f32>().map_err(|_| LoadError::Malformed {
                    record: row_no,
                    reason: format!("value {j} of '{token}' is not a number: '{tok}'"),
                })
            })
            .collect::<Result<Vec<f32>, _>>()?;

        pairs.push((token, vector));
    }

    if let Some((count, _)) = declared {
        if limit.is_none() && count != pairs.len() {
            warn!(
                "{}: header declares {count} vectors but {} were read",
                path.display(),
                pairs.len()
            );
        }
    }

    Ok(pairs)
}

// ---------------------------------------------------------------------------
// word2vec binary loader
// ---------------------------------------------------------------------------

fn load_word2vec_binary(path: &Path, limit: Option<usize>) -> Result<Pairs, LoadError> {
    let io_err = |source: std::io::Error| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = open(path)?;
    let file_len = file.metadata().map_err(io_err)?.len();
    let mut reader = BufReader::new(file);

    let mut header = String::new();
    reader.read_line(&mut header).map_err(io_err)?;
    let mut parts = header.split_whitespace().map(str::parse::<usize>);
    let (count, dim) = match (parts.next(), parts.next()) {
        (Some(Ok(count)), Some(Ok(dim))) if dim > 0 => (count, dim),
        _ => {
            return Err(LoadError::Malformed {
                record: 0,
                reason: format!("invalid binary header '{}'", header.trim()),
            })
        }
    };

    // Header values are untrusted: size buffers from the file, not from them.
    let vector_bytes = dim
        .checked_mul(4)
        .filter(|&b| b as u64 <= file_len)
        .ok_or_else(|| LoadError::Malformed {
            record: 0,
            reason: format!("header dimension {dim} exceeds the file size ({file_len} bytes)"),
        })?;
    let n = limit.map_or(count, |l| l.min(count));
    let max_records = usize::try_from(file_len / (vector_bytes as u64 + 2)).unwrap_or(usize::MAX);
    let mut pairs = Vec::with_capacity(n.min(max_records));
    let mut buf = vec![0u8; vector_bytes];

    for i in 0..n {
        let token = read_binary_token(&mut reader, i)?;
        reader.read_exact(&mut buf).map_err(|e| LoadError::Malformed {
            record: i + 1,
            reason: format!("truncated vector for '{token}': {e}"),
        })?;
        let vector = buf
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        pairs.push((token, vector));
    }

    Ok(pairs)
}

/// Read bytes up to the next space, skipping the newline some writers put
/// after each vector.
fn read_binary_token<R: Read>(reader: &mut R, index: usize) -> Result<String, LoadError> {
    let mut bytes = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        reader.read_exact(&mut byte).map_err(|e| LoadError::Malformed {
            record: index + 1,
            reason: format!("unexpected end of file while reading token: {e}"),
        })?;
        match byte[0] {
            b' ' => break,
            b'\n' if bytes.is_empty() => continue,
            b => bytes.push(b),
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Two accepted layouts:
///
/// ```json
/// [ { "token": "cat", "vector": [0.1, 0.2] }, ... ]
/// { "cat": [0.1, 0.2], ... }
/// ```
///
/// The object layout is read in file order.
fn load_json(path: &Path, limit: Option<usize>) -> Result<Pairs, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: JsonValue = serde_json::from_str(&text).map_err(|e| LoadError::Malformed {
        record: 0,
        reason: format!("parsing JSON: {e}"),
    })?;
    let limit = limit.unwrap_or(usize::MAX);

    match root {
        JsonValue::Array(records) => records
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, rec)| {
                let token = rec
                    .get("token")
                    .and_then(JsonValue::as_str)
                    .ok_or_else(|| LoadError::Malformed {
                        record: i,
                        reason: "missing string 'token'".to_string(),
                    })?;
                let vector = json_array_to_f32(rec.get("vector"), i)?;
                Ok((token.to_string(), vector))
            })
            .collect(),
        JsonValue::Object(map) => map
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, (token, val))| Ok((token.clone(), json_array_to_f32(Some(val), i)?)))
            .collect(),
        _ => Err(LoadError::Malformed {
            record: 0,
            reason: "expected a top-level JSON array or object".to_string(),
        }),
    }
}

fn json_array_to_f32(val: Option<&JsonValue>, record: usize) -> Result<Vec<f32>, LoadError> {
    let arr = val
        .and_then(JsonValue::as_array)
        .ok_or_else(|| LoadError::Malformed {
            record,
            reason: "missing or invalid vector array".to_string(),
        })?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| LoadError::Malformed {
                record,
                reason: format!("vector[{j}] is not a number"),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Expected schema:
/// - `token`: Utf8 or LargeUtf8
/// - `vector`: List, LargeList or FixedSizeList of Float32/Float64
///
/// Other columns are ignored.
fn load_parquet(path: &Path, limit: Option<usize>) -> Result<Pairs, LoadError> {
    let malformed = |reason: String| LoadError::Malformed { record: 0, reason };

    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)
        .map_err(|e| malformed(format!("reading parquet metadata: {e}")))?;
    let reader = builder
        .build()
        .map_err(|e| malformed(format!("building parquet reader: {e}")))?;

    let limit = limit.unwrap_or(usize::MAX);
    let mut pairs = Vec::new();

    'batches: for batch_result in reader {
        let batch = batch_result.map_err(|e| malformed(format!("reading record batch: {e}")))?;
        let schema = batch.schema();

        let token_idx = schema
            .index_of("token")
            .map_err(|_| malformed("parquet file missing 'token' column".to_string()))?;
        let vector_idx = schema
            .index_of("vector")
            .map_err(|_| malformed("parquet file missing 'vector' column".to_string()))?;

        let token_col = batch.column(token_idx);
        let vector_col = batch.column(vector_idx);

        for row in 0..batch.num_rows() {
            if pairs.len() >= limit {
                break 'batches;
            }
            let record = pairs.len();
            let token = extract_token(token_col, row).ok_or_else(|| LoadError::Malformed {
                record,
                reason: "null or non-string token".to_string(),
            })?;
            let vector = extract_f32_list(vector_col, row).map_err(|reason| {
                LoadError::Malformed {
                    record,
                    reason: format!("'{token}': {reason}"),
                }
            })?;
            pairs.push((token, vector));
        }
    }

    Ok(pairs)
}

fn extract_token(col: &Arc<dyn Array>, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 => Some(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Some(col.as_string::<i64>().value(row).to_string()),
        _ => None,
    }
}

/// Extract a `Vec<f32>` from a list column at the given row.
fn extract_f32_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f32>, String> {
    if col.is_null(row) {
        return Err("null vector".to_string());
    }

    let values_array = match col.data_type() {
        DataType::List(_) => col
            .as_any()
            .downcast_ref::<ListArray>()
            .ok_or("expected ListArray")?
            .value(row),
        DataType::LargeList(_) => col
            .as_any()
            .downcast_ref::<LargeListArray>()
            .ok_or("expected LargeListArray")?
            .value(row),
        DataType::FixedSizeList(_, _) => col
            .as_any()
            .downcast_ref::<FixedSizeListArray>()
            .ok_or("expected FixedSizeListArray")?
            .value(row),
        other => return Err(format!("expected a list column, got {other:?}")),
    };

    if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN)).collect())
    } else if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN) as f32).collect())
    } else {
        Err(format!(
            "list inner type is {:?}, expected Float32 or Float64",
            values_array.data_type()
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use arrow::array::{Float32Builder, ListBuilder, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use tempfile::TempDir;

    use super::*;

    fn write(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        path
    }

    fn load(path: &Path) -> Result<VocabularyMapping, LoadError> {
        load_embeddings(path, &LoadOptions::default())
    }

    #[test]
    fn word2vec_text_with_header() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "m.txt", b"2 3\ncat 1 0 0\ndog 0 1 0.5\n");
        let m = load(&path).unwrap();
        assert_eq!(m.tokens(), &["cat", "dog"]);
        assert_eq!(m.dim(), 3);
        assert_eq!(m.get("dog").unwrap().to_vec(), vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn glove_text_without_header_and_trailing_spaces() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "g.txt", b"the 0.1 0.2 \nof 0.3 0.4 \n");
        let m = load_embeddings(
            EmbeddingSource::file(&path, Some(EmbeddingFormat::Glove)),
            &LoadOptions::default(),
        )
        .unwrap();
        assert_eq!(m.tokens(), &["the", "of"]);
        assert_eq!(m.dim(), 2);
    }

    #[test]
    fn tokens_with_spaces_take_leading_fields() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "s.vec", b"2 2\nnew york 1 2\nparis 3 4\n");
        let opts = LoadOptions {
            spaced_tokens: true,
            ..Default::default()
        };
        let m = load_embeddings(path.as_path(), &opts).unwrap();
        assert!(m.contains("new york"));
        assert_eq!(m.get("paris").unwrap().to_vec(), vec![3.0, 4.0]);

        assert!(matches!(load(&path), Err(LoadError::Malformed { record: 1, .. })));
    }

    #[test]
    fn long_text_rows_are_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "l.txt", b"a 1 2\nb 3 4 5\n");
        assert!(matches!(load(&path), Err(LoadError::Malformed { record: 1, .. })));
    }

    #[test]
    fn ragged_text_rows_are_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "r.txt", b"a 1 2 3\nb 1\n");
        assert!(matches!(load(&path), Err(LoadError::Malformed { record: 1, .. })));
    }

    #[test]
    fn non_numeric_value_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "n.txt", b"a 1 x\n");
        assert!(matches!(load(&path), Err(LoadError::Malformed { .. })));
    }

    #[test]
    fn word2vec_binary_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut bytes = b"2 2\n".to_vec();
        for (token, v) in [("cat", [1.0f32, 2.0]), ("dog", [3.0, 4.0])] {
            bytes.extend_from_slice(token.as_bytes());
            bytes.push(b' ');
            for x in v {
                bytes.extend_from_slice(&x.to_le_bytes());
            }
            bytes.push(b'\n');
        }
        let path = write(&dir, "m.bin", &bytes);
        let m = load(&path).unwrap();
        assert_eq!(m.tokens(), &["cat", "dog"]);
        assert_eq!(m.get("dog").unwrap().to_vec(), vec![3.0, 4.0]);
    }

    #[test]
    fn truncated_binary_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.bin", b"1 4\ncat \x00\x00");
        assert!(matches!(load(&path), Err(LoadError::Malformed { .. })));
    }

    #[test]
    fn oversized_binary_header_is_malformed() {
        let dir = TempDir::new().unwrap();
        let huge_count = write(&dir, "c.bin", b"1000000000000000000 2\ncat \x00\x00\x00\x00");
        assert!(matches!(load(&huge_count), Err(LoadError::Malformed { .. })));

        let huge_dim = write(&dir, "d.bin", b"1 1000000\ncat \x00");
        assert!(matches!(load(&huge_dim), Err(LoadError::Malformed { record: 0, .. })));

        let overflowing_dim = write(&dir, "o.bin", b"1 18446744073709551615\ncat \x00");
        assert!(matches!(load(&overflowing_dim), Err(LoadError::Malformed { record: 0, .. })));
    }

    #[test]
    fn fasttext_native_bin_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "cc.it.300.bin", b"\x00");
        let err = load_embeddings(
            EmbeddingSource::file(&path, Some(EmbeddingFormat::FastText)),
            &LoadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(_)));
    }

    #[test]
    fn json_records_and_object() {
        let dir = TempDir::new().unwrap();
        let records = write(
            &dir,
            "r.json",
            br#"[{"token":"b","vector":[1,2]},{"token":"a","vector":[3,4]}]"#,
        );
        assert_eq!(load(&records).unwrap().tokens(), &["b", "a"]);

        let object = write(&dir, "o.json", br#"{"x":[1.5,2.5],"y":[0,1]}"#);
        let m = load(&object).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.get("x").unwrap().to_vec(), vec![1.5, 2.5]);
    }

    #[test]
    fn json_object_keeps_file_order() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "z.json",
            br#"{"zebra":[1,0],"apple":[0,1],"mango":[1,1]}"#,
        );
        assert_eq!(load(&path).unwrap().tokens(), &["zebra", "apple", "mango"]);

        let opts = LoadOptions {
            limit: Some(1),
            ..Default::default()
        };
        assert_eq!(load_embeddings(path.as_path(), &opts).unwrap().tokens(), &["zebra"]);
    }

    #[test]
    fn parquet_token_and_vector_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.parquet");

        let mut vectors = ListBuilder::new(Float32Builder::new());
        for row in [[1.0f32, 0.0], [0.0, 1.0]] {
            vectors.values().append_slice(&row);
            vectors.append(true);
        }
        let schema = Arc::new(Schema::new(vec![
            Field::new("token", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::List(Arc::new(Field::new("item", DataType::Float32, true))),
                false,
            ),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["up", "down"])),
                Arc::new(vectors.finish()),
            ],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let m = load(&path).unwrap();
        assert_eq!(m.tokens(), &["up", "down"]);
        assert_eq!(m.get("down").unwrap().to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn missing_file_and_bad_extension() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load(&dir.path().join("nope.txt")),
            Err(LoadError::NotFound(_))
        ));
        let path = write(&dir, "m.csv", b"a 1\n");
        assert!(matches!(load(&path), Err(LoadError::UnsupportedFormat(_))));
    }

    #[test]
    fn limit_reads_first_vectors_only() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "m.txt", b"3 1\na 1\nb 2\nc 3\n");
        let opts = LoadOptions {
            limit: Some(2),
            ..Default::default()
        };
        assert_eq!(load_embeddings(path.as_path(), &opts).unwrap().tokens(), &["a", "b"]);
    }

    #[test]
    fn missing_tokens_follow_policy() {
        let pairs = vec![
            ("a".to_string(), vec![1.0, 0.0]),
            ("b".to_string(), vec![0.0, 1.0]),
        ];
        let mut opts = LoadOptions {
            tokens: Some(vec!["b".into(), "zzz".into(), "b".into()]),
            ..Default::default()
        };

        let err = load_embeddings(pairs.clone(), &opts).unwrap_err();
        assert!(matches!(err, LoadError::MissingTokens(ref t) if t == &["zzz".to_string()]));

        opts.on_missing = MissingPolicy::Skip;
        let m = load_embeddings(pairs, &opts).unwrap();
        assert_eq!(m.tokens(), &["b"]);
    }

    #[test]
    fn parses_format_and_policy_names() {
        assert_eq!("GloVe".parse::<EmbeddingFormat>().unwrap(), EmbeddingFormat::Glove);
        assert!("gensim".parse::<EmbeddingFormat>().is_err());
        assert_eq!("skip".parse::<MissingPolicy>().unwrap(), MissingPolicy::Skip);
    }
}
