use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use arrow::array::{Float32Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

const TOPICS: [(&str, [&str; 10]); 5] = [
    (
        "animals",
        ["cat", "dog", "horse", "cow", "sheep", "wolf", "fox", "bear", "lion", "tiger"],
    ),
    (
        "fruits",
        ["apple", "pear", "plum", "cherry", "banana", "mango", "grape", "lemon", "peach", "melon"],
    ),
    (
        "countries",
        ["france", "spain", "italy", "germany", "japan", "china", "brazil", "canada", "india", "egypt"],
    ),
    (
        "colors",
        ["red", "green", "blue", "yellow", "purple", "orange", "black", "white", "pink", "brown"],
    ),
    (
        "tools",
        ["hammer", "saw", "drill", "wrench", "chisel", "pliers", "shovel", "rake", "axe", "file"],
    ),
];

/// Write a synthetic clustered word-vector model (word2vec text and Parquet).
#[derive(Parser)]
struct Args {
    /// Vector dimensionality.
    #[arg(long, default_value_t = 50)]
    dim: usize,
    /// Spread of words around their topic centre.
    #[arg(long, default_value_t = 0.3)]
    noise: f32,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let mut rows: Vec<(String, Vec<f32>)> = Vec::new();
    for (_, words) in TOPICS {
        let center: Vec<f32> = (0..args.dim)
            .map(|_| rng.sample::<f32, _>(StandardNormal))
            .collect();
        for word in words {
            let v = center
                .iter()
                .map(|c| c + args.noise * rng.sample::<f32, _>(StandardNormal))
                .collect();
            rows.push((word.to_string(), v));
        }
    }

    // word2vec text
    let text_path = args.out_dir.join("sample_vectors.txt");
    let file = std::fs::File::create(&text_path)
        .with_context(|| format!("Failed to create {}", text_path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{} {}", rows.len(), args.dim)?;
    for (token, v) in &rows {
        let values: Vec<String> = v.iter().map(|x| format!("{x:.5}")).collect();
        writeln!(out, "{token} {}", values.join(" "))?;
    }
    out.flush()?;

    // Parquet: token + vector list column
    let mut vector_builder = ListBuilder::new(Float32Builder::new());
    for (_, v) in &rows {
        vector_builder.values().append_slice(v);
        vector_builder.append(true);
    }
    let tokens = StringArray::from(rows.iter().map(|(t, _)| t.as_str()).collect::<Vec<_>>());

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
        vec![Arc::new(tokens), Arc::new(vector_builder.finish())],
    )
    .context("Failed to create RecordBatch")?;

    let parquet_path = args.out_dir.join("sample_vectors.parquet");
    let file = std::fs::File::create(&parquet_path)
        .with_context(|| format!("Failed to create {}", parquet_path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("Failed to create writer")?;
    writer.write(&batch).context("Failed to write batch")?;
    writer.close().context("Failed to close writer")?;

    println!(
        "Wrote {} words ({} topics, {} dims) to {} and {}",
        rows.len(),
        TOPICS.len(),
        args.dim,
        text_path.display(),
        parquet_path.display()
    );
    Ok(())
}
