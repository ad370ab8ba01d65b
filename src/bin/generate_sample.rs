use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Dirichlet;

use vector_lda::data::model::Dataset;
use vector_lda::data::writer;

/// Generate a synthetic term-count corpus with planted topics.
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
struct Args {
    /// Output stem; writes <stem>.txt and <stem>.parquet
    #[arg(long, default_value = "sample_lda_data")]
    output: PathBuf,

    /// Number of documents
    #[arg(long, default_value_t = 200)]
    documents: usize,

    /// Number of planted topics
    #[arg(long, default_value_t = 3)]
    topics: usize,

    /// Terms per topic; the vocabulary is topics × this
    #[arg(long, default_value_t = 8)]
    terms_per_topic: usize,

    /// Tokens per document
    #[arg(long, default_value_t = 60)]
    doc_length: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Each topic puts most of its mass on its own block of terms and a little
/// on the rest.
fn planted_topics(topics: usize, terms_per_topic: usize) -> Vec<Vec<f64>> {
    let vocab = topics * terms_per_topic;
    (0..topics)
        .map(|t| {
            (0..vocab)
                .map(|w| if w / terms_per_topic == t { 1.0 } else { 0.02 })
                .collect()
        })
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();
    anyhow::ensure!(args.topics >= 2, "--topics must be at least 2");
    anyhow::ensure!(args.terms_per_topic >= 1, "--terms-per-topic must be positive");

    let mut rng = StdRng::seed_from_u64(args.seed);
    let topic_terms = planted_topics(args.topics, args.terms_per_topic)
        .iter()
        .map(|weights| WeightedIndex::new(weights))
        .collect::<Result<Vec<_>, _>>()
        .context("building topic distributions")?;
    let mixture = Dirichlet::new_with_size(0.3, args.topics).context("building topic prior")?;
    let vocab = args.topics * args.terms_per_topic;

    let mut rows = Vec::with_capacity(args.documents);
    for _ in 0..args.documents {
        let theta = WeightedIndex::new(mixture.sample(&mut rng))
            .context("sampling document mixture")?;
        let mut counts = vec![0.0; vocab];
        for _ in 0..args.doc_length {
            let topic = theta.sample(&mut rng);
            counts[topic_terms[topic].sample(&mut rng)] += 1.0;
        }
        rows.push(counts);
    }

    let dataset = Dataset::from_rows(rows).context("building dataset")?;
    let text_path = args.output.with_extension("txt");
    let parquet_path = args.output.with_extension("parquet");
    writer::write_text(&dataset, &text_path)?;
    writer::write_parquet(&dataset, &parquet_path)?;

    println!(
        "Wrote {} documents ({} terms, {} planted topics) to {} and {}",
        dataset.len(),
        vocab,
        args.topics,
        text_path.display(),
        parquet_path.display()
    );
    Ok(())
}
