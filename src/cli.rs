use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use clap::error::ErrorKind;
use log::info;

use crate::data::loader;
use crate::lda::{Lda, LdaParams, Optimizer};
use crate::report::{self, TrainingSummary};
use crate::session::Session;

pub const USAGE: &str = "Usage: vector-lda <file> <k>";

/// Train an LDA topic model on a file of space-separated term-count vectors
/// and print log-likelihood, log-perplexity and the top terms per topic.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "vector-lda", version)]
pub struct Args {
    /// Input file: one vector of space-separated numbers per line
    /// (.parquet and .json are also accepted)
    pub file: PathBuf,

    /// Number of topics
    pub k: usize,

    /// Training iterations (default 10)
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Terms shown per topic
    #[arg(long, default_value_t = 3)]
    pub max_terms: usize,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Inference algorithm: online or gibbs
    #[arg(long)]
    pub optimizer: Option<Optimizer>,

    /// JSON file with LDA parameters; flags and <k> override it
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Worker threads (default: one per core)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Also print each row's topic distribution
    #[arg(long)]
    pub show_distributions: bool,
}

/// Outcome of argument parsing that ends the program early.
#[derive(Debug)]
pub enum Exit {
    /// `--help` / `--version`: print the message, exit 0.
    Info(String),
    /// Wrong arguments: print [`USAGE`], exit 1.
    Usage(String),
}

pub fn parse_args<I, T>(args: I) -> Result<Args, Exit>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(args).map_err(|e| match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Exit::Info(e.to_string()),
        _ => Exit::Usage(e.to_string()),
    })
}

impl Args {
    /// Defaults ← params file ← flags ← positional `k`.
    pub fn lda_params(&self) -> Result<LdaParams> {
        let mut params = match &self.params {
            Some(path) => LdaParams::from_json_file(path)?,
            None => LdaParams::default(),
        };
        params.k = self.k;
        if let Some(max_iter) = self.max_iter {
            params.max_iter = max_iter;
        }
        if let Some(seed) = self.seed {
            params.seed = seed;
        }
        if let Some(optimizer) = self.optimizer {
            params.optimizer = optimizer;
        }
        Ok(params)
    }
}

/// Load, train, report.
pub fn run(args: &Args) -> Result<()> {
    let params = args.lda_params()?;
    let session = Session::builder()
        .app_name("VectorLdaExample")
        .num_threads(args.threads)
        .build()?;

    let dataset = loader::load_file(&session, &args.file)
        .with_context(|| format!("loading {}", args.file.display()))?;

    let model = session.install(|| Lda::new(params).fit(&dataset))?;
    let (log_likelihood, log_perplexity) = session.install(|| {
        Ok::<_, anyhow::Error>((model.log_likelihood(&dataset)?, model.log_perplexity(&dataset)?))
    })?;
    info!("log likelihood {log_likelihood}, log perplexity {log_perplexity}");

    let summary = TrainingSummary {
        k: model.k(),
        vocab_size: model.vocab_size(),
        documents: dataset.len(),
        log_likelihood,
        log_perplexity,
        topics: model.describe_topics(args.max_terms),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        report::write_json(&mut out, &summary)?;
    } else {
        let topics = model.describe_topics_frame(args.max_terms)?;
        report::write_text(&mut out, &summary, &topics)?;
    }
    if args.show_distributions {
        let transformed = session.install(|| model.transform(&dataset))?;
        report::write_table(&mut out, &transformed)?;
    }
    out.flush()?;

    session.stop();
    Ok(())
}
