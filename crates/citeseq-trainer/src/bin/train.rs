//! Train a reference parser from an XML corpus, or a reference finder from a
//! directory of `.ttx` documents, and save the model.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use citeseq_core::{Dataset, FeatureSet};
use citeseq_trainer::{TrainConfig, Trainer};
use clap::Parser;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Train a citeseq parser or finder model")]
#[command(version)]
struct Cli {
    /// XML corpus (parser) or directory of .ttx files (finder)
    input: PathBuf,

    /// Where to write the model
    output: PathBuf,

    /// Replace the output file if it exists
    #[arg(long)]
    overwrite: bool,

    /// Also log per-pass metrics and the label alphabet
    #[arg(short, long)]
    verbose: bool,

    /// JSON training configuration
    #[arg(short, long, env = "CITESEQ_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum passes over the corpus
    #[arg(long, env = "CITESEQ_MAX_ITERATIONS")]
    max_iterations: Option<usize>,

    /// Stop once a pass updates at most this much
    #[arg(long, env = "CITESEQ_CONVERGENCE_THRESHOLD")]
    convergence_threshold: Option<f64>,

    /// L2 shrink applied at the end of every pass
    #[arg(long, env = "CITESEQ_REGULARIZATION")]
    regularization: Option<f64>,

    /// Shuffle seed
    #[arg(long, env = "CITESEQ_SEED")]
    seed: Option<u64>,

    /// Keep the final weights instead of averaging
    #[arg(long)]
    no_average: bool,
}

impl Cli {
    fn train_config(&self) -> Result<TrainConfig> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::from_json_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => TrainConfig::default(),
        };
        if let Some(n) = self.max_iterations {
            config = config.with_max_iterations(n);
        }
        if let Some(t) = self.convergence_threshold {
            config = config.with_convergence_threshold(t);
        }
        if let Some(r) = self.regularization {
            config = config.with_regularization(r);
        }
        if self.seed.is_some() {
            config = config.with_seed(self.seed);
        }
        if self.no_average {
            config = config.with_averaging(false);
        }
        Ok(config)
    }

    fn log_level(&self) -> Level {
        if self.verbose { Level::DEBUG } else { Level::INFO }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt().with_max_level(cli.log_level()).init();

    if !cli.overwrite && cli.output.exists() {
        bail!(
            "file exists, use --overwrite to force saving: {}",
            cli.output.display()
        );
    }

    let (dataset, feature_set) = if cli.input.extension().is_some_and(|e| e == "xml") {
        let dataset = Dataset::open_xml(&cli.input)
            .with_context(|| format!("reading {}", cli.input.display()))?;
        (dataset, FeatureSet::reference())
    } else if cli.input.is_dir() {
        let dataset = Dataset::open_ttx_dir(&cli.input)
            .with_context(|| format!("reading {}", cli.input.display()))?;
        (dataset, FeatureSet::document())
    } else {
        bail!("cannot train input: {}", cli.input.display());
    };

    let config = cli.train_config()?;
    let (model, report) = Trainer::new(config)
        .train_with_report(&dataset, feature_set)
        .context("training failed")?;
    info!(
        iterations = report.iterations,
        converged = report.converged,
        labels = report.num_labels,
        features = report.num_features,
        "training finished"
    );

    model
        .save(&cli.output, cli.overwrite)
        .with_context(|| format!("saving {}", cli.output.display()))?;
    Ok(())
}
