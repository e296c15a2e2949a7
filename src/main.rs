use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use clap::{Args, Parser, Subcommand};
use energy_etl::{
    extract_nested, extract_tabular, pipeline, sample, DocumentFormat, LocalStorage,
    PipelineConfig,
};
use std::{fs, path::PathBuf, time::Instant};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Extract, reshape and load electricity sales and capability data"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline
    Run(RunArgs),
    /// Write the sample sales CSV and capability JSON
    Generate {
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print the first rows of a CSV, Parquet or JSON file
    Inspect {
        path: PathBuf,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Args)]
struct RunArgs {
    /// YAML file with any of the four paths below
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    sales_input: Option<PathBuf>,
    #[arg(long)]
    capability_input: Option<PathBuf>,
    #[arg(long)]
    sales_output: Option<PathBuf>,
    #[arg(long)]
    capability_output: Option<PathBuf>,
}

impl RunArgs {
    fn resolve(self) -> Result<PipelineConfig> {
        let mut cfg = match &self.config {
            Some(path) => PipelineConfig::from_yaml_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(p) = self.sales_input {
            cfg.sales_input = p;
        }
        if let Some(p) = self.capability_input {
            cfg.capability_input = p;
        }
        if let Some(p) = self.sales_output {
            cfg.sales_output = p;
        }
        if let Some(p) = self.capability_output {
            cfg.capability_output = p;
        }
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cli = Cli::parse();
    let storage = LocalStorage;

    match cli.command {
        Command::Run(args) => {
            let cfg = args.resolve()?;
            info!(?cfg, "starting pipeline");
            let start = Instant::now();

            let summary = pipeline::run(&storage, &cfg).context("pipeline failed")?;

            info!(elapsed = ?start.elapsed(), "all done");
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Generate { out_dir } => {
            fs::create_dir_all(&out_dir)
                .with_context(|| format!("creating {}", out_dir.display()))?;
            let (sales, cap) = sample::write_samples(&storage, &out_dir)?;
            println!("{}\n{}", sales.display(), cap.display());
        }

        Command::Inspect { path, limit } => {
            let batch = if DocumentFormat::from_path(&path).is_ok() {
                extract_nested(&storage, &path)?
            } else {
                extract_tabular(&storage, &path)?
            };

            let shown = batch.slice(0, limit.min(batch.num_rows()));
            println!("{}", pretty_format_batches(&[shown])?);
            println!(
                "{} rows x {} columns",
                batch.num_rows(),
                batch.num_columns()
            );
        }
    }

    Ok(())
}
