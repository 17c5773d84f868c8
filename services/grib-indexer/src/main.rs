//! GRIB2 coordinate indexer.
//!
//! Builds, updates, inspects and queries coordinate indexes of GRIB2 files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coord_index::DuplicatePolicy;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use grib_indexer::config::split_list;
use grib_indexer::{build_index, describe, lookup_values, update_index, IndexDocument, IndexerConfig};

#[derive(Parser, Debug)]
#[command(name = "grib-indexer")]
#[command(about = "Build and query coordinate indexes of GRIB2 files")]
struct Args {
    /// Configuration file path (YAML); environment defaults otherwise
    #[arg(short, long, global = true, env = "INDEXER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index GRIB2 files and directories
    Build {
        /// Files or directories to index
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Index document to write
        #[arg(short, long, default_value = "index.json")]
        output: PathBuf,

        /// Comma-separated dimensions (e.g. "runtime,time,vertical:100:desc")
        #[arg(short, long)]
        dims: Option<String>,

        /// Only index this parameter (e.g. TMP)
        #[arg(short, long)]
        parameter: Option<String>,

        /// Duplicate policy: last-wins or first-wins
        #[arg(long)]
        policy: Option<String>,

        /// Accumulate dimensions in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Add files to an existing index
    Update {
        /// Index document to extend in place
        index: PathBuf,

        /// Files or directories to add
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Print the axes and fill of an index
    Inspect {
        index: PathBuf,
    },

    /// Find the records at one coordinate tuple
    Lookup {
        index: PathBuf,

        /// One `name=value` per dimension (e.g. --value time=24 --value vertical=100:50000)
        #[arg(long = "value", required = true)]
        values: Vec<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<IndexerConfig> {
    let config = match path {
        Some(path) => IndexerConfig::from_yaml(path)?,
        None => IndexerConfig::from_env(),
    };
    config.validate()?;
    Ok(config)
}

fn load_document(path: &Path) -> Result<IndexDocument> {
    IndexDocument::load(path).with_context(|| format!("Failed to load index {:?}", path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Build {
            paths,
            output,
            dims,
            parameter,
            policy,
            parallel,
        } => {
            if let Some(dims) = dims {
                config.dimensions = split_list(&dims);
            }
            if parameter.is_some() {
                config.parameter = parameter;
            }
            if let Some(policy) = policy {
                config.index.duplicate_policy = DuplicatePolicy::parse(&policy)
                    .with_context(|| format!("Unknown duplicate policy '{}'", policy))?;
            }
            if parallel {
                config.index.parallel = true;
            }

            info!(dimensions = ?config.dimensions, paths = paths.len(), "Building index");
            let (document, _) = build_index(&paths, &config).await?;
            document
                .save(&output)
                .with_context(|| format!("Failed to write index {:?}", output))?;
            info!(output = %output.display(), report = %document.report, "Index written");
        }

        Command::Update { index, paths } => {
            let document = load_document(&index)?;
            let (updated, _) = update_index(&document, &paths, &config).await?;
            updated
                .save(&index)
                .with_context(|| format!("Failed to write index {:?}", index))?;
            info!(output = %index.display(), report = %updated.report, "Index updated");
        }

        Command::Inspect { index } => {
            let document = load_document(&index)?;
            let space = document.to_space()?;
            print!("{}", describe(&document, &space));
        }

        Command::Lookup { index, values } => {
            let document = load_document(&index)?;
            let space = document.to_space()?;
            let answer = lookup_values(&document, &space, &values)?;
            if !answer.is_found() {
                info!(values = ?values, "No record at these coordinates");
            }
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
    }

    Ok(())
}
