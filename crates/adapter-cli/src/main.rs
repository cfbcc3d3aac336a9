//! Adapter Catalog CLI - validate and query a directory of descriptor cards.
//!
//! Command output goes to stdout; logs go to stderr.

mod output;

use adapter_catalog::{
    catalog::select_version, compute_file_digests_with_progress, verify_digests, AdapterQuery,
    Catalog, CatalogError, DirectorySource, RecordError,
};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "adapter-catalog")]
#[command(about = "Validate and query adapter descriptor cards")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load every card and report the ones that fail validation
    Validate {
        /// Directory of descriptor cards
        dir: PathBuf,
    },
    /// List adapters, optionally filtered
    List {
        /// Directory of descriptor cards
        dir: PathBuf,
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        subtask: Option<String>,
        #[arg(long)]
        model_type: Option<String>,
        #[arg(long)]
        model_name: Option<String>,
        /// Adapter architecture (`config.using`)
        #[arg(long)]
        config: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Resolve a query to a single downloadable file
    Resolve {
        /// Directory of descriptor cards
        dir: PathBuf,
        #[command(flatten)]
        query: QueryArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Resolve a query, then check a downloaded archive against it
    Verify {
        /// Directory of descriptor cards
        dir: PathBuf,
        /// Downloaded archive to check
        archive: PathBuf,
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Print the SHA-1 and SHA-256 of an archive
    Digest {
        /// Archive to hash
        archive: PathBuf,
    },
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[arg(long)]
    task: String,
    #[arg(long)]
    subtask: Option<String>,
    #[arg(long)]
    model_name: Option<String>,
    /// Adapter architecture (`config.using`), to tell variants apart
    #[arg(long)]
    config: Option<String>,
    /// Version to resolve (defaults to the card's default_version)
    #[arg(long)]
    version: Option<String>,
}

impl QueryArgs {
    fn as_query(&self) -> AdapterQuery<'_> {
        AdapterQuery {
            task: &self.task,
            subtask: self.subtask.as_deref(),
            model_name: self.model_name.as_deref(),
            config: self.config.as_deref(),
            version: self.version.as_deref(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match run(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            let code = err
                .downcast_ref::<CatalogError>()
                .map(CatalogError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

fn load(dir: &Path) -> Result<(Catalog, Vec<RecordError>)> {
    debug!("Loading descriptor cards from {}", dir.display());
    Ok(Catalog::load_from(&DirectorySource::new(dir))?)
}

async fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Validate { dir } => {
            let (catalog, errors) = load(&dir)?;
            for error in &errors {
                println!("FAIL {}", error);
            }
            println!("{} valid, {} invalid", catalog.len(), errors.len());
            Ok(if errors.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(65)
            })
        }

        Command::List {
            dir,
            task,
            subtask,
            model_type,
            model_name,
            config,
            json,
        } => {
            let (catalog, _) = load(&dir)?;
            let snapshot = catalog.snapshot();
            let descriptors: Vec<_> = match (&task, &model_type) {
                (Some(task), _) => snapshot.lookup(
                    task,
                    subtask.as_deref(),
                    model_type.as_deref(),
                    model_name.as_deref(),
                    config.as_deref(),
                ),
                (None, Some(model_type)) => snapshot
                    .lookup_model(model_type, model_name.as_deref())
                    .into_iter()
                    .filter(|d| output::subtask_matches(d, subtask.as_deref()))
                    .filter(|d| output::config_matches(d, config.as_deref()))
                    .collect(),
                (None, None) => snapshot
                    .descriptors()
                    .iter()
                    .filter(|d| output::subtask_matches(d, subtask.as_deref()))
                    .filter(|d| output::model_name_matches(d, model_name.as_deref()))
                    .filter(|d| output::config_matches(d, config.as_deref()))
                    .collect(),
            };

            if json {
                let listing = output::descriptors_json(&descriptors)?;
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                output::print_table(&descriptors);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Resolve { dir, query, json } => {
            let (catalog, _) = load(&dir)?;
            let snapshot = catalog.snapshot();
            let query = query.as_query();
            let descriptor = snapshot
                .resolve_descriptor(&query)
                .map_err(CatalogError::from)?;
            let entry = select_version(descriptor, query.version)
                .map_err(CatalogError::from)?;

            if json {
                let resolved = output::Resolved::new(descriptor, entry);
                println!("{}", serde_json::to_string_pretty(&resolved)?);
            } else {
                output::print_resolved(descriptor, entry);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Verify {
            dir,
            archive,
            query,
        } => {
            let (catalog, _) = load(&dir)?;
            let query = query.as_query();
            let entry = catalog
                .resolve_query(&query)
                .map_err(CatalogError::from)?;

            info!("Hashing {}", archive.display());
            let digests = compute_file_digests_with_progress(&archive, None).await?;
            let result = verify_digests(&digests, &entry);
            println!("{}: {}", archive.display(), result);

            Ok(if result.is_trusted() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(65)
            })
        }

        Command::Digest { archive } => {
            let digests = compute_file_digests_with_progress(&archive, None).await?;
            println!("sha1: {}", digests.sha1);
            println!("sha256: {}", digests.sha256);
            Ok(ExitCode::SUCCESS)
        }
    }
}
