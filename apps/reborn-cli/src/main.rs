use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use reborn_core::config::Config;
use reborn_core::{RecordClass, SearchMode};
use reborn_search::SearchRepository;

mod ingest;

#[derive(Parser)]
#[command(name = "reborn", version, about = "Index and search research articles and statements")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add records from JSON files or directories of JSON files
    Ingest {
        #[arg(value_parser = parse_class)]
        class: RecordClass,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Run a query and print the results as JSON
    Search {
        #[arg(value_parser = parse_class)]
        class: RecordClass,
        query: String,
        #[arg(long, value_enum, default_value_t = Mode::Hybrid)]
        mode: Mode,
        /// Number of results; 0 uses the configured default
        #[arg(short, default_value_t = 0)]
        k: usize,
    },
    /// Drop every index of every active engine
    DeleteIndices,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Semantic,
    Keyword,
    Hybrid,
}

impl From<Mode> for SearchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Semantic => SearchMode::Semantic,
            Mode::Keyword => SearchMode::Keyword,
            Mode::Hybrid => SearchMode::Hybrid,
        }
    }
}

fn parse_class(s: &str) -> Result<RecordClass, String> { s.parse().map_err(|e| format!("{e}")) }

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Config::load()?.search_settings()?;
    let repo = SearchRepository::from_settings(&settings)?;

    match cli.command {
        Command::Ingest { class, paths } => {
            let files = ingest::collect_json_files(&paths)?;
            let mut total = 0usize;
            for file in &files {
                let records = ingest::read_records(file)?;
                total += records.len();
                repo.add(class, &records)?;
                tracing::info!(file = %file.display(), records = records.len(), "ingested");
            }
            tracing::info!(%class, files = files.len(), records = total, "ingest complete");
        }
        Command::Search { class, query, mode, k } => {
            let response = repo.search(mode.into(), class, &query, k)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::DeleteIndices => {
            repo.delete_indices()?;
            tracing::info!("indices deleted");
        }
    }
    Ok(())
}
