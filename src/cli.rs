//! CLI definitions for imgsearch.
//!
//! Uses clap for argument parsing with derive macros.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::model::{MAX_TOP_K, MIN_TOP_K, Metric};

/// imgsearch - find visually similar images through a search service
#[derive(Parser, Debug)]
#[command(name = "imgsearch")]
#[command(version)]
#[command(about = "Query an image similarity search service from the terminal")]
#[command(long_about = r#"
imgsearch uploads a query image to an image similarity search service and
shows the ranked matches it returns.

Quick start:
  1. Start the search service (default: http://127.0.0.1:8000)
  2. Search: imgsearch search ./photo.jpg -k 10 --metric cosine
  3. Or explore interactively: imgsearch interactive
"#)]
pub struct Cli {
    /// Base URL of the search service
    #[arg(long, env = "IMGSEARCH_API_BASE", global = true)]
    pub api_base: Option<String>,

    /// Output format
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Do not send the metric parameter (for services that do not take one)
    #[arg(long, global = true)]
    pub no_metric: bool,

    /// Give up on a request after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Be verbose (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Be quiet (suppress non-error output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search for images similar to a query image
    Search(SearchArgs),

    /// Open an interactive search session
    #[command(alias = "i")]
    Interactive,

    /// Show or manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Path to the query image
    pub image: PathBuf,

    /// Number of results to request
    #[arg(long, short = 'k', value_parser = clap::value_parser!(u32).range(i64::from(MIN_TOP_K)..=i64::from(MAX_TOP_K)))]
    pub top_k: Option<u32>,

    /// Similarity metric
    #[arg(long, short = 'm')]
    pub metric: Option<Metric>,

    /// Also print the L2 vs cosine guide
    #[arg(long)]
    pub guide: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(long)]
    pub show: bool,

    /// Write a default config file (refuses to overwrite without --force)
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing config file with --init
    #[arg(long)]
    pub force: bool,

    /// Config file to write with --init or show, instead of the default location
    #[arg(long)]
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
    Compact,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}
