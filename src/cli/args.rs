use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "polytl")]
#[command(about = "Translate text with several language models at once")]
#[command(version)]
pub struct Args {
    /// File to translate (reads from stdin if not provided)
    pub file: Option<PathBuf>,

    /// Target language code (ISO 639-1, e.g., ja, en, zh)
    #[arg(short = 't', long = "to")]
    pub to: Option<String>,

    /// Source language code (auto-detected if not provided)
    #[arg(short = 'f', long = "from")]
    pub from: Option<String>,

    /// Default provider for models without an @provider suffix
    #[arg(short = 'p', long)]
    pub provider: Option<String>,

    /// Model to translate with, optionally as model@provider (repeatable)
    #[arg(short = 'm', long = "model", action = ArgAction::Append)]
    pub models: Vec<String>,

    /// Maximum number of models streaming at the same time
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Format of the result printed to stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also write a standalone HTML page with all results to this path
    #[arg(long, value_name = "PATH")]
    pub html: Option<PathBuf>,

    /// Suppress progress and status output
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// How results are printed to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Raw translated text
    Text,
    /// Rendered HTML fragments, one card per model
    Html,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List supported language codes
    Languages,
    /// List configured providers
    Providers {
        /// Show details for a single provider
        provider: Option<String>,
    },
    /// List the models a provider serves
    Models {
        /// Provider to query (defaults to the configured default provider)
        #[arg(short = 'p', long)]
        provider: Option<String>,
    },
    /// Render markdown to HTML without translating
    Render {
        /// Markdown file (reads from stdin if not provided)
        file: Option<PathBuf>,
    },
}
