use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tl")]
#[command(about = "Cached, batched translation CLI tool")]
#[command(version)]
pub struct Args {
    /// File to translate line by line (reads from stdin if not provided)
    pub file: Option<String>,

    /// Source language code (ISO 639-1, e.g., en, ja, zh)
    #[arg(short = 'f', long = "from", global = true)]
    pub from: Option<String>,

    /// Target language code (ISO 639-1, e.g., ja, en, zh)
    #[arg(short = 't', long = "to", global = true)]
    pub to: Option<String>,

    /// Provider name (defined in config.toml)
    #[arg(short = 'p', long)]
    pub provider: Option<String>,

    /// Model name
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// Directory holding the translation cache files
    #[arg(short = 'c', long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Suppress status output
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Show debug logs
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List supported language codes
    Languages,
    /// Store a known translation in the cache
    Feed {
        /// Text in the source language
        original: String,

        /// Its translation in the target language
        translation: String,

        /// Replace an existing, different translation
        #[arg(long)]
        overwrite: bool,
    },
}
