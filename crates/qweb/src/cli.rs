//! Command-line argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Qweb template renderer and checker
#[derive(Parser, Debug, Clone)]
#[command(name = "qweb")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Project directory
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Path to qweb.json
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Template directory, may be repeated
    #[arg(short = 'I', long = "templates", global = true)]
    pub templates: Vec<PathBuf>,

    /// Developer mode: never cache, keep generated code in errors
    #[arg(long, global = true)]
    pub dev: bool,

    /// Active language
    #[arg(long, global = true)]
    pub lang: Option<String>,

    /// Ignore patterns (glob)
    #[arg(long, global = true)]
    pub ignore: Vec<String>,

    /// Output format for errors
    #[arg(long, default_value = "human", global = true)]
    pub output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render one template to stdout
    Render {
        /// Template name or id
        template: String,

        /// Values as a JSON object
        #[arg(long)]
        values: Option<String>,

        /// File holding the values as a JSON object
        #[arg(long, conflicts_with = "values")]
        values_file: Option<PathBuf>,

        /// Print the generated code instead of rendering
        #[arg(long)]
        emit_code: bool,
    },
    /// Compile templates and report errors
    Check {
        /// Template names to check; every indexed template when empty
        names: Vec<String>,
    },
}

/// Output format for errors.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output, one object per line
    Json,
    /// Machine-readable output
    Machine,
}

impl Args {
    /// Default log filter, overridden by `RUST_LOG`.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}
