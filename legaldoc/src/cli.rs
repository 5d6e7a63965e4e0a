//! Command-line interface definitions for legaldoc

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for the inspect command
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum InspectFormat {
    /// Human-readable listing
    #[default]
    Text,
    /// JSON object with placeholders, markers and labels
    Json,
}

/// CLI structure for the legaldoc application
#[derive(Parser)]
#[command(name = "legaldoc")]
#[command(version)]
#[command(about = "Legal document generator for wills, powers of attorney and care plans", long_about = None)]
pub struct Cli {
    /// Verbose output (RUST_LOG is honored otherwise)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Where templates, clauses and defaults come from
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Template .docx (defaults to the profile's template in the templates directory)
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Clause library directory, searched recursively
    #[arg(short, long)]
    pub clauses: Option<PathBuf>,

    /// Generation date as YYYY-MM-DD (defaults to today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,

    /// Practice configuration file (defaults to ./legaldoc.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Available subcommands for legaldoc
#[derive(Subcommand)]
pub enum Commands {
    /// Generate one document from a JSON input record
    Generate {
        /// Document type (will, poa, hcpoa, acp, or an abbreviation such as LWT)
        doc_type: String,

        /// JSON file holding the client input record
        #[arg(short, long)]
        input: PathBuf,

        /// Output file or directory (defaults to the suggested filename)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Generate one document per record of a JSON array
    Batch {
        /// Document type (will, poa, hcpoa, acp, or an abbreviation such as LWT)
        doc_type: String,

        /// JSON file holding an array of input records
        #[arg(short, long)]
        input: PathBuf,

        /// Directory the generated documents are written to
        #[arg(long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// List the placeholders, markers and section labels of a template
    Inspect {
        /// Template .docx to inspect
        path: PathBuf,

        /// Section label keyword
        #[arg(short, long, default_value = "Article")]
        keyword: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: InspectFormat,
    },

    /// List the supported document types
    ListTypes,
}
