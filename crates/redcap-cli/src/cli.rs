//! Command line arguments of the `redcap` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use redcap_api::{DEFAULT_MAX_CHUNK_SIZE, DEFAULT_PARALLEL_CALLS};

#[derive(Parser)]
#[command(
    name = "redcap",
    version,
    about = "Export and import REDCap project records",
    long_about = "Export and import records of a REDCap project through its API.\n\n\
                  Large exports are split into chunks of record ids and fetched in\n\
                  parallel. Values can be typed using the project's data dictionary."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow record values in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Export records as JSON or CSV.
    Export(ExportArgs),

    /// List the fields of the project's data dictionary.
    Metadata(MetadataArgs),

    /// Import records from a JSON file.
    Import(ImportArgs),
}

/// Project endpoint and request tuning, shared by every command.
#[derive(Args)]
pub struct ConnectionArgs {
    /// API url of the REDCap instance.
    #[arg(long, env = "REDCAP_API_URL")]
    pub url: String,

    /// Project API token.
    #[arg(long, env = "REDCAP_API_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Maximum record ids (export) or rows (import) per request.
    #[arg(long = "chunk-size", value_name = "N", default_value_t = DEFAULT_MAX_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Maximum requests in flight.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PARALLEL_CALLS)]
    pub parallel: usize,

    /// Skip TLS certificate verification.
    #[arg(long)]
    pub insecure: bool,

    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Parser)]
pub struct ExportArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Record id field; enables chunked export.
    #[arg(long = "id-var", value_name = "FIELD")]
    pub id_var: Option<String>,

    /// Only export these record ids.
    #[arg(long = "id", value_name = "ID", value_delimiter = ',')]
    pub ids: Vec<String>,

    /// Fields to export (default: all).
    #[arg(long = "field", value_name = "FIELD", value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Instruments to export.
    #[arg(long = "form", value_name = "FORM", value_delimiter = ',')]
    pub forms: Vec<String>,

    /// Events to export (longitudinal projects).
    #[arg(long = "event", value_name = "EVENT", value_delimiter = ',')]
    pub events: Vec<String>,

    /// Keep only records where FIELD is non-empty. Repeatable.
    #[arg(long = "require", value_name = "FIELD", requires = "id_var")]
    pub require: Vec<String>,

    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormatArg,

    /// Coerce values using the project's data dictionary.
    #[arg(long)]
    pub typed: bool,

    /// Treat every non-text field type as categorical.
    #[arg(long = "legacy-types", requires = "typed")]
    pub legacy_types: bool,

    /// Output file (default: stdout).
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
pub struct MetadataArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Treat every non-text field type as categorical.
    #[arg(long = "legacy-types")]
    pub legacy_types: bool,

    /// List checkbox sub-fields instead of checkbox fields.
    #[arg(long)]
    pub expand: bool,
}

#[derive(Parser)]
pub struct ImportArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// JSON file holding an array of flat record objects.
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Blank values overwrite stored values.
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    Json,
    Csv,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
