//! CLI argument definitions using clap derive API

use atlas_core::ProviderType;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::str::FromStr;

/// dbatlas - inventory, dependency graphs and usage analysis for databases
#[derive(Parser, Debug)]
#[command(name = "atlas")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ./atlas.yml when present)
    #[arg(short, long, global = true, env = "ATLAS_CONFIG")]
    pub config: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run analyzers against a database or a whole server
    Analyze(AnalyzeArgs),

    /// List the databases a server-level connection would analyze
    Databases(DatabasesArgs),

    /// Show what depends on one object
    Impact(ImpactArgs),
}

/// Connection options shared by every command
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Connection string (`server=...;database=...`) or a path
    pub connection: String,

    /// Provider (duckdb, snapshot); defaults to the config file's provider
    #[arg(long, value_parser = parse_provider)]
    pub provider: Option<ProviderType>,
}

fn parse_provider(s: &str) -> Result<ProviderType, String> {
    ProviderType::from_str(s).map_err(|e| e.to_string())
}

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub conn: ConnectionArgs,

    /// Analyzers to run (comma-separated, default: all)
    #[arg(short, long)]
    pub analyzers: Option<String>,

    /// In server mode, refresh only this database
    #[arg(short, long)]
    pub database: Option<String>,

    /// Re-run the analyzers and everything downstream of them
    #[arg(long)]
    pub force: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    pub output: OutputFormat,

    /// Write JSON output to a file instead of stdout
    #[arg(long)]
    pub out: Option<String>,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary
    Summary,
    /// Full JSON result
    Json,
}

/// Arguments for the databases command
#[derive(Args, Debug)]
pub struct DatabasesArgs {
    #[command(flatten)]
    pub conn: ConnectionArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    pub output: OutputFormat,
}

/// Arguments for the impact command
#[derive(Args, Debug)]
pub struct ImpactArgs {
    #[command(flatten)]
    pub conn: ConnectionArgs,

    /// Object as `schema.name` (or `database.schema.name` in server mode)
    #[arg(long)]
    pub object: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    pub output: OutputFormat,
}
