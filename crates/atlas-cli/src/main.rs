//! dbatlas CLI - database inventory, dependency and usage analysis

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod context;

use cli::Cli;
use commands::common::ExitCode;
use commands::{analyze, databases, impact};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let result = match &cli.command {
        cli::Commands::Analyze(args) => analyze::execute(args, &cli.global).await,
        cli::Commands::Databases(args) => databases::execute(args, &cli.global).await,
        cli::Commands::Impact(args) => impact::execute(args, &cli.global).await,
    };

    if let Err(err) = &result {
        if let Some(code) = err.downcast_ref::<ExitCode>() {
            std::process::exit(code.0);
        }
    }
    result
}
