//! Commanded states CLI
//!
//! Command-line interface for maintaining the commanded states tables

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

#[derive(Debug, Parser)]
#[command(name = "cmd-states")]
#[command(about = "Commanded states - interpret commands and maintain the state tables", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./cmd-states.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interpret commands and reconcile the row store and archive
    Update(commands::update::UpdateArgs),
    /// Print states over a date range
    Fetch(commands::fetch::FetchArgs),
    /// Compare the trailing rows of the row store and archive
    Check(commands::check::CheckArgs),
    /// Generate the commands of a named command set
    CmdSet(commands::cmd_set::CmdSetArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = config::load(cli.config.as_deref()).and_then(|cfg| {
        cmdstates_core::logging_facility::init(cfg.log_profile);
        match cli.command {
            Commands::Update(args) => commands::update::execute(args, &cfg),
            Commands::Fetch(args) => commands::fetch::execute(args, &cfg),
            Commands::Check(args) => commands::check::execute(args, &cfg),
            Commands::CmdSet(args) => commands::cmd_set::execute(args),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
