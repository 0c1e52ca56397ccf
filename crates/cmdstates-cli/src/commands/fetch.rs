//! Fetch command

use crate::config::Config;
use clap::Args;
use cmdstates_core::queries::{fetch_states, Source};
use cmdstates_core::StateKey;
use cmdstates_store::{JsonlArchive, SqliteRowStore};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Start date (YYYY:DOY[:HH:MM:SS.sss])
    pub start: String,

    /// Stop date; open-ended if omitted
    pub stop: Option<String>,

    /// Comma-separated state keys that must change for a row to be kept
    #[arg(long, value_delimiter = ',')]
    pub vals: Vec<StateKey>,

    /// Keep transitions where the listed keys did not actually change
    #[arg(long)]
    pub allow_identical: bool,

    /// Read from the archive instead of the row store
    #[arg(long)]
    pub from_archive: bool,

    #[arg(long)]
    pub db: Option<PathBuf>,

    #[arg(long)]
    pub archive: Option<PathBuf>,
}

pub fn execute(args: FetchArgs, cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let stop = args.stop.as_deref();
    let states = if args.from_archive {
        let archive = JsonlArchive::new(args.archive.as_ref().unwrap_or(&cfg.archive));
        fetch_states(
            Source::Archive(&archive),
            &args.start,
            stop,
            &args.vals,
            args.allow_identical,
        )?
    } else {
        let rows = SqliteRowStore::open(args.db.as_ref().unwrap_or(&cfg.db))?;
        fetch_states(
            Source::Rows(&rows),
            &args.start,
            stop,
            &args.vals,
            args.allow_identical,
        )?
    };

    println!("{}", serde_json::to_string_pretty(&states)?);
    Ok(())
}
