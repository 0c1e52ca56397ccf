//! Check command: row store / archive consistency without updating

use crate::config::Config;
use clap::Args;
use cmdstates_core::reconcile::check_consistency;
use cmdstates_store::{JsonlArchive, SqliteRowStore};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Trailing rows to compare (defaults to n_check_changed)
    #[arg(long)]
    pub n_check: Option<usize>,

    #[arg(long)]
    pub db: Option<PathBuf>,

    #[arg(long)]
    pub archive: Option<PathBuf>,
}

pub fn execute(args: CheckArgs, cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let rows = SqliteRowStore::open(args.db.as_ref().unwrap_or(&cfg.db))?;
    let archive = JsonlArchive::new(args.archive.as_ref().unwrap_or(&cfg.archive));

    let report = check_consistency(
        &rows,
        &archive,
        args.n_check.unwrap_or(cfg.n_check_changed),
    )?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_consistent() {
        return Err("row store and archive disagree".into());
    }
    Ok(())
}
