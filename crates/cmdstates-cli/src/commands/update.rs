//! Update command: interpret a command file and reconcile both stores

use crate::config::Config;
use clap::Args;
use cmdstates_core::interpret::{check_window, get_states, InterpretOptions};
use cmdstates_core::queries::get_state0;
use cmdstates_core::reconcile::{update_states, UpdateOptions};
use cmdstates_core::time::{date_to_secs, now_secs};
use cmdstates_core::{Command, CommandRecord, SlerpManeuverOracle};
use cmdstates_store::{JsonlArchive, SqliteRowStore};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// JSON array of command records
    #[arg(long)]
    pub cmds: PathBuf,

    /// Treat this date as now when choosing state0
    #[arg(long)]
    pub date_now: Option<String>,

    /// Reject commands dated before this
    #[arg(long)]
    pub window_start: Option<String>,

    #[arg(long)]
    pub db: Option<PathBuf>,

    #[arg(long)]
    pub archive: Option<PathBuf>,
}

pub fn execute(args: UpdateArgs, cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(&args.cmds)
        .map_err(|e| format!("failed to read {}: {e}", args.cmds.display()))?;
    let records: Vec<CommandRecord> = serde_json::from_str(&contents)?;
    let cmds = records
        .into_iter()
        .map(Command::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(window_start) = &args.window_start {
        check_window(&cmds, window_start)?;
    }

    let mut rows = SqliteRowStore::open(args.db.as_ref().unwrap_or(&cfg.db))?;
    let mut archive = JsonlArchive::new(args.archive.as_ref().unwrap_or(&cfg.archive));

    let now = match &args.date_now {
        Some(date) => date_to_secs(date)?,
        None => now_secs()?,
    };
    let state0 = get_state0(&rows, None, now, cfg.date_margin_days)?;
    tracing::info!(datestart = state0.datestart.as_str(), n_cmds = cmds.len(), "state0");

    let opts = InterpretOptions {
        pitch_sample_interval: cfg.pitch_sample_interval,
        ..InterpretOptions::default()
    };
    let states = get_states(&state0, &cmds, &SlerpManeuverOracle::default(), &opts)?;

    let update_opts = UpdateOptions {
        n_check_changed: cfg.n_check_changed,
        n_check_unchanged: cfg.n_check_unchanged,
    };
    let outcome = update_states(&states, &mut rows, &mut archive, &update_opts)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.consistency.is_consistent() {
        return Err("row store and archive disagree after update".into());
    }
    Ok(())
}
