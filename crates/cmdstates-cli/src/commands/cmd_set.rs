//! Command set generation
//!
//! Prints the commands as JSON records, ready to be merged into a command
//! file for `update`.

use clap::Args;
use cmdstates_core::time::date_to_secs;
use cmdstates_core::{generate_cmds, CmdSet, CommandRecord};

#[derive(Debug, Args)]
pub struct CmdSetArgs {
    /// Set name: obsid, manvr, scs107, nsm, acis, aciscti
    pub name: String,

    /// Set arguments, e.g. `manvr 10 -20 30`
    #[arg(allow_negative_numbers = true)]
    pub args: Vec<String>,

    /// Date of the first command
    #[arg(long)]
    pub date: String,
}

pub fn execute(args: CmdSetArgs) -> Result<(), Box<dyn std::error::Error>> {
    let set = CmdSet::parse(&args.name, &args.args)?;
    let cmds = generate_cmds(date_to_secs(&args.date)?, &set)?;
    let records: Vec<CommandRecord> = cmds.iter().map(CommandRecord::from).collect();
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
