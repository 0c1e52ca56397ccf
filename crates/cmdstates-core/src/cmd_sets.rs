//! Predefined command sets for non-load commanding
//!
//! A set is a list of commands with the delay before the next one. Laying it
//! out from a start time gives commands the interpreter can merge with a
//! load's commands (e.g. a safing action or a replanned maneuver).

use std::fmt;

use crate::attitude::Quat;
use crate::errors::{Result, StatesError};
use crate::model::{Command, CommandKind};
use crate::time::secs_to_date;

#[derive(Debug, Clone, PartialEq)]
pub enum CmdSet {
    /// Set the observation id
    Obsid(i64),
    /// Maneuver to a target attitude
    Manvr(Quat),
    /// SCS-107 science instrument safing
    Scs107,
    /// Normal sun mode safing
    Nsm,
    /// Arbitrary ACIS packets, back to back
    Acis(Vec<String>),
    /// ACIS CTI measurement setup
    AcisCti,
}

/// One step of a set: an optional command and the time until the next step
type Step = (Option<CommandKind>, f64);

fn acis(mnemonic: &str) -> Option<CommandKind> {
    Some(CommandKind::AcisPacket {
        mnemonic: mnemonic.to_string(),
    })
}

fn switch(mnemonic: &str) -> Option<CommandKind> {
    Some(CommandKind::Switch {
        mnemonic: mnemonic.to_string(),
    })
}

impl CmdSet {
    /// Build a set from its name and string arguments.
    ///
    /// `manvr` takes either `ra dec roll` (degrees) or `q1 q2 q3 q4`.
    ///
    /// # Errors
    ///
    /// `UnknownCommandSet` for an unknown name or unusable arguments.
    pub fn parse(name: &str, args: &[String]) -> Result<Self> {
        let bad = |reason: String| StatesError::UnknownCommandSet {
            name: name.to_string(),
            reason,
        };
        let floats = || {
            args.iter()
                .map(|a| a.parse::<f64>().map_err(|e| bad(format!("'{}': {}", a, e))))
                .collect::<Result<Vec<f64>>>()
        };

        match name {
            "obsid" => match args {
                [id] => id
                    .parse()
                    .map(CmdSet::Obsid)
                    .map_err(|e| bad(format!("'{}': {}", id, e))),
                _ => Err(bad("expected one obsid argument".to_string())),
            },
            "manvr" => match floats()?.as_slice() {
                [ra, dec, roll] => Ok(CmdSet::Manvr(Quat::from_equatorial(*ra, *dec, *roll))),
                [q1, q2, q3, q4] => Ok(CmdSet::Manvr(Quat::new(*q1, *q2, *q3, *q4).normalized())),
                _ => Err(bad("expected ra dec roll or q1 q2 q3 q4".to_string())),
            },
            "scs107" => Ok(CmdSet::Scs107),
            "nsm" => Ok(CmdSet::Nsm),
            "acis" if !args.is_empty() => Ok(CmdSet::Acis(args.to_vec())),
            "acis" => Err(bad("expected at least one ACIS mnemonic".to_string())),
            "aciscti" => Ok(CmdSet::AcisCti),
            _ => Err(bad("expected one of obsid, manvr, scs107, nsm, acis, aciscti".to_string())),
        }
    }

    fn steps(&self) -> Vec<Step> {
        match self {
            CmdSet::Obsid(id) => vec![(Some(CommandKind::SetObsid { id: *id }), 0.0)],
            CmdSet::Manvr(target) => vec![
                (switch("AONMMODE"), 0.25625),
                (switch("AONM2NPE"), 4.1),
                (Some(CommandKind::TargetQuat { target: *target }), 5.894),
                (switch("AOMANUVR"), 0.0),
            ],
            CmdSet::Scs107 => vec![
                (None, 1.025),
                (Some(CommandKind::SimTrans { pos: -99616 }), 65.66),
                (acis("AA00000000"), 1.025),
                (acis("AA00000000"), 10.25),
                (acis("WSPOW00000"), 0.0),
            ],
            CmdSet::Nsm => vec![(switch("AONSMSAF"), 0.0)],
            CmdSet::Acis(mnemonics) => mnemonics.iter().map(|m| (acis(m), 0.0)).collect(),
            CmdSet::AcisCti => vec![
                (acis("WSVIDALLDN"), 1.025),
                (acis("WSPOW0CF3F"), 1.025),
                (acis("WT00216024"), 67.0),
                (acis("XTZ0000005"), 0.0),
            ],
        }
    }
}

impl fmt::Display for CmdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CmdSet::Obsid(_) => "obsid",
            CmdSet::Manvr(_) => "manvr",
            CmdSet::Scs107 => "scs107",
            CmdSet::Nsm => "nsm",
            CmdSet::Acis(_) => "acis",
            CmdSet::AcisCti => "aciscti",
        })
    }
}

/// Lay out `set` starting at mission seconds `time`.
///
/// # Errors
///
/// `InvalidDate` if a command time cannot be formatted.
pub fn generate_cmds(time: f64, set: &CmdSet) -> Result<Vec<Command>> {
    let mut cmds = Vec::new();
    let mut t = time;
    for (kind, dur) in set.steps() {
        if let Some(kind) = kind {
            cmds.push(Command::new(secs_to_date(t)?, t, kind));
        }
        t += dur;
    }
    Ok(cmds)
}
