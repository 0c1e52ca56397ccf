//! State Transition Interpreter
//!
//! Replays commands against an initial state and produces the ordered,
//! non-overlapping state sequence. Commands are reduced to per-date
//! [`Transitions`], then states are built by applying each transition to a
//! copy of the previous state.

use crate::attitude::{self, Quat};
use crate::errors::{Result, StatesError};
use crate::model::{
    Command, CommandKind, Dither, Grating, PcadMode, State, StateUpdate, TransKeys, Transitions,
};
use crate::oracle::ManeuverOracle;
use crate::power::decode_power;
use crate::time::{date_to_secs, secs_to_date, DATESTOP_SENTINEL};
use crate::{log_op_end, log_op_error, log_op_start};

/// Default spacing of synthetic pitch samples, seconds
pub const PITCH_SAMPLE_INTERVAL: f64 = 5000.0;

#[derive(Debug, Clone)]
pub struct InterpretOptions {
    /// Spacing of synthetic pitch samples; zero or negative disables them
    pub pitch_sample_interval: f64,
    /// Keys that may not cause a transition
    pub exclude: TransKeys,
}

impl Default for InterpretOptions {
    fn default() -> Self {
        Self {
            pitch_sample_interval: PITCH_SAMPLE_INTERVAL,
            exclude: TransKeys::new(),
        }
    }
}

/// Get the states resulting from `cmds` starting from `state0`.
///
/// Only commands dated strictly after `state0.datestart` are applied. The
/// first returned state is `state0` with its `datestop` closed off at the
/// next transition; the last ends at [`DATESTOP_SENTINEL`].
///
/// # Errors
///
/// - `InvalidPowerCommand` for a malformed `WSPOW` mnemonic
/// - `InvalidDate` if a date cannot be converted
pub fn get_states(
    state0: &State,
    cmds: &[Command],
    oracle: &dyn ManeuverOracle,
    opts: &InterpretOptions,
) -> Result<Vec<State>> {
    log_op_start!(
        "get_states",
        datestart = state0.datestart.as_str(),
        n_cmds = cmds.len()
    );
    let start = std::time::Instant::now();

    let states = get_states_impl(state0, cmds, oracle, opts).map_err(|e| {
        log_op_error!(
            "get_states",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "get_states",
        duration_ms = start.elapsed().as_millis() as u64,
        n_states = states.len()
    );
    Ok(states)
}

fn get_states_impl(
    state0: &State,
    cmds: &[Command],
    oracle: &dyn ManeuverOracle,
    opts: &InterpretOptions,
) -> Result<Vec<State>> {
    let samples = pitch_samples(state0, cmds, opts.pitch_sample_interval)?;

    // Stable sort: real commands stay ahead of samples sharing their date
    let mut ordered: Vec<&Command> = cmds.iter().chain(samples.iter()).collect();
    ordered.sort_by(|a, b| a.date.cmp(&b.date));

    let mut walker = Walker {
        oracle,
        curr_att: state0.attitude(),
        targ_att: None,
        auto_npnt: true,
        transitions: Transitions::new(opts.exclude),
    };
    for cmd in ordered
        .into_iter()
        .filter(|c| c.date.as_str() > state0.datestart.as_str())
    {
        walker.step(cmd)?;
    }

    build_states(state0, walker.transitions)
}

/// Synthetic pitch-sample commands every `interval` seconds from `state0`
/// through the last command.
fn pitch_samples(state0: &State, cmds: &[Command], interval: f64) -> Result<Vec<Command>> {
    let Some(last_time) = cmds.iter().map(|c| c.time).reduce(f64::max) else {
        return Ok(Vec::new());
    };
    if interval <= 0.0 {
        return Ok(Vec::new());
    }

    let mut samples = Vec::new();
    let mut time = state0.tstart;
    while time <= last_time {
        samples.push(Command::new(
            secs_to_date(time)?,
            time,
            CommandKind::PitchSample,
        ));
        time += interval;
    }
    Ok(samples)
}

/// Interpreter loop state threaded through the command walk
struct Walker<'a> {
    oracle: &'a dyn ManeuverOracle,
    curr_att: Quat,
    targ_att: Option<Quat>,
    auto_npnt: bool,
    transitions: Transitions,
}

impl Walker<'_> {
    fn step(&mut self, cmd: &Command) -> Result<()> {
        let date = cmd.date.as_str();
        match &cmd.kind {
            CommandKind::SetObsid { id } => {
                self.transitions.add(date, [StateUpdate::Obsid(*id)]);
            }
            CommandKind::SimTrans { pos } => {
                self.transitions.add(date, [StateUpdate::Simpos(*pos)]);
            }
            CommandKind::SimFocus { pos } => {
                self.transitions.add(date, [StateUpdate::SimfaPos(*pos)]);
            }
            CommandKind::AcisPacket { mnemonic } => {
                let updates = acis_updates(mnemonic)?;
                if updates.is_empty() {
                    tracing::trace!(date, mnemonic = mnemonic.as_str(), "ignoring ACIS packet");
                }
                self.transitions.add(date, updates);
            }
            CommandKind::TargetQuat { target } => {
                self.targ_att = Some(*target);
            }
            CommandKind::Switch { mnemonic } => self.switch(cmd, SwitchAction::parse(mnemonic))?,
            CommandKind::PitchSample => {
                // Inside an expanded maneuver the samples already carry pitch
                if self.transitions.last_date().is_some_and(|last| date < last) {
                    return Ok(());
                }
                let pitch = attitude::pitch(&self.curr_att, cmd.time);
                self.transitions.add(date, [StateUpdate::Pitch(pitch)]);
            }
            CommandKind::Other { cmd: kind, .. } => {
                tracing::trace!(date, cmd = kind.as_str(), "ignoring command type");
            }
        }
        Ok(())
    }

    fn switch(&mut self, cmd: &Command, action: SwitchAction) -> Result<()> {
        let date = cmd.date.as_str();
        match action {
            SwitchAction::AutoNpnt(enabled) => self.auto_npnt = enabled,
            SwitchAction::Mode(mode) => {
                self.transitions.add(date, [StateUpdate::PcadMode(mode)]);
            }
            SwitchAction::Hetg(pos) => {
                self.transitions.add(date, [StateUpdate::Hetg(pos)]);
            }
            SwitchAction::Letg(pos) => {
                self.transitions.add(date, [StateUpdate::Letg(pos)]);
            }
            SwitchAction::Dither(flag) => {
                self.transitions.add(date, [StateUpdate::Dither(flag)]);
            }
            SwitchAction::Maneuver => match self.targ_att {
                Some(target) => self.maneuver(cmd, target)?,
                None => {
                    tracing::warn!(date, "maneuver with no target attitude, skipping");
                }
            },
            SwitchAction::NsmSafe => {
                self.transitions
                    .add(date, [StateUpdate::PcadMode(PcadMode::Nsun)]);
                let target = self.oracle.nsm_attitude(&self.curr_att, cmd.time);
                self.targ_att = Some(target);
                self.auto_npnt = false;
                self.maneuver(cmd, target)?;
            }
            SwitchAction::Unrecognized => {
                tracing::trace!(date, "ignoring switch command");
            }
        }
        Ok(())
    }

    fn maneuver(&mut self, cmd: &Command, target: Quat) -> Result<()> {
        let atts = self.oracle.attitudes(&self.curr_att, &target, cmd.time);
        tracing::debug!(
            date = cmd.date.as_str(),
            time = cmd.time,
            from = ?self.curr_att,
            to = ?target,
            n_samples = atts.len(),
            "maneuver"
        );
        let Some(last) = atts.last() else {
            tracing::warn!(date = cmd.date.as_str(), "oracle returned no attitudes");
            return Ok(());
        };

        // Each sample carries the mean pitch over its interval
        let pitches: Vec<f64> = atts
            .windows(2)
            .map(|w| (w[0].pitch + w[1].pitch) / 2.0)
            .chain(std::iter::once(last.pitch))
            .collect();

        for (att, pitch) in atts.iter().zip(pitches) {
            let q = att.quat;
            self.transitions.add(
                &secs_to_date(att.time)?,
                [
                    StateUpdate::Pitch(pitch),
                    StateUpdate::Q1(q.q1),
                    StateUpdate::Q2(q.q2),
                    StateUpdate::Q3(q.q3),
                    StateUpdate::Q4(q.q4),
                    StateUpdate::Ra(q.ra()),
                    StateUpdate::Dec(q.dec()),
                    StateUpdate::Roll(q.roll()),
                ],
            );
        }

        if self.auto_npnt {
            self.transitions.add(
                &secs_to_date(last.time)?,
                [StateUpdate::PcadMode(PcadMode::Npnt)],
            );
        }

        self.curr_att = target;
        Ok(())
    }
}

/// Switch command effects the interpreter models
#[derive(Debug, Clone, Copy, PartialEq)]
enum SwitchAction {
    AutoNpnt(bool),
    Mode(PcadMode),
    Hetg(Grating),
    Letg(Grating),
    Dither(Dither),
    Maneuver,
    NsmSafe,
    Unrecognized,
}

impl SwitchAction {
    fn parse(mnemonic: &str) -> Self {
        match mnemonic {
            "AONM2NPE" => SwitchAction::AutoNpnt(true),
            "AONM2NPD" => SwitchAction::AutoNpnt(false),
            "AONMMODE" => SwitchAction::Mode(PcadMode::Nman),
            "AONPMODE" => SwitchAction::Mode(PcadMode::Npnt),
            "4OHETGIN" => SwitchAction::Hetg(Grating::Inserted),
            "4OHETGRE" => SwitchAction::Hetg(Grating::Retracted),
            "4OLETGIN" => SwitchAction::Letg(Grating::Inserted),
            "4OLETGRE" => SwitchAction::Letg(Grating::Retracted),
            "AOENDITH" => SwitchAction::Dither(Dither::Enabled),
            "AODSDITH" => SwitchAction::Dither(Dither::Disabled),
            "AOMANUVR" => SwitchAction::Maneuver,
            "AONSMSAF" => SwitchAction::NsmSafe,
            _ => SwitchAction::Unrecognized,
        }
    }
}

/// State updates for an ACIS packet mnemonic; empty when not modelled
fn acis_updates(mnemonic: &str) -> Result<Vec<StateUpdate>> {
    let power_cmd = || StateUpdate::PowerCmd(mnemonic.to_string());
    let updates = match mnemonic {
        m if m.starts_with("WSPOW") => {
            let pwr = decode_power(m)?;
            vec![
                StateUpdate::FepCount(pwr.fep_count),
                StateUpdate::CcdCount(pwr.ccd_count),
                StateUpdate::VidBoard(true),
                StateUpdate::Clocking(false),
                power_cmd(),
            ]
        }
        m if m.starts_with("XTZ0000005") || m.starts_with("XCZ0000005") => {
            vec![StateUpdate::Clocking(true), power_cmd()]
        }
        "WSVIDALLDN" => vec![StateUpdate::VidBoard(false), power_cmd()],
        "AA00000000" => vec![StateUpdate::Clocking(false), power_cmd()],
        "WSFEPALLUP" => vec![StateUpdate::FepCount(6), power_cmd()],
        m if m.starts_with("WC") => vec![StateUpdate::SiMode(format!("CC_{}", mode_code(m)))],
        m if m.starts_with("WT") => vec![StateUpdate::SiMode(format!("TE_{}", mode_code(m)))],
        _ => Vec::new(),
    };
    Ok(updates)
}

/// Characters 2..7 of a science mode mnemonic
fn mode_code(mnemonic: &str) -> String {
    mnemonic.chars().skip(2).take(5).collect()
}

/// Chain transitions onto `state0` and close each interval.
fn build_states(state0: &State, transitions: Transitions) -> Result<Vec<State>> {
    let mut states = Vec::with_capacity(transitions.len() + 1);
    states.push(state0.clone());

    for (date, transition) in transitions.into_sorted() {
        let mut next = states[states.len() - 1].clone();
        next.datestart = date;
        for update in transition.updates() {
            next.apply(update);
        }
        next.trans_keys = transition.keys();
        states.push(next);
    }

    let next_starts: Vec<String> = states
        .iter()
        .skip(1)
        .map(|s| s.datestart.clone())
        .chain(std::iter::once(DATESTOP_SENTINEL.to_string()))
        .collect();
    for (state, datestop) in states.iter_mut().zip(next_starts) {
        state.datestop = datestop;
        state.tstart = date_to_secs(&state.datestart)?;
        state.tstop = date_to_secs(&state.datestop)?;
    }

    tracing::debug!(n_states = states.len(), "built states");
    Ok(states)
}

/// Reject commands dated before the start of the window they were
/// assembled for.
///
/// # Errors
///
/// `CommandBeforeWindow` naming the first offending command.
pub fn check_window(cmds: &[Command], window_start: &str) -> Result<()> {
    match cmds.iter().find(|c| c.date.as_str() < window_start) {
        Some(cmd) => Err(StatesError::CommandBeforeWindow {
            date: cmd.date.clone(),
            window_start: window_start.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::default_state0;
    use crate::oracle::SlerpManeuverOracle;

    fn no_samples() -> InterpretOptions {
        InterpretOptions {
            pitch_sample_interval: 0.0,
            ..InterpretOptions::default()
        }
    }

    fn cmd(date: &str, kind: CommandKind) -> Command {
        let time = date_to_secs(date).unwrap();
        Command::new(date, time, kind)
    }

    fn acis(date: &str, mnemonic: &str) -> Command {
        cmd(
            date,
            CommandKind::AcisPacket {
                mnemonic: mnemonic.to_string(),
            },
        )
    }

    #[test]
    fn test_power_command_sets_counts_and_video() {
        let state0 = default_state0().unwrap();
        let cmds = vec![acis("2002:010:00:00:00.000", "WSPOW08F3E")];
        let states = get_states(&state0, &cmds, &SlerpManeuverOracle::default(), &no_samples())
            .unwrap();

        assert_eq!(states.len(), 2);
        let s = &states[1];
        assert_eq!(s.fep_count, 5);
        assert_eq!(s.ccd_count, 5);
        assert!(s.vid_board);
        assert!(!s.clocking);
        assert_eq!(s.power_cmd, "WSPOW08F3E");
        assert_eq!(
            s.trans_keys.to_string(),
            "ccd_count,clocking,fep_count,power_cmd,vid_board"
        );
    }

    #[test]
    fn test_malformed_power_command_aborts() {
        let state0 = default_state0().unwrap();
        let cmds = vec![acis("2002:010:00:00:00.000", "WSPOW08F3")];
        let err = get_states(&state0, &cmds, &SlerpManeuverOracle::default(), &no_samples())
            .unwrap_err();
        assert!(matches!(err, StatesError::InvalidPowerCommand { .. }));
    }

    #[test]
    fn test_science_mode_labels() {
        assert_eq!(
            acis_updates("WT00C62014").unwrap(),
            vec![StateUpdate::SiMode("TE_00C62".to_string())]
        );
        assert_eq!(
            acis_updates("WC000B4014").unwrap(),
            vec![StateUpdate::SiMode("CC_000B4".to_string())]
        );
        assert!(acis_updates("RS_0000001").unwrap().is_empty());
    }

    #[test]
    fn test_command_on_state0_date_is_not_applied() {
        let state0 = default_state0().unwrap();
        let cmds = vec![cmd(&state0.datestart, CommandKind::SetObsid { id: 1 })];
        let states = get_states(&state0, &cmds, &SlerpManeuverOracle::default(), &no_samples())
            .unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].obsid, 61358);
    }

    #[test]
    fn test_pitch_samples_dropped_inside_maneuver() {
        let state0 = default_state0().unwrap();
        let oracle = SlerpManeuverOracle {
            rate_deg_per_sec: 0.001,
            step_secs: 10000.0,
        };
        let target = Quat::from_equatorial(12.0, -11.5, 289.37);
        let cmds = vec![
            cmd("2002:008:00:00:00.000", CommandKind::TargetQuat { target }),
            cmd(
                "2002:008:00:00:01.000",
                CommandKind::Switch {
                    mnemonic: "AOMANUVR".to_string(),
                },
            ),
            cmd("2002:012:00:00:00.000", CommandKind::SetObsid { id: 2 }),
        ];
        let states = get_states(
            &state0,
            &cmds,
            &oracle,
            &InterpretOptions::default(),
        )
        .unwrap();

        let manvr_start = "2002:008:00:00:01.000";
        let manvr_end = states
            .iter()
            .rev()
            .find(|s| s.trans_keys.contains(crate::model::StateKey::Q1))
            .map(|s| s.datestart.clone())
            .unwrap();
        for s in &states {
            if s.datestart.as_str() > manvr_start && s.datestart < manvr_end {
                assert!(
                    s.trans_keys.contains(crate::model::StateKey::Q1),
                    "pitch-only state {} inside maneuver",
                    s.datestart
                );
            }
        }
        // Samples resume after the maneuver
        assert!(states
            .iter()
            .any(|s| s.datestart > manvr_end && s.trans_keys.to_string() == "pitch"));
    }

    #[test]
    fn test_check_window_rejects_early_command() {
        let cmds = vec![
            cmd("2010:001:00:00:00.000", CommandKind::PitchSample),
            cmd("2009:365:00:00:00.000", CommandKind::PitchSample),
        ];
        let err = check_window(&cmds, "2010:001:00:00:00.000").unwrap_err();
        assert_eq!(
            err,
            StatesError::CommandBeforeWindow {
                date: "2009:365:00:00:00.000".to_string(),
                window_start: "2010:001:00:00:00.000".to_string(),
            }
        );
        assert!(check_window(&cmds[..1], "2010:001:00:00:00.000").is_ok());
    }
}
