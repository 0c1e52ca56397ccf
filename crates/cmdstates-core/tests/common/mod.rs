use cmdstates_core::attitude::{self, Quat};
use cmdstates_core::errors::{ExError, ExErrorKind};
use cmdstates_core::interpret::{get_states, InterpretOptions};
use cmdstates_core::oracle::{AttitudeSample, ManeuverOracle, SlerpManeuverOracle};
use cmdstates_core::store::RowStore;
use cmdstates_core::time::{date_to_secs, secs_to_date};
use cmdstates_core::{default_state0, Command, CommandKind, State};

/// Command at `date` with its mission seconds filled in
#[allow(dead_code)]
pub fn cmd(date: &str, kind: CommandKind) -> Command {
    Command::new(date, date_to_secs(date).unwrap(), kind)
}

#[allow(dead_code)]
pub fn switch(date: &str, mnemonic: &str) -> Command {
    cmd(
        date,
        CommandKind::Switch {
            mnemonic: mnemonic.to_string(),
        },
    )
}

/// Interpreter options with pitch sampling turned off
#[allow(dead_code)]
pub fn no_samples() -> InterpretOptions {
    InterpretOptions {
        pitch_sample_interval: 0.0,
        ..InterpretOptions::default()
    }
}

/// `n` states: the default state0 followed by one obsid change per day of 2010
#[allow(dead_code)]
pub fn obsid_sequence(n: usize) -> Vec<State> {
    let state0 = default_state0().unwrap();
    let t0 = date_to_secs("2010:001:00:00:00.000").unwrap();
    let cmds: Vec<Command> = (1..n)
        .map(|i| {
            let t = t0 + (i as f64) * 86400.0;
            Command::new(
                secs_to_date(t).unwrap(),
                t,
                CommandKind::SetObsid { id: 1000 + i as i64 },
            )
        })
        .collect();
    get_states(&state0, &cmds, &SlerpManeuverOracle::default(), &no_samples()).unwrap()
}

/// Oracle returning `n_steps + 1` samples, `step_secs` apart, with pitch
/// 10 degrees times the sample index
#[allow(dead_code)]
pub struct ScriptedOracle {
    pub n_steps: usize,
    pub step_secs: f64,
}

impl ManeuverOracle for ScriptedOracle {
    fn attitudes(&self, start: &Quat, target: &Quat, tstart: f64) -> Vec<AttitudeSample> {
        (0..=self.n_steps)
            .map(|i| AttitudeSample {
                time: tstart + self.step_secs * i as f64,
                quat: start.slerp(target, i as f64 / self.n_steps as f64),
                pitch: 10.0 * i as f64,
            })
            .collect()
    }

    fn nsm_attitude(&self, _current: &Quat, time: f64) -> Quat {
        let (ra, dec) = attitude::sun_position(time);
        Quat::from_equatorial(ra, dec - 90.0, 0.0)
    }
}

/// Row store delegating to an inner store but failing every insert
#[allow(dead_code)]
pub struct FailingInsertRows<R: RowStore>(pub R);

impl<R: RowStore> RowStore for FailingInsertRows<R> {
    fn fetch_overlapping(&self, start: &str, stop: &str) -> Result<Vec<State>, ExError> {
        self.0.fetch_overlapping(start, stop)
    }

    fn fetch_all(&self) -> Result<Vec<State>, ExError> {
        self.0.fetch_all()
    }

    fn tail(&self, n: usize) -> Result<Vec<State>, ExError> {
        self.0.tail(n)
    }

    fn last_state_before(&self, date: &str, pcad_mode: &str) -> Result<Option<State>, ExError> {
        self.0.last_state_before(date, pcad_mode)
    }

    fn count(&self) -> Result<usize, ExError> {
        self.0.count()
    }

    fn delete_from(&mut self, datestart: &str) -> Result<usize, ExError> {
        self.0.delete_from(datestart)
    }

    fn insert(&mut self, _states: &[State]) -> Result<(), ExError> {
        Err(ExError::new(ExErrorKind::Persistence)
            .with_op("insert")
            .with_message("disk full"))
    }
}
