use serde::{Deserialize, Serialize};
use std::fmt;

use super::keys::{StateKey, TransKeys};
use super::transition::StateUpdate;
use crate::attitude::Quat;
use crate::errors::Result;
use crate::time::{date_to_secs, DATESTOP_SENTINEL};

/// A commanded state: spacecraft configuration over `[datestart, datestop)`
///
/// Field names and types are the persisted row schema shared by both stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub datestart: String,
    pub datestop: String,
    pub tstart: f64,
    pub tstop: f64,
    pub obsid: i64,
    pub power_cmd: String,
    pub si_mode: String,
    pub pcad_mode: String,
    pub vid_board: bool,
    pub clocking: bool,
    pub fep_count: u32,
    pub ccd_count: u32,
    pub simpos: i64,
    pub simfa_pos: i64,
    pub pitch: f64,
    pub ra: f64,
    pub dec: f64,
    pub roll: f64,
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    pub q4: f64,
    pub trans_keys: TransKeys,
    pub hetg: String,
    pub letg: String,
    pub dither: String,
}

/// Value of a single state attribute
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", u8::from(*v)),
            FieldValue::Str(v) => f.write_str(v),
        }
    }
}

impl State {
    /// Current value of `key`
    pub fn field(&self, key: StateKey) -> FieldValue {
        match key {
            StateKey::CcdCount => FieldValue::Int(self.ccd_count.into()),
            StateKey::Clocking => FieldValue::Bool(self.clocking),
            StateKey::Dec => FieldValue::Float(self.dec),
            StateKey::Dither => FieldValue::Str(self.dither.clone()),
            StateKey::FepCount => FieldValue::Int(self.fep_count.into()),
            StateKey::Hetg => FieldValue::Str(self.hetg.clone()),
            StateKey::Letg => FieldValue::Str(self.letg.clone()),
            StateKey::Obsid => FieldValue::Int(self.obsid),
            StateKey::PcadMode => FieldValue::Str(self.pcad_mode.clone()),
            StateKey::Pitch => FieldValue::Float(self.pitch),
            StateKey::PowerCmd => FieldValue::Str(self.power_cmd.clone()),
            StateKey::Q1 => FieldValue::Float(self.q1),
            StateKey::Q2 => FieldValue::Float(self.q2),
            StateKey::Q3 => FieldValue::Float(self.q3),
            StateKey::Q4 => FieldValue::Float(self.q4),
            StateKey::Ra => FieldValue::Float(self.ra),
            StateKey::Roll => FieldValue::Float(self.roll),
            StateKey::SiMode => FieldValue::Str(self.si_mode.clone()),
            StateKey::SimfaPos => FieldValue::Int(self.simfa_pos),
            StateKey::Simpos => FieldValue::Int(self.simpos),
            StateKey::VidBoard => FieldValue::Bool(self.vid_board),
        }
    }

    /// Apply one attribute update in place
    pub fn apply(&mut self, update: &StateUpdate) {
        match update {
            StateUpdate::Obsid(v) => self.obsid = *v,
            StateUpdate::PowerCmd(v) => self.power_cmd = v.clone(),
            StateUpdate::SiMode(v) => self.si_mode = v.clone(),
            StateUpdate::PcadMode(v) => self.pcad_mode = v.to_string(),
            StateUpdate::VidBoard(v) => self.vid_board = *v,
            StateUpdate::Clocking(v) => self.clocking = *v,
            StateUpdate::FepCount(v) => self.fep_count = *v,
            StateUpdate::CcdCount(v) => self.ccd_count = *v,
            StateUpdate::Simpos(v) => self.simpos = *v,
            StateUpdate::SimfaPos(v) => self.simfa_pos = *v,
            StateUpdate::Pitch(v) => self.pitch = *v,
            StateUpdate::Ra(v) => self.ra = *v,
            StateUpdate::Dec(v) => self.dec = *v,
            StateUpdate::Roll(v) => self.roll = *v,
            StateUpdate::Q1(v) => self.q1 = *v,
            StateUpdate::Q2(v) => self.q2 = *v,
            StateUpdate::Q3(v) => self.q3 = *v,
            StateUpdate::Q4(v) => self.q4 = *v,
            StateUpdate::Hetg(v) => self.hetg = v.to_string(),
            StateUpdate::Letg(v) => self.letg = v.to_string(),
            StateUpdate::Dither(v) => self.dither = v.to_string(),
        }
    }

    /// Attitude quaternion of this state
    pub fn attitude(&self) -> Quat {
        Quat::new(self.q1, self.q2, self.q3, self.q4)
    }
}

/// Canonical spacecraft state at the start of 2002:007:13:00:00.000
///
/// Used as the starting point when the row store holds nothing definitive.
///
/// # Errors
///
/// Only if the date conversion itself fails.
pub fn default_state0() -> Result<State> {
    let datestart = "2002:007:13:00:00.000".to_string();
    let datestop = DATESTOP_SENTINEL.to_string();
    Ok(State {
        tstart: date_to_secs(&datestart)?,
        tstop: date_to_secs(&datestop)?,
        datestart,
        datestop,
        obsid: 61358,
        power_cmd: "AA00000000".to_string(),
        si_mode: "undef".to_string(),
        pcad_mode: "NPNT".to_string(),
        vid_board: false,
        clocking: false,
        fep_count: 0,
        ccd_count: 5,
        simpos: -99616,
        simfa_pos: -468,
        pitch: 61.37,
        ra: 352.0,
        dec: -11.5,
        roll: 289.37,
        q1: -0.568062,
        q2: 0.121674,
        q3: 0.00114141,
        q4: 0.813941,
        trans_keys: TransKeys::new(),
        hetg: "RETR".to_string(),
        letg: "RETR".to_string(),
        dither: "None".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::transition::PcadMode;

    #[test]
    fn test_default_state0_times_derived_from_dates() {
        let s = default_state0().unwrap();
        assert!((s.tstart - 126795664.184).abs() < 1e-3);
        assert_eq!(s.datestop, DATESTOP_SENTINEL);
        assert!(s.trans_keys.is_empty());
    }

    #[test]
    fn test_apply_and_field_agree() {
        let mut s = default_state0().unwrap();
        s.apply(&StateUpdate::Obsid(12345));
        s.apply(&StateUpdate::PcadMode(PcadMode::Nman));
        assert_eq!(s.field(StateKey::Obsid), FieldValue::Int(12345));
        assert_eq!(
            s.field(StateKey::PcadMode),
            FieldValue::Str("NMAN".to_string())
        );
    }

    #[test]
    fn test_serializes_trans_keys_as_string() {
        let s = default_state0().unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["trans_keys"], "undef");
        let back: State = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }
}
