use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::attitude::Quat;
use crate::errors::StatesError;

pub const MP_OBSID: &str = "MP_OBSID";
pub const SIMTRANS: &str = "SIMTRANS";
pub const SIMFOCUS: &str = "SIMFOCUS";
pub const ACISPKT: &str = "ACISPKT";
pub const MP_TARGQUAT: &str = "MP_TARGQUAT";
pub const COMMAND_SW: &str = "COMMAND_SW";
pub const PITCH_SAMPLE: &str = "PITCH_SAMPLE";

/// Command parameter value as it arrives from the command source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            ParamValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// Untyped command record supplied by a command source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub date: String,
    pub time: f64,
    /// Command type tag, e.g. `COMMAND_SW`
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tlmsid: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, ParamValue>,
}

impl CommandRecord {
    /// Mnemonic from the record or, failing that, its `TLMSID` parameter
    pub fn mnemonic(&self) -> String {
        self.tlmsid
            .clone()
            .or_else(|| {
                self.params
                    .get("TLMSID")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_default()
    }

    fn param<T>(&self, name: &str, get: impl Fn(&ParamValue) -> Option<T>) -> Result<T, StatesError> {
        self.params
            .get(name)
            .and_then(get)
            .ok_or_else(|| StatesError::MissingParam {
                cmd: self.cmd.clone(),
                date: self.date.clone(),
                param: name.to_string(),
            })
    }
}

/// Typed command payload
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    SetObsid { id: i64 },
    SimTrans { pos: i64 },
    SimFocus { pos: i64 },
    AcisPacket { mnemonic: String },
    TargetQuat { target: Quat },
    Switch { mnemonic: String },
    /// Synthetic sample asking for the pitch at the current attitude
    PitchSample,
    /// Any type the interpreter does not model
    Other { cmd: String, mnemonic: String },
}

/// A single timed command
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub date: String,
    pub time: f64,
    pub kind: CommandKind,
}

impl Command {
    pub fn new(date: impl Into<String>, time: f64, kind: CommandKind) -> Self {
        Self {
            date: date.into(),
            time,
            kind,
        }
    }

    /// Type tag used by command records
    pub fn type_name(&self) -> &str {
        match &self.kind {
            CommandKind::SetObsid { .. } => MP_OBSID,
            CommandKind::SimTrans { .. } => SIMTRANS,
            CommandKind::SimFocus { .. } => SIMFOCUS,
            CommandKind::AcisPacket { .. } => ACISPKT,
            CommandKind::TargetQuat { .. } => MP_TARGQUAT,
            CommandKind::Switch { .. } => COMMAND_SW,
            CommandKind::PitchSample => PITCH_SAMPLE,
            CommandKind::Other { cmd, .. } => cmd,
        }
    }
}

impl TryFrom<CommandRecord> for Command {
    type Error = StatesError;

    fn try_from(record: CommandRecord) -> Result<Self, Self::Error> {
        let kind = match record.cmd.as_str() {
            MP_OBSID => CommandKind::SetObsid {
                id: record.param("ID", ParamValue::as_i64)?,
            },
            SIMTRANS => CommandKind::SimTrans {
                pos: record.param("POS", ParamValue::as_i64)?,
            },
            SIMFOCUS => CommandKind::SimFocus {
                pos: record.param("POS", ParamValue::as_i64)?,
            },
            ACISPKT => CommandKind::AcisPacket {
                mnemonic: record.mnemonic(),
            },
            MP_TARGQUAT => CommandKind::TargetQuat {
                target: Quat::new(
                    record.param("Q1", ParamValue::as_f64)?,
                    record.param("Q2", ParamValue::as_f64)?,
                    record.param("Q3", ParamValue::as_f64)?,
                    record.param("Q4", ParamValue::as_f64)?,
                ),
            },
            COMMAND_SW => CommandKind::Switch {
                mnemonic: record.mnemonic(),
            },
            PITCH_SAMPLE => CommandKind::PitchSample,
            other => CommandKind::Other {
                cmd: other.to_string(),
                mnemonic: record.mnemonic(),
            },
        };
        Ok(Command {
            date: record.date,
            time: record.time,
            kind,
        })
    }
}

impl From<&Command> for CommandRecord {
    fn from(cmd: &Command) -> Self {
        let mut params = BTreeMap::new();
        let mut tlmsid = None;
        match &cmd.kind {
            CommandKind::SetObsid { id } => {
                params.insert("ID".to_string(), ParamValue::Int(*id));
            }
            CommandKind::SimTrans { pos } | CommandKind::SimFocus { pos } => {
                params.insert("POS".to_string(), ParamValue::Int(*pos));
            }
            CommandKind::AcisPacket { mnemonic }
            | CommandKind::Switch { mnemonic }
            | CommandKind::Other { mnemonic, .. } => {
                if !mnemonic.is_empty() {
                    tlmsid = Some(mnemonic.clone());
                }
            }
            CommandKind::TargetQuat { target } => {
                for (name, v) in [
                    ("Q1", target.q1),
                    ("Q2", target.q2),
                    ("Q3", target.q3),
                    ("Q4", target.q4),
                ] {
                    params.insert(name.to_string(), ParamValue::Float(v));
                }
            }
            CommandKind::PitchSample => {}
        }
        CommandRecord {
            date: cmd.date.clone(),
            time: cmd.time,
            cmd: cmd.type_name().to_string(),
            tlmsid,
            params,
        }
    }
}
