use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::StatesError;

/// Attribute of a commanded state that a transition can change
///
/// Variants are declared in column-name order so that iterating a
/// [`TransKeys`] yields names already sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateKey {
    CcdCount,
    Clocking,
    Dec,
    Dither,
    FepCount,
    Hetg,
    Letg,
    Obsid,
    PcadMode,
    Pitch,
    PowerCmd,
    Q1,
    Q2,
    Q3,
    Q4,
    Ra,
    Roll,
    SiMode,
    SimfaPos,
    Simpos,
    VidBoard,
}

impl StateKey {
    pub const ALL: [StateKey; 21] = [
        StateKey::CcdCount,
        StateKey::Clocking,
        StateKey::Dec,
        StateKey::Dither,
        StateKey::FepCount,
        StateKey::Hetg,
        StateKey::Letg,
        StateKey::Obsid,
        StateKey::PcadMode,
        StateKey::Pitch,
        StateKey::PowerCmd,
        StateKey::Q1,
        StateKey::Q2,
        StateKey::Q3,
        StateKey::Q4,
        StateKey::Ra,
        StateKey::Roll,
        StateKey::SiMode,
        StateKey::SimfaPos,
        StateKey::Simpos,
        StateKey::VidBoard,
    ];

    /// Column name in the persisted schema
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::CcdCount => "ccd_count",
            StateKey::Clocking => "clocking",
            StateKey::Dec => "dec",
            StateKey::Dither => "dither",
            StateKey::FepCount => "fep_count",
            StateKey::Hetg => "hetg",
            StateKey::Letg => "letg",
            StateKey::Obsid => "obsid",
            StateKey::PcadMode => "pcad_mode",
            StateKey::Pitch => "pitch",
            StateKey::PowerCmd => "power_cmd",
            StateKey::Q1 => "q1",
            StateKey::Q2 => "q2",
            StateKey::Q3 => "q3",
            StateKey::Q4 => "q4",
            StateKey::Ra => "ra",
            StateKey::Roll => "roll",
            StateKey::SiMode => "si_mode",
            StateKey::SimfaPos => "simfa_pos",
            StateKey::Simpos => "simpos",
            StateKey::VidBoard => "vid_board",
        }
    }

    fn bit(&self) -> u32 {
        1 << (*self as u32)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateKey {
    type Err = StatesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StatesError::InvalidStateKey { key: s.to_string() })
    }
}

/// Set of state keys changed by a transition
///
/// Rendered as the sorted, comma-joined key names; the empty set renders as
/// `undef`, the marker carried by an initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TransKeys(u32);

const UNDEF: &str = "undef";

impl TransKeys {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, key: StateKey) {
        self.0 |= key.bit();
    }

    pub fn contains(&self, key: StateKey) -> bool {
        self.0 & key.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Keys in sorted order
    pub fn iter(&self) -> impl Iterator<Item = StateKey> + '_ {
        StateKey::ALL.iter().copied().filter(move |k| self.contains(*k))
    }

    pub fn intersects(&self, other: &TransKeys) -> bool {
        self.0 & other.0 != 0
    }
}

impl FromIterator<StateKey> for TransKeys {
    fn from_iter<I: IntoIterator<Item = StateKey>>(iter: I) -> Self {
        let mut keys = TransKeys::new();
        for key in iter {
            keys.insert(key);
        }
        keys
    }
}

impl fmt::Display for TransKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str(UNDEF);
        }
        let names: Vec<&str> = self.iter().map(|k| k.as_str()).collect();
        f.write_str(&names.join(","))
    }
}

impl FromStr for TransKeys {
    type Err = StatesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == UNDEF {
            return Ok(TransKeys::new());
        }
        s.split(',').map(|name| name.trim().parse()).collect()
    }
}

impl Serialize for TransKeys {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TransKeys {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
