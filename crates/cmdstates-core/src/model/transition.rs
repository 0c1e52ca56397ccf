use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::keys::{StateKey, TransKeys};

/// Pointing control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PcadMode {
    /// Normal maneuver mode
    Nman,
    /// Normal point mode
    Npnt,
    /// Normal sun mode
    Nsun,
}

impl fmt::Display for PcadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PcadMode::Nman => "NMAN",
            PcadMode::Npnt => "NPNT",
            PcadMode::Nsun => "NSUN",
        })
    }
}

/// Grating position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grating {
    Inserted,
    Retracted,
}

impl fmt::Display for Grating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Grating::Inserted => "INSR",
            Grating::Retracted => "RETR",
        })
    }
}

/// Dither enable flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dither {
    Enabled,
    Disabled,
}

impl fmt::Display for Dither {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dither::Enabled => "ENAB",
            Dither::Disabled => "DISA",
        })
    }
}

/// New value for one state attribute
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    Obsid(i64),
    PowerCmd(String),
    SiMode(String),
    PcadMode(PcadMode),
    VidBoard(bool),
    Clocking(bool),
    FepCount(u32),
    CcdCount(u32),
    Simpos(i64),
    SimfaPos(i64),
    Pitch(f64),
    Ra(f64),
    Dec(f64),
    Roll(f64),
    Q1(f64),
    Q2(f64),
    Q3(f64),
    Q4(f64),
    Hetg(Grating),
    Letg(Grating),
    Dither(Dither),
}

impl StateUpdate {
    /// Attribute this update writes
    pub fn key(&self) -> StateKey {
        match self {
            StateUpdate::Obsid(_) => StateKey::Obsid,
            StateUpdate::PowerCmd(_) => StateKey::PowerCmd,
            StateUpdate::SiMode(_) => StateKey::SiMode,
            StateUpdate::PcadMode(_) => StateKey::PcadMode,
            StateUpdate::VidBoard(_) => StateKey::VidBoard,
            StateUpdate::Clocking(_) => StateKey::Clocking,
            StateUpdate::FepCount(_) => StateKey::FepCount,
            StateUpdate::CcdCount(_) => StateKey::CcdCount,
            StateUpdate::Simpos(_) => StateKey::Simpos,
            StateUpdate::SimfaPos(_) => StateKey::SimfaPos,
            StateUpdate::Pitch(_) => StateKey::Pitch,
            StateUpdate::Ra(_) => StateKey::Ra,
            StateUpdate::Dec(_) => StateKey::Dec,
            StateUpdate::Roll(_) => StateKey::Roll,
            StateUpdate::Q1(_) => StateKey::Q1,
            StateUpdate::Q2(_) => StateKey::Q2,
            StateUpdate::Q3(_) => StateKey::Q3,
            StateUpdate::Q4(_) => StateKey::Q4,
            StateUpdate::Hetg(_) => StateKey::Hetg,
            StateUpdate::Letg(_) => StateKey::Letg,
            StateUpdate::Dither(_) => StateKey::Dither,
        }
    }
}

/// All attribute updates attributed to one date, at most one per key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    updates: BTreeMap<StateKey, StateUpdate>,
}

impl Transition {
    pub fn keys(&self) -> TransKeys {
        self.updates.keys().copied().collect()
    }

    pub fn updates(&self) -> impl Iterator<Item = &StateUpdate> {
        self.updates.values()
    }

    pub fn get(&self, key: StateKey) -> Option<&StateUpdate> {
        self.updates.get(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Transitions collected while walking a command stream
///
/// Updates at the same date merge into one transition, last write wins per
/// key. `last_date` is the latest date at which any update was recorded.
#[derive(Debug, Clone, Default)]
pub struct Transitions {
    by_date: BTreeMap<String, Transition>,
    last_date: Option<String>,
    exclude: TransKeys,
}

impl Transitions {
    /// Accumulator ignoring any update group that touches an `exclude` key
    pub fn new(exclude: TransKeys) -> Self {
        Self {
            by_date: BTreeMap::new(),
            last_date: None,
            exclude,
        }
    }

    /// Record `updates` at `date`.
    ///
    /// The group is dropped whole if any of its keys is excluded. Returns
    /// whether it was recorded.
    pub fn add(&mut self, date: &str, updates: impl IntoIterator<Item = StateUpdate>) -> bool {
        let updates: Vec<StateUpdate> = updates.into_iter().collect();
        if updates.is_empty() || updates.iter().any(|u| self.exclude.contains(u.key())) {
            return false;
        }

        let transition = self.by_date.entry(date.to_string()).or_default();
        for update in updates {
            transition.updates.insert(update.key(), update);
        }

        if self.last_date.as_deref().map_or(true, |last| date > last) {
            self.last_date = Some(date.to_string());
        }
        true
    }

    /// Latest date with a recorded update
    pub fn last_date(&self) -> Option<&str> {
        self.last_date.as_deref()
    }

    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    /// Transitions in date order
    pub fn into_sorted(self) -> impl Iterator<Item = (String, Transition)> {
        self.by_date.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const D1: &str = "2010:001:00:00:00.000";
    const D2: &str = "2010:002:00:00:00.000";

    #[test]
    fn test_same_date_updates_merge_last_write_wins() {
        let mut t = Transitions::new(TransKeys::new());
        t.add(D1, [StateUpdate::Obsid(1), StateUpdate::Simpos(75624)]);
        t.add(D1, [StateUpdate::Obsid(2)]);

        assert_eq!(t.len(), 1);
        let (date, trans) = t.into_sorted().next().unwrap();
        assert_eq!(date, D1);
        assert_eq!(trans.get(StateKey::Obsid), Some(&StateUpdate::Obsid(2)));
        assert_eq!(trans.keys().to_string(), "obsid,simpos");
    }

    #[test]
    fn test_excluded_key_drops_whole_group() {
        let exclude: TransKeys = [StateKey::SimfaPos].into_iter().collect();
        let mut t = Transitions::new(exclude);
        assert!(!t.add(D1, [StateUpdate::SimfaPos(-468), StateUpdate::Obsid(3)]));
        assert!(t.is_empty());
        assert_eq!(t.last_date(), None);
    }

    #[test]
    fn test_last_date_tracks_latest_not_most_recent_call() {
        let mut t = Transitions::new(TransKeys::new());
        t.add(D2, [StateUpdate::Pitch(90.0)]);
        t.add(D1, [StateUpdate::Obsid(4)]);
        assert_eq!(t.last_date(), Some(D2));
    }
}
