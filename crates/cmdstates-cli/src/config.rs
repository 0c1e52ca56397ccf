//! TOML configuration
//!
//! Every field has a default, so a partial file (or no file) is fine.

use cmdstates_core::interpret::PITCH_SAMPLE_INTERVAL;
use cmdstates_core::logging_facility::init::Profile;
use cmdstates_core::reconcile::pipeline::{N_CHECK_CHANGED, N_CHECK_UNCHANGED};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "cmd-states.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite row store
    pub db: PathBuf,
    /// JSON-lines archive
    pub archive: PathBuf,
    pub pitch_sample_interval: f64,
    pub n_check_changed: usize,
    pub n_check_unchanged: usize,
    /// States newer than this many days before now are not used as state0
    pub date_margin_days: f64,
    pub log_profile: Profile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db: PathBuf::from("cmd_states.db3"),
            archive: PathBuf::from("cmd_states.jsonl"),
            pitch_sample_interval: PITCH_SAMPLE_INTERVAL,
            n_check_changed: N_CHECK_CHANGED,
            n_check_unchanged: N_CHECK_UNCHANGED,
            date_margin_days: 10.0,
            log_profile: Profile::Development,
        }
    }
}

/// Load `path`, or `./cmd-states.toml` if it exists, or the defaults.
///
/// An explicitly named file must exist.
pub fn load(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(CONFIG_FILE);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };
    let contents = fs::read_to_string(&path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    parse(&contents).map_err(|e| format!("failed to parse {}: {e}", path.display()).into())
}

fn parse(contents: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg = parse("db = \"/data/states.db3\"\nn_check_changed = 10\n").unwrap();
        assert_eq!(cfg.db, PathBuf::from("/data/states.db3"));
        assert_eq!(cfg.n_check_changed, 10);
        assert_eq!(cfg.n_check_unchanged, 100);
        assert_eq!(cfg.archive, PathBuf::from("cmd_states.jsonl"));
        assert_eq!(cfg.log_profile, Profile::Development);
    }

    #[test]
    fn test_log_profile_is_lowercase() {
        let cfg = parse("log_profile = \"production\"").unwrap();
        assert_eq!(cfg.log_profile, Profile::Production);
        assert!(parse("log_profile = \"Loud\"").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(load(Some(Path::new("/nonexistent/cmd-states.toml"))).is_err());
    }
}
