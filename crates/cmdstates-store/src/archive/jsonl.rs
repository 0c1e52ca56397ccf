//! JSON-lines archive
//!
//! Row `i` of the archive is line `i` of the file. The file existing is what
//! makes the archive initialized. Appends go to the end of the file; row
//! removal and creation rewrite it atomically.
//!
//! Parsed rows are cached against the file size, so one reconciliation
//! pass parses the file at most once. Any change to the size made outside
//! this handle forces a reload.

#![allow(clippy::result_large_err)]

use super::atomic::atomic_write;
use crate::errors::{archive_corrupt, archive_missing, io_error, Result};
use cmdstates_core::errors::{ExError, ExErrorKind};
use cmdstates_core::model::State;
use cmdstates_core::store::ArchiveStore;
#[cfg(test)]
use std::cell::Cell;
use std::cell::RefCell;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
struct Cached {
    rows: Vec<State>,
    size: u64,
}

#[derive(Debug, Clone)]
pub struct JsonlArchive {
    path: PathBuf,
    cache: RefCell<Option<Cached>>,
    #[cfg(test)]
    loads: Cell<usize>,
}

impl JsonlArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RefCell::new(None),
            #[cfg(test)]
            loads: Cell::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All archive rows in file order; empty when not created
    pub fn read_all(&self) -> Result<Vec<State>> {
        self.with_rows(<[State]>::to_vec)
    }

    fn file_size(&self) -> Result<Option<u64>> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("archive_stat", e)),
        }
    }

    /// Run `f` over the current rows, parsing the file only when it changed
    /// size since the last look.
    fn with_rows<T>(&self, f: impl FnOnce(&[State]) -> T) -> Result<T> {
        let Some(size) = self.file_size()? else {
            self.cache.replace(None);
            return Ok(f(&[]));
        };
        let mut cache = self.cache.borrow_mut();
        if cache.as_ref().map_or(true, |c| c.size != size) {
            let rows = self.load()?;
            *cache = Some(Cached { rows, size });
        }
        Ok(f(cache.as_ref().map_or(&[][..], |c| c.rows.as_slice())))
    }

    fn load(&self) -> Result<Vec<State>> {
        #[cfg(test)]
        self.loads.set(self.loads.get() + 1);
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("archive_read", e)),
        };
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| serde_json::from_str(line).map_err(|e| archive_corrupt(i + 1, e)))
            .collect()
    }

    fn write_all(&mut self, states: &[State]) -> Result<()> {
        atomic_write(&self.path, &encode(states)?)?;
        self.remember(states.to_vec())
    }

    fn remember(&mut self, rows: Vec<State>) -> Result<()> {
        *self.cache.get_mut() = self.file_size()?.map(|size| Cached { rows, size });
        Ok(())
    }
}

fn encode(states: &[State]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for state in states {
        serde_json::to_writer(&mut buf, state).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("archive_write")
                .with_date(state.datestart.clone())
                .with_message(e.to_string())
        })?;
        buf.push(b'\n');
    }
    Ok(buf)
}

fn matching_indices(states: &[State], pred: impl Fn(&State) -> bool) -> Vec<usize> {
    states
        .iter()
        .enumerate()
        .filter(|(_, s)| pred(s))
        .map(|(i, _)| i)
        .collect()
}

impl ArchiveStore for JsonlArchive {
    fn is_initialized(&self) -> bool {
        self.path.is_file()
    }

    fn create(&mut self, states: &[State]) -> Result<()> {
        self.write_all(states)?;
        tracing::info!(path = %self.path.display(), n_rows = states.len(), "created archive");
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        self.with_rows(<[State]>::len)
    }

    fn indices_from(&self, datestart: &str) -> Result<Vec<usize>> {
        self.with_rows(|rows| matching_indices(rows, |s| s.datestart.as_str() >= datestart))
    }

    fn indices_overlapping(&self, start: &str, stop: &str) -> Result<Vec<usize>> {
        self.with_rows(|rows| {
            matching_indices(rows, |s| {
                s.datestop.as_str() > start && s.datestart.as_str() < stop
            })
        })
    }

    fn read_range(&self, start: usize, stop: usize) -> Result<Vec<State>> {
        self.with_rows(|rows| {
            rows.get(start..stop).map(<[State]>::to_vec).ok_or_else(|| {
                ExError::new(ExErrorKind::Persistence)
                    .with_op("read_range")
                    .with_message(format!(
                        "rows {}..{} out of range for {} archive rows",
                        start,
                        stop,
                        rows.len()
                    ))
            })
        })?
    }

    fn append(&mut self, states: &[State]) -> Result<()> {
        if !self.is_initialized() {
            return Err(archive_missing("archive_append"));
        }
        let before = self.file_size()?;
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| io_error("archive_append", e))?;
        file.write_all(&encode(states)?)
            .map_err(|e| io_error("archive_append", e))?;
        file.sync_data().map_err(|e| io_error("archive_sync", e))?;

        let cached = self.cache.get_mut().take();
        match cached {
            Some(mut c) if Some(c.size) == before => {
                c.rows.extend_from_slice(states);
                self.remember(c.rows)
            }
            _ => Ok(()),
        }
    }

    fn remove_rows(&mut self, start: usize, stop: usize) -> Result<()> {
        if !self.is_initialized() {
            return Err(archive_missing("archive_remove_rows"));
        }
        let mut all = self.read_all()?;
        if start > stop || stop != all.len() {
            return Err(ExError::new(ExErrorKind::ArchiveNotContiguous)
                .with_op("archive_remove_rows")
                .with_message(format!("rows {}..{} are not a suffix", start, stop)));
        }
        all.truncate(start);
        self.write_all(&all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdstates_core::model::default_state0;
    use tempfile::TempDir;

    fn states(n: usize) -> Vec<State> {
        (0..n)
            .map(|i| {
                let mut s = default_state0().unwrap();
                s.datestart = format!("2010:{:03}:00:00:00.000", i + 1);
                s.datestop = format!("2010:{:03}:00:00:00.000", i + 2);
                s.obsid = i as i64;
                s
            })
            .collect()
    }

    #[test]
    fn test_uninitialized_until_created() {
        let dir = TempDir::new().unwrap();
        let mut archive = JsonlArchive::new(dir.path().join("cmd_states.jsonl"));
        assert!(!archive.is_initialized());
        assert_eq!(archive.len().unwrap(), 0);
        assert!(archive.append(&states(1)).is_err());

        archive.create(&[]).unwrap();
        assert!(archive.is_initialized());
        assert!(archive.is_empty().unwrap());
    }

    #[test]
    fn test_append_and_remove_suffix() {
        let dir = TempDir::new().unwrap();
        let mut archive = JsonlArchive::new(dir.path().join("cmd_states.jsonl"));
        let rows = states(5);
        archive.create(&rows[..3]).unwrap();
        archive.append(&rows[3..]).unwrap();
        assert_eq!(archive.read_all().unwrap(), rows);

        assert_eq!(
            archive.indices_from("2010:004:00:00:00.000").unwrap(),
            vec![3, 4]
        );
        archive.remove_rows(3, 5).unwrap();
        assert_eq!(archive.read_all().unwrap(), rows[..3].to_vec());
    }

    #[test]
    fn test_remove_rows_requires_suffix() {
        let dir = TempDir::new().unwrap();
        let mut archive = JsonlArchive::new(dir.path().join("cmd_states.jsonl"));
        archive.create(&states(4)).unwrap();
        let err = archive.remove_rows(1, 3).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::ArchiveNotContiguous);
        assert_eq!(archive.len().unwrap(), 4);
    }

    #[test]
    fn test_rows_parsed_once_across_queries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cmd_states.jsonl");
        let rows = states(6);
        JsonlArchive::new(&path).create(&rows[..4]).unwrap();

        let mut archive = JsonlArchive::new(&path);
        assert_eq!(archive.len().unwrap(), 4);
        assert_eq!(
            archive.indices_from("2010:003:00:00:00.000").unwrap(),
            vec![2, 3]
        );
        assert_eq!(
            archive
                .indices_overlapping("2010:001:12:00:00.000", "2010:003:00:00:00.000")
                .unwrap(),
            vec![0, 1]
        );
        assert_eq!(archive.read_range(1, 3).unwrap(), rows[1..3].to_vec());
        assert_eq!(archive.loads.get(), 1);

        archive.append(&rows[4..]).unwrap();
        archive.remove_rows(5, 6).unwrap();
        assert_eq!(archive.read_all().unwrap(), rows[..5].to_vec());
        assert_eq!(archive.loads.get(), 1);
        assert_eq!(JsonlArchive::new(&path).read_all().unwrap(), rows[..5].to_vec());
    }

    #[test]
    fn test_outside_change_forces_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cmd_states.jsonl");
        let rows = states(3);
        let mut archive = JsonlArchive::new(&path);
        archive.create(&rows[..2]).unwrap();
        assert_eq!(archive.len().unwrap(), 2);

        JsonlArchive::new(&path).append(&rows[2..]).unwrap();
        assert_eq!(archive.read_all().unwrap(), rows);
        assert_eq!(archive.loads.get(), 1);
    }

    #[test]
    fn test_corrupt_line_reports_line_number() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cmd_states.jsonl");
        let mut archive = JsonlArchive::new(&path);
        archive.create(&states(1)).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not json").unwrap();

        let err = archive.read_all().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Serialization);
        assert!(err.message().contains("line 2"));
    }
}
