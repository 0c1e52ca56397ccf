//! SQLite row store
//!
//! One row per state in `cmd_states`, keyed by `datestart`. Multi-row
//! writes run in a single transaction.

#![allow(clippy::result_large_err)]

use crate::db;
use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use cmdstates_core::model::{State, TransKeys};
use cmdstates_core::store::RowStore;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;

const COLUMNS: &str = "datestart, datestop, tstart, tstop, obsid, power_cmd, si_mode, pcad_mode, \
     vid_board, clocking, fep_count, ccd_count, simpos, simfa_pos, pitch, ra, dec, roll, \
     q1, q2, q3, q4, trans_keys, hetg, letg, dither";

pub struct SqliteRowStore {
    conn: Connection,
}

impl SqliteRowStore {
    /// Open (creating if needed) the row store at `path` and migrate it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = db::open(path)?;
        db::configure(&conn)?;
        Self::from_connection(conn)
    }

    /// In-memory row store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(db::open_in_memory()?)
    }

    pub fn from_connection(mut conn: Connection) -> Result<Self> {
        apply_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<State>> {
        let mut stmt = self.conn.prepare(sql).map_err(from_rusqlite)?;
        let states = stmt
            .query_map(params, state_from_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(states)
    }
}

fn state_from_row(row: &Row<'_>) -> rusqlite::Result<State> {
    let trans_keys: String = row.get(22)?;
    let trans_keys: TransKeys = trans_keys
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(22, Type::Text, Box::new(e)))?;

    Ok(State {
        datestart: row.get(0)?,
        datestop: row.get(1)?,
        tstart: row.get(2)?,
        tstop: row.get(3)?,
        obsid: row.get(4)?,
        power_cmd: row.get(5)?,
        si_mode: row.get(6)?,
        pcad_mode: row.get(7)?,
        vid_board: row.get(8)?,
        clocking: row.get(9)?,
        fep_count: row.get(10)?,
        ccd_count: row.get(11)?,
        simpos: row.get(12)?,
        simfa_pos: row.get(13)?,
        pitch: row.get(14)?,
        ra: row.get(15)?,
        dec: row.get(16)?,
        roll: row.get(17)?,
        q1: row.get(18)?,
        q2: row.get(19)?,
        q3: row.get(20)?,
        q4: row.get(21)?,
        trans_keys,
        hetg: row.get(23)?,
        letg: row.get(24)?,
        dither: row.get(25)?,
    })
}

impl RowStore for SqliteRowStore {
    fn fetch_overlapping(&self, start: &str, stop: &str) -> Result<Vec<State>> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM cmd_states \
                 WHERE datestop > ?1 AND datestart < ?2 ORDER BY datestart"
            ),
            [start, stop],
        )
    }

    fn fetch_all(&self) -> Result<Vec<State>> {
        self.query(
            &format!("SELECT {COLUMNS} FROM cmd_states ORDER BY datestart"),
            [],
        )
    }

    fn tail(&self, n: usize) -> Result<Vec<State>> {
        let mut states = self.query(
            &format!("SELECT {COLUMNS} FROM cmd_states ORDER BY datestart DESC LIMIT ?1"),
            [n as i64],
        )?;
        states.reverse();
        Ok(states)
    }

    fn last_state_before(&self, date: &str, pcad_mode: &str) -> Result<Option<State>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM cmd_states \
                     WHERE datestop < ?1 AND pcad_mode = ?2 \
                     ORDER BY datestop DESC LIMIT 1"
                ),
                [date, pcad_mode],
                state_from_row,
            )
            .optional()
            .map_err(from_rusqlite)
    }

    fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cmd_states", [], |row| row.get(0))
            .map_err(from_rusqlite)?;
        Ok(n as usize)
    }

    fn delete_from(&mut self, datestart: &str) -> Result<usize> {
        let n = self
            .conn
            .execute("DELETE FROM cmd_states WHERE datestart >= ?1", [datestart])
            .map_err(from_rusqlite)?;
        tracing::debug!(datestart, n, "deleted cmd_states rows");
        Ok(n)
    }

    fn insert(&mut self, states: &[State]) -> Result<()> {
        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO cmd_states ({COLUMNS}) VALUES \
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, \
                      ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26)"
                ))
                .map_err(from_rusqlite)?;
            for s in states {
                stmt.execute(rusqlite::params![
                    s.datestart,
                    s.datestop,
                    s.tstart,
                    s.tstop,
                    s.obsid,
                    s.power_cmd,
                    s.si_mode,
                    s.pcad_mode,
                    s.vid_board,
                    s.clocking,
                    s.fep_count,
                    s.ccd_count,
                    s.simpos,
                    s.simfa_pos,
                    s.pitch,
                    s.ra,
                    s.dec,
                    s.roll,
                    s.q1,
                    s.q2,
                    s.q3,
                    s.q4,
                    s.trans_keys.to_string(),
                    s.hetg,
                    s.letg,
                    s.dither,
                ])
                .map_err(from_rusqlite)?;
            }
        }
        tx.commit().map_err(from_rusqlite)?;
        tracing::debug!(n = states.len(), "inserted cmd_states rows");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdstates_core::model::default_state0;

    fn state_at(datestart: &str, datestop: &str, pcad_mode: &str) -> State {
        let mut s = default_state0().unwrap();
        s.datestart = datestart.to_string();
        s.datestop = datestop.to_string();
        s.pcad_mode = pcad_mode.to_string();
        s
    }

    fn three_rows() -> SqliteRowStore {
        let mut store = SqliteRowStore::open_in_memory().unwrap();
        store
            .insert(&[
                state_at("2010:001:00:00:00.000", "2010:002:00:00:00.000", "NPNT"),
                state_at("2010:002:00:00:00.000", "2010:003:00:00:00.000", "NMAN"),
                state_at("2010:003:00:00:00.000", "2099:365:00:00:00.000", "NPNT"),
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_insert_and_fetch_preserves_fields() {
        let mut store = SqliteRowStore::open_in_memory().unwrap();
        let s = default_state0().unwrap();
        store.insert(std::slice::from_ref(&s)).unwrap();
        assert_eq!(store.fetch_all().unwrap(), vec![s]);
    }

    #[test]
    fn test_overlap_and_tail() {
        let store = three_rows();
        let overlap = store
            .fetch_overlapping("2010:002:12:00:00.000", "2010:003:12:00:00.000")
            .unwrap();
        assert_eq!(overlap.len(), 2);
        assert_eq!(overlap[0].datestart, "2010:002:00:00:00.000");

        let tail = store.tail(2).unwrap();
        assert_eq!(tail[0].datestart, "2010:002:00:00:00.000");
        assert_eq!(tail[1].datestart, "2010:003:00:00:00.000");
        assert_eq!(store.tail(10).unwrap().len(), 3);
    }

    #[test]
    fn test_last_state_before_filters_mode() {
        let store = three_rows();
        let s = store
            .last_state_before("2010:004:00:00:00.000", "NMAN")
            .unwrap()
            .unwrap();
        assert_eq!(s.datestart, "2010:002:00:00:00.000");
        assert!(store
            .last_state_before("2010:001:00:00:00.000", "NPNT")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete_from_removes_suffix() {
        let mut store = three_rows();
        assert_eq!(store.delete_from("2010:002:00:00:00.000").unwrap(), 2);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_insert_rolls_back_batch() {
        let mut store = three_rows();
        let err = store
            .insert(&[
                state_at("2010:004:00:00:00.000", "2010:005:00:00:00.000", "NPNT"),
                state_at("2010:001:00:00:00.000", "2010:002:00:00:00.000", "NPNT"),
            ])
            .unwrap_err();
        assert_eq!(err.code(), "ERR_PERSISTENCE");
        assert_eq!(store.count().unwrap(), 3);
    }
}
