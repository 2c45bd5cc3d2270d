//! SQLite-backed [`ElectionStore`]
//!
//! Each aggregate is stored as a JSON document keyed by its code. The
//! autoincrement `id` column preserves first-insert order across upserts,
//! which is what `get_precinct(None)` relies on.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, Params, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::ElectionStore;
use crate::errors::Entity;
use crate::types::{Ballot, Candidate, ElectionReturn, Mapping, Position, Precinct};
use crate::{Error, Result};

/// Persistent store over a single SQLite connection
pub struct SqliteElectionStore {
    db: Mutex<Connection>,
}

impl SqliteElectionStore {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS precincts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            doc TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS positions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            doc TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS candidates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            doc TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS mappings (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            doc TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ballots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            precinct_code TEXT NOT NULL,
            code TEXT NOT NULL,
            doc TEXT NOT NULL,
            UNIQUE (precinct_code, code)
        );

        CREATE TABLE IF NOT EXISTS ballot_marks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            precinct_code TEXT NOT NULL,
            ballot_code TEXT NOT NULL,
            mark_key TEXT NOT NULL,
            UNIQUE (precinct_code, ballot_code, mark_key)
        );

        CREATE TABLE IF NOT EXISTS election_returns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            precinct_code TEXT NOT NULL UNIQUE,
            doc TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_ballots_precinct ON ballots(precinct_code);
    ";

    /// Open or create a store database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Connection::open(path).map_err(|e| {
            Error::storage(format!("Failed to open store at {}: {e}", path.display()))
        })?;
        Self::initialize(db, true)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::initialize(db, false)
    }

    fn initialize(db: Connection, wal: bool) -> Result<Self> {
        if wal {
            db.execute_batch("PRAGMA journal_mode=WAL;")?;
        }
        db.execute_batch("PRAGMA synchronous=FULL;")?;
        db.execute_batch(Self::SCHEMA)?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| Error::internal("Election store connection lock poisoned"))
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn query_one<T: DeserializeOwned>(
    conn: &Connection,
    sql: &str,
    params: impl Params,
) -> Result<Option<T>> {
    let doc: Option<String> = conn
        .query_row(sql, params, |row| row.get(0))
        .optional()?;
    doc.map(|doc| serde_json::from_str(&doc).map_err(Error::from))
        .transpose()
}

fn query_all<T: DeserializeOwned>(
    conn: &Connection,
    sql: &str,
    params: impl Params,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let docs = stmt
        .query_map(params, |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    docs.iter()
        .map(|doc| serde_json::from_str(doc).map_err(Error::from))
        .collect()
}

impl ElectionStore for SqliteElectionStore {
    fn put_precinct(&self, precinct: Precinct) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO precincts (code, doc) VALUES (?1, ?2)
             ON CONFLICT(code) DO UPDATE SET doc = excluded.doc",
            params![precinct.code, encode(&precinct)?],
        )?;
        Ok(())
    }

    fn get_precinct(&self, code: Option<&str>) -> Result<Option<Precinct>> {
        let conn = self.conn()?;
        match code {
            Some(code) => query_one(
                &conn,
                "SELECT doc FROM precincts WHERE code = ?1",
                params![code],
            ),
            None => query_one(
                &conn,
                "SELECT doc FROM precincts ORDER BY id LIMIT 1",
                params![],
            ),
        }
    }

    fn put_positions(&self, positions: Vec<Position>) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for position in &positions {
            tx.execute(
                "INSERT INTO positions (code, doc) VALUES (?1, ?2)
                 ON CONFLICT(code) DO UPDATE SET doc = excluded.doc",
                params![position.code, encode(position)?],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_position(&self, code: &str) -> Result<Option<Position>> {
        query_one(&*self.conn()?, "SELECT doc FROM positions WHERE code = ?1", params![code])
    }

    fn all_positions(&self) -> Result<Vec<Position>> {
        query_all(&*self.conn()?, "SELECT doc FROM positions ORDER BY id", params![])
    }

    fn put_candidates(&self, candidates: Vec<Candidate>) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for candidate in &candidates {
            tx.execute(
                "INSERT INTO candidates (code, doc) VALUES (?1, ?2)
                 ON CONFLICT(code) DO UPDATE SET doc = excluded.doc",
                params![candidate.code, encode(candidate)?],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_candidate(&self, code: &str) -> Result<Option<Candidate>> {
        query_one(&*self.conn()?, "SELECT doc FROM candidates WHERE code = ?1", params![code])
    }

    fn all_candidates(&self) -> Result<Vec<Candidate>> {
        query_all(&*self.conn()?, "SELECT doc FROM candidates ORDER BY id", params![])
    }

    fn put_mapping(&self, mapping: Mapping) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO mappings (id, doc) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET doc = excluded.doc",
            params![encode(&mapping)?],
        )?;
        Ok(())
    }

    fn get_mapping(&self) -> Result<Option<Mapping>> {
        query_one(&*self.conn()?, "SELECT doc FROM mappings WHERE id = 1", params![])
    }

    fn get_ballots(&self, precinct_code: &str) -> Result<Vec<Ballot>> {
        query_all(
            &*self.conn()?,
            "SELECT doc FROM ballots WHERE precinct_code = ?1 ORDER BY id",
            params![precinct_code],
        )
    }

    fn put_ballot(&self, precinct_code: &str, ballot: Ballot) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let known: Option<i64> = tx
            .query_row(
                "SELECT id FROM precincts WHERE code = ?1",
                params![precinct_code],
                |row| row.get(0),
            )
            .optional()?;
        if known.is_none() {
            return Err(Error::not_found(Entity::Precinct, precinct_code));
        }

        tx.execute(
            "INSERT INTO ballots (precinct_code, code, doc) VALUES (?1, ?2, ?3)
             ON CONFLICT(precinct_code, code) DO UPDATE SET doc = excluded.doc",
            params![precinct_code, ballot.code, encode(&ballot)?],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn add_ballot_mark(
        &self,
        precinct_code: &str,
        ballot_code: &str,
        mark_key: &str,
    ) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR IGNORE INTO ballot_marks (precinct_code, ballot_code, mark_key)
             VALUES (?1, ?2, ?3)",
            params![precinct_code, ballot_code, mark_key],
        )?;
        Ok(())
    }

    fn get_ballot_mark_keys(&self, precinct_code: &str, ballot_code: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT mark_key FROM ballot_marks
             WHERE precinct_code = ?1 AND ballot_code = ?2 ORDER BY id",
        )?;
        let keys = stmt
            .query_map(params![precinct_code, ballot_code], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn put_election_return(&self, election_return: ElectionReturn) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        // Keep the row id of whichever return is being replaced so ordering survives.
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM election_returns WHERE code = ?1 OR precinct_code = ?2
                 ORDER BY id LIMIT 1",
                params![election_return.code, election_return.precinct.code],
                |row| row.get(0),
            )
            .optional()?;

        tx.execute(
            "DELETE FROM election_returns WHERE code = ?1 OR precinct_code = ?2",
            params![election_return.code, election_return.precinct.code],
        )?;

        let doc = encode(&election_return)?;
        match existing {
            Some(id) => tx.execute(
                "INSERT INTO election_returns (id, code, precinct_code, doc) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, election_return.code, election_return.precinct.code, doc],
            )?,
            None => tx.execute(
                "INSERT INTO election_returns (code, precinct_code, doc) VALUES (?1, ?2, ?3)",
                params![election_return.code, election_return.precinct.code, doc],
            )?,
        };
        tx.commit()?;
        Ok(())
    }

    fn get_election_return(&self, code: Option<&str>) -> Result<Option<ElectionReturn>> {
        let conn = self.conn()?;
        match code {
            Some(code) => query_one(
                &conn,
                "SELECT doc FROM election_returns WHERE code = ?1",
                params![code],
            ),
            None => query_one(
                &conn,
                "SELECT doc FROM election_returns ORDER BY id LIMIT 1",
                params![],
            ),
        }
    }

    fn get_election_return_by_precinct(
        &self,
        precinct_code: &str,
    ) -> Result<Option<ElectionReturn>> {
        query_one(
            &*self.conn()?,
            "SELECT doc FROM election_returns WHERE precinct_code = ?1",
            params![precinct_code],
        )
    }

    fn reset(&self) -> Result<()> {
        self.conn()?.execute_batch(
            "DELETE FROM ballot_marks;
             DELETE FROM ballots;
             DELETE FROM election_returns;
             DELETE FROM mappings;
             DELETE FROM candidates;
             DELETE FROM positions;
             DELETE FROM precincts;",
        )?;
        Ok(())
    }
}
