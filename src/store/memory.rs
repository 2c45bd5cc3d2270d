//! In-memory [`ElectionStore`] backed by `RwLock`ed tables

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::ElectionStore;
use crate::errors::Entity;
use crate::types::{Ballot, Candidate, ElectionReturn, Mapping, Position, Precinct};
use crate::{Error, Result};

#[derive(Default)]
struct Tables {
    precincts: HashMap<String, Precinct>,
    /// Precinct codes in the order they were first loaded
    precinct_order: Vec<String>,
    positions: Vec<Position>,
    candidates: Vec<Candidate>,
    mapping: Option<Mapping>,
    ballots: HashMap<String, Vec<Ballot>>,
    /// (precinct code, ballot code) -> mark keys
    ballot_marks: HashMap<(String, String), Vec<String>>,
    election_returns: Vec<ElectionReturn>,
}

/// Process-local store; one instance per process or test run
#[derive(Default)]
pub struct MemoryElectionStore {
    tables: RwLock<Tables>,
}

impl MemoryElectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| Error::internal("Election store read error"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| Error::internal("Election store write error"))
    }
}

fn upsert_by<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T, &T) -> bool) {
    match items.iter_mut().find(|existing| same(existing, &item)) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

impl ElectionStore for MemoryElectionStore {
    fn put_precinct(&self, precinct: Precinct) -> Result<()> {
        let mut tables = self.write()?;
        if !tables.precincts.contains_key(&precinct.code) {
            tables.precinct_order.push(precinct.code.clone());
        }
        tables.precincts.insert(precinct.code.clone(), precinct);
        Ok(())
    }

    fn get_precinct(&self, code: Option<&str>) -> Result<Option<Precinct>> {
        let tables = self.read()?;
        let code = match code {
            Some(code) => code,
            None => match tables.precinct_order.first() {
                Some(first) => first.as_str(),
                None => return Ok(None),
            },
        };
        Ok(tables.precincts.get(code).cloned())
    }

    fn put_positions(&self, positions: Vec<Position>) -> Result<()> {
        let mut tables = self.write()?;
        for position in positions {
            upsert_by(&mut tables.positions, position, |a, b| a.code == b.code);
        }
        Ok(())
    }

    fn get_position(&self, code: &str) -> Result<Option<Position>> {
        Ok(self.read()?.positions.iter().find(|p| p.code == code).cloned())
    }

    fn all_positions(&self) -> Result<Vec<Position>> {
        Ok(self.read()?.positions.clone())
    }

    fn put_candidates(&self, candidates: Vec<Candidate>) -> Result<()> {
        let mut tables = self.write()?;
        for candidate in candidates {
            upsert_by(&mut tables.candidates, candidate, |a, b| a.code == b.code);
        }
        Ok(())
    }

    fn get_candidate(&self, code: &str) -> Result<Option<Candidate>> {
        Ok(self.read()?.candidates.iter().find(|c| c.code == code).cloned())
    }

    fn all_candidates(&self) -> Result<Vec<Candidate>> {
        Ok(self.read()?.candidates.clone())
    }

    fn put_mapping(&self, mapping: Mapping) -> Result<()> {
        self.write()?.mapping = Some(mapping);
        Ok(())
    }

    fn get_mapping(&self) -> Result<Option<Mapping>> {
        Ok(self.read()?.mapping.clone())
    }

    fn get_ballots(&self, precinct_code: &str) -> Result<Vec<Ballot>> {
        Ok(self
            .read()?
            .ballots
            .get(precinct_code)
            .cloned()
            .unwrap_or_default())
    }

    fn put_ballot(&self, precinct_code: &str, ballot: Ballot) -> Result<()> {
        let mut tables = self.write()?;
        if !tables.precincts.contains_key(precinct_code) {
            return Err(Error::not_found(Entity::Precinct, precinct_code));
        }
        let ballots = tables.ballots.entry(precinct_code.to_string()).or_default();
        upsert_by(ballots, ballot, |a, b| a.code == b.code);
        Ok(())
    }

    fn add_ballot_mark(
        &self,
        precinct_code: &str,
        ballot_code: &str,
        mark_key: &str,
    ) -> Result<()> {
        let mut tables = self.write()?;
        let keys = tables
            .ballot_marks
            .entry((precinct_code.to_string(), ballot_code.to_string()))
            .or_default();
        if !keys.iter().any(|k| k == mark_key) {
            keys.push(mark_key.to_string());
        }
        Ok(())
    }

    fn get_ballot_mark_keys(&self, precinct_code: &str, ballot_code: &str) -> Result<Vec<String>> {
        let key = (precinct_code.to_string(), ballot_code.to_string());
        Ok(self
            .read()?
            .ballot_marks
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    fn put_election_return(&self, election_return: ElectionReturn) -> Result<()> {
        let mut tables = self.write()?;
        let returns = &mut tables.election_returns;
        let replaces = |er: &ElectionReturn| {
            er.code == election_return.code || er.precinct.code == election_return.precinct.code
        };

        // Everything removed sits at or after the first match, so `slot` stays valid.
        let slot = returns.iter().position(replaces);
        returns.retain(|er| !replaces(er));
        match slot {
            Some(index) => returns.insert(index, election_return),
            None => returns.push(election_return),
        }
        Ok(())
    }

    fn get_election_return(&self, code: Option<&str>) -> Result<Option<ElectionReturn>> {
        let tables = self.read()?;
        Ok(match code {
            Some(code) => tables.election_returns.iter().find(|er| er.code == code).cloned(),
            None => tables.election_returns.first().cloned(),
        })
    }

    fn get_election_return_by_precinct(
        &self,
        precinct_code: &str,
    ) -> Result<Option<ElectionReturn>> {
        Ok(self
            .read()?
            .election_returns
            .iter()
            .find(|er| er.precinct.code == precinct_code)
            .cloned())
    }

    fn reset(&self) -> Result<()> {
        *self.write()? = Tables::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_loaded_precinct_is_default() {
        let store = MemoryElectionStore::new();
        store.put_precinct(Precinct::new("P-002", "Second")).unwrap();
        store.put_precinct(Precinct::new("P-001", "First")).unwrap();
        store.put_precinct(Precinct::new("P-002", "Second, renamed")).unwrap();

        let default = store.get_precinct(None).unwrap().unwrap();
        assert_eq!(default.code, "P-002");
        assert_eq!(default.location_name, "Second, renamed");
    }

    #[test]
    fn test_put_ballot_requires_precinct() {
        let store = MemoryElectionStore::new();
        let err = store.put_ballot("NOPE", Ballot::new("B1", vec![])).unwrap_err();
        assert!(err.is_not_found(Entity::Precinct));
    }

    #[test]
    fn test_ballot_marks_are_deduplicated() {
        let store = MemoryElectionStore::new();
        store.add_ballot_mark("P-001", "B1", "A1").unwrap();
        store.add_ballot_mark("P-001", "B1", "B3").unwrap();
        store.add_ballot_mark("P-001", "B1", "A1").unwrap();
        assert_eq!(store.get_ballot_mark_keys("P-001", "B1").unwrap(), vec!["A1", "B3"]);
        assert!(store.get_ballot_mark_keys("P-001", "B2").unwrap().is_empty());
        assert!(store.get_ballot_mark_keys("P-002", "B1").unwrap().is_empty());
    }
}
