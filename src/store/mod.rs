//! Election Store: repository for reference data and session state
//!
//! The store holds no business rules. Lookups of unknown codes return
//! `Ok(None)`; deciding whether absence is an error is the caller's job.
//! [`MemoryElectionStore`] and [`SqliteElectionStore`] satisfy the same
//! contract, so the same ledger logic runs against either.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use crate::Result;
use crate::config::{StoreBackend, StoreConfig};
use crate::types::{Ballot, Candidate, ElectionReturn, Mapping, Position, Precinct};

pub use memory::MemoryElectionStore;
pub use sqlite::SqliteElectionStore;

/// Persistence contract shared by every backend
pub trait ElectionStore: Send + Sync {
    /// Add or replace a precinct by code
    fn put_precinct(&self, precinct: Precinct) -> Result<()>;

    /// Precinct by code; with `None`, the first precinct ever loaded
    fn get_precinct(&self, code: Option<&str>) -> Result<Option<Precinct>>;

    fn put_positions(&self, positions: Vec<Position>) -> Result<()>;

    fn get_position(&self, code: &str) -> Result<Option<Position>>;

    fn all_positions(&self) -> Result<Vec<Position>>;

    fn put_candidates(&self, candidates: Vec<Candidate>) -> Result<()>;

    fn get_candidate(&self, code: &str) -> Result<Option<Candidate>>;

    fn all_candidates(&self) -> Result<Vec<Candidate>>;

    /// Replace the loaded mapping
    fn put_mapping(&self, mapping: Mapping) -> Result<()>;

    fn get_mapping(&self) -> Result<Option<Mapping>>;

    /// Ballots of a precinct in insertion order; empty for unknown precincts
    fn get_ballots(&self, precinct_code: &str) -> Result<Vec<Ballot>>;

    /// Add or replace a ballot (by code) under a precinct
    ///
    /// Fails with `NotFound` when the precinct does not exist.
    fn put_ballot(&self, precinct_code: &str, ballot: Ballot) -> Result<()>;

    /// Record a raw mark read for a precinct's ballot-in-progress
    ///
    /// Recording the same key twice is a no-op.
    fn add_ballot_mark(&self, precinct_code: &str, ballot_code: &str, mark_key: &str) -> Result<()>;

    /// Raw mark reads of a precinct's ballot, in the order first seen
    fn get_ballot_mark_keys(&self, precinct_code: &str, ballot_code: &str) -> Result<Vec<String>>;

    /// Persist an election return
    ///
    /// Replaces any return with the same code and any other return for the
    /// same precinct, keeping one active return per precinct.
    fn put_election_return(&self, election_return: ElectionReturn) -> Result<()>;

    /// Return by code; with `None`, the first stored return
    fn get_election_return(&self, code: Option<&str>) -> Result<Option<ElectionReturn>>;

    fn get_election_return_by_precinct(
        &self,
        precinct_code: &str,
    ) -> Result<Option<ElectionReturn>>;

    /// Drop all state (test teardown)
    fn reset(&self) -> Result<()>;
}

/// Construct the backend selected by configuration
pub fn open(config: &StoreConfig) -> Result<Arc<dyn ElectionStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryElectionStore::new())),
        StoreBackend::Sqlite => {
            let path = config.database_path.as_ref().ok_or_else(|| {
                crate::Error::internal("sqlite store requires a database path")
            })?;
            Ok(Arc::new(SqliteElectionStore::open(path)?))
        }
    }
}
