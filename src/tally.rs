//! Tally Engine: ballots in, election return out
//!
//! The overvote rule lives here. A (ballot, position) pair with more
//! distinct candidates than `position.count` contributes nothing, whatever
//! storage accepted.

use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};
use uuid::Uuid;

use crate::Result;
use crate::precinct::PrecinctContext;
use crate::store::ElectionStore;
use crate::types::{Ballot, ElectionReturn, Tally};

/// Default length of generated election return codes
pub const DEFAULT_RETURN_CODE_LENGTH: usize = 12;

/// Count ballots into tally rows
///
/// Rows are ordered by position code, then count descending, then candidate
/// code, so the result does not depend on ballot order.
pub fn count_votes(ballots: &[Ballot]) -> Vec<Tally> {
    // position code -> candidate code -> (name, count)
    let mut counts: BTreeMap<&str, BTreeMap<&str, (&str, u64)>> = BTreeMap::new();

    for ballot in ballots {
        for vote in &ballot.votes {
            if vote.is_overvote() {
                warn!(
                    ballot = %ballot.code,
                    position = %vote.position.code,
                    allowed = vote.position.count,
                    selected = vote.distinct_candidate_count(),
                    "Overvote excluded from tally"
                );
                continue;
            }

            let mut seen = HashSet::new();
            let per_position = counts.entry(vote.position.code.as_str()).or_default();
            for candidate in &vote.candidates {
                if !seen.insert(candidate.code.as_str()) {
                    continue;
                }
                per_position
                    .entry(candidate.code.as_str())
                    .or_insert((candidate.name.as_str(), 0))
                    .1 += 1;
            }
        }
    }

    let mut tallies = Vec::new();
    for (position_code, candidates) in counts {
        let mut rows: Vec<Tally> = candidates
            .into_iter()
            .map(|(candidate_code, (name, count))| Tally {
                position_code: position_code.to_string(),
                candidate_code: candidate_code.to_string(),
                candidate_name: name.to_string(),
                count,
            })
            .collect();
        // BTreeMap iteration already sorted by candidate code; stable sort keeps that for ties.
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        tallies.extend(rows);
    }
    tallies
}

/// Random uppercase alphanumeric return code
pub fn generate_return_code(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(|byte| char::from(byte).to_ascii_uppercase())
        .collect()
}

/// Generates and persists a precinct's election return
pub struct TallyEngine<'a> {
    store: &'a dyn ElectionStore,
    code_length: usize,
}

impl<'a> TallyEngine<'a> {
    pub fn new(store: &'a dyn ElectionStore) -> Self {
        Self {
            store,
            code_length: DEFAULT_RETURN_CODE_LENGTH,
        }
    }

    pub fn with_code_length(mut self, code_length: usize) -> Self {
        self.code_length = code_length.max(1);
        self
    }

    /// Tally the precinct's ballots and persist the resulting return
    ///
    /// With no `return_code`, an existing return for the precinct keeps its
    /// code and a fresh precinct gets a generated one. Regeneration keeps the
    /// return's id and `created_at`; signatures come from the roster, which
    /// is where signing records them, so they survive regeneration. A closed
    /// precinct's return is sealed and cannot be regenerated.
    pub fn run(
        &self,
        precinct_code: Option<&str>,
        return_code: Option<&str>,
    ) -> Result<ElectionReturn> {
        let context = PrecinctContext::new(self.store, precinct_code)?;
        context.ensure_open()?;
        let ballots = context.ballots()?;
        let tallies = count_votes(&ballots);

        let previous = self.store.get_election_return_by_precinct(context.code())?;
        let now = Utc::now();

        let code = match (return_code, &previous) {
            (Some(code), _) => code.to_string(),
            (None, Some(previous)) => previous.code.clone(),
            (None, None) => generate_return_code(self.code_length),
        };

        let (id, created_at) = match &previous {
            Some(previous) => (previous.id, previous.created_at),
            None => (Uuid::new_v4(), now),
        };

        let precinct = context.into_precinct();
        let election_return = ElectionReturn {
            id,
            code,
            signatures: precinct.electoral_inspectors.clone(),
            precinct,
            tallies,
            ballots,
            created_at,
            updated_at: now,
        };

        self.store.put_election_return(election_return.clone())?;

        info!(
            precinct = %election_return.precinct.code,
            code = %election_return.code,
            ballots = election_return.ballots.len(),
            tallies = election_return.tallies.len(),
            "Election return generated"
        );

        Ok(election_return)
    }
}
