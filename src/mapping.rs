//! Mapping Resolver: mark keys to candidates, mark sets to draft votes

use tracing::{debug, info, warn};

use crate::errors::Entity;
use crate::store::ElectionStore;
use crate::types::{Ballot, Candidate, Mapping, Mark, Vote};
use crate::{Error, Result};

/// Resolves marks against the loaded mapping and candidate catalog
pub struct MappingResolver<'a> {
    store: &'a dyn ElectionStore,
    mapping: Mapping,
}

impl<'a> MappingResolver<'a> {
    /// Bind to the store's mapping; fails when no mapping has been loaded
    pub fn new(store: &'a dyn ElectionStore) -> Result<Self> {
        let mapping = store
            .get_mapping()?
            .ok_or_else(|| Error::not_found(Entity::Mapping, "current"))?;
        Ok(Self { store, mapping })
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn marks(&self) -> &[Mark] {
        &self.mapping.marks
    }

    pub fn get_mark(&self, key: &str) -> Result<&Mark> {
        self.mapping
            .find_mark(key)
            .ok_or_else(|| Error::not_found(Entity::Mark, key))
    }

    /// Catalog candidate whose code is the mark's value
    pub fn resolve_candidate(&self, key: &str) -> Result<Candidate> {
        let mark = self.get_mark(key)?;
        self.store
            .get_candidate(&mark.value)?
            .ok_or_else(|| Error::not_found(Entity::Candidate, mark.value.as_str()))
    }

    /// Raw mark reads accumulated for a precinct's ballot-in-progress
    pub fn ballot_mark_keys(&self, precinct_code: &str, ballot_code: &str) -> Result<Vec<String>> {
        self.store.get_ballot_mark_keys(precinct_code, ballot_code)
    }

    /// Resolve every recorded mark of a ballot into position-grouped votes
    ///
    /// Unresolvable marks are skipped. A position whose distinct candidates
    /// exceed its `count` is left out of the draft entirely.
    pub fn resolve_ballot(&self, precinct_code: &str, ballot_code: &str) -> Result<Ballot> {
        let keys = self.ballot_mark_keys(precinct_code, ballot_code)?;
        let mut votes: Vec<Vote> = Vec::new();

        for key in &keys {
            let candidate = match self.resolve_candidate(key) {
                Ok(candidate) => candidate,
                Err(err @ Error::NotFound { .. }) => {
                    warn!(
                        precinct = %precinct_code,
                        ballot = %ballot_code,
                        mark = %key,
                        error = %err,
                        "Skipping unresolvable mark"
                    );
                    continue;
                }
                Err(err) => return Err(err),
            };

            match votes
                .iter_mut()
                .find(|vote| vote.position.code == candidate.position.code)
            {
                Some(vote) => vote.candidates.push(candidate),
                None => votes.push(Vote::new(candidate.position.clone(), vec![candidate])),
            }
        }

        votes.retain(|vote| {
            if vote.is_overvote() {
                info!(
                    ballot = %ballot_code,
                    position = %vote.position.code,
                    expected_max = vote.position.count,
                    actual = vote.distinct_candidate_count(),
                    "Voiding draft vote due to overvote"
                );
                return false;
            }
            true
        });

        debug!(
            precinct = %precinct_code,
            ballot = %ballot_code,
            marks = keys.len(),
            positions = votes.len(),
            "Resolved draft ballot"
        );
        Ok(Ballot::new(ballot_code, votes))
    }
}
