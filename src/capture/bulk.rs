//! Structured ballot submission

use tracing::debug;

use super::{BallotSubmission, VoteEntry};
use crate::errors::Entity;
use crate::precinct::PrecinctContext;
use crate::store::ElectionStore;
use crate::types::{Ballot, Vote};
use crate::{Error, Result, validation_error};

/// Validate a submission and store it through the precinct's merge step
///
/// Positions and candidates are resolved against the loaded catalog, so the
/// stored ballot always carries catalog snapshots regardless of what extra
/// fields the client sent.
pub fn submit_ballot(
    store: &dyn ElectionStore,
    precinct: &PrecinctContext<'_>,
    submission: BallotSubmission,
) -> Result<Ballot> {
    let ballot = build_ballot(store, submission)?;
    debug!(precinct = %precinct.code(), ballot = %ballot.code, "Submitting ballot");
    precinct.put_ballot(ballot)
}

/// Turn a submission into a catalog-backed [`Ballot`]
pub fn build_ballot(store: &dyn ElectionStore, submission: BallotSubmission) -> Result<Ballot> {
    let ballot_code = submission.ballot_code.trim();
    if ballot_code.is_empty() {
        return Err(validation_error!("ballot_code", "is required"));
    }
    if submission.votes.is_empty() {
        return Err(validation_error!("votes", "at least one vote is required"));
    }

    let votes = submission
        .votes
        .iter()
        .enumerate()
        .map(|(index, entry)| build_vote(store, index, entry))
        .collect::<Result<Vec<_>>>()?;

    Ok(Ballot::new(ballot_code, votes))
}

fn build_vote(store: &dyn ElectionStore, index: usize, entry: &VoteEntry) -> Result<Vote> {
    let position_code = entry
        .position
        .as_ref()
        .and_then(|p| p.code.as_deref())
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| validation_error!(format!("votes.{index}.position.code"), "is required"))?;

    let position = store
        .get_position(position_code)?
        .ok_or_else(|| Error::not_found(Entity::Position, position_code))?;

    let refs = entry
        .candidates
        .as_deref()
        .filter(|refs| !refs.is_empty())
        .ok_or_else(|| {
            validation_error!(
                format!("votes.{index}.candidates"),
                "at least one candidate is required"
            )
        })?;

    let mut candidates = Vec::with_capacity(refs.len());
    for (slot, candidate_ref) in refs.iter().enumerate() {
        let code = candidate_ref
            .code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .ok_or_else(|| {
                validation_error!(format!("votes.{index}.candidates.{slot}.code"), "is required")
            })?;

        let candidate = store
            .get_candidate(code)?
            .ok_or_else(|| Error::not_found(Entity::Candidate, code))?;

        if candidate.position.code != position.code {
            return Err(validation_error!(
                format!("votes.{index}.candidates.{slot}.code"),
                "candidate {} runs for {}, not {}",
                candidate.code,
                candidate.position.code,
                position.code
            ));
        }
        candidates.push(candidate);
    }

    Ok(Vote::new(position, candidates))
}
