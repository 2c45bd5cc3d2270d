//! Compact line format: `CODE|POS:c1,c2;POS2:c3`

use super::{BallotSubmission, CandidateRef, PositionRef, VoteEntry};
use crate::errors::Entity;
use crate::store::ElectionStore;
use crate::{Error, Result, validation_error};

const BALLOT_SEPARATOR: char = '|';
const VOTE_SEPARATOR: char = ';';
const POSITION_SEPARATOR: char = ':';
const CANDIDATE_SEPARATOR: char = ',';

/// Parse a compact line into the bulk submission shape
///
/// Every position and candidate token must exist in the catalog; the
/// returned entries carry the catalog's names. Empty vote segments (a
/// trailing `;`) are ignored.
pub fn parse_compact_ballot(store: &dyn ElectionStore, line: &str) -> Result<BallotSubmission> {
    let (ballot_code, votes_part) = line
        .trim()
        .split_once(BALLOT_SEPARATOR)
        .ok_or_else(|| validation_error!("ballot", "expected CODE|POS:c1,c2, got {:?}", line))?;

    let ballot_code = ballot_code.trim();
    if ballot_code.is_empty() {
        return Err(validation_error!("ballot_code", "is required"));
    }

    let mut votes = Vec::new();
    for segment in votes_part.split(VOTE_SEPARATOR).map(str::trim) {
        if segment.is_empty() {
            continue;
        }

        let (position_code, candidate_codes) = segment
            .split_once(POSITION_SEPARATOR)
            .ok_or_else(|| validation_error!("votes", "expected POS:c1,c2, got {:?}", segment))?;
        let position_code = position_code.trim();

        let position = store
            .get_position(position_code)?
            .ok_or_else(|| Error::not_found(Entity::Position, position_code))?;

        let mut candidates = Vec::new();
        for code in candidate_codes.split(CANDIDATE_SEPARATOR).map(str::trim) {
            if code.is_empty() {
                return Err(validation_error!(
                    "votes",
                    "empty candidate code under {}",
                    position.code
                ));
            }
            let candidate = store
                .get_candidate(code)?
                .ok_or_else(|| Error::not_found(Entity::Candidate, code))?;
            candidates.push(CandidateRef::from(&candidate));
        }

        votes.push(VoteEntry {
            position: Some(PositionRef::from(&position)),
            candidates: Some(candidates),
        });
    }

    if votes.is_empty() {
        return Err(validation_error!("votes", "at least one vote is required"));
    }

    Ok(BallotSubmission::new(ballot_code, votes))
}
