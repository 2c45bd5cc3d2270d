//! Vote Capture
//!
//! Three entry points that all end in a stored [`Ballot`]:
//!
//! - [`marks`]: one `(ballot_code, mark_key)` reading at a time, then a finalize step
//! - [`bulk`]: a structured [`BallotSubmission`]
//! - [`compact`]: a `CODE|POS:c1,c2;POS2:c3` line, parsed into a [`BallotSubmission`]

pub mod bulk;
pub mod compact;
pub mod marks;

use serde::{Deserialize, Serialize};

use crate::types::{Ballot, Candidate, Level, Position};

pub use bulk::submit_ballot;
pub use compact::parse_compact_ballot;
pub use marks::{finalize_ballot, read_vote};

/// Position reference as sent by a client; only `code` is required
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionRef {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

impl From<&Position> for PositionRef {
    fn from(position: &Position) -> Self {
        Self {
            code: Some(position.code.clone()),
            name: Some(position.name.clone()),
            level: Some(position.level),
            count: Some(position.count),
        }
    }
}

/// Candidate reference as sent by a client; only `code` is required
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRef {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl From<&Candidate> for CandidateRef {
    fn from(candidate: &Candidate) -> Self {
        Self {
            code: Some(candidate.code.clone()),
            name: Some(candidate.name.clone()),
            alias: candidate.alias.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteEntry {
    #[serde(default)]
    pub position: Option<PositionRef>,
    #[serde(default)]
    pub candidates: Option<Vec<CandidateRef>>,
}

impl VoteEntry {
    /// Entry naming a position and candidates by code only
    pub fn codes(position_code: &str, candidate_codes: &[&str]) -> Self {
        Self {
            position: Some(PositionRef {
                code: Some(position_code.to_string()),
                ..PositionRef::default()
            }),
            candidates: Some(
                candidate_codes
                    .iter()
                    .map(|code| CandidateRef {
                        code: Some(code.to_string()),
                        ..CandidateRef::default()
                    })
                    .collect(),
            ),
        }
    }
}

/// Bulk ballot shape: `{ballot_code, votes: [{position, candidates}]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BallotSubmission {
    #[serde(default)]
    pub ballot_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precinct_code: Option<String>,
    #[serde(default)]
    pub votes: Vec<VoteEntry>,
}

impl BallotSubmission {
    pub fn new(ballot_code: impl Into<String>, votes: Vec<VoteEntry>) -> Self {
        Self {
            ballot_code: ballot_code.into(),
            precinct_code: None,
            votes,
        }
    }
}

impl From<&Ballot> for BallotSubmission {
    fn from(ballot: &Ballot) -> Self {
        Self {
            ballot_code: ballot.code.clone(),
            precinct_code: ballot.precinct_code.clone(),
            votes: ballot
                .votes
                .iter()
                .map(|vote| VoteEntry {
                    position: Some(PositionRef::from(&vote.position)),
                    candidates: Some(vote.candidates.iter().map(CandidateRef::from).collect()),
                })
                .collect(),
        }
    }
}
