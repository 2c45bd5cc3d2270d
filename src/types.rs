//! # Core Types for the Precinct Ledger
//!
//! Reference data (positions, candidates, mapping) is loaded once per
//! session and never changes afterwards. Mutable state (precincts, ballots,
//! election returns) is owned by the [`crate::store::ElectionStore`].
//!
//! ## Type Categories
//!
//! ### Reference data
//! - [`Position`]: an elective office and how many selections it allows
//! - [`Candidate`]: a contender, carrying a snapshot of its [`Position`]
//! - [`Mapping`]: the mark-key to candidate-code table of a ballot layout
//!
//! ### Session state
//! - [`Precinct`]: roster, statistics and the write-once `closed_at`
//! - [`Ballot`]: one voter's selections, at most one [`Vote`] per position
//! - [`ElectionReturn`]: tallies, signatures and the ballot snapshot
//!
//! ## Usage Examples
//!
//! ```rust
//! use ledger::types::*;
//!
//! let senator = Position::new("SENATOR", "Senator", Level::National, 12);
//! let vote = Vote::new(
//!     senator.clone(),
//!     vec![
//!         Candidate::new("C002", "Maria Santos", Some("MARIA"), senator.clone()),
//!         Candidate::new("C003", "Pedro Reyes", None, senator),
//!     ],
//! );
//!
//! assert_eq!(vote.distinct_candidate_count(), 2);
//! assert!(!vote.is_overvote());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Result, validation_error};

/// Wall-clock instant used for signatures, closing and audit timestamps
pub type Timestamp = DateTime<Utc>;

/// Administrative level of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    National,
    Local,
}

/// An elective office on the ballot
///
/// `count` is the maximum number of distinct candidates a voter may select.
/// Selecting more than `count` candidates is an overvote and the ballot
/// contributes nothing to this position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub code: String,
    pub name: String,
    pub level: Level,
    pub count: u32,
}

impl Position {
    pub fn new(code: impl Into<String>, name: impl Into<String>, level: Level, count: u32) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            level,
            count,
        }
    }
}

/// A contender for one position
///
/// The embedded `position` is a snapshot taken when the catalog is loaded,
/// so a candidate always agrees with the position catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub position: Position,
}

impl Candidate {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        alias: Option<&str>,
        position: Position,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            alias: alias.map(str::to_string),
            position,
        }
    }
}

/// A physical ballot location mapped to one candidate code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    pub key: String,
    pub value: String,
}

/// Mark table for one precinct's ballot layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub code: String,
    pub location_name: String,
    pub district: String,
    pub marks: Vec<Mark>,
}

impl Mapping {
    /// Look up a mark by its key
    pub fn find_mark(&self, key: &str) -> Option<&Mark> {
        self.marks.iter().find(|mark| mark.key == key)
    }
}

/// Role of an electoral inspector on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InspectorRole {
    Chairperson,
    Member,
}

impl fmt::Display for InspectorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InspectorRole::Chairperson => f.write_str("chairperson"),
            InspectorRole::Member => f.write_str("member"),
        }
    }
}

/// A member of the precinct's board of electoral inspectors
///
/// `signature` and `signed_at` are only ever written by signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectoralInspector {
    pub id: String,
    pub name: String,
    pub role: InspectorRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<Timestamp>,
}

impl ElectoralInspector {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: InspectorRole) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            signature: None,
            signed_at: None,
        }
    }

    /// Whether this inspector has a non-empty signature on record
    pub fn has_signed(&self) -> bool {
        self.signature.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Statistics recorded by the board at the end of voting
///
/// Every field is either unset or a non-negative count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecinctStatistics {
    pub watchers_count: Option<u64>,
    pub precincts_count: Option<u64>,
    pub registered_voters_count: Option<u64>,
    pub actual_voters_count: Option<u64>,
    pub ballots_in_box_count: Option<u64>,
    pub unused_ballots_count: Option<u64>,
    pub spoiled_ballots_count: Option<u64>,
    pub void_ballots_count: Option<u64>,
}

impl PrecinctStatistics {
    /// Names of every statistics field, in payload order
    pub const FIELDS: [&'static str; 8] = [
        "watchers_count",
        "precincts_count",
        "registered_voters_count",
        "actual_voters_count",
        "ballots_in_box_count",
        "unused_ballots_count",
        "spoiled_ballots_count",
        "void_ballots_count",
    ];

    /// Mutable slot for a named field, `None` if the name is not a statistic
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Option<u64>> {
        match name {
            "watchers_count" => Some(&mut self.watchers_count),
            "precincts_count" => Some(&mut self.precincts_count),
            "registered_voters_count" => Some(&mut self.registered_voters_count),
            "actual_voters_count" => Some(&mut self.actual_voters_count),
            "ballots_in_box_count" => Some(&mut self.ballots_in_box_count),
            "unused_ballots_count" => Some(&mut self.unused_ballots_count),
            "spoiled_ballots_count" => Some(&mut self.spoiled_ballots_count),
            "void_ballots_count" => Some(&mut self.void_ballots_count),
            _ => None,
        }
    }
}

/// A voting precinct and its board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Precinct {
    pub code: String,
    pub location_name: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub electoral_inspectors: Vec<ElectoralInspector>,
    #[serde(flatten)]
    pub statistics: PrecinctStatistics,
    /// Set once by wrap-up, never changed afterwards
    #[serde(default)]
    pub closed_at: Option<Timestamp>,
}

impl Precinct {
    pub fn new(code: impl Into<String>, location_name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            location_name: location_name.into(),
            latitude: 0.0,
            longitude: 0.0,
            electoral_inspectors: Vec::new(),
            statistics: PrecinctStatistics::default(),
            closed_at: None,
        }
    }

    pub fn with_inspectors(mut self, inspectors: Vec<ElectoralInspector>) -> Self {
        self.electoral_inspectors = inspectors;
        self
    }

    pub fn find_inspector(&self, id: &str) -> Option<&ElectoralInspector> {
        self.electoral_inspectors.iter().find(|i| i.id == id)
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }
}

/// Selections for one position within a ballot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub position: Position,
    pub candidates: Vec<Candidate>,
}

impl Vote {
    pub fn new(position: Position, candidates: Vec<Candidate>) -> Self {
        Self {
            position,
            candidates,
        }
    }

    /// Number of distinct candidate codes selected
    pub fn distinct_candidate_count(&self) -> usize {
        self.candidates
            .iter()
            .map(|c| c.code.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// More distinct candidates than the position allows
    pub fn is_overvote(&self) -> bool {
        self.distinct_candidate_count() > self.position.count as usize
    }
}

/// One voter's submitted selections
///
/// A ballot never holds two votes for the same position; constructors and
/// [`Ballot::merge_with`] fold same-position votes together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub code: String,
    pub votes: Vec<Vote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precinct_code: Option<String>,
}

impl Ballot {
    /// Build a ballot, folding any repeated positions into a single vote
    pub fn new(code: impl Into<String>, votes: Vec<Vote>) -> Self {
        let empty = Self {
            code: code.into(),
            votes: Vec::new(),
            precinct_code: None,
        };
        let incoming = Self {
            votes,
            ..empty.clone()
        };
        empty.merge_with(incoming)
    }

    pub fn with_precinct_code(mut self, precinct_code: impl Into<String>) -> Self {
        self.precinct_code = Some(precinct_code.into());
        self
    }

    pub fn vote_for(&self, position_code: &str) -> Option<&Vote> {
        self.votes.iter().find(|v| v.position.code == position_code)
    }

    /// Fold `incoming` into this ballot
    ///
    /// Positions absent here are appended. Positions present on both sides
    /// keep the union of candidates, incoming candidates first, deduplicated
    /// by code. Nothing is truncated: overvotes are recorded as submitted.
    pub fn merge_with(mut self, incoming: Ballot) -> Ballot {
        for vote in incoming.votes {
            match self
                .votes
                .iter_mut()
                .find(|existing| existing.position.code == vote.position.code)
            {
                Some(existing) => {
                    let mut candidates =
                        Vec::with_capacity(vote.candidates.len() + existing.candidates.len());
                    let mut seen = HashSet::new();
                    let union = vote.candidates.into_iter().chain(existing.candidates.drain(..));
                    for candidate in union {
                        if seen.insert(candidate.code.clone()) {
                            candidates.push(candidate);
                        }
                    }
                    existing.candidates = candidates;
                }
                None => self.votes.push(dedup_vote(vote)),
            }
        }
        if self.precinct_code.is_none() {
            self.precinct_code = incoming.precinct_code;
        }
        self
    }
}

fn dedup_vote(mut vote: Vote) -> Vote {
    let mut seen = HashSet::new();
    vote.candidates.retain(|c| seen.insert(c.code.clone()));
    vote
}

/// Count of votes for one candidate in one position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub position_code: String,
    pub candidate_code: String,
    pub candidate_name: String,
    pub count: u64,
}

/// The signed tally artifact for one precinct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionReturn {
    pub id: Uuid,
    pub code: String,
    pub precinct: Precinct,
    pub tallies: Vec<Tally>,
    pub signatures: Vec<ElectoralInspector>,
    pub ballots: Vec<Ballot>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ElectionReturn {
    /// Inspectors that have actually signed
    pub fn signed_inspectors(&self) -> impl Iterator<Item = &ElectoralInspector> {
        self.signatures.iter().filter(|i| i.has_signed())
    }

    pub fn has_inspector_signed(&self, id: &str) -> bool {
        self.signed_inspectors().any(|i| i.id == id)
    }

    pub fn find_signatory(&self, id: &str) -> Option<&ElectoralInspector> {
        self.signatures.iter().find(|i| i.id == id)
    }

    pub fn last_ballot(&self) -> Option<&Ballot> {
        self.ballots.last()
    }

    /// Tallies for a single position
    pub fn tallies_for<'a>(&'a self, position_code: &'a str) -> impl Iterator<Item = &'a Tally> {
        self.tallies
            .iter()
            .filter(move |t| t.position_code == position_code)
    }

    /// Count for one candidate, zero when the candidate has no tally row
    pub fn count_for(&self, position_code: &str, candidate_code: &str) -> u64 {
        self.tallies_for(position_code)
            .find(|t| t.candidate_code == candidate_code)
            .map(|t| t.count)
            .unwrap_or(0)
    }
}

/// Inspector signature scanned from a `ROLE:ID:SIGNATURE` string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignPayload {
    /// Informational role token; the roster decides the actual role
    pub role: String,
    pub id: String,
    pub signature: String,
}

impl FromStr for SignPayload {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let mut parts = raw.trim().splitn(3, ':');
        let (Some(role), Some(id), Some(signature)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(validation_error!(
                "payload",
                "expected ROLE:ID:SIGNATURE, got {:?}",
                raw
            ));
        };

        if role.is_empty() || id.is_empty() || signature.is_empty() {
            return Err(validation_error!(
                "payload",
                "ROLE, ID and SIGNATURE must all be non-empty"
            ));
        }

        Ok(Self {
            role: role.to_string(),
            id: id.to_string(),
            signature: signature.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn senator() -> Position {
        Position::new("SENATOR", "Senator", Level::National, 12)
    }

    fn president() -> Position {
        Position::new("PRESIDENT", "President", Level::National, 1)
    }

    fn cand(code: &str, position: &Position) -> Candidate {
        Candidate::new(code, format!("Candidate {code}"), None, position.clone())
    }

    #[test]
    fn test_sign_payload_parsing() {
        let payload: SignPayload = "BEI:uuid-juan:signature123".parse().unwrap();
        assert_eq!(payload.role, "BEI");
        assert_eq!(payload.id, "uuid-juan");
        assert_eq!(payload.signature, "signature123");

        assert!("BEI:uuid-juan".parse::<SignPayload>().is_err());
        assert!("BEI::sig".parse::<SignPayload>().is_err());
        assert!("".parse::<SignPayload>().is_err());
    }

    #[test]
    fn test_merge_adds_missing_positions() {
        let president = president();
        let senator = senator();
        let existing = Ballot::new(
            "BAL-001",
            vec![Vote::new(president.clone(), vec![cand("C001", &president)])],
        );
        let incoming = Ballot::new(
            "BAL-001",
            vec![Vote::new(senator.clone(), vec![cand("C002", &senator)])],
        );

        let merged = existing.merge_with(incoming);
        assert_eq!(merged.votes.len(), 2);
        assert_eq!(merged.votes[0].position.code, "PRESIDENT");
        assert_eq!(merged.votes[1].position.code, "SENATOR");
    }

    #[test]
    fn test_merge_unions_candidates_incoming_first() {
        let senator = senator();
        let existing = Ballot::new(
            "BAL-001",
            vec![Vote::new(senator.clone(), vec![cand("C002", &senator), cand("C003", &senator)])],
        );
        let incoming = Ballot::new(
            "BAL-001",
            vec![Vote::new(senator.clone(), vec![cand("C005", &senator), cand("C002", &senator)])],
        );

        let merged = existing.merge_with(incoming);
        let codes: Vec<_> = merged.votes[0].candidates.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["C005", "C002", "C003"]);
    }

    #[test]
    fn test_merge_keeps_overvotes_for_single_seat() {
        let president = president();
        let existing = Ballot::new(
            "BAL-001",
            vec![Vote::new(president.clone(), vec![cand("C001", &president)])],
        );
        let incoming = Ballot::new(
            "BAL-001",
            vec![Vote::new(president.clone(), vec![cand("C004", &president)])],
        );

        let merged = existing.merge_with(incoming);
        let vote = merged.vote_for("PRESIDENT").unwrap();
        assert_eq!(vote.distinct_candidate_count(), 2);
        assert!(vote.is_overvote());
    }

    #[test]
    fn test_new_folds_repeated_positions() {
        let senator = senator();
        let ballot = Ballot::new(
            "BAL-002",
            vec![
                Vote::new(senator.clone(), vec![cand("C002", &senator)]),
                Vote::new(senator.clone(), vec![cand("C003", &senator), cand("C003", &senator)]),
            ],
        );
        assert_eq!(ballot.votes.len(), 1);
        assert_eq!(ballot.votes[0].candidates.len(), 2);
    }

    #[test]
    fn test_precinct_statistics_flatten() {
        let json = serde_json::json!({
            "code": "PRECINCT-01",
            "location_name": "City Hall",
            "electoral_inspectors": [
                {"id": "A1", "name": "Alice", "role": "chairperson"}
            ],
            "watchers_count": 3
        });
        let precinct: Precinct = serde_json::from_value(json).unwrap();
        assert_eq!(precinct.statistics.watchers_count, Some(3));
        assert_eq!(precinct.statistics.actual_voters_count, None);
        assert_eq!(precinct.electoral_inspectors[0].role, InspectorRole::Chairperson);
        assert!(!precinct.is_closed());
    }
}
