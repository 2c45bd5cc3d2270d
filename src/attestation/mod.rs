//! Attestation & Finalization
//!
//! An election return moves one way through
//! `unsigned -> partially signed -> quorum met -> finalized`. Signing and
//! statistics may happen in any order before wrap-up; wrap-up is terminal.

pub mod export;
pub mod finalize;
pub mod sign;
pub mod statistics;

use serde::{Deserialize, Serialize};

use crate::types::{ElectionReturn, Precinct};

pub use export::{ArtifactSink, ExportPayload, ExportReceipt, FileArtifactSink, NullArtifactSink};
pub use finalize::{ChairPlusMemberPolicy, Finalizer, QuorumPolicy, WrapUp};
pub use sign::{SignOutcome, sign_election_return};
pub use statistics::input_precinct_statistics;

/// Where a return stands in the attestation workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnState {
    Unsigned,
    PartiallySigned,
    QuorumMet,
    Finalized,
}

impl ReturnState {
    pub fn of(
        election_return: &ElectionReturn,
        precinct: &Precinct,
        policy: &dyn QuorumPolicy,
    ) -> Self {
        if precinct.is_closed() {
            ReturnState::Finalized
        } else if policy.is_satisfied(&election_return.signatures) {
            ReturnState::QuorumMet
        } else if election_return.signed_inspectors().next().is_some() {
            ReturnState::PartiallySigned
        } else {
            ReturnState::Unsigned
        }
    }
}
