//! Wrap-up: quorum check, write-once close, final export

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::export::{ArtifactSink, ExportPayload, ExportReceipt};
use crate::errors::Entity;
use crate::precinct::PrecinctContext;
use crate::store::ElectionStore;
use crate::types::{ElectionReturn, ElectoralInspector, InspectorRole};
use crate::{Error, Result, precondition_error};

/// Decides whether a set of signatures is enough to close a precinct
pub trait QuorumPolicy: Send + Sync {
    fn is_satisfied(&self, signatures: &[ElectoralInspector]) -> bool;

    /// Human-readable requirement, used in the failure message
    fn requirement(&self) -> &str;

    fn assert_satisfied(&self, signatures: &[ElectoralInspector], force: bool) -> Result<()> {
        if force || self.is_satisfied(signatures) {
            return Ok(());
        }
        Err(precondition_error!("Missing required signatures (need {})", self.requirement()))
    }
}

/// The chairperson plus at least one member must have signed
#[derive(Debug, Clone, Copy, Default)]
pub struct ChairPlusMemberPolicy;

impl QuorumPolicy for ChairPlusMemberPolicy {
    fn is_satisfied(&self, signatures: &[ElectoralInspector]) -> bool {
        let signed = || signatures.iter().filter(|s| s.has_signed());
        let chair = signed().any(|s| s.role == InspectorRole::Chairperson);
        let members = signed().filter(|s| s.role == InspectorRole::Member).count();
        chair && members >= 1
    }

    fn requirement(&self) -> &str {
        "chair + at least one member"
    }
}

/// Result of a wrap-up: the closed return and the exported artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrapUp {
    pub election_return: ElectionReturn,
    pub receipt: ExportReceipt,
}

/// Closes a precinct's session
pub struct Finalizer<'a> {
    store: &'a dyn ElectionStore,
    policy: &'a dyn QuorumPolicy,
    sink: &'a dyn ArtifactSink,
    payload: ExportPayload,
}

impl<'a> Finalizer<'a> {
    pub fn new(
        store: &'a dyn ElectionStore,
        policy: &'a dyn QuorumPolicy,
        sink: &'a dyn ArtifactSink,
        payload: ExportPayload,
    ) -> Self {
        Self {
            store,
            policy,
            sink,
            payload,
        }
    }

    /// Close the bound precinct and export its return
    ///
    /// Without `force`, the quorum policy must be satisfied and the precinct
    /// must still be open. `closed_at` is set only if unset, and is committed
    /// before the export runs; an export failure is returned to the caller
    /// with the close already in place (see [`Finalizer::export`]).
    pub fn wrap_up(&self, context: &mut PrecinctContext<'_>, force: bool) -> Result<WrapUp> {
        let mut election_return = self.election_return(context)?;

        if context.precinct().is_closed() && !force {
            return Err(precondition_error!(
                "Balloting for precinct {} is already closed",
                context.code()
            ));
        }

        self.policy
            .assert_satisfied(&election_return.signatures, force)?;
        if force && !self.policy.is_satisfied(&election_return.signatures) {
            warn!(precinct = %context.code(), "Wrapping up without quorum (forced)");
        }

        let now = Utc::now();
        if !context.precinct().is_closed() {
            let mut precinct = context.precinct().clone();
            precinct.closed_at = Some(now);
            context.update_precinct(precinct)?;
            info!(precinct = %context.code(), closed_at = %now, "Balloting closed");
        }

        election_return.precinct = context.precinct().clone();
        election_return.updated_at = now;
        self.store.put_election_return(election_return.clone())?;

        let receipt = self.export(&election_return)?;
        Ok(WrapUp {
            election_return,
            receipt,
        })
    }

    /// Export the return as it stands; safe to repeat after a failed export
    pub fn export(&self, election_return: &ElectionReturn) -> Result<ExportReceipt> {
        self.sink.export(election_return, self.payload)
    }

    fn election_return(&self, context: &PrecinctContext<'_>) -> Result<ElectionReturn> {
        self.store
            .get_election_return_by_precinct(context.code())?
            .ok_or_else(|| Error::not_found(Entity::ElectionReturn, context.code()))
    }
}
