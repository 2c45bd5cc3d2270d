//! Inspector signatures on an election return

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::Entity;
use crate::precinct::PrecinctContext;
use crate::store::ElectionStore;
use crate::types::{ElectionReturn, InspectorRole, SignPayload, Timestamp};
use crate::{Error, Result};

/// What a successful signing reports back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignOutcome {
    pub message: String,
    pub id: String,
    pub name: String,
    pub role: InspectorRole,
    pub signed_at: Timestamp,
    pub election_return: ElectionReturn,
}

/// Attach an inspector's signature to the precinct's election return
///
/// The inspector must be on the precinct roster; the roster's role is the
/// one recorded. Signing again replaces the earlier signature. Signatures
/// are closed along with the precinct.
pub fn sign_election_return(
    store: &dyn ElectionStore,
    context: &mut PrecinctContext<'_>,
    payload: &SignPayload,
) -> Result<SignOutcome> {
    context.ensure_open()?;
    let mut election_return = store
        .get_election_return_by_precinct(context.code())?
        .ok_or_else(|| Error::not_found(Entity::ElectionReturn, context.code()))?;

    let mut precinct = context.precinct().clone();
    let inspector = precinct
        .electoral_inspectors
        .iter_mut()
        .find(|i| i.id == payload.id)
        .ok_or_else(|| Error::not_found(Entity::Inspector, payload.id.as_str()))?;

    let signed_at = Utc::now();
    inspector.signature = Some(payload.signature.clone());
    inspector.signed_at = Some(signed_at);
    let signed = inspector.clone();

    context.update_precinct(precinct)?;

    match election_return
        .signatures
        .iter_mut()
        .find(|entry| entry.id == signed.id)
    {
        Some(entry) => *entry = signed.clone(),
        None => election_return.signatures.push(signed.clone()),
    }
    election_return.precinct = context.precinct().clone();
    election_return.updated_at = signed_at;
    store.put_election_return(election_return.clone())?;

    info!(
        precinct = %context.code(),
        code = %election_return.code,
        inspector = %signed.id,
        role = %signed.role,
        "Signature recorded"
    );

    Ok(SignOutcome {
        message: "Signature saved successfully.".to_string(),
        id: signed.id,
        name: signed.name,
        role: signed.role,
        signed_at,
        election_return,
    })
}
