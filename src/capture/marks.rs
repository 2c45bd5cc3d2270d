//! Incremental capture from OMR mark readings

use tracing::{debug, info};

use crate::Result;
use crate::mapping::MappingResolver;
use crate::precinct::PrecinctContext;
use crate::store::ElectionStore;
use crate::types::Ballot;

/// Record one mark reading and return the re-resolved draft ballot
///
/// Fails with `NotFound` for a key the mapping does not define, before
/// anything is recorded. The draft is resolved from every mark recorded so
/// far under this precinct, so a position this reading overvotes drops out
/// while others stay.
pub fn read_vote(
    store: &dyn ElectionStore,
    precinct: &PrecinctContext<'_>,
    ballot_code: &str,
    mark_key: &str,
) -> Result<Ballot> {
    precinct.ensure_open()?;
    let resolver = MappingResolver::new(store)?;
    resolver.get_mark(mark_key)?;

    store.add_ballot_mark(precinct.code(), ballot_code, mark_key)?;
    debug!(precinct = %precinct.code(), ballot = %ballot_code, mark = %mark_key, "Mark recorded");

    resolver.resolve_ballot(precinct.code(), ballot_code)
}

/// Resolve the ballot-in-progress and store it under the precinct
pub fn finalize_ballot(
    store: &dyn ElectionStore,
    precinct: &PrecinctContext<'_>,
    ballot_code: &str,
) -> Result<Ballot> {
    precinct.ensure_open()?;
    info!(precinct = %precinct.code(), ballot = %ballot_code, "Finalizing ballot from marks");

    let resolved = MappingResolver::new(store)?.resolve_ballot(precinct.code(), ballot_code)?;
    precinct.put_ballot(resolved)
}
