//! Precinct Context: a view of one precinct plus its ballot-merge step

use tracing::info;

use crate::errors::Entity;
use crate::store::ElectionStore;
use crate::types::{Ballot, ElectoralInspector, InspectorRole, Precinct, PrecinctStatistics};
use crate::{Error, Result, precondition_error};

/// Store access bound to a single precinct
///
/// The precinct is read once at construction; [`PrecinctContext::update_precinct`]
/// writes through and refreshes the held copy.
pub struct PrecinctContext<'a> {
    store: &'a dyn ElectionStore,
    precinct: Precinct,
}

impl<'a> PrecinctContext<'a> {
    /// Bind to `code`, or to the first-loaded precinct when `code` is `None`
    pub fn new(store: &'a dyn ElectionStore, code: Option<&str>) -> Result<Self> {
        let precinct = store
            .get_precinct(code)?
            .ok_or_else(|| Error::not_found(Entity::Precinct, code.unwrap_or("default")))?;
        Ok(Self { store, precinct })
    }

    pub fn precinct(&self) -> &Precinct {
        &self.precinct
    }

    pub fn into_precinct(self) -> Precinct {
        self.precinct
    }

    pub fn code(&self) -> &str {
        &self.precinct.code
    }

    pub fn location(&self) -> &str {
        &self.precinct.location_name
    }

    pub fn latitude(&self) -> f64 {
        self.precinct.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.precinct.longitude
    }

    pub fn inspectors(&self) -> &[ElectoralInspector] {
        &self.precinct.electoral_inspectors
    }

    pub fn chairperson(&self) -> Option<&ElectoralInspector> {
        self.inspectors()
            .iter()
            .find(|i| i.role == InspectorRole::Chairperson)
    }

    pub fn members(&self) -> impl Iterator<Item = &ElectoralInspector> {
        self.inspectors()
            .iter()
            .filter(|i| i.role == InspectorRole::Member)
    }

    pub fn statistics(&self) -> &PrecinctStatistics {
        &self.precinct.statistics
    }

    /// Fails once wrap-up has closed the precinct
    pub fn ensure_open(&self) -> Result<()> {
        if self.precinct.is_closed() {
            return Err(precondition_error!(
                "Balloting for precinct {} is already closed",
                self.code()
            ));
        }
        Ok(())
    }

    pub fn ballots(&self) -> Result<Vec<Ballot>> {
        self.store.get_ballots(self.code())
    }

    /// Store a ballot, folding it into any stored ballot with the same code
    ///
    /// Overvotes are recorded as submitted; the tally decides what counts.
    /// A closed precinct accepts no more ballots.
    pub fn put_ballot(&self, incoming: Ballot) -> Result<Ballot> {
        self.ensure_open()?;
        let existing = self
            .ballots()?
            .into_iter()
            .find(|ballot| ballot.code == incoming.code);

        let ballot = match existing {
            Some(existing) => {
                let incoming_votes = incoming.votes.len();
                let merged = existing
                    .merge_with(incoming)
                    .with_precinct_code(self.code());
                info!(
                    precinct = %self.code(),
                    ballot = %merged.code,
                    votes = incoming_votes,
                    merged_votes = merged.votes.len(),
                    "Ballot merged"
                );
                merged
            }
            None => {
                let ballot = incoming.with_precinct_code(self.code());
                info!(
                    precinct = %self.code(),
                    ballot = %ballot.code,
                    votes = ballot.votes.len(),
                    "Ballot added"
                );
                ballot
            }
        };

        self.store.put_ballot(self.code(), ballot.clone())?;
        Ok(ballot)
    }

    /// Persist a modified copy of this precinct
    pub fn update_precinct(&mut self, precinct: Precinct) -> Result<()> {
        if precinct.code != self.precinct.code {
            return Err(Error::internal(format!(
                "Precinct context for {} cannot write precinct {}",
                self.precinct.code, precinct.code
            )));
        }
        self.store.put_precinct(precinct.clone())?;
        self.precinct = precinct;
        Ok(())
    }
}
