//! `ElectionLedger`: the one entry point adapters call
//!
//! Owns the injected store, the per-precinct locks, the notifier, the
//! export sink and the quorum policy. Every operation resolves its precinct
//! and runs under that precinct's lock. Once wrap-up closes a precinct,
//! only a forced wrap-up and the export retry still act on it.

use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::attestation::{
    ArtifactSink, ChairPlusMemberPolicy, ExportPayload, ExportReceipt, FileArtifactSink, Finalizer,
    NullArtifactSink, QuorumPolicy, ReturnState, SignOutcome, WrapUp,
};
use crate::capture::{self, BallotSubmission};
use crate::catalog::{self, ElectionCatalog, InitSummary, MappingDocument, PrecinctRoster};
use crate::config::LedgerConfig;
use crate::errors::Entity;
use crate::events::{BallotNotifier, LedgerEvent};
use crate::locks::PrecinctLocks;
use crate::precinct::PrecinctContext;
use crate::store::{self, ElectionStore};
use crate::tally::{DEFAULT_RETURN_CODE_LENGTH, TallyEngine};
use crate::types::{Ballot, ElectionReturn, Precinct, SignPayload};
use crate::{Error, Result};

pub struct ElectionLedger {
    store: Arc<dyn ElectionStore>,
    locks: PrecinctLocks,
    notifier: BallotNotifier,
    sink: Arc<dyn ArtifactSink>,
    policy: Arc<dyn QuorumPolicy>,
    export_payload: ExportPayload,
    return_code_length: usize,
}

impl ElectionLedger {
    /// Ledger over `store` that exports nothing
    pub fn new(store: Arc<dyn ElectionStore>) -> Self {
        Self {
            store,
            locks: PrecinctLocks::new(),
            notifier: BallotNotifier::default(),
            sink: Arc::new(NullArtifactSink),
            policy: Arc::new(ChairPlusMemberPolicy),
            export_payload: ExportPayload::default(),
            return_code_length: DEFAULT_RETURN_CODE_LENGTH,
        }
    }

    /// Store, export directory and code length from configuration
    pub fn from_config(config: &LedgerConfig) -> Result<Self> {
        let store = store::open(&config.store)?;
        Ok(Self::new(store)
            .with_sink(Arc::new(FileArtifactSink::new(&config.export.directory)))
            .with_export_payload(config.export.payload)
            .with_return_code_length(config.return_code_length))
    }

    pub fn with_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn QuorumPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_notifier(mut self, notifier: BallotNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_export_payload(mut self, payload: ExportPayload) -> Self {
        self.export_payload = payload;
        self
    }

    pub fn with_return_code_length(mut self, length: usize) -> Self {
        self.return_code_length = length;
        self
    }

    pub fn store(&self) -> &dyn ElectionStore {
        self.store.as_ref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.notifier.subscribe()
    }

    /// Code of the named precinct, or of the first-loaded one
    fn resolve(&self, precinct_code: Option<&str>) -> Result<String> {
        Ok(PrecinctContext::new(self.store(), precinct_code)?
            .code()
            .to_string())
    }

    /// Resolve the precinct, lock it, and hand `f` a fresh context
    fn with_precinct<T>(
        &self,
        precinct_code: Option<&str>,
        f: impl FnOnce(&mut PrecinctContext<'_>) -> Result<T>,
    ) -> Result<T> {
        let code = self.resolve(precinct_code)?;
        self.locks.with_lock(&code, || {
            let mut context = PrecinctContext::new(self.store(), Some(&code))?;
            f(&mut context)
        })
    }

    fn finalizer(&self) -> Finalizer<'_> {
        Finalizer::new(
            self.store(),
            self.policy.as_ref(),
            self.sink.as_ref(),
            self.export_payload,
        )
    }

    pub fn initialize(
        &self,
        election: ElectionCatalog,
        roster: PrecinctRoster,
        mapping: MappingDocument,
    ) -> Result<InitSummary> {
        let code = roster.code.clone();
        self.locks.with_lock(&code, || {
            catalog::initialize(self.store(), election, roster, mapping)
        })
    }

    pub fn initialize_from_paths(
        &self,
        election_path: impl AsRef<Path>,
        precinct_path: impl AsRef<Path>,
        mapping_path: impl AsRef<Path>,
    ) -> Result<InitSummary> {
        catalog::from_paths(self.store(), election_path, precinct_path, mapping_path)
    }

    pub fn precinct(&self, precinct_code: Option<&str>) -> Result<Precinct> {
        Ok(PrecinctContext::new(self.store(), precinct_code)?.into_precinct())
    }

    pub fn election_return(&self, precinct_code: Option<&str>) -> Result<ElectionReturn> {
        let code = self.resolve(precinct_code)?;
        self.store
            .get_election_return_by_precinct(&code)?
            .ok_or_else(|| Error::not_found(Entity::ElectionReturn, code))
    }

    pub fn return_state(&self, precinct_code: Option<&str>) -> Result<ReturnState> {
        let election_return = self.election_return(precinct_code)?;
        let precinct = self.precinct(Some(&election_return.precinct.code))?;
        Ok(ReturnState::of(&election_return, &precinct, self.policy.as_ref()))
    }

    /// Record one OMR mark reading and return the draft ballot
    pub fn read_vote(
        &self,
        precinct_code: Option<&str>,
        ballot_code: &str,
        mark_key: &str,
    ) -> Result<Ballot> {
        self.with_precinct(precinct_code, |context| {
            capture::read_vote(self.store(), context, ballot_code, mark_key)
        })
    }

    /// Store the current resolution of a ballot's mark readings
    pub fn finalize_ballot(
        &self,
        precinct_code: Option<&str>,
        ballot_code: &str,
    ) -> Result<Ballot> {
        let ballot = self.with_precinct(precinct_code, |context| {
            capture::finalize_ballot(self.store(), context, ballot_code)
        })?;
        self.notify_ballot(&ballot);
        Ok(ballot)
    }

    /// Bulk submission; the submission's own precinct code is used when none is given
    pub fn submit_ballot(
        &self,
        precinct_code: Option<&str>,
        submission: BallotSubmission,
    ) -> Result<Ballot> {
        let target = precinct_code
            .map(str::to_string)
            .or_else(|| submission.precinct_code.clone());
        let ballot = self.with_precinct(target.as_deref(), |context| {
            capture::submit_ballot(self.store(), context, submission)
        })?;
        self.notify_ballot(&ballot);
        Ok(ballot)
    }

    pub fn submit_compact_ballot(&self, precinct_code: Option<&str>, line: &str) -> Result<Ballot> {
        let submission = capture::parse_compact_ballot(self.store(), line)?;
        self.submit_ballot(precinct_code, submission)
    }

    fn notify_ballot(&self, ballot: &Ballot) {
        if let Some(precinct_code) = &ballot.precinct_code {
            self.notifier.send(LedgerEvent::BallotSubmitted {
                precinct_code: precinct_code.clone(),
                ballot_code: ballot.code.clone(),
                votes: ballot.votes.len(),
            });
        }
    }

    /// Tally the precinct and persist its election return
    pub fn generate_election_return(
        &self,
        precinct_code: Option<&str>,
        return_code: Option<&str>,
    ) -> Result<ElectionReturn> {
        let election_return = self.with_precinct(precinct_code, |context| {
            TallyEngine::new(self.store())
                .with_code_length(self.return_code_length)
                .run(Some(context.code()), return_code)
        })?;
        self.notifier.send(LedgerEvent::ReturnGenerated {
            precinct_code: election_return.precinct.code.clone(),
            return_code: election_return.code.clone(),
            tallies: election_return.tallies.len(),
        });
        Ok(election_return)
    }

    /// Sign with a scanned `ROLE:ID:SIGNATURE` string
    pub fn sign_election_return(
        &self,
        precinct_code: Option<&str>,
        payload: &str,
    ) -> Result<SignOutcome> {
        let payload: SignPayload = payload.parse()?;
        self.with_precinct(precinct_code, |context| {
            crate::attestation::sign_election_return(self.store(), context, &payload)
        })
    }

    pub fn input_precinct_statistics(
        &self,
        precinct_code: Option<&str>,
        payload: &Map<String, Value>,
    ) -> Result<Precinct> {
        self.with_precinct(precinct_code, |context| {
            crate::attestation::input_precinct_statistics(context, payload)
        })
    }

    /// Close the precinct and export its final return
    pub fn wrap_up(&self, precinct_code: Option<&str>, force: bool) -> Result<WrapUp> {
        let wrap_up = self.with_precinct(precinct_code, |context| {
            self.finalizer().wrap_up(context, force)
        })?;
        if let Some(closed_at) = wrap_up.election_return.precinct.closed_at {
            self.notifier.send(LedgerEvent::PrecinctClosed {
                precinct_code: wrap_up.election_return.precinct.code.clone(),
                return_code: wrap_up.election_return.code.clone(),
                closed_at,
            });
        }
        Ok(wrap_up)
    }

    /// Re-run the export of a closed precinct's return
    pub fn export_election_return(&self, precinct_code: Option<&str>) -> Result<ExportReceipt> {
        self.with_precinct(precinct_code, |context| {
            if !context.precinct().is_closed() {
                return Err(crate::precondition_error!(
                    "Precinct {} has not been wrapped up",
                    context.code()
                ));
            }
            let election_return = self
                .store
                .get_election_return_by_precinct(context.code())?
                .ok_or_else(|| Error::not_found(Entity::ElectionReturn, context.code()))?;
            self.finalizer().export(&election_return)
        })
    }
}
