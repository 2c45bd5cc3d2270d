//! Catalog load: positions, candidates, the precinct roster and the mapping
//!
//! Runs once at setup. Candidates listed under a position code the catalog
//! does not define are skipped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::{Result, precondition_error};
use crate::store::ElectionStore;
use crate::types::{Candidate, ElectoralInspector, Level, Mapping, Mark, Position, Precinct};

/// One position entry of the election document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionEntry {
    /// Defaults to the map key when positions are keyed by code
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    pub level: Level,
    pub count: u32,
}

/// Positions either keyed by code or listed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PositionEntries {
    Keyed(BTreeMap<String, PositionEntry>),
    Listed(Vec<PositionEntry>),
}

impl Default for PositionEntries {
    fn default() -> Self {
        PositionEntries::Listed(Vec::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateEntry {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
}

/// `{positions: {...}, candidates: {position_code: [...]}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElectionCatalog {
    #[serde(default)]
    pub positions: PositionEntries,
    #[serde(default)]
    pub candidates: BTreeMap<String, Vec<CandidateEntry>>,
}

impl ElectionCatalog {
    /// Position catalog; keyed documents come out sorted by code
    pub fn positions(&self) -> Vec<Position> {
        let to_position = |key: Option<&str>, entry: &PositionEntry| {
            let code = entry.code.as_deref().or(key).unwrap_or_default();
            Position::new(code, entry.name.clone(), entry.level, entry.count)
        };
        match &self.positions {
            PositionEntries::Keyed(map) => map
                .iter()
                .map(|(key, entry)| to_position(Some(key.as_str()), entry))
                .collect(),
            PositionEntries::Listed(list) => {
                list.iter().map(|entry| to_position(None, entry)).collect()
            }
        }
    }

    /// Candidates with their position snapshot attached
    pub fn candidates(&self, positions: &[Position]) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for (position_code, entries) in &self.candidates {
            let Some(position) = positions.iter().find(|p| &p.code == position_code) else {
                warn!(position_code = %position_code, "Skipping candidates under unknown position");
                continue;
            };
            candidates.extend(entries.iter().map(|entry| {
                Candidate::new(
                    entry.code.clone(),
                    entry.name.clone(),
                    entry.alias.as_deref(),
                    position.clone(),
                )
            }));
        }
        candidates
    }
}

/// Precinct roster document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecinctRoster {
    pub code: String,
    pub location_name: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub electoral_inspectors: Vec<ElectoralInspector>,
}

impl From<PrecinctRoster> for Precinct {
    fn from(roster: PrecinctRoster) -> Self {
        let mut precinct = Precinct::new(roster.code, roster.location_name)
            .with_inspectors(roster.electoral_inspectors);
        precinct.latitude = roster.latitude;
        precinct.longitude = roster.longitude;
        precinct
    }
}

/// Mapping document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingDocument {
    pub code: String,
    pub location_name: String,
    pub district: String,
    #[serde(default)]
    pub marks: Vec<Mark>,
}

impl From<MappingDocument> for Mapping {
    fn from(doc: MappingDocument) -> Self {
        Mapping {
            code: doc.code,
            location_name: doc.location_name,
            district: doc.district,
            marks: doc.marks,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadCount {
    pub created: usize,
    pub updated: usize,
}

/// What a catalog load created or replaced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitSummary {
    pub positions: LoadCount,
    pub candidates: LoadCount,
    pub precinct: LoadCount,
    pub mapping_loaded: bool,
    pub precinct_code: String,
}

/// Load the catalog, roster and mapping into the store
///
/// Re-running with the same documents replaces records in place. The roster
/// is replaced, dropping inspector signatures already recorded on it, but
/// statistics entered for the precinct are kept. A precinct that wrap-up has
/// closed cannot be re-initialized.
pub fn initialize(
    store: &dyn ElectionStore,
    election: ElectionCatalog,
    roster: PrecinctRoster,
    mapping: MappingDocument,
) -> Result<InitSummary> {
    let mut precinct_count = LoadCount::default();
    let mut precinct = Precinct::from(roster);
    let precinct_code = precinct.code.clone();
    match store.get_precinct(Some(&precinct_code))? {
        Some(existing) if existing.is_closed() => {
            return Err(precondition_error!(
                "Precinct {} is closed and cannot be re-initialized",
                precinct_code
            ));
        }
        Some(existing) => {
            precinct.statistics = existing.statistics;
            precinct_count.updated += 1;
        }
        None => precinct_count.created += 1,
    }
    store.put_precinct(precinct)?;

    let positions = election.positions();
    let mut position_count = LoadCount::default();
    for position in &positions {
        match store.get_position(&position.code)? {
            Some(_) => position_count.updated += 1,
            None => position_count.created += 1,
        }
    }

    let candidates = election.candidates(&positions);
    let mut candidate_count = LoadCount::default();
    for candidate in &candidates {
        match store.get_candidate(&candidate.code)? {
            Some(_) => candidate_count.updated += 1,
            None => candidate_count.created += 1,
        }
    }

    store.put_positions(positions)?;
    store.put_candidates(candidates)?;
    store.put_mapping(mapping.into())?;

    let summary = InitSummary {
        positions: position_count,
        candidates: candidate_count,
        precinct: precinct_count,
        mapping_loaded: true,
        precinct_code,
    };

    info!(
        precinct = %summary.precinct_code,
        positions = summary.positions.created + summary.positions.updated,
        candidates = summary.candidates.created + summary.candidates.updated,
        "Election catalog loaded"
    );

    Ok(summary)
}

/// Read the three JSON documents from disk and [`initialize`] the store
pub fn from_paths(
    store: &dyn ElectionStore,
    election_path: impl AsRef<Path>,
    precinct_path: impl AsRef<Path>,
    mapping_path: impl AsRef<Path>,
) -> Result<InitSummary> {
    let election = serde_json::from_slice(&std::fs::read(election_path)?)?;
    let roster = serde_json::from_slice(&std::fs::read(precinct_path)?)?;
    let mapping = serde_json::from_slice(&std::fs::read(mapping_path)?)?;
    initialize(store, election, roster, mapping)
}
