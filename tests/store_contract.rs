//! Both store backends must satisfy the same contract

use chrono::Utc;
use ledger::errors::Entity;
use ledger::store::{ElectionStore, MemoryElectionStore, SqliteElectionStore};
use ledger::types::{
    Ballot, Candidate, ElectionReturn, ElectoralInspector, InspectorRole, Level, Mapping, Mark,
    Position, Precinct, Vote,
};
use ledger::Result;
use uuid::Uuid;

fn president() -> Position {
    Position::new("PRESIDENT", "President", Level::National, 1)
}

fn election_return(code: &str, precinct: &Precinct) -> ElectionReturn {
    ElectionReturn {
        id: Uuid::new_v4(),
        code: code.to_string(),
        precinct: precinct.clone(),
        tallies: vec![],
        signatures: precinct.electoral_inspectors.clone(),
        ballots: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn check_reference_data(store: &dyn ElectionStore) -> Result<()> {
    assert!(store.get_position("PRESIDENT")?.is_none());
    assert!(store.get_candidate("C001")?.is_none());
    assert!(store.get_mapping()?.is_none());

    let president = president();
    store.put_positions(vec![president.clone()])?;
    store.put_candidates(vec![
        Candidate::new("C001", "Juan", Some("JDC"), president.clone()),
        Candidate::new("C004", "Jose", None, president.clone()),
    ])?;
    store.put_mapping(Mapping {
        code: "0102800000".to_string(),
        location_name: "Currimao".to_string(),
        district: "2".to_string(),
        marks: vec![Mark {
            key: "A1".to_string(),
            value: "C001".to_string(),
        }],
    })?;

    assert_eq!(store.get_position("PRESIDENT")?, Some(president.clone()));
    assert_eq!(store.get_candidate("C001")?.unwrap().alias.as_deref(), Some("JDC"));
    let codes: Vec<_> = store.all_candidates()?.into_iter().map(|c| c.code).collect();
    assert_eq!(codes, vec!["C001", "C004"]);
    assert_eq!(store.all_positions()?.len(), 1);
    assert_eq!(store.get_mapping()?.unwrap().find_mark("A1").unwrap().value, "C001");

    // Upsert by code replaces in place
    store.put_candidates(vec![Candidate::new("C001", "Juan dela Cruz", None, president)])?;
    let all = store.all_candidates()?;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].name, "Juan dela Cruz");
    Ok(())
}

fn check_precincts_and_ballots(store: &dyn ElectionStore) -> Result<()> {
    assert!(store.get_precinct(None)?.is_none());
    assert!(store.get_ballots("P-001")?.is_empty());

    let err = store.put_ballot("P-001", Ballot::new("BAL-001", vec![])).unwrap_err();
    assert!(err.is_not_found(Entity::Precinct));

    let mut precinct = Precinct::new("P-001", "City Hall")
        .with_inspectors(vec![ElectoralInspector::new("A1", "Alice", InspectorRole::Chairperson)]);
    precinct.statistics.watchers_count = Some(4);
    store.put_precinct(precinct.clone())?;
    store.put_precinct(Precinct::new("P-002", "Annex"))?;

    assert_eq!(store.get_precinct(None)?, Some(precinct.clone()));
    assert_eq!(store.get_precinct(Some("P-002"))?.unwrap().location_name, "Annex");
    assert!(store.get_precinct(Some("P-404"))?.is_none());

    let president = president();
    let vote = Vote::new(
        president.clone(),
        vec![Candidate::new("C001", "Juan", None, president)],
    );
    let first = Ballot::new("BAL-001", vec![vote.clone()]).with_precinct_code("P-001");
    store.put_ballot("P-001", first)?;
    store.put_ballot("P-001", Ballot::new("BAL-002", vec![]).with_precinct_code("P-001"))?;
    store.put_ballot("P-001", Ballot::new("BAL-001", vec![]).with_precinct_code("P-001"))?;

    let ballots = store.get_ballots("P-001")?;
    let codes: Vec<_> = ballots.iter().map(|b| b.code.as_str()).collect();
    assert_eq!(codes, vec!["BAL-001", "BAL-002"]);
    assert!(ballots[0].votes.is_empty(), "same code replaces the stored ballot");
    assert!(store.get_ballots("P-002")?.is_empty());
    Ok(())
}

fn check_marks(store: &dyn ElectionStore) -> Result<()> {
    assert!(store.get_ballot_mark_keys("P-001", "BAL-001")?.is_empty());
    for key in ["B3", "A1", "B3", "C9"] {
        store.add_ballot_mark("P-001", "BAL-001", key)?;
    }
    store.add_ballot_mark("P-001", "BAL-002", "A1")?;
    store.add_ballot_mark("P-002", "BAL-001", "A2")?;

    assert_eq!(store.get_ballot_mark_keys("P-001", "BAL-001")?, vec!["B3", "A1", "C9"]);
    assert_eq!(store.get_ballot_mark_keys("P-001", "BAL-002")?, vec!["A1"]);
    // Same ballot code, different precinct
    assert_eq!(store.get_ballot_mark_keys("P-002", "BAL-001")?, vec!["A2"]);
    Ok(())
}

fn check_election_returns(store: &dyn ElectionStore) -> Result<()> {
    let p1 = Precinct::new("P-001", "City Hall");
    let p2 = Precinct::new("P-002", "Annex");
    store.put_precinct(p1.clone())?;
    store.put_precinct(p2.clone())?;

    assert!(store.get_election_return(None)?.is_none());
    store.put_election_return(election_return("ER-ONE", &p1))?;
    store.put_election_return(election_return("ER-TWO", &p2))?;

    assert_eq!(store.get_election_return(None)?.unwrap().code, "ER-ONE");
    assert_eq!(store.get_election_return_by_precinct("P-002")?.unwrap().code, "ER-TWO");

    // A new code for the same precinct replaces the old return
    let replacement = election_return("ER-ONE-B", &p1);
    store.put_election_return(replacement.clone())?;
    assert!(store.get_election_return(Some("ER-ONE"))?.is_none());
    assert_eq!(store.get_election_return_by_precinct("P-001")?, Some(replacement));
    assert_eq!(store.get_election_return(None)?.unwrap().code, "ER-ONE-B");
    Ok(())
}

fn run_contract(store: &dyn ElectionStore) -> Result<()> {
    check_reference_data(store)?;
    store.reset()?;
    check_precincts_and_ballots(store)?;
    store.reset()?;
    check_marks(store)?;
    store.reset()?;
    check_election_returns(store)?;
    store.reset()?;
    assert!(store.get_precinct(None)?.is_none());
    assert!(store.all_positions()?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_memory_store_contract() -> Result<()> {
    run_contract(&MemoryElectionStore::new())
}

#[tokio::test]
async fn test_sqlite_in_memory_store_contract() -> Result<()> {
    run_contract(&SqliteElectionStore::open_in_memory()?)
}

#[tokio::test]
async fn test_sqlite_file_store_contract() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = SqliteElectionStore::open(dir.path().join("nested").join("ledger.db"))?;
    run_contract(&store)
}

#[tokio::test]
async fn test_sqlite_round_trips_timestamps() -> Result<()> {
    let store = SqliteElectionStore::open_in_memory()?;
    let precinct = Precinct::new("P-001", "City Hall");
    store.put_precinct(precinct.clone())?;
    let er = election_return("ER-ONE", &precinct);
    store.put_election_return(er.clone())?;
    assert_eq!(store.get_election_return(Some("ER-ONE"))?, Some(er));
    Ok(())
}
