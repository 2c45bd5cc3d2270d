//! Edge cases: concurrent capture, resubmission, empty precincts, backends

mod common;

use common::{PRECINCT, seed, seeded_ledger, seeded_ledger_over};
use ledger::capture::{BallotSubmission, VoteEntry};
use ledger::config::{LedgerConfig, StoreConfig};
use ledger::errors::{Entity, Outcome};
use ledger::store::{ElectionStore, MemoryElectionStore, SqliteElectionStore};
use ledger::{ElectionLedger, Result};
use std::sync::Arc;

#[tokio::test]
async fn test_concurrent_resubmissions_lose_no_candidates() -> Result<()> {
    println!("⚡ Testing concurrent resubmissions of one ballot...");
    let ledger = Arc::new(seeded_ledger()?);

    let handles: Vec<_> = (1..=8)
        .map(|n| {
            let ledger = ledger.clone();
            tokio::task::spawn_blocking(move || {
                let code = format!("K{n:02}");
                let votes = vec![VoteEntry::codes("COUNCILOR", &[code.as_str()])];
                let submission = BallotSubmission::new("BAL-SHARED", votes);
                ledger.submit_ballot(None, submission)
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("capture task panicked")?;
    }

    let ballots = ledger.store().get_ballots(PRECINCT)?;
    assert_eq!(ballots.len(), 1);
    let councilors = ballots[0].vote_for("COUNCILOR").unwrap();
    assert_eq!(councilors.candidates.len(), 8, "every concurrent merge must survive");

    let er = ledger.generate_election_return(None, None)?;
    assert_eq!(er.tallies_for("COUNCILOR").count(), 8);
    println!("✅ All 8 concurrent merges recorded");
    Ok(())
}

#[tokio::test]
async fn test_concurrent_capture_on_sqlite() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Arc::new(SqliteElectionStore::open(dir.path().join("ledger.db"))?);
    let ledger = Arc::new(seeded_ledger_over(store)?);

    let handles: Vec<_> = (0..20)
        .map(|n| {
            let ledger = ledger.clone();
            tokio::task::spawn_blocking(move || {
                let president = if n % 2 == 0 { "C001" } else { "C004" };
                ledger.submit_compact_ballot(None, &format!("BAL-{n:03}|PRESIDENT:{president}"))
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("capture task panicked")?;
    }

    let er = ledger.generate_election_return(None, None)?;
    assert_eq!(er.ballots.len(), 20);
    assert_eq!(er.count_for("PRESIDENT", "C001"), 10);
    assert_eq!(er.count_for("PRESIDENT", "C004"), 10);
    Ok(())
}

#[tokio::test]
async fn test_precincts_are_independent() -> Result<()> {
    let ledger = Arc::new(ElectionLedger::new(Arc::new(MemoryElectionStore::new())));
    seed(&ledger, "P-NORTH", true)?;
    seed(&ledger, "P-SOUTH", true)?;

    let north = {
        let ledger = ledger.clone();
        tokio::task::spawn_blocking(move || {
            ledger.submit_compact_ballot(Some("P-NORTH"), "BAL-1|PRESIDENT:C001")
        })
    };
    let south = {
        let ledger = ledger.clone();
        tokio::task::spawn_blocking(move || {
            ledger.submit_compact_ballot(Some("P-SOUTH"), "BAL-1|PRESIDENT:C004")
        })
    };
    north.await.expect("north task panicked")?;
    south.await.expect("south task panicked")?;

    let north = ledger.generate_election_return(Some("P-NORTH"), None)?;
    let south = ledger.generate_election_return(Some("P-SOUTH"), None)?;
    assert_eq!(north.count_for("PRESIDENT", "C001"), 1);
    assert_eq!(north.count_for("PRESIDENT", "C004"), 0);
    assert_eq!(south.count_for("PRESIDENT", "C004"), 1);
    assert_ne!(north.code, south.code);

    // The first-loaded precinct is the default
    assert_eq!(ledger.precinct(None)?.code, "P-NORTH");
    Ok(())
}

#[tokio::test]
async fn test_mark_reads_stay_in_their_precinct() -> Result<()> {
    let stores: [Arc<dyn ElectionStore>; 2] = [
        Arc::new(MemoryElectionStore::new()),
        Arc::new(SqliteElectionStore::open_in_memory()?),
    ];

    for store in stores {
        let ledger = ElectionLedger::new(store);
        seed(&ledger, "P-NORTH", true)?;
        seed(&ledger, "P-SOUTH", true)?;

        ledger.read_vote(Some("P-NORTH"), "BAL-1", "A1")?;
        let south = ledger.finalize_ballot(Some("P-SOUTH"), "BAL-1")?;
        assert!(south.votes.is_empty(), "no marks were read in P-SOUTH");

        let north = ledger.finalize_ballot(Some("P-NORTH"), "BAL-1")?;
        assert_eq!(north.vote_for("PRESIDENT").unwrap().candidates[0].code, "C001");

        let south = ledger.generate_election_return(Some("P-SOUTH"), None)?;
        assert!(south.tallies.is_empty());
        let north = ledger.generate_election_return(Some("P-NORTH"), None)?;
        assert_eq!(north.count_for("PRESIDENT", "C001"), 1);
    }
    Ok(())
}

#[tokio::test]
async fn test_resubmission_that_overvotes_is_excluded_at_tally() -> Result<()> {
    let ledger = seeded_ledger()?;
    ledger.submit_compact_ballot(None, "BAL-X|PRESIDENT:C001;SENATOR:C002")?;
    let merged = ledger.submit_compact_ballot(None, "BAL-X|PRESIDENT:C004")?;

    let president = merged.vote_for("PRESIDENT").unwrap();
    let codes: Vec<_> = president.candidates.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["C004", "C001"], "union keeps incoming candidates first");

    let er = ledger.generate_election_return(None, None)?;
    assert_eq!(er.tallies_for("PRESIDENT").count(), 0);
    assert_eq!(er.count_for("SENATOR", "C002"), 1);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_candidates_count_once() -> Result<()> {
    let ledger = seeded_ledger()?;
    ledger.submit_compact_ballot(None, "BAL-D|SENATOR:C002,C002,C003")?;
    let er = ledger.generate_election_return(None, None)?;
    assert_eq!(er.count_for("SENATOR", "C002"), 1);
    assert_eq!(er.count_for("SENATOR", "C003"), 1);
    Ok(())
}

#[tokio::test]
async fn test_empty_precinct_tallies_nothing() -> Result<()> {
    let ledger = seeded_ledger()?;
    let er = ledger.generate_election_return(None, None)?;
    assert!(er.tallies.is_empty());
    assert!(er.ballots.is_empty());
    assert_eq!(er.signatures.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_unknown_precinct_and_unseeded_store() -> Result<()> {
    let ledger = seeded_ledger()?;
    let err = ledger
        .submit_compact_ballot(Some("P-404"), "BAL-1|PRESIDENT:C001")
        .unwrap_err();
    assert!(err.is_not_found(Entity::Precinct));
    assert_eq!(err.status_code(), 404);

    let empty = ElectionLedger::new(Arc::new(MemoryElectionStore::new()));
    let err = empty.generate_election_return(None, None).unwrap_err();
    assert!(err.is_not_found(Entity::Precinct));
    Ok(())
}

#[tokio::test]
async fn test_compact_errors_surface_as_outcomes() -> Result<()> {
    let ledger = seeded_ledger()?;

    let err = ledger.submit_compact_ballot(None, "BAL-1|MAYOR:C001").unwrap_err();
    assert!(err.is_not_found(Entity::Position));

    let err = ledger.submit_compact_ballot(None, "BAL-1|PRESIDENT:C999").unwrap_err();
    assert!(err.is_not_found(Entity::Candidate));

    let err = ledger.submit_compact_ballot(None, "no separator").unwrap_err();
    assert_eq!(err.outcome(), Outcome::ValidationFailed);
    assert_eq!(err.status_code(), 422);

    assert!(ledger.store().get_ballots(PRECINCT)?.is_empty());
    Ok(())
}

#[test]
fn test_ledger_from_testing_config() {
    let config = LedgerConfig::for_testing();
    let ledger = ElectionLedger::from_config(&config).unwrap();
    seed(&ledger, PRECINCT, true).unwrap();

    let wrap_up = tokio_test::block_on(async {
        ledger.generate_election_return(None, None).unwrap();
        ledger.wrap_up(None, true).unwrap()
    });

    let path = wrap_up.receipt.path.unwrap();
    assert!(path.starts_with(&config.export.directory));
    assert!(path.exists());
    std::fs::remove_dir_all(&config.export.directory).unwrap();
}

#[test]
fn test_ledger_from_sqlite_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = LedgerConfig::for_testing();
    config.store = StoreConfig::sqlite(dir.path().join("ledger.db"));
    config.return_code_length = 8;

    let ledger = ElectionLedger::from_config(&config).unwrap();
    seed(&ledger, PRECINCT, true).unwrap();
    let er = ledger.generate_election_return(None, None).unwrap();
    assert_eq!(er.code.len(), 8);

    // A second ledger over the same file sees the same state
    let reopened = ElectionLedger::from_config(&config).unwrap();
    assert_eq!(reopened.election_return(None).unwrap().code, er.code);
}
