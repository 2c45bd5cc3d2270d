//! Shared fixtures for the integration tests

#![allow(dead_code)]

use ledger::catalog::{ElectionCatalog, MappingDocument, PrecinctRoster};
use ledger::store::{ElectionStore, MemoryElectionStore};
use ledger::{ElectionLedger, Result};
use serde_json::{Value, json};
use std::sync::Arc;

pub const PRECINCT: &str = "CURRIMAO-001";

/// C002, C003, C005 and ten more, thirteen senators in all
pub fn senator_codes() -> Vec<String> {
    let mut codes = vec!["C002".to_string(), "C003".to_string(), "C005".to_string()];
    codes.extend((6..=15).map(|n| format!("C{n:03}")));
    codes
}

pub fn election_json() -> Value {
    let senators: Vec<Value> = senator_codes()
        .iter()
        .map(|code| json!({"code": code, "name": format!("Senator {code}")}))
        .collect();
    let councilors: Vec<Value> = (1..=8)
        .map(|n| json!({"code": format!("K{n:02}"), "name": format!("Councilor {n}")}))
        .collect();

    json!({
        "positions": {
            "PRESIDENT": {"name": "President of the Philippines", "level": "national", "count": 1},
            "SENATOR": {"name": "Senator", "level": "national", "count": 12},
            "COUNCILOR": {"name": "Councilor", "level": "local", "count": 8}
        },
        "candidates": {
            "PRESIDENT": [
                {"code": "C001", "name": "Juan dela Cruz", "alias": "JDC"},
                {"code": "C004", "name": "Jose Rizal", "alias": "JR"}
            ],
            "SENATOR": senators,
            "COUNCILOR": councilors
        }
    })
}

pub fn roster_json(code: &str, with_juan: bool) -> Value {
    let mut inspectors = vec![
        json!({"id": "uuid-maria", "name": "Maria Santos", "role": "member"}),
        json!({"id": "uuid-pedro", "name": "Pedro Reyes", "role": "member"}),
    ];
    if with_juan {
        inspectors.insert(
            0,
            json!({"id": "uuid-juan", "name": "Juan dela Cruz", "role": "chairperson"}),
        );
    } else {
        inspectors.insert(0, json!({"id": "uuid-ana", "name": "Ana Lim", "role": "chairperson"}));
    }

    json!({
        "code": code,
        "location_name": "Currimao, Ilocos Norte",
        "latitude": 17.993217,
        "longitude": 120.488902,
        "electoral_inspectors": inspectors
    })
}

pub fn mapping_json() -> Value {
    let mut marks = vec![
        json!({"key": "A1", "value": "C001"}),
        json!({"key": "A2", "value": "C004"}),
    ];
    marks.extend(
        senator_codes()
            .iter()
            .enumerate()
            .map(|(i, code)| json!({"key": format!("B{}", i + 1), "value": code})),
    );

    json!({
        "code": "0102800000",
        "location_name": "Currimao, Ilocos Norte",
        "district": "2",
        "marks": marks
    })
}

pub fn seed(ledger: &ElectionLedger, precinct_code: &str, with_juan: bool) -> Result<()> {
    let election: ElectionCatalog = serde_json::from_value(election_json())?;
    let roster: PrecinctRoster = serde_json::from_value(roster_json(precinct_code, with_juan))?;
    let mapping: MappingDocument = serde_json::from_value(mapping_json())?;
    ledger.initialize(election, roster, mapping)?;
    Ok(())
}

pub fn seeded_ledger() -> Result<ElectionLedger> {
    seeded_ledger_over(Arc::new(MemoryElectionStore::new()))
}

pub fn seeded_ledger_over(store: Arc<dyn ElectionStore>) -> Result<ElectionLedger> {
    let ledger = ElectionLedger::new(store);
    seed(&ledger, PRECINCT, true)?;
    Ok(ledger)
}

/// `CODE|PRESIDENT:..;SENATOR:..` for the scenario ballots
pub fn scenario_lines() -> Vec<String> {
    vec![
        "BAL-A|PRESIDENT:C001;SENATOR:C002,C003".to_string(),
        "BAL-B|PRESIDENT:C004;SENATOR:C002,C005".to_string(),
        format!("BAL-C|SENATOR:{}", senator_codes().join(",")),
    ]
}
