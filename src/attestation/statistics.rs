//! Precinct statistics entered by the board

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::Result;
use crate::precinct::PrecinctContext;
use crate::types::{Precinct, PrecinctStatistics};
use crate::validation_error;

/// Apply a partial statistics payload to the bound precinct
///
/// Only keys present in `payload` change: `null` clears a field, a
/// non-negative integer sets it. Keys that are not statistics are ignored.
/// The whole payload is validated before anything is written. A closed
/// precinct's statistics are final.
pub fn input_precinct_statistics(
    context: &mut PrecinctContext<'_>,
    payload: &Map<String, Value>,
) -> Result<Precinct> {
    context.ensure_open()?;

    let mut updates = Vec::new();
    for (key, value) in payload {
        if !PrecinctStatistics::FIELDS.contains(&key.as_str()) {
            debug!(key = %key, "Ignoring unrecognized statistics key");
            continue;
        }
        let parsed = match value {
            Value::Null => None,
            Value::Number(n) => match n.as_u64() {
                Some(count) => Some(count),
                None => {
                    return Err(validation_error!(
                        key.as_str(),
                        "must be an integer >= 0, got {}",
                        n
                    ));
                }
            },
            other => {
                return Err(validation_error!(
                    key.as_str(),
                    "must be an integer or null, got {}",
                    other
                ));
            }
        };
        updates.push((key.as_str(), parsed));
    }

    let mut precinct = context.precinct().clone();
    for (key, value) in &updates {
        if let Some(slot) = precinct.statistics.field_mut(key) {
            *slot = *value;
        }
    }
    context.update_precinct(precinct)?;

    info!(precinct = %context.code(), fields = updates.len(), "Precinct statistics updated");
    Ok(context.precinct().clone())
}
