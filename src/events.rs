//! Fire-and-forget ledger notifications for dashboards

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::types::Timestamp;

const DEFAULT_CAPACITY: usize = 256;

/// Something a precinct dashboard may want to redraw for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    BallotSubmitted {
        precinct_code: String,
        ballot_code: String,
        votes: usize,
    },
    ReturnGenerated {
        precinct_code: String,
        return_code: String,
        tallies: usize,
    },
    PrecinctClosed {
        precinct_code: String,
        return_code: String,
        closed_at: Timestamp,
    },
}

impl LedgerEvent {
    pub fn precinct_code(&self) -> &str {
        match self {
            LedgerEvent::BallotSubmitted { precinct_code, .. }
            | LedgerEvent::ReturnGenerated { precinct_code, .. }
            | LedgerEvent::PrecinctClosed { precinct_code, .. } => precinct_code,
        }
    }
}

/// Broadcast fan-out; sending never fails the caller
#[derive(Debug, Clone)]
pub struct BallotNotifier {
    sender: broadcast::Sender<LedgerEvent>,
}

impl Default for BallotNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BallotNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; having no subscribers is fine
    pub fn send(&self, event: LedgerEvent) {
        let precinct = event.precinct_code().to_string();
        match self.sender.send(event) {
            Ok(receivers) => trace!(precinct = %precinct, receivers, "Ledger event sent"),
            Err(_) => trace!(precinct = %precinct, "Ledger event dropped, no subscribers"),
        }
    }
}
