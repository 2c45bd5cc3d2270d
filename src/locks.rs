//! Per-precinct serialization
//!
//! Every read-modify-write on a precinct's aggregates runs under that
//! precinct's lock. Different precincts never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{Error, Result};

/// Lock table keyed by precinct code
#[derive(Debug, Default)]
pub struct PrecinctLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PrecinctLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, precinct_code: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| Error::internal("Precinct lock table poisoned"))?;
        Ok(locks
            .entry(precinct_code.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// Run `f` while holding the precinct's lock
    pub fn with_lock<T>(&self, precinct_code: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.lock_for(precinct_code)?;
        let _guard = lock
            .lock()
            .map_err(|_| Error::internal(format!("Lock for precinct {precinct_code} poisoned")))?;
        f()
    }

    /// Number of precincts that have been locked at least once
    pub fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
