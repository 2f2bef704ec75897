//! Single Flight Module
//!
//! Collapses concurrent loads of the same key into one execution.

use std::collections::HashMap;
use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{CacheError, Result};

type Slot<T> = Option<Result<T>>;

// == Single Flight ==
/// Tracks in-flight calls by key.
///
/// The first caller for a key runs the work; everyone arriving while it runs
/// waits for and shares its result. The map lock is only held while looking
/// up or updating the map, never while the work runs.
pub struct SingleFlight<T> {
    calls: Mutex<HashMap<String, watch::Receiver<Slot<T>>>>,
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    // == Work ==
    /// Runs `f` unless a call for `key` is already in flight, in which case
    /// that call's result is returned instead.
    pub async fn work<F, Fut>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let leader = {
            let mut calls = self.calls.lock();
            match calls.get(key) {
                Some(rx) => Err(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    calls.insert(key.to_string(), rx);
                    Ok(tx)
                }
            }
        };

        let tx = match leader {
            Ok(tx) => tx,
            Err(rx) => return Self::wait(rx, key).await,
        };

        // removes the record even if this future is dropped mid-call
        let _record = CallRecord {
            calls: &self.calls,
            key,
        };
        let result = f().await;
        tx.send_replace(Some(result.clone()));
        result
    }

    async fn wait(mut rx: watch::Receiver<Slot<T>>, key: &str) -> Result<T> {
        match rx.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone().unwrap_or_else(|| Err(abandoned(key))),
            Err(_) => Err(abandoned(key)),
        }
    }

    /// Number of keys currently in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn abandoned(key: &str) -> CacheError {
    CacheError::Internal(format!("in-flight load of '{}' was abandoned", key))
}

struct CallRecord<'a, T> {
    calls: &'a Mutex<HashMap<String, watch::Receiver<Slot<T>>>>,
    key: &'a str,
}

impl<T> Drop for CallRecord<'_, T> {
    fn drop(&mut self) {
        self.calls.lock().remove(self.key);
    }
}
