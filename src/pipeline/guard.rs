//! Per-game single-flight guard.

use crate::error::{Error, Result};
use crate::types::GameKey;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Keys with a pipeline currently running
#[derive(Clone, Debug, Default)]
pub(crate) struct InFlight {
    keys: Arc<Mutex<HashSet<GameKey>>>,
}

impl InFlight {
    // A panic while holding the lock cannot leave the set half-updated
    fn lock(&self) -> MutexGuard<'_, HashSet<GameKey>> {
        self.keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim `key`, failing with [`Error::PipelineBusy`] if it is already claimed
    pub(crate) fn acquire(&self, key: &GameKey) -> Result<InFlightGuard> {
        if !self.lock().insert(key.clone()) {
            return Err(Error::PipelineBusy {
                key: key.to_string(),
            });
        }
        Ok(InFlightGuard {
            in_flight: self.clone(),
            key: key.clone(),
        })
    }

    /// Whether a pipeline is running for `key`
    pub(crate) fn contains(&self, key: &GameKey) -> bool {
        self.lock().contains(key)
    }
}

/// Releases the claim on drop, early returns and panics included
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    in_flight: InFlight,
    key: GameKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}
