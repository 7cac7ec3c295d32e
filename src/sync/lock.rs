//! Per-resource pass locks

use crate::storage::SharedStore;
use crate::sync_state::{ResourceType, SyncStatus};
use crate::{Error, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

pub const CANCELLED_MESSAGE: &str = "sync pass cancelled";

/// Resources with a pass currently running in this process
#[derive(Debug, Clone, Default)]
pub struct PassLocks {
    active: Arc<Mutex<HashSet<ResourceType>>>,
}

impl PassLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `resource`, failing with `Error::SyncInProgress` if a pass already holds it
    pub fn acquire(&self, resource: ResourceType, store: SharedStore) -> Result<PassGuard> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(resource) {
            return Err(Error::SyncInProgress(resource));
        }
        Ok(PassGuard {
            resource,
            locks: self.clone(),
            store,
        })
    }

    pub fn is_active(&self, resource: ResourceType) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&resource)
    }

    fn release(&self, resource: ResourceType) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&resource);
    }
}

/// Held for the lifetime of one pass.
///
/// On drop the lock is released; a state row still marked `syncing` means the
/// pass never reached an end state (its future was dropped), so it is moved
/// to `error`.
pub struct PassGuard {
    resource: ResourceType,
    locks: PassLocks,
    store: SharedStore,
}

impl PassGuard {
    pub fn resource(&self) -> ResourceType {
        self.resource
    }
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        {
            let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
            let marked = store.get_sync_state(self.resource).and_then(|state| match state {
                Some(mut state) if state.sync_status == SyncStatus::Syncing => {
                    state.sync_status = SyncStatus::Error;
                    state.error_message = Some(CANCELLED_MESSAGE.to_string());
                    store.put_sync_state(&state).map(|_| true)
                }
                _ => Ok(false),
            });
            match marked {
                Ok(true) => tracing::warn!("{} sync pass dropped before completion", self.resource),
                Ok(false) => {}
                Err(e) => tracing::error!("Failed to record cancelled {} pass: {}", self.resource, e),
            }
        }
        self.locks.release(self.resource);
    }
}
