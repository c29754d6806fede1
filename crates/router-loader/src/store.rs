//! The match id keyed cache of live entries.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use router_core::{MatchDescriptor, MatchId, RouterError};

use crate::state::{MatchEntry, MatchHandle};

/// Cache of match entries.
///
/// At most one entry exists per match id, so every consumer of a match id
/// shares the same record and the same in-flight load.
#[derive(Debug, Default)]
pub struct MatchStore {
    entries: Mutex<HashMap<MatchId, MatchHandle>>,
}

impl MatchStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an entry.
    pub fn get(&self, match_id: &MatchId) -> Option<MatchHandle> {
        self.entries.lock().get(match_id).cloned()
    }

    /// Get the entry for a descriptor, creating an idle one if absent.
    ///
    /// Fails when the match id is already held by a different route.
    pub fn get_or_insert(
        &self,
        descriptor: &MatchDescriptor,
        now: u64,
    ) -> Result<MatchHandle, RouterError> {
        let entry = self
            .entries
            .lock()
            .entry(descriptor.match_id.clone())
            .or_insert_with(|| Arc::new(MatchEntry::new(descriptor, now)))
            .clone();

        if entry.route_id() != descriptor.route_id {
            return Err(RouterError::MatchConflict {
                match_id: descriptor.match_id.clone(),
                route_id: descriptor.route_id.clone(),
                existing: entry.route_id().to_string(),
            });
        }
        Ok(entry)
    }

    /// Drop every entry for which `keep` returns `false`.
    ///
    /// Returns the removed match ids.
    pub fn retain(&self, mut keep: impl FnMut(&MatchHandle) -> bool) -> Vec<MatchId> {
        let mut removed = Vec::new();
        self.entries.lock().retain(|id, entry| {
            let kept = keep(entry);
            if !kept {
                removed.push(id.clone());
            }
            kept
        });
        removed
    }

    /// All entries, in no particular order.
    pub fn entries(&self) -> Vec<MatchHandle> {
        self.entries.lock().values().cloned().collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
