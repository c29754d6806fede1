//! Router snapshots and the store that publishes them.

use std::sync::Arc;

use router_core::{LoaderError, Location, MatchId, RouterError, SharedValue};
use router_loader::{MatchHandle, MatchStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::share::Share;

/// Whether a transition is in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterStatus {
    /// No navigation pending.
    #[default]
    Idle,
    /// A navigation's chain is loading.
    Loading,
}

/// Immutable view of one match.
#[derive(Debug, Clone)]
pub struct MatchSnapshot {
    pub match_id: MatchId,
    pub route_id: String,
    pub status: MatchStatus,
    pub params: SharedValue,
    pub search: SharedValue,
    pub loader_data: Option<SharedValue>,
    pub error: Option<LoaderError>,
    pub invalid_at: u64,
    pub updated_at: u64,
    pub is_preload: bool,
}

impl MatchSnapshot {
    /// Capture the current state of an entry.
    pub fn capture(entry: &MatchHandle) -> Self {
        entry.inspect(|state| Self {
            match_id: entry.match_id().clone(),
            route_id: entry.route_id().to_string(),
            status: state.status,
            params: state.params.clone(),
            search: state.search.clone(),
            loader_data: state.loader_data.clone(),
            error: state.error.clone(),
            invalid_at: state.invalid_at,
            updated_at: state.updated_at,
            is_preload: state.is_preload,
        })
    }
}

impl PartialEq for MatchSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.match_id == other.match_id
            && self.route_id == other.route_id
            && self.status == other.status
            && self.params == other.params
            && self.search == other.search
            && self.loader_data == other.loader_data
            && match (&self.error, &other.error) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
            && self.invalid_at == other.invalid_at
            && self.updated_at == other.updated_at
            && self.is_preload == other.is_preload
    }
}

impl Share for MatchSnapshot {
    fn share(prev: &Self, next: Self) -> Self {
        Self {
            params: SharedValue::share(&prev.params, next.params),
            search: SharedValue::share(&prev.search, next.search),
            loader_data: Share::share(&prev.loader_data, next.loader_data),
            ..next
        }
    }
}

/// Shared list of match snapshots, root first.
pub type MatchList = Arc<Vec<Arc<MatchSnapshot>>>;

/// Immutable view of the whole router.
#[derive(Debug, Clone)]
pub struct RouterSnapshot {
    /// Whether a transition is in progress.
    pub status: RouterStatus,
    /// Committed location.
    pub location: Arc<Location>,
    /// Location being loaded, during a transition.
    pub pending_location: Option<Arc<Location>>,
    /// Committed chain, root first.
    pub current_matches: MatchList,
    /// Chain being loaded, or empty.
    pub pending_matches: MatchList,
    /// Any current or pending match is loading.
    pub is_fetching: bool,
    /// Last matcher failure for the committed location.
    pub error: Option<RouterError>,
    /// Incremented on every published change.
    pub version: u64,
}

impl RouterSnapshot {
    /// Snapshot of a router that has not navigated yet.
    pub fn initial(location: Location) -> Self {
        Self {
            status: RouterStatus::Idle,
            location: Arc::new(location),
            pending_location: None,
            current_matches: Arc::new(Vec::new()),
            pending_matches: Arc::new(Vec::new()),
            is_fetching: false,
            error: None,
            version: 0,
        }
    }

    /// Build a snapshot from live entries.
    pub fn capture(
        location: &Location,
        pending_location: Option<&Location>,
        current: &[MatchHandle],
        pending: &[MatchHandle],
        error: Option<RouterError>,
    ) -> Self {
        let capture = |entries: &[MatchHandle]| -> MatchList {
            Arc::new(
                entries
                    .iter()
                    .map(|entry| Arc::new(MatchSnapshot::capture(entry)))
                    .collect(),
            )
        };
        let current_matches = capture(current);
        let pending_matches = capture(pending);
        let is_fetching = current_matches
            .iter()
            .chain(pending_matches.iter())
            .any(|m| m.status == MatchStatus::Loading);

        Self {
            status: if pending_location.is_some() {
                RouterStatus::Loading
            } else {
                RouterStatus::Idle
            },
            location: Arc::new(location.clone()),
            pending_location: pending_location.map(|l| Arc::new(l.clone())),
            current_matches,
            pending_matches,
            is_fetching,
            error,
            version: 0,
        }
    }

    /// Find a committed match by route id.
    pub fn find(&self, route_id: &str) -> Option<&Arc<MatchSnapshot>> {
        self.current_matches.iter().find(|m| m.route_id == route_id)
    }

    /// The deepest committed match.
    pub fn leaf(&self) -> Option<&Arc<MatchSnapshot>> {
        self.current_matches.last()
    }

    /// Check if two snapshots hold the same allocations, ignoring the version.
    fn same_content(&self, other: &Self) -> bool {
        self.status == other.status
            && Arc::ptr_eq(&self.location, &other.location)
            && match (&self.pending_location, &other.pending_location) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
            && Arc::ptr_eq(&self.current_matches, &other.current_matches)
            && Arc::ptr_eq(&self.pending_matches, &other.pending_matches)
            && self.is_fetching == other.is_fetching
            && self.error.as_ref().map(ToString::to_string)
                == other.error.as_ref().map(ToString::to_string)
    }
}

impl Share for RouterSnapshot {
    fn share(prev: &Self, next: Self) -> Self {
        Self {
            status: next.status,
            location: share_leaf(&prev.location, next.location),
            pending_location: match (&prev.pending_location, next.pending_location) {
                (Some(old), Some(new)) => Some(share_leaf(old, new)),
                (_, new) => new,
            },
            current_matches: Share::share(&prev.current_matches, next.current_matches),
            pending_matches: Share::share(&prev.pending_matches, next.pending_matches),
            is_fetching: next.is_fetching,
            error: next.error,
            version: next.version,
        }
    }
}

/// Reuse `prev` when the value is equal; no field-wise sharing.
fn share_leaf<T: PartialEq>(prev: &Arc<T>, next: Arc<T>) -> Arc<T> {
    if Arc::ptr_eq(prev, &next) || **prev == *next {
        Arc::clone(prev)
    } else {
        next
    }
}

/// Publishes structurally shared router snapshots to subscribers.
#[derive(Debug)]
pub struct RouterStore {
    tx: watch::Sender<Arc<RouterSnapshot>>,
}

impl RouterStore {
    /// Create a store holding `initial`.
    pub fn new(initial: RouterSnapshot) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> Arc<RouterSnapshot> {
        Arc::clone(&self.tx.borrow())
    }

    /// Watch for new snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Arc<RouterSnapshot>> {
        self.tx.subscribe()
    }

    /// Share `next` against the latest snapshot and publish it if anything
    /// changed. Returns whether a new version was published.
    pub fn publish(&self, next: RouterSnapshot) -> bool {
        self.tx.send_if_modified(|current| {
            let mut shared = RouterSnapshot::share(current, next);
            if shared.same_content(current) {
                return false;
            }
            shared.version = current.version + 1;
            *current = Arc::new(shared);
            true
        })
    }
}
