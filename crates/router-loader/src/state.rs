//! Per-match records and their lifecycle.

use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use router_core::{LoaderError, MatchDescriptor, MatchId, SharedValue};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Status of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Created, loader not started.
    Idle,
    /// Loader in flight.
    Loading,
    /// Loader resolved; data available.
    Success,
    /// Loader rejected; error available.
    Error,
}

impl MatchStatus {
    /// Check if the match reached a terminal state.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// Check if moving to `next` is a legal transition.
    ///
    /// `Idle -> Success` is taken by routes without a loader and when
    /// seeding hydrated data; `Error -> Success` only when seeding.
    pub fn can_transition_to(&self, next: MatchStatus) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Loading)
                | (Self::Idle, Self::Success)
                | (Self::Error, Self::Success)
                | (Self::Loading, Self::Success)
                | (Self::Loading, Self::Error)
                | (Self::Success, Self::Loading)
                | (Self::Error, Self::Loading)
        )
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Result of one loader run.
pub type LoadResult = Result<SharedValue, LoaderError>;

/// In-flight loader run, shared by every consumer awaiting the same match.
#[derive(Clone)]
pub struct LoadPromise(Shared<BoxFuture<'static, LoadResult>>);

impl LoadPromise {
    pub(crate) fn new(future: BoxFuture<'static, LoadResult>) -> Self {
        Self(future.shared())
    }

    /// Wait for the loader to settle.
    pub async fn wait(&self) -> LoadResult {
        self.0.clone().await
    }

    /// The result, if already settled.
    pub fn peek(&self) -> Option<&LoadResult> {
        self.0.peek()
    }

    /// Check if both handles belong to the same loader run.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.0.ptr_eq(&other.0)
    }
}

impl fmt::Debug for LoadPromise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadPromise")
            .field("settled", &self.peek().is_some())
            .finish()
    }
}

/// Observable state of a match.
#[derive(Debug, Clone)]
pub struct MatchState {
    /// Typed params.
    pub params: SharedValue,
    /// Validated, merged search.
    pub search: SharedValue,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Present iff `status` is `Success`.
    pub loader_data: Option<SharedValue>,
    /// Present iff `status` is `Error`.
    pub error: Option<LoaderError>,
    /// Present iff `status` is `Loading`.
    pub load_promise: Option<LoadPromise>,
    /// Data is stale from this instant (ms).
    pub invalid_at: u64,
    /// Last status change (ms).
    pub updated_at: u64,
    /// Last load was a preload or a hydration seed.
    pub is_preload: bool,
    /// Incremented each time a loader run starts.
    pub generation: u64,
    /// Marked stale explicitly; the next reconcile reloads.
    pub invalidated: bool,
}

impl MatchState {
    fn idle(descriptor: &MatchDescriptor, now: u64) -> Self {
        Self {
            params: descriptor.params.clone(),
            search: descriptor.search.clone(),
            status: MatchStatus::Idle,
            loader_data: None,
            error: None,
            load_promise: None,
            invalid_at: 0,
            updated_at: now,
            is_preload: false,
            generation: 0,
            invalidated: false,
        }
    }

    /// Check if the data can be served without reloading.
    pub fn is_fresh(&self, now: u64) -> bool {
        self.status == MatchStatus::Success
            && !self.invalidated
            && router_cache::is_fresh(self.invalid_at, now)
    }
}

/// The live record for one match id.
///
/// Entries are created by the scheduler and updated in place; consumers read
/// snapshots through [`MatchEntry::state`] or watch them with
/// [`MatchEntry::subscribe`].
pub struct MatchEntry {
    match_id: MatchId,
    route_id: String,
    state: watch::Sender<MatchState>,
}

/// Shared handle on a match entry. Identity is the match id.
pub type MatchHandle = Arc<MatchEntry>;

impl MatchEntry {
    pub(crate) fn new(descriptor: &MatchDescriptor, now: u64) -> Self {
        let (state, _) = watch::channel(MatchState::idle(descriptor, now));
        Self {
            match_id: descriptor.match_id.clone(),
            route_id: descriptor.route_id.clone(),
            state,
        }
    }

    /// Match id.
    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    /// Route id.
    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> MatchState {
        self.state.borrow().clone()
    }

    /// Current status.
    pub fn status(&self) -> MatchStatus {
        self.state.borrow().status
    }

    /// Loader data, if the match succeeded.
    pub fn loader_data(&self) -> Option<SharedValue> {
        self.state.borrow().loader_data.clone()
    }

    /// Loader error, if the match failed.
    pub fn error(&self) -> Option<LoaderError> {
        self.state.borrow().error.clone()
    }

    /// The in-flight loader run, if loading.
    pub fn load_promise(&self) -> Option<LoadPromise> {
        self.state.borrow().load_promise.clone()
    }

    /// Watch state changes of this match.
    pub fn subscribe(&self) -> watch::Receiver<MatchState> {
        self.state.subscribe()
    }

    /// Read the state without cloning it.
    pub fn inspect<R>(&self, f: impl FnOnce(&MatchState) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Apply `f` atomically; subscribers are woken only if it returns `true`.
    ///
    /// Debug builds panic on a status change the lifecycle does not allow.
    pub(crate) fn modify(&self, f: impl FnOnce(&mut MatchState) -> bool) -> bool {
        self.state.send_if_modified(|state| {
            let from = state.status;
            let modified = f(state);
            debug_assert!(
                from == state.status || from.can_transition_to(state.status),
                "illegal match transition {from} -> {}",
                state.status
            );
            modified
        })
    }

    /// Record the outcome of loader run `generation`.
    ///
    /// Returns `false` when a newer run has started since; the outcome is
    /// then discarded.
    pub(crate) fn settle(&self, generation: u64, result: &LoadResult, now: u64, invalid_at: u64) -> bool {
        self.modify(|state| {
            if state.generation != generation || state.status != MatchStatus::Loading {
                return false;
            }
            match result {
                Ok(data) => {
                    state.status = MatchStatus::Success;
                    state.loader_data = Some(data.clone());
                    state.error = None;
                    state.invalid_at = invalid_at;
                }
                Err(error) => {
                    state.status = MatchStatus::Error;
                    state.loader_data = None;
                    state.error = Some(error.clone());
                    state.invalid_at = now;
                }
            }
            state.load_promise = None;
            state.updated_at = now;
            true
        })
    }

    /// Mark the entry stale so the next reconcile reloads it.
    pub(crate) fn invalidate(&self) -> bool {
        self.modify(|state| {
            if state.invalidated || state.status == MatchStatus::Idle {
                return false;
            }
            state.invalidated = true;
            true
        })
    }
}

impl fmt::Debug for MatchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchEntry")
            .field("match_id", &self.match_id)
            .field("route_id", &self.route_id)
            .field("status", &self.status())
            .finish()
    }
}
