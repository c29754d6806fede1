//! Load scheduler.
//!
//! Reconciles matched chains against the match cache and drives each match
//! through its loader, parents before children. Entries that are loading or
//! fresh are reused, so concurrent and repeated requests for a match id share
//! one loader run.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::FutureExt;
use parking_lot::{Mutex, RwLock};
use router_cache::ResolvedPolicy;
use router_core::{
    Clock, LoadKind, Loader, LoaderContext, MatchDescriptor, MatchId, RouteTree, RouterConfig,
    RouterError, SharedValue,
};
use router_observability::load_span;
use tracing::{debug, trace, Instrument};

use crate::chain::{ChainOutcome, PendingChain};
use crate::state::{LoadPromise, LoadResult, MatchEntry, MatchHandle, MatchStatus};
use crate::store::MatchStore;

/// Callback run after any entry changes state.
pub type ChangeListener = Arc<dyn Fn(&MatchId) + Send + Sync>;

/// Drives matches through their loaders.
///
/// Cloning is cheap; clones share the same cache.
#[derive(Clone)]
pub struct LoadScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    tree: Arc<RouteTree>,
    config: RouterConfig,
    clock: Arc<dyn Clock>,
    context: SharedValue,
    store: MatchStore,
    /// Match ids of chains whose driver has not finished, by chain id.
    active: Mutex<HashMap<u64, Vec<MatchId>>>,
    next_chain: AtomicU64,
    listener: RwLock<Option<ChangeListener>>,
}

enum Step {
    Ready(LoadResult),
    Wait(LoadPromise),
}

impl LoadScheduler {
    /// Create a scheduler.
    ///
    /// `context` is handed to every loader invocation.
    pub fn new(
        tree: Arc<RouteTree>,
        config: RouterConfig,
        clock: Arc<dyn Clock>,
        context: SharedValue,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                tree,
                config,
                clock,
                context,
                store: MatchStore::new(),
                active: Mutex::new(HashMap::new()),
                next_chain: AtomicU64::new(0),
                listener: RwLock::new(None),
            }),
        }
    }

    /// Install the change listener, replacing any previous one.
    pub fn set_listener(&self, listener: ChangeListener) {
        *self.inner.listener.write() = Some(listener);
    }

    /// The route tree.
    pub fn tree(&self) -> &Arc<RouteTree> {
        &self.inner.tree
    }

    /// The router configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    /// Current time on the scheduler's clock.
    pub fn now_ms(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    /// The match cache.
    pub fn store(&self) -> &MatchStore {
        &self.inner.store
    }

    /// Get a cached entry.
    pub fn get(&self, match_id: &MatchId) -> Option<MatchHandle> {
        self.inner.store.get(match_id)
    }

    /// Reconcile a chain against the cache and start driving it.
    ///
    /// Fresh or loading entries are reused as-is; everything else is loaded
    /// once its parent has succeeded. The chain is driven on the current
    /// tokio runtime when there is one.
    pub fn reconcile(
        &self,
        descriptors: &[MatchDescriptor],
        kind: LoadKind,
    ) -> Result<PendingChain, RouterError> {
        for descriptor in descriptors {
            if self.inner.tree.get(&descriptor.route_id).is_none() {
                return Err(RouterError::UnknownRoute(descriptor.route_id.clone()));
            }
        }

        let now = self.inner.clock.now_ms();
        let entries: Vec<MatchHandle> = descriptors
            .iter()
            .map(|descriptor| self.inner.store.get_or_insert(descriptor, now))
            .collect::<Result<_, _>>()?;

        let id = self.inner.next_chain.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.active.lock().insert(
            id,
            descriptors.iter().map(|d| d.match_id.clone()).collect(),
        );

        let links: Vec<(MatchDescriptor, MatchHandle)> = descriptors
            .iter()
            .cloned()
            .zip(entries.iter().cloned())
            .collect();
        let done = drive(Arc::clone(&self.inner), id, links, kind).boxed();
        let chain = PendingChain::new(id, kind, entries, done);
        let spawned = chain.spawn_driver();

        debug!(
            chain = id,
            kind = %kind,
            matches = descriptors.len(),
            spawned,
            "chain reconciled"
        );
        Ok(chain)
    }

    /// Load a chain into the cache ahead of navigation.
    pub fn preload(&self, descriptors: &[MatchDescriptor]) -> Result<PendingChain, RouterError> {
        self.reconcile(descriptors, LoadKind::Preload)
    }

    /// Seed a successful entry from server-rendered data without running the
    /// loader.
    pub fn seed(
        &self,
        descriptor: &MatchDescriptor,
        data: SharedValue,
    ) -> Result<MatchHandle, RouterError> {
        let policy = self.inner.policy(&descriptor.route_id)?;
        let now = self.inner.clock.now_ms();
        let entry = self.inner.store.get_or_insert(descriptor, now)?;

        entry.modify(|state| {
            // Any run still in flight must not overwrite the seeded data
            state.generation += 1;
            state.params = descriptor.params.clone();
            state.search = descriptor.search.clone();
            state.status = MatchStatus::Success;
            state.loader_data = Some(data);
            state.error = None;
            state.load_promise = None;
            state.invalid_at = policy.invalid_at(now, LoadKind::Hydration);
            state.updated_at = now;
            state.is_preload = true;
            state.invalidated = false;
            true
        });
        trace!(match_id = %descriptor.match_id, "seeded hydrated match");
        self.inner.notify(entry.match_id());

        Ok(entry)
    }

    /// Mark matching entries stale. Returns how many changed.
    pub fn invalidate(&self, filter: impl Fn(&MatchEntry) -> bool) -> usize {
        let mut count = 0;
        for entry in self.inner.store.entries() {
            if filter(&entry) && entry.invalidate() {
                count += 1;
                self.inner.notify(entry.match_id());
            }
        }
        debug!(count, "invalidated matches");
        count
    }

    /// Mark every entry of a route stale.
    pub fn invalidate_route(&self, route_id: &str) -> usize {
        self.invalidate(|entry| entry.route_id() == route_id)
    }

    /// Mark every entry stale.
    pub fn invalidate_all(&self) -> usize {
        self.invalidate(|_| true)
    }

    /// Drop stale entries that nothing references.
    ///
    /// Entries in `retain`, in a chain still being driven, loading, or fresh
    /// are kept. Returns the removed match ids.
    pub fn evict(&self, retain: &HashSet<MatchId>) -> Vec<MatchId> {
        let now = self.inner.clock.now_ms();
        let active: HashSet<MatchId> = self
            .inner
            .active
            .lock()
            .values()
            .flatten()
            .cloned()
            .collect();

        let removed = self.inner.store.retain(|entry| {
            retain.contains(entry.match_id())
                || active.contains(entry.match_id())
                || entry.inspect(|s| s.status == MatchStatus::Loading || s.is_fresh(now))
        });

        if !removed.is_empty() {
            debug!(count = removed.len(), "evicted stale matches");
        }
        removed
    }

    /// Number of chains whose driver has not finished.
    pub fn active_chains(&self) -> usize {
        self.inner.active.lock().len()
    }
}

impl fmt::Debug for LoadScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadScheduler")
            .field("routes", &self.inner.tree.len())
            .field("entries", &self.inner.store.len())
            .field("active_chains", &self.active_chains())
            .finish()
    }
}

impl Inner {
    fn policy(&self, route_id: &str) -> Result<ResolvedPolicy, RouterError> {
        let route = self
            .tree
            .get(route_id)
            .ok_or_else(|| RouterError::UnknownRoute(route_id.to_string()))?;
        Ok(route.cache_policy().resolve(
            self.config.default_max_age,
            self.config.default_preload_max_age,
        ))
    }

    fn notify(&self, match_id: &MatchId) {
        let listener = self.listener.read().clone();
        if let Some(listener) = listener {
            listener(match_id);
        }
    }

    /// Decide, atomically per entry, whether to reuse it, join its
    /// in-flight run, or start a new run.
    fn begin(
        self: &Arc<Self>,
        descriptor: &MatchDescriptor,
        entry: &MatchHandle,
        parent_data: Option<SharedValue>,
        kind: LoadKind,
    ) -> Step {
        let (policy, loader) = match self.policy(&descriptor.route_id) {
            Ok(policy) => {
                let loader = self
                    .tree
                    .get(&descriptor.route_id)
                    .and_then(|route| route.loader().cloned());
                (policy, loader)
            }
            Err(err) => return Step::Ready(Err(Arc::new(anyhow::Error::new(err)))),
        };
        let now = self.clock.now_ms();

        let mut step = Step::Ready(Ok(SharedValue::Null));
        let mut started = false;

        let modified = entry.modify(|state| {
            if state.status == MatchStatus::Loading && !state.invalidated {
                if let Some(promise) = &state.load_promise {
                    step = Step::Wait(promise.clone());
                    return false;
                }
            }
            // Without a loader there is nothing to go stale
            let settled_without_loader = loader.is_none()
                && state.status == MatchStatus::Success
                && !state.invalidated;
            if (settled_without_loader || state.is_fresh(now)) && state.search == descriptor.search {
                step = Step::Ready(Ok(state.loader_data.clone().unwrap_or_default()));
                return false;
            }

            state.generation += 1;
            state.params = descriptor.params.clone();
            state.search = descriptor.search.clone();
            state.is_preload = kind.is_preload();
            state.invalidated = false;
            state.error = None;
            state.updated_at = now;

            match &loader {
                // Routes without a loader succeed immediately with no data
                None => {
                    state.status = MatchStatus::Success;
                    state.loader_data = Some(SharedValue::Null);
                    state.load_promise = None;
                    state.invalid_at = policy.invalid_at(now, kind);
                    step = Step::Ready(Ok(SharedValue::Null));
                }
                Some(loader) => {
                    let ctx = LoaderContext {
                        route_id: descriptor.route_id.clone(),
                        match_id: descriptor.match_id.clone(),
                        params: descriptor.params.clone(),
                        search: descriptor.search.clone(),
                        parent_data,
                        kind,
                        context: self.context.clone(),
                    };
                    let promise = self.load(entry, Arc::clone(loader), ctx, state.generation, policy);
                    state.status = MatchStatus::Loading;
                    state.loader_data = None;
                    state.load_promise = Some(promise.clone());
                    step = Step::Wait(promise);
                    started = true;
                }
            }
            true
        });

        if started {
            trace!(match_id = %descriptor.match_id, kind = %kind, "loader started");
            if let Step::Wait(promise) = &step {
                spawn_promise(promise);
            }
        }
        if modified {
            self.notify(entry.match_id());
        }

        step
    }

    fn load(
        self: &Arc<Self>,
        entry: &MatchHandle,
        loader: Arc<dyn Loader>,
        ctx: LoaderContext,
        generation: u64,
        policy: ResolvedPolicy,
    ) -> LoadPromise {
        let inner = Arc::clone(self);
        let entry = Arc::clone(entry);
        let kind = ctx.kind;
        let span = load_span(entry.match_id().as_str(), entry.route_id(), &kind.to_string());

        let future = async move {
            let result: LoadResult = loader
                .load(ctx)
                .await
                .map(SharedValue::from)
                .map_err(Arc::new);

            let now = inner.clock.now_ms();
            if entry.settle(generation, &result, now, policy.invalid_at(now, kind)) {
                debug!(status = %entry.status(), generation, "load settled");
                inner.notify(entry.match_id());
            } else {
                debug!(generation, "superseded load discarded");
            }
            result
        }
        .instrument(span)
        .boxed();

        LoadPromise::new(future)
    }
}

/// Keep a loader run progressing even if every awaiting chain goes away.
fn spawn_promise(promise: &LoadPromise) {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        let promise = promise.clone();
        handle.spawn(async move {
            let _ = promise.wait().await;
        });
    }
}

async fn drive(
    inner: Arc<Inner>,
    id: u64,
    links: Vec<(MatchDescriptor, MatchHandle)>,
    kind: LoadKind,
) -> ChainOutcome {
    let mut parent_data: Option<SharedValue> = None;
    let mut error = None;

    for (descriptor, entry) in &links {
        let result = match inner.begin(descriptor, entry, parent_data.take(), kind) {
            Step::Ready(result) => result,
            Step::Wait(promise) => promise.wait().await,
        };

        match result {
            Ok(data) => parent_data = Some(data),
            Err(source) => {
                debug!(chain = id, match_id = %descriptor.match_id, "chain stopped at failed loader");
                error = Some(RouterError::Loader {
                    route_id: descriptor.route_id.clone(),
                    match_id: descriptor.match_id.clone(),
                    error: source,
                });
                break;
            }
        }
    }

    inner.active.lock().remove(&id);
    trace!(chain = id, failed = error.is_some(), "chain settled");

    ChainOutcome {
        matches: links.into_iter().map(|(_, entry)| entry).collect(),
        error,
    }
}
