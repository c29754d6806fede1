//! The router: ties matching, loading and the snapshot store together.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use router_core::{
    match_path, match_routes, Clock, LoadKind, Location, LocationKey, MatchDescriptor, MatchId,
    MatchOptions, MatchPathOptions, RawParams, RouteTree, RouterConfig, RouterError, SharedValue,
    SystemClock,
};
use router_loader::{LoadScheduler, MatchHandle, PendingChain};
use router_observability::{navigation_span, preload_span};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn, Instrument};

use crate::dehydrate::{DehydrateError, DehydratedRouter};
use crate::history::{History, MemoryHistory};
use crate::navigate::{self, NavigateOptions};
use crate::store::{MatchSnapshot, RouterSnapshot, RouterStore};

/// Result of a navigation that matched.
#[derive(Debug, Clone)]
pub struct NavigationOutcome {
    /// Navigation sequence number.
    pub seq: u64,
    /// Whether the chain became the current chain. False when a later
    /// navigation started before this one settled.
    pub committed: bool,
    /// The chain, root first.
    pub matches: Vec<MatchHandle>,
    /// First loader failure in the chain.
    pub error: Option<RouterError>,
}

impl NavigationOutcome {
    /// Check if the chain committed and every match loaded.
    pub fn is_success(&self) -> bool {
        self.committed && self.error.is_none()
    }

    /// The deepest match.
    pub fn leaf(&self) -> Option<&MatchHandle> {
        self.matches.last()
    }
}

/// Options for [`Router::match_route`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchRouteOptions {
    /// Test the pending location instead of the committed one.
    pub pending: bool,
    /// Allow the location to continue past the pattern.
    pub fuzzy: bool,
    /// Override the router's case sensitivity.
    pub case_sensitive: Option<bool>,
}

/// Builder for [`Router`].
pub struct RouterBuilder {
    tree: RouteTree,
    config: RouterConfig,
    clock: Arc<dyn Clock>,
    context: SharedValue,
    history: Box<dyn History>,
}

impl RouterBuilder {
    /// Set the configuration.
    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the clock used for cache expiry.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Set the context handed to every loader.
    pub fn with_context(mut self, context: impl Into<SharedValue>) -> Self {
        self.context = context.into();
        self
    }

    /// Set the history collaborator.
    pub fn with_history(mut self, history: impl History + 'static) -> Self {
        self.history = Box::new(history);
        self
    }

    /// Build the router. Nothing is matched or loaded until the first
    /// navigation.
    pub fn build(self) -> Router {
        let location = self.history.location();
        let scheduler = LoadScheduler::new(
            Arc::new(self.tree),
            self.config,
            self.clock,
            self.context,
        );

        let inner = Arc::new(RouterInner {
            scheduler,
            store: RouterStore::new(RouterSnapshot::initial(location.clone())),
            history: Mutex::new(self.history),
            nav: Mutex::new(NavState {
                location,
                current: Vec::new(),
                pending: None,
                error: None,
            }),
            seq: AtomicU64::new(0),
        });

        let weak: Weak<RouterInner> = Arc::downgrade(&inner);
        inner.scheduler.set_listener(Arc::new(move |_match_id: &MatchId| {
            if let Some(inner) = weak.upgrade() {
                inner.refresh();
            }
        }));

        Router { inner }
    }
}

/// Client-side router.
///
/// Cloning is cheap; clones drive the same cache and store.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    scheduler: LoadScheduler,
    store: RouterStore,
    history: Mutex<Box<dyn History>>,
    nav: Mutex<NavState>,
    seq: AtomicU64,
}

struct NavState {
    location: Location,
    current: Vec<MatchHandle>,
    pending: Option<PendingNavigation>,
    error: Option<RouterError>,
}

struct PendingNavigation {
    seq: u64,
    location: Location,
    chain: PendingChain,
}

/// Settles a navigation whose caller stopped waiting for it.
///
/// With a runtime the chain is committed once it settles, as if the caller
/// were still awaiting; without one the pending navigation is abandoned.
struct NavigationGuard {
    inner: Arc<RouterInner>,
    seq: u64,
    armed: Option<(Location, PendingChain)>,
}

impl NavigationGuard {
    fn new(inner: &Arc<RouterInner>, seq: u64, location: &Location, chain: &PendingChain) -> Self {
        Self {
            inner: Arc::clone(inner),
            seq,
            armed: Some((location.clone(), chain.clone())),
        }
    }

    fn disarm(mut self) {
        self.armed = None;
    }
}

impl Drop for NavigationGuard {
    fn drop(&mut self) {
        let Some((location, chain)) = self.armed.take() else {
            return;
        };
        let inner = Arc::clone(&self.inner);
        let seq = self.seq;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(seq, "navigation dropped, committing in background");
                handle.spawn(async move {
                    let outcome = chain.settled().await;
                    if inner.commit(seq, location, &outcome.matches) {
                        info!(seq, "dropped navigation committed");
                    }
                });
            }
            Err(_) => {
                debug!(seq, "navigation dropped without a runtime, abandoning");
                inner.abandon(seq);
            }
        }
    }
}

impl Router {
    /// Start building a router for a route tree.
    pub fn builder(tree: RouteTree) -> RouterBuilder {
        RouterBuilder {
            tree,
            config: RouterConfig::default(),
            clock: Arc::new(SystemClock),
            context: SharedValue::Null,
            history: Box::new(MemoryHistory::default()),
        }
    }

    /// Create a router with default configuration.
    pub fn new(tree: RouteTree) -> Self {
        Self::builder(tree).build()
    }

    /// The route tree.
    pub fn tree(&self) -> &Arc<RouteTree> {
        self.inner.scheduler.tree()
    }

    /// The configuration.
    pub fn config(&self) -> &RouterConfig {
        self.inner.scheduler.config()
    }

    /// The load scheduler owning the match cache.
    pub fn scheduler(&self) -> &LoadScheduler {
        &self.inner.scheduler
    }

    /// The committed location.
    pub fn location(&self) -> Location {
        self.inner.nav.lock().location.clone()
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> Arc<RouterSnapshot> {
        self.inner.store.snapshot()
    }

    /// Watch for new snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Arc<RouterSnapshot>> {
        self.inner.store.subscribe()
    }

    /// Navigate to a location.
    ///
    /// Matcher failures abort the navigation before any loader runs and are
    /// returned as errors; the committed chain becomes empty. Loader failures
    /// are reported on the outcome. Only the most recently started
    /// navigation commits.
    pub async fn navigate(&self, location: Location) -> Result<NavigationOutcome, RouterError> {
        let inner = &self.inner;
        let seq = inner.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let span = navigation_span(seq, &location.pathname);

        async move {
            let descriptors = match inner.resolve(&location) {
                Ok(descriptors) => descriptors,
                Err(err) => {
                    warn!(error = %err, "navigation did not match");
                    inner.fail(seq, location, err.clone());
                    return Err(err);
                }
            };

            inner.evict(&descriptors);
            let chain = inner
                .scheduler
                .reconcile(&descriptors, LoadKind::Navigation)?;
            inner.begin(seq, &location, &chain);

            let guard = NavigationGuard::new(inner, seq, &location, &chain);
            let outcome = chain.settled().await;
            guard.disarm();
            let committed = inner.commit(seq, location, &outcome.matches);
            if committed {
                info!(
                    matches = outcome.matches.len(),
                    failed = outcome.error.is_some(),
                    "navigation committed"
                );
            } else {
                debug!("navigation superseded");
            }

            Ok(NavigationOutcome {
                seq,
                committed,
                matches: outcome.matches,
                error: outcome.error,
            })
        }
        .instrument(span)
        .await
    }

    /// Build a location from an intent, record it in history and navigate.
    pub async fn navigate_to(
        &self,
        opts: NavigateOptions,
    ) -> Result<NavigationOutcome, RouterError> {
        let location = self.build_location(&opts)?;
        {
            let mut history = self.inner.history.lock();
            if opts.replace {
                history.replace(location.clone());
            } else {
                history.push(location.clone());
            }
        }
        self.navigate(location).await
    }

    /// Navigate to the history's current location.
    pub async fn load(&self) -> Result<NavigationOutcome, RouterError> {
        let location = self.inner.history.lock().location();
        self.navigate(location).await
    }

    /// Step back in history and navigate. Returns `None` at the first entry.
    pub async fn back(&self) -> Result<Option<NavigationOutcome>, RouterError> {
        let location = match self.inner.history.lock().back() {
            Ok(location) => location,
            Err(err) => {
                trace!(error = %err, "history back ignored");
                return Ok(None);
            }
        };
        self.navigate(location).await.map(Some)
    }

    /// Step forward in history and navigate. Returns `None` at the last entry.
    pub async fn forward(&self) -> Result<Option<NavigationOutcome>, RouterError> {
        let location = match self.inner.history.lock().forward() {
            Ok(location) => location,
            Err(err) => {
                trace!(error = %err, "history forward ignored");
                return Ok(None);
            }
        };
        self.navigate(location).await.map(Some)
    }

    /// Load the chain for an intent into the cache without navigating.
    pub fn preload(&self, opts: &NavigateOptions) -> Result<PendingChain, RouterError> {
        let location = self.build_location(opts)?;
        let span = preload_span(&location.pathname);
        let _enter = span.enter();

        let descriptors = self.inner.resolve(&location)?;
        self.inner.scheduler.preload(&descriptors)
    }

    /// Build the location an intent points at.
    pub fn build_location(&self, opts: &NavigateOptions) -> Result<Location, RouterError> {
        navigate::build_location(self.tree(), self.config(), opts)
    }

    /// Build the href an intent points at.
    pub fn build_href(&self, opts: &NavigateOptions) -> Result<String, RouterError> {
        navigate::build_href(self.tree(), self.config(), opts)
    }

    /// Mark every cached match of a route stale.
    pub fn invalidate_route(&self, route_id: &str) -> usize {
        self.inner.scheduler.invalidate_route(route_id)
    }

    /// Mark every cached match stale.
    pub fn invalidate_all(&self) -> usize {
        self.inner.scheduler.invalidate_all()
    }

    /// Invalidate the committed chain and navigate to the same location
    /// again.
    pub async fn reload(&self) -> Result<NavigationOutcome, RouterError> {
        let (mut location, ids) = {
            let nav = self.inner.nav.lock();
            let ids: HashSet<MatchId> = nav
                .current
                .iter()
                .map(|entry| entry.match_id().clone())
                .collect();
            (nav.location.clone(), ids)
        };

        self.inner
            .scheduler
            .invalidate(|entry| ids.contains(entry.match_id()));
        location.key = LocationKey::generate();
        self.navigate(location).await
    }

    /// Test a route pattern against the committed (or pending) location.
    ///
    /// Returns the bound params on a match.
    pub fn match_route(&self, to: &str, opts: MatchRouteOptions) -> Option<RawParams> {
        let pathname = {
            let nav = self.inner.nav.lock();
            if opts.pending {
                nav.pending.as_ref()?.location.pathname.clone()
            } else {
                nav.location.pathname.clone()
            }
        };
        let config = self.config();
        let pathname = config.strip_base(&pathname)?;

        match_path(
            to,
            pathname,
            MatchPathOptions {
                case_sensitive: opts.case_sensitive.unwrap_or(config.case_sensitive),
                fuzzy: opts.fuzzy,
            },
        )
    }

    /// Snapshot of the committed match for a route.
    pub fn get_match(&self, route_id: &str) -> Option<Arc<MatchSnapshot>> {
        self.snapshot().find(route_id).cloned()
    }

    /// Live entry of the committed match for a route.
    pub fn match_handle(&self, route_id: &str) -> Option<MatchHandle> {
        self.inner
            .nav
            .lock()
            .current
            .iter()
            .find(|entry| entry.route_id() == route_id)
            .cloned()
    }

    /// A cached entry, committed or not.
    pub fn cached(&self, match_id: &MatchId) -> Option<MatchHandle> {
        self.inner.scheduler.get(match_id)
    }

    /// Serialize the committed chain.
    pub fn dehydrate(&self) -> DehydratedRouter {
        DehydratedRouter::from_snapshot(&self.snapshot())
    }

    /// Serialize the committed chain as JSON.
    pub fn dehydrate_json(&self) -> Result<String, DehydrateError> {
        self.dehydrate().to_json()
    }

    /// Seed the cache from dehydrated state, then load the history's
    /// location.
    ///
    /// Seeded matches are cache hits; anything that does not line up with
    /// the client location loads normally.
    pub async fn hydrate(&self, state: &DehydratedRouter) -> Result<NavigationOutcome, RouterError> {
        let mut seeded = 0;
        for dehydrated in &state.matches {
            let Some(data) = dehydrated.loader_data.clone() else {
                continue;
            };
            match self.inner.scheduler.seed(&dehydrated.descriptor(), data) {
                Ok(_) => seeded += 1,
                Err(err) => warn!(
                    match_id = %dehydrated.match_id,
                    error = %err,
                    "skipping dehydrated match"
                ),
            }
        }
        debug!(seeded, href = %state.location_href, "hydrated match cache");

        self.load().await
    }

    /// Seed the cache from dehydrated JSON, then load the history's location.
    pub async fn hydrate_json(&self, input: &str) -> Result<NavigationOutcome, DehydrateError> {
        let state = DehydratedRouter::from_json(input)?;
        Ok(self.hydrate(&state).await?)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("scheduler", &self.inner.scheduler)
            .field("version", &self.inner.store.snapshot().version)
            .finish()
    }
}

impl RouterInner {
    fn is_latest(&self, seq: u64) -> bool {
        self.seq.load(Ordering::SeqCst) == seq
    }

    fn resolve(&self, location: &Location) -> Result<Vec<MatchDescriptor>, RouterError> {
        let config = self.scheduler.config();
        let pathname = config
            .strip_base(&location.pathname)
            .ok_or_else(|| RouterError::NotFound {
                pathname: location.pathname.clone(),
                remainder: location.pathname.clone(),
            })?;

        match_routes(
            self.scheduler.tree(),
            pathname,
            &location.search,
            MatchOptions {
                case_sensitive: config.case_sensitive,
            },
        )
    }

    /// Drop stale entries not referenced by the committed, pending or new
    /// chain.
    fn evict(&self, descriptors: &[MatchDescriptor]) {
        let mut retain: HashSet<MatchId> = descriptors.iter().map(|d| d.match_id.clone()).collect();
        {
            let nav = self.nav.lock();
            retain.extend(nav.current.iter().map(|entry| entry.match_id().clone()));
            if let Some(pending) = &nav.pending {
                retain.extend(
                    pending
                        .chain
                        .matches()
                        .iter()
                        .map(|entry| entry.match_id().clone()),
                );
            }
        }
        self.scheduler.evict(&retain);
    }

    fn begin(&self, seq: u64, location: &Location, chain: &PendingChain) {
        {
            let mut nav = self.nav.lock();
            if !self.is_latest(seq) {
                return;
            }
            nav.pending = Some(PendingNavigation {
                seq,
                location: location.clone(),
                chain: chain.clone(),
            });
        }
        self.refresh();
    }

    fn commit(&self, seq: u64, location: Location, matches: &[MatchHandle]) -> bool {
        {
            let mut nav = self.nav.lock();
            if !self.is_latest(seq) {
                return false;
            }
            nav.location = location;
            nav.current = matches.to_vec();
            if nav.pending.as_ref().is_some_and(|p| p.seq == seq) {
                nav.pending = None;
            }
            nav.error = None;
        }
        self.refresh();
        true
    }

    /// Forget the pending navigation `seq`; the committed chain stays.
    fn abandon(&self, seq: u64) {
        {
            let mut nav = self.nav.lock();
            if !nav.pending.as_ref().is_some_and(|p| p.seq == seq) {
                return;
            }
            nav.pending = None;
        }
        self.refresh();
    }

    fn fail(&self, seq: u64, location: Location, error: RouterError) {
        {
            let mut nav = self.nav.lock();
            if !self.is_latest(seq) {
                return;
            }
            nav.location = location;
            nav.current.clear();
            nav.pending = None;
            nav.error = Some(error);
        }
        self.refresh();
    }

    /// Capture the live state and publish it if anything changed.
    fn refresh(&self) {
        let nav = self.nav.lock();
        let pending = nav.pending.as_ref();
        let snapshot = RouterSnapshot::capture(
            &nav.location,
            pending.map(|p| &p.location),
            &nav.current,
            pending.map(|p| p.chain.matches()).unwrap_or(&[]),
            nav.error.clone(),
        );

        if self.store.publish(snapshot) {
            trace!(version = self.store.snapshot().version, "snapshot published");
        }
    }
}
