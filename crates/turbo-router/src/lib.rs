//! Client-side routing with cached route loaders.
//!
//! This crate is the public face of the routing engine:
//!
//! ```text
//! Location ──► match_routes ──► LoadScheduler ──► RouterStore ──► subscribers
//!                  │                 │
//!              RouteTree        match cache (MatchId -> MatchEntry)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use turbo_router::prelude::*;
//!
//! let tree = RouteTree::build(Route::root().children(vec![
//!     Route::new("posts").children(vec![
//!         Route::new("$postId")
//!             .parse_params(parse_param("postId", |s| s.parse::<i64>()))
//!             .loader(|ctx: LoaderContext| async move {
//!                 Ok(json!({ "id": ctx.param("postId").and_then(|v| v.as_i64()) }))
//!             }),
//!     ]),
//! ]))?;
//!
//! let router = Router::builder(tree)
//!     .with_history(MemoryHistory::new("/posts/3"))
//!     .build();
//! router.load().await?;
//! let html_state = router.dehydrate_json()?;
//! ```

mod dehydrate;
mod history;
mod navigate;
pub mod prelude;
mod router;
mod share;
mod store;

pub use dehydrate::*;
pub use history::*;
pub use navigate::*;
pub use router::*;
pub use share::*;
pub use store::*;

pub use router_core::{
    match_path, match_routes, parse_param, parse_search, stringify_search, typed_search,
    CachePolicy, Clock, LoadKind, Loader, LoaderContext, LoaderError, Location, LocationKey,
    ManualClock, MatchDescriptor, MatchId, MatchOptions, MatchPathOptions, ParamParser, RawParams,
    Route, RouteDefinition, RoutePath, RouteTree, RouterConfig, RouterError, SearchMap,
    SearchValidator, Segment, SharedValue, SystemClock, TrailingSlash, TreeError,
};
pub use router_loader::{
    ChainOutcome, LoadScheduler, MatchEntry, MatchHandle, MatchState, MatchStatus, PendingChain,
};
pub use router_observability::{init_logging, LogConfig, LogFormat, LoggingError};
