//! Prelude for convenient imports.
//!
//! ```rust,ignore
//! use turbo_router::prelude::*;
//! ```

pub use crate::{
    parse_param, typed_search, LoaderContext, Location, MatchRouteOptions, MatchStatus,
    MemoryHistory, NavigateOptions, Route, RouteTree, Router, RouterConfig, RouterError,
    RouterSnapshot, SharedValue,
};
