//! Core abstractions for the routing engine.
//!
//! This crate provides the fundamental types and traits:
//! - `RouteTree` / `Route` - Static route definitions and their builder
//! - `Location` - Pathname, parsed search, hash and navigation key
//! - `match_routes` - Resolve a location to a root-to-leaf match chain
//! - `Loader`, `ParamParser`, `SearchValidator` - Application hooks
//! - `SharedValue` - JSON-like data with reference-counted containers
//! - `RouterConfig` - Router-wide defaults
//! - `Clock` - Wall clock used for cache expiry

mod clock;
mod config;
mod error;
mod loader;
mod location;
mod matcher;
mod route;
mod value;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use loader::*;
pub use location::*;
pub use matcher::*;
pub use route::*;
pub use value::*;

// Re-export the cache identity types most callers need alongside routes
pub use router_cache::{CachePolicy, LoadKind, MatchId};
