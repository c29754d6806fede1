//! Cache policies and match identity for the route loading engine.
//!
//! This crate provides:
//! - `CachePolicy` - Per-route loader data freshness
//! - `ResolvedPolicy` - A policy with router defaults applied
//! - `LoadKind` - Why a match is being loaded (navigation, preload, hydration)
//! - `MatchId` - Deterministic cache key from route id + path params
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use router_cache::{CachePolicy, LoadKind, MatchId};
//!
//! let policy = CachePolicy::new()
//!     .with_max_age(Duration::from_secs(30))
//!     .with_preload_max_age(Duration::from_secs(5));
//!
//! let resolved = policy.resolve(Duration::ZERO, Duration::from_secs(2));
//! let invalid_at = resolved.invalid_at(now_ms, LoadKind::Preload);
//!
//! let id = MatchId::derive("/posts/$postId", &params);
//! assert_eq!(id.as_str(), "/posts/$postId?postId=42");
//! ```

mod key;
mod policy;

pub mod duration_ms;

pub use key::*;
pub use policy::*;
