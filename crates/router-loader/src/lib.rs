//! Match lifecycle and load orchestration.
//!
//! This crate drives matched routes through their loaders:
//! - `MatchEntry` / `MatchHandle` - One live record per match id
//! - `MatchStore` - The match id keyed cache of entries
//! - `LoadScheduler` - Reconcile chains, coalesce loads, preload, invalidate
//! - `PendingChain` - Handle on a chain being driven to completion

mod chain;
mod scheduler;
mod state;
mod store;

pub use chain::*;
pub use scheduler::*;
pub use state::*;
pub use store::*;
