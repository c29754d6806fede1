//! Handles on chains being driven to completion.

use std::fmt;

use futures::future::{BoxFuture, FutureExt, Shared};
use router_core::{LoadKind, RouterError};

use crate::state::{MatchHandle, MatchStatus};

/// Outcome of driving a chain.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    /// Entries of the chain, root first.
    pub matches: Vec<MatchHandle>,
    /// First loader failure; its descendants were never started.
    pub error: Option<RouterError>,
}

impl ChainOutcome {
    /// Check if every match in the chain loaded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// A reconciled chain whose loaders run in parent-to-child order.
///
/// The chain is driven on the current tokio runtime when one exists;
/// otherwise awaiting [`PendingChain::settled`] drives it.
#[derive(Clone)]
pub struct PendingChain {
    id: u64,
    kind: LoadKind,
    matches: Vec<MatchHandle>,
    done: Shared<BoxFuture<'static, ChainOutcome>>,
}

impl PendingChain {
    pub(crate) fn new(
        id: u64,
        kind: LoadKind,
        matches: Vec<MatchHandle>,
        done: BoxFuture<'static, ChainOutcome>,
    ) -> Self {
        Self {
            id,
            kind,
            matches,
            done: done.shared(),
        }
    }

    /// Chain id, unique per scheduler.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Why the chain is loading.
    pub fn kind(&self) -> LoadKind {
        self.kind
    }

    /// Entries of the chain, root first.
    pub fn matches(&self) -> &[MatchHandle] {
        &self.matches
    }

    /// The leaf entry.
    pub fn leaf(&self) -> Option<&MatchHandle> {
        self.matches.last()
    }

    /// Check if the driver has finished.
    pub fn is_settled(&self) -> bool {
        self.done.peek().is_some()
    }

    /// Check if any entry is still loading.
    pub fn is_loading(&self) -> bool {
        self.matches
            .iter()
            .any(|entry| entry.status() == MatchStatus::Loading)
    }

    /// Wait for the chain to settle.
    pub async fn settled(&self) -> ChainOutcome {
        self.done.clone().await
    }

    /// Spawn the driver on the current runtime, if there is one.
    pub(crate) fn spawn_driver(&self) -> bool {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let done = self.done.clone();
                handle.spawn(async move {
                    done.await;
                });
                true
            }
            Err(_) => false,
        }
    }
}

impl fmt::Debug for PendingChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingChain")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("matches", &self.matches)
            .field("settled", &self.is_settled())
            .finish()
    }
}
