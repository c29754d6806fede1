//! Route-level loader cache policies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Why a match is being loaded.
///
/// Each kind picks a different freshness window from the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadKind {
    /// Loaded for a real navigation.
    Navigation,
    /// Loaded ahead of navigation (hover/focus intent).
    Preload,
    /// Seeded from server-rendered state.
    Hydration,
}

impl LoadKind {
    /// Check if entries of this kind were produced outside a navigation.
    pub fn is_preload(&self) -> bool {
        !matches!(self, Self::Navigation)
    }
}

impl std::fmt::Display for LoadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Navigation => write!(f, "navigation"),
            Self::Preload => write!(f, "preload"),
            Self::Hydration => write!(f, "hydration"),
        }
    }
}

/// Per-route cache policy for loader data.
///
/// Unset fields inherit the router defaults at resolution time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// How long navigation-loaded data stays fresh.
    #[serde(default, with = "crate::duration_ms::option", skip_serializing_if = "Option::is_none")]
    pub max_age: Option<Duration>,
    /// How long preloaded data stays fresh.
    #[serde(default, with = "crate::duration_ms::option", skip_serializing_if = "Option::is_none")]
    pub preload_max_age: Option<Duration>,
}

impl CachePolicy {
    /// Create a policy that inherits every router default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the navigation freshness window.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Set the preload freshness window.
    pub fn with_preload_max_age(mut self, max_age: Duration) -> Self {
        self.preload_max_age = Some(max_age);
        self
    }

    /// Apply router defaults to unset fields.
    pub fn resolve(&self, default_max_age: Duration, default_preload_max_age: Duration) -> ResolvedPolicy {
        ResolvedPolicy {
            max_age: self.max_age.unwrap_or(default_max_age),
            preload_max_age: self.preload_max_age.unwrap_or(default_preload_max_age),
        }
    }
}

/// A cache policy with all windows known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPolicy {
    /// Navigation freshness window.
    pub max_age: Duration,
    /// Preload freshness window.
    pub preload_max_age: Duration,
}

impl ResolvedPolicy {
    /// Freshness window for a load of the given kind.
    pub fn ttl(&self, kind: LoadKind) -> Duration {
        match kind {
            LoadKind::Navigation => self.max_age,
            LoadKind::Preload => self.preload_max_age,
            LoadKind::Hydration => self.max_age.max(self.preload_max_age),
        }
    }

    /// Timestamp (ms) after which data loaded at `now_ms` is stale.
    pub fn invalid_at(&self, now_ms: u64, kind: LoadKind) -> u64 {
        now_ms.saturating_add(self.ttl(kind).as_millis() as u64)
    }
}

/// Check whether data with the given expiry is still fresh at `now_ms`.
pub fn is_fresh(invalid_at: u64, now_ms: u64) -> bool {
    now_ms < invalid_at
}
