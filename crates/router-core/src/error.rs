//! Error types for routing.

use std::sync::Arc;

use router_cache::MatchId;
use thiserror::Error;

/// Error raised by an application loader.
///
/// Kept exactly as the loader returned it; use `downcast_ref` to recover the
/// application's own error type.
pub type LoaderError = Arc<anyhow::Error>;

/// Errors produced while resolving or loading a navigation.
#[derive(Error, Debug, Clone)]
pub enum RouterError {
    /// No route matches the location.
    #[error("no route matches {pathname:?} (unmatched: {remainder:?})")]
    NotFound { pathname: String, remainder: String },

    /// A route's param parser rejected the raw params.
    #[error("invalid params for route {route_id}: {message}")]
    ParamParse { route_id: String, message: String },

    /// A route's search validator rejected the search.
    #[error("invalid search for route {route_id}: {message}")]
    SearchValidation { route_id: String, message: String },

    /// A loader rejected.
    #[error("loader for {match_id} failed: {error}")]
    Loader {
        route_id: String,
        match_id: MatchId,
        error: LoaderError,
    },

    /// A navigation referenced a route id the tree does not contain.
    #[error("unknown route: {0}")]
    UnknownRoute(String),

    /// A navigation target is missing a path param.
    #[error("route {route_id} requires param {param:?}")]
    MissingParam { route_id: String, param: String },

    /// A cached match id already belongs to another route.
    #[error("match {match_id} belongs to route {existing}, not {route_id}")]
    MatchConflict {
        match_id: MatchId,
        route_id: String,
        existing: String,
    },
}

impl RouterError {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The route the error is attributed to, if any.
    pub fn route_id(&self) -> Option<&str> {
        match self {
            Self::ParamParse { route_id, .. }
            | Self::SearchValidation { route_id, .. }
            | Self::Loader { route_id, .. }
            | Self::MissingParam { route_id, .. }
            | Self::MatchConflict { route_id, .. } => Some(route_id),
            Self::UnknownRoute(route_id) => Some(route_id),
            Self::NotFound { .. } => None,
        }
    }

    /// The loader error, if this is a loader failure.
    pub fn loader_error(&self) -> Option<&LoaderError> {
        match self {
            Self::Loader { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Errors raised while building a route tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Two routes resolved to the same id.
    #[error("duplicate route id: {0}")]
    DuplicateRoute(String),

    /// A wildcard segment was followed by more segments.
    #[error("wildcard must be the last segment in {0:?}")]
    WildcardNotLast(String),

    /// A path segment could not be parsed.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// TOML could not be parsed.
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON could not be parsed.
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
