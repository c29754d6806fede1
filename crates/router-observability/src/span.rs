//! Spans for navigations and loader runs.

use tracing::Span;

/// Span covering one navigation, from matching to commit.
pub fn navigation_span(seq: u64, pathname: &str) -> Span {
    tracing::info_span!("navigation", seq, pathname)
}

/// Span covering one preload request.
pub fn preload_span(pathname: &str) -> Span {
    tracing::debug_span!("preload", pathname)
}

/// Span covering a single loader invocation.
pub fn load_span(match_id: &str, route_id: &str, kind: &str) -> Span {
    tracing::debug_span!("load", match_id, route_id, kind)
}
