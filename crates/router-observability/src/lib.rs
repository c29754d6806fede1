//! Observability for the routing engine.
//!
//! This crate provides:
//! - `init_logging` / `LogConfig` - Global `tracing` subscriber setup
//! - `navigation_span` / `load_span` - Spans wrapping navigations and loads

mod logging;
mod span;

pub use logging::*;
pub use span::*;
