//! Application hooks: loaders, param parsers and search validators.

use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use router_cache::{LoadKind, MatchId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::location::SearchMap;
use crate::value::SharedValue;

/// Raw path params as bound by the matcher.
pub type RawParams = BTreeMap<String, String>;

/// Everything a loader receives.
#[derive(Debug, Clone)]
pub struct LoaderContext {
    /// Route being loaded.
    pub route_id: String,
    /// Match being loaded.
    pub match_id: MatchId,
    /// Typed params accumulated from the root to this route.
    pub params: SharedValue,
    /// Validated search merged from the root to this route.
    pub search: SharedValue,
    /// Loader data of the parent match, once it has succeeded.
    pub parent_data: Option<SharedValue>,
    /// Why this load happens.
    pub kind: LoadKind,
    /// Application context handed to the router at construction.
    pub context: SharedValue,
}

impl LoaderContext {
    /// Get a param by name.
    pub fn param(&self, name: &str) -> Option<&SharedValue> {
        self.params.get(name)
    }

    /// Check if this load is a preload.
    pub fn is_preload(&self) -> bool {
        self.kind.is_preload()
    }
}

/// Asynchronous per-route data loader.
///
/// Errors are opaque application data; they are stored verbatim on the match.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Produce the match's data.
    async fn load(&self, ctx: LoaderContext) -> anyhow::Result<Value>;
}

#[async_trait]
impl<F, Fut> Loader for F
where
    F: Fn(LoaderContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn load(&self, ctx: LoaderContext) -> anyhow::Result<Value> {
        (self)(ctx).await
    }
}

/// Converts raw path params into typed values.
///
/// Receives every raw param bound from the root down to the route; returns
/// the typed values to overlay on the accumulated params.
pub trait ParamParser: Send + Sync {
    /// Parse raw params. The error message is attributed to the route.
    fn parse(&self, raw: &RawParams) -> Result<SearchMap, String>;
}

impl<F> ParamParser for F
where
    F: Fn(&RawParams) -> Result<SearchMap, String> + Send + Sync,
{
    fn parse(&self, raw: &RawParams) -> Result<SearchMap, String> {
        (self)(raw)
    }
}

/// Validates search for a route.
///
/// Receives the parent's validated search (the raw search for the root) and
/// returns fields that overlay it.
pub trait SearchValidator: Send + Sync {
    /// Validate the search. The error message is attributed to the route.
    fn validate(&self, search: &SearchMap) -> Result<SearchMap, String>;
}

impl<F> SearchValidator for F
where
    F: Fn(&SearchMap) -> Result<SearchMap, String> + Send + Sync,
{
    fn validate(&self, search: &SearchMap) -> Result<SearchMap, String> {
        (self)(search)
    }
}

/// Parser for a single param using `FromStr`-like conversion.
///
/// ```ignore
/// Route::new("$postId").parse_params(parse_param("postId", |s| s.parse::<i64>()))
/// ```
pub fn parse_param<T, E, F>(name: &'static str, convert: F) -> impl ParamParser
where
    T: Serialize,
    E: std::fmt::Display,
    F: Fn(&str) -> Result<T, E> + Send + Sync,
{
    move |raw: &RawParams| -> Result<SearchMap, String> {
        let mut out = SearchMap::new();
        if let Some(value) = raw.get(name) {
            let typed = convert(value).map_err(|e| format!("{}: {}", name, e))?;
            let json = serde_json::to_value(typed).map_err(|e| e.to_string())?;
            out.insert(name.to_string(), json);
        }
        Ok(out)
    }
}

/// Validator that deserializes the search into `T` and re-serializes it.
///
/// Unknown fields pass through the parent's search untouched; fields of `T`
/// are overlaid with their typed values.
pub fn typed_search<T>() -> impl SearchValidator
where
    T: DeserializeOwned + Serialize,
{
    |search: &SearchMap| -> Result<SearchMap, String> {
        let typed: T = serde_json::from_value(Value::Object(search.clone())).map_err(|e| e.to_string())?;
        match serde_json::to_value(typed).map_err(|e| e.to_string())? {
            Value::Object(map) => Ok(map),
            other => Err(format!("search must validate to an object, got {}", other)),
        }
    }
}
