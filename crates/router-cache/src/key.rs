//! Match identity.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Param name a wildcard segment binds the remaining path under.
pub const WILDCARD_PARAM: &str = "*";

/// Cache key for a route match.
///
/// The route id followed by the raw values of the params it binds, so two
/// navigations with identical params share an entry and two routes never
/// do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    /// Create a match id from an already-derived string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the match id for a route id and its raw params.
    ///
    /// Static route ids are their own match id. Dynamic ones get a query
    /// of `name=value` pairs in name order, with values percent-encoded, so
    /// `/$section` with `section=posts` can not collide with `/posts`.
    pub fn derive(route_id: &str, raw_params: &BTreeMap<String, String>) -> Self {
        let bound: Vec<String> = route_id
            .split('/')
            .filter_map(|part| match part {
                "*" | "$" => Some(WILDCARD_PARAM),
                _ => part.strip_prefix('$'),
            })
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .map(|name| {
                let value = raw_params.get(name).map(String::as_str).unwrap_or_default();
                format!("{name}={}", urlencoding::encode(value))
            })
            .collect();

        if bound.is_empty() {
            Self(route_id.to_string())
        } else {
            Self(format!("{route_id}?{}", bound.join("&")))
        }
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MatchId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
