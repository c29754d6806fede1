//! Dehydrated router state for server rendering.
//!
//! The server emits the committed chain with its loader data; the client
//! seeds its cache from it so the first render needs no loader calls.

use router_core::{MatchDescriptor, MatchId, RawParams, RouterError, SharedValue};
use router_loader::MatchStatus;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::store::RouterSnapshot;

/// Errors raised while encoding or decoding dehydrated state.
#[derive(Error, Debug)]
pub enum DehydrateError {
    /// The payload is not valid JSON for this format.
    #[error("invalid dehydrated state: {0}")]
    Json(#[from] serde_json::Error),

    /// The hydrating navigation failed to match.
    #[error(transparent)]
    Router(#[from] RouterError),
}

/// One serialized match.
///
/// Unknown fields are ignored and a missing `loaderData` means the match
/// was not loaded. A `null` one is data like any other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DehydratedMatch {
    pub match_id: MatchId,
    pub route_id: String,
    #[serde(default)]
    pub params: SharedValue,
    #[serde(default)]
    pub search: SharedValue,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub loader_data: Option<SharedValue>,
}

/// Read a field that is present, even as `null`, as `Some`.
fn present<'de, D>(deserializer: D) -> Result<Option<SharedValue>, D::Error>
where
    D: Deserializer<'de>,
{
    SharedValue::deserialize(deserializer).map(Some)
}

impl DehydratedMatch {
    /// Descriptor used to seed the cache.
    pub fn descriptor(&self) -> MatchDescriptor {
        MatchDescriptor {
            route_id: self.route_id.clone(),
            match_id: self.match_id.clone(),
            raw_params: RawParams::new(),
            params: self.params.clone(),
            search: self.search.clone(),
        }
    }
}

/// Serialized router state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DehydratedRouter {
    /// Href of the committed location.
    #[serde(default)]
    pub location_href: String,
    /// Committed chain, root first.
    #[serde(default)]
    pub matches: Vec<DehydratedMatch>,
}

impl DehydratedRouter {
    /// Capture the committed chain of a snapshot.
    ///
    /// Loader data is only kept for successful matches; errors and in-flight
    /// loads are never serialized.
    pub fn from_snapshot(snapshot: &RouterSnapshot) -> Self {
        Self {
            location_href: snapshot.location.href(),
            matches: snapshot
                .current_matches
                .iter()
                .map(|m| DehydratedMatch {
                    match_id: m.match_id.clone(),
                    route_id: m.route_id.clone(),
                    params: m.params.clone(),
                    search: m.search.clone(),
                    loader_data: match m.status {
                        MatchStatus::Success => m.loader_data.clone(),
                        _ => None,
                    },
                })
                .collect(),
        }
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String, DehydrateError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON.
    pub fn from_json(input: &str) -> Result<Self, DehydrateError> {
        Ok(serde_json::from_str(input)?)
    }
}
