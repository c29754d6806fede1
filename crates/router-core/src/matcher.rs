//! Resolve a pathname against the route tree.
//!
//! Matching walks the tree depth-first. Siblings are tried by precedence:
//! literal segments before dynamic ones, dynamic before wildcards, ties in
//! declaration order. A sibling only wins if its whole subtree can consume
//! the rest of the path; otherwise the walk backtracks to the next sibling.

use std::cmp::Ordering;

use router_cache::{MatchId, WILDCARD_PARAM};
use serde_json::Value;
use tracing::trace;

use crate::error::RouterError;
use crate::loader::RawParams;
use crate::location::SearchMap;
use crate::route::{RoutePath, RouteTree, Segment};
use crate::value::SharedValue;

/// A route resolved against a location, before any loading happens.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchDescriptor {
    /// Matched route.
    pub route_id: String,
    /// Cache key for this match.
    pub match_id: MatchId,
    /// Raw params bound from the root down to this route.
    pub raw_params: RawParams,
    /// Typed params accumulated from the root down to this route.
    pub params: SharedValue,
    /// Validated search merged from the root down to this route.
    pub search: SharedValue,
}

/// Options for [`match_routes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Compare literal segments case-sensitively.
    pub case_sensitive: bool,
}

/// Options for [`match_path`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchPathOptions {
    /// Compare literal segments case-sensitively.
    pub case_sensitive: bool,
    /// Allow the pathname to continue past the pattern.
    pub fuzzy: bool,
}

/// Resolve a pathname and search into a root-to-leaf chain of matches.
///
/// Params are run through each route's parser and search through each
/// route's validator, root first. Any failure aborts the whole match.
pub fn match_routes(
    tree: &RouteTree,
    pathname: &str,
    search: &SearchMap,
    opts: MatchOptions,
) -> Result<Vec<MatchDescriptor>, RouterError> {
    let components = path_components(pathname);
    let mut walk = Walk {
        tree,
        components: &components,
        case_sensitive: opts.case_sensitive,
        deepest: 0,
    };

    let Some(mut chain) = walk.descend(0, 0, &RawParams::new()) else {
        let remainder = components[walk.deepest.min(components.len())..].join("/");
        trace!(pathname, remainder = %remainder, "no route matched");
        return Err(RouterError::NotFound {
            pathname: pathname.to_string(),
            remainder,
        });
    };
    chain.push((0, RawParams::new()));
    chain.reverse();

    let mut typed = SearchMap::new();
    let mut merged = search.clone();
    let mut descriptors = Vec::with_capacity(chain.len());

    for (index, raw) in chain {
        let route = tree.node(index);

        for (name, value) in &raw {
            typed
                .entry(name.clone())
                .or_insert_with(|| Value::String(value.clone()));
        }
        if let Some(parser) = route.param_parser() {
            let parsed = parser.parse(&raw).map_err(|message| RouterError::ParamParse {
                route_id: route.id().to_string(),
                message,
            })?;
            typed.extend(parsed);
        }

        if let Some(validator) = route.search_validator() {
            let validated =
                validator
                    .validate(&merged)
                    .map_err(|message| RouterError::SearchValidation {
                        route_id: route.id().to_string(),
                        message,
                    })?;
            merged.extend(validated);
        }

        descriptors.push(MatchDescriptor {
            route_id: route.id().to_string(),
            match_id: MatchId::derive(route.id(), &raw),
            params: SharedValue::from(typed.clone()),
            search: SharedValue::from(merged.clone()),
            raw_params: raw,
        });
    }

    Ok(descriptors)
}

/// Test a single path pattern such as `/posts/$postId` against a pathname.
///
/// Returns the bound raw params on success.
pub fn match_path(pattern: &str, pathname: &str, opts: MatchPathOptions) -> Option<RawParams> {
    let components = path_components(pathname);
    let mut params = RawParams::new();

    let consumed = match RoutePath::parse(pattern).ok()? {
        RoutePath::Segments(segments) => consume_segments(
            &segments,
            &components,
            0,
            opts.case_sensitive,
            &mut params,
        )?,
        _ => 0,
    };

    (opts.fuzzy || consumed == components.len()).then_some(params)
}

/// Split a pathname into percent-decoded, non-empty components.
pub fn path_components(pathname: &str) -> Vec<String> {
    pathname
        .split('/')
        .filter(|part| !part.is_empty())
        .map(|part| {
            urlencoding::decode(part)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| part.to_string())
        })
        .collect()
}

struct Walk<'a> {
    tree: &'a RouteTree,
    components: &'a [String],
    case_sensitive: bool,
    deepest: usize,
}

impl Walk<'_> {
    /// Find a chain below `index` consuming `components[pos..]`.
    ///
    /// Returns the chain leaf first, excluding `index` itself.
    fn descend(
        &mut self,
        index: usize,
        pos: usize,
        params: &RawParams,
    ) -> Option<Vec<(usize, RawParams)>> {
        for child in self.ordered_children(index) {
            let mut bound = params.clone();
            let Some(next) = self.consume(child, pos, &mut bound) else {
                continue;
            };
            self.deepest = self.deepest.max(next);

            if let Some(mut rest) = self.descend(child, next, &bound) {
                rest.push((child, bound));
                return Some(rest);
            }
        }

        // Root and layouts consume nothing, so they need a matching descendant
        let terminal = !matches!(
            self.tree.node(index).path(),
            RoutePath::Root | RoutePath::Layout
        ) && pos == self.components.len();

        terminal.then(Vec::new)
    }

    fn consume(&self, index: usize, pos: usize, params: &mut RawParams) -> Option<usize> {
        match self.tree.node(index).path() {
            RoutePath::Root | RoutePath::Layout => Some(pos),
            RoutePath::Index => (pos == self.components.len()).then_some(pos),
            RoutePath::Segments(segments) => consume_segments(
                segments,
                self.components,
                pos,
                self.case_sensitive,
                params,
            ),
        }
    }

    fn ordered_children(&self, index: usize) -> Vec<usize> {
        let mut children = self.tree.child_indices(index).to_vec();
        // Stable sort keeps declaration order among equal precedence
        children.sort_by(|a, b| compare_precedence(&self.precedence(*a), &self.precedence(*b)));
        children
    }

    fn precedence(&self, index: usize) -> Vec<u8> {
        match self.tree.node(index).path() {
            RoutePath::Root | RoutePath::Index => vec![0],
            RoutePath::Segments(segments) => segments.iter().map(Segment::rank).collect(),
            RoutePath::Layout => self
                .tree
                .child_indices(index)
                .iter()
                .map(|&child| self.precedence(child))
                .min_by(|a, b| compare_precedence(a, b))
                .unwrap_or_else(|| vec![u8::MAX]),
        }
    }
}

/// Order two precedence keys; the more specific one sorts first.
fn compare_precedence(a: &[u8], b: &[u8]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        if x != y {
            return x.cmp(y);
        }
    }
    // Equal prefix: the longer (more specific) pattern first
    b.len().cmp(&a.len())
}

fn consume_segments(
    segments: &[Segment],
    components: &[String],
    mut pos: usize,
    case_sensitive: bool,
    params: &mut RawParams,
) -> Option<usize> {
    for segment in segments {
        match segment {
            Segment::Literal(text) => {
                let component = components.get(pos)?;
                if !literal_eq(text, component, case_sensitive) {
                    return None;
                }
                pos += 1;
            }
            Segment::Dynamic(name) => {
                let component = components.get(pos)?;
                params.insert(name.clone(), component.clone());
                pos += 1;
            }
            Segment::Wildcard => {
                // Binds whatever is left, possibly nothing
                let rest = components.get(pos..).unwrap_or_default();
                params.insert(WILDCARD_PARAM.to_string(), rest.join("/"));
                pos = components.len();
            }
        }
    }
    Some(pos)
}

fn literal_eq(pattern: &str, component: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        pattern == component
    } else {
        pattern.to_lowercase() == component.to_lowercase()
    }
}
