//! Navigation intents and href building.

use router_core::{
    stringify_search, Location, RawParams, RouteTree, RouterConfig, RouterError, SearchMap,
};
use serde_json::Value;

/// A navigation request.
///
/// `to` is either a concrete path (`/posts/3`) or a route path with params
/// to interpolate (`/posts/$postId`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigateOptions {
    /// Target path or route path.
    pub to: String,
    /// Values for `$param` and `*` segments in `to`.
    pub params: RawParams,
    /// Search for the new location.
    pub search: SearchMap,
    /// Fragment without the leading `#`.
    pub hash: Option<String>,
    /// Replace the current history entry instead of pushing.
    pub replace: bool,
}

impl NavigateOptions {
    /// Navigate to `to`.
    pub fn to(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            ..Default::default()
        }
    }

    /// Set a path param.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Replace the search.
    pub fn with_search(mut self, search: SearchMap) -> Self {
        self.search = search;
        self
    }

    /// Set one search field.
    pub fn with_search_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.search.insert(key.into(), value.into());
        self
    }

    /// Set the hash.
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Replace instead of push.
    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }
}

/// Build the location a navigation intent points at.
///
/// Params are percent-encoded into their segments, then the trailing slash
/// policy and base path are applied.
pub fn build_location(
    tree: &RouteTree,
    config: &RouterConfig,
    opts: &NavigateOptions,
) -> Result<Location, RouterError> {
    let to = if opts.to.starts_with('/') {
        opts.to.clone()
    } else {
        format!("/{}", opts.to)
    };

    let is_pattern = to.split('/').any(|part| part.starts_with('$') || part == "*");
    if is_pattern && tree.get(&to).is_none() {
        return Err(RouterError::UnknownRoute(to));
    }

    let mut parts = Vec::new();
    for part in to.split('/').filter(|p| !p.is_empty()) {
        if part == "*" || part == "$" {
            let rest = opts.params.get("*").ok_or_else(|| RouterError::MissingParam {
                route_id: to.clone(),
                param: "*".to_string(),
            })?;
            parts.extend(
                rest.split('/')
                    .filter(|p| !p.is_empty())
                    .map(|p| urlencoding::encode(p).into_owned()),
            );
        } else if let Some(name) = part.strip_prefix('$') {
            let value = opts.params.get(name).ok_or_else(|| RouterError::MissingParam {
                route_id: to.clone(),
                param: name.to_string(),
            })?;
            parts.push(urlencoding::encode(value).into_owned());
        } else {
            parts.push(part.to_string());
        }
    }

    let mut pathname = format!("/{}", parts.join("/"));
    if to.len() > 1 && to.ends_with('/') {
        pathname.push('/');
    }
    let pathname = config.join_base(&config.trailing_slash.apply(&pathname));

    let mut location = Location::new(pathname).with_search(opts.search.clone());
    if let Some(hash) = &opts.hash {
        location = location.with_hash(hash.clone());
    }
    Ok(location)
}

/// Render the href for a navigation intent.
pub fn build_href(
    tree: &RouteTree,
    config: &RouterConfig,
    opts: &NavigateOptions,
) -> Result<String, RouterError> {
    build_location(tree, config, opts).map(|location| location.href())
}

/// The canonical search string of an intent, for callers building links.
pub fn search_string(opts: &NavigateOptions) -> String {
    stringify_search(&opts.search)
}

#[cfg(test)]
mod tests {
    use super::*;
    use router_core::{Route, TrailingSlash};
    use serde_json::json;

    fn tree() -> RouteTree {
        RouteTree::build(Route::root().children(vec![
            Route::new("posts").children(vec![Route::new("$postId")]),
            Route::new("files/*"),
        ]))
        .unwrap()
    }

    #[test]
    fn test_interpolates_params() {
        let opts = NavigateOptions::to("/posts/$postId")
            .with_param("postId", "a b")
            .with_search_param("tab", "comments")
            .with_hash("top");

        let location = build_location(&tree(), &RouterConfig::default(), &opts).unwrap();

        assert_eq!(location.pathname, "/posts/a%20b");
        assert_eq!(location.href(), "/posts/a%20b?tab=comments#top");
    }

    #[test]
    fn test_missing_param() {
        let err = build_location(
            &tree(),
            &RouterConfig::default(),
            &NavigateOptions::to("/posts/$postId"),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            RouterError::MissingParam { ref param, .. } if param == "postId"
        ));
    }

    #[test]
    fn test_unknown_route_pattern() {
        let err = build_location(
            &tree(),
            &RouterConfig::default(),
            &NavigateOptions::to("/users/$id").with_param("id", "1"),
        )
        .unwrap_err();

        assert!(matches!(err, RouterError::UnknownRoute(ref id) if id == "/users/$id"));
    }

    #[test]
    fn test_wildcard_param_keeps_slashes() {
        let opts = NavigateOptions::to("/files/*").with_param("*", "docs/read me.txt");
        let href = build_href(&tree(), &RouterConfig::default(), &opts).unwrap();

        assert_eq!(href, "/files/docs/read%20me.txt");
    }

    #[test]
    fn test_base_path_and_trailing_slash() {
        let config = RouterConfig::new()
            .with_base_path("/app")
            .with_trailing_slash(TrailingSlash::Always);
        let href = build_href(&tree(), &config, &NavigateOptions::to("posts")).unwrap();

        assert_eq!(href, "/app/posts/");
    }

    #[test]
    fn test_concrete_path_needs_no_route() {
        let opts = NavigateOptions::to("/anything/here").with_search_param("page", json!(2));
        let href = build_href(&tree(), &RouterConfig::default(), &opts).unwrap();

        assert_eq!(href, "/anything/here?page=2");
        assert_eq!(search_string(&opts), "?page=2");
    }
}
