//! Route definitions and the immutable route tree.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use router_cache::{CachePolicy, WILDCARD_PARAM};

use crate::error::TreeError;
use crate::loader::{Loader, ParamParser, SearchValidator};

/// Id of the root route.
pub const ROOT_ROUTE_ID: &str = "__root__";

/// One component of a route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches the exact text.
    Literal(String),
    /// `$name`: matches one component and binds it.
    Dynamic(String),
    /// `*` or `$`: matches every remaining component.
    Wildcard,
}

impl Segment {
    /// Precedence among siblings; lower wins.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Literal(_) => 0,
            Self::Dynamic(_) => 1,
            Self::Wildcard => 2,
        }
    }

    fn parse(part: &str) -> Result<Self, String> {
        if part.contains(['?', '#']) {
            return Err(format!("'{part}' contains a query or fragment marker"));
        }
        match part {
            "*" | "$" => Ok(Self::Wildcard),
            _ => match part.strip_prefix('$') {
                Some("") => Err("empty param name".to_string()),
                Some(name) => Ok(Self::Dynamic(name.to_string())),
                None => Ok(Self::Literal(part.to_string())),
            },
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => write!(f, "{}", text),
            Self::Dynamic(name) => write!(f, "${}", name),
            Self::Wildcard => write!(f, "{}", WILDCARD_PARAM),
        }
    }
}

/// Shape of a route's path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePath {
    /// The tree root; consumes nothing.
    Root,
    /// Pathless layout; consumes nothing and needs a matching descendant.
    Layout,
    /// `/`: matches only when the path is fully consumed.
    Index,
    /// One or more segments.
    Segments(Vec<Segment>),
}

impl RoutePath {
    /// Parse a path such as `posts/$postId` or `/`.
    pub fn parse(path: &str) -> Result<Self, TreeError> {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            return Ok(Self::Index);
        }

        let mut segments = Vec::with_capacity(parts.len());
        for part in parts {
            let segment = Segment::parse(part).map_err(|reason| TreeError::InvalidPath {
                path: path.to_string(),
                reason,
            })?;
            segments.push(segment);
        }

        let wildcard_at = segments.iter().position(|s| *s == Segment::Wildcard);
        if matches!(wildcard_at, Some(i) if i + 1 != segments.len()) {
            return Err(TreeError::WildcardNotLast(path.to_string()));
        }

        Ok(Self::Segments(segments))
    }

    /// Path text used when building the route id.
    fn id_fragment(&self) -> String {
        match self {
            Self::Root | Self::Layout => String::new(),
            Self::Index => "/".to_string(),
            Self::Segments(segments) => segments
                .iter()
                .map(|s| format!("/{}", s))
                .collect::<String>(),
        }
    }
}

/// Builder for a route and its children.
///
/// ```ignore
/// let tree = RouteTree::build(
///     Route::root().children(vec![
///         Route::new("/").loader(home),
///         Route::new("posts").loader(list_posts).children(vec![
///             Route::new("$postId").parse_params(parse_param("postId", |s| s.parse::<i64>())),
///         ]),
///     ]),
/// )?;
/// ```
pub struct Route {
    path: PathSpec,
    loader: Option<Arc<dyn Loader>>,
    param_parser: Option<Arc<dyn ParamParser>>,
    search_validator: Option<Arc<dyn SearchValidator>>,
    cache: CachePolicy,
    children: Vec<Route>,
}

enum PathSpec {
    Root,
    Layout(String),
    Path(String),
}

impl Route {
    /// Create the root route.
    pub fn root() -> Self {
        Self::with_spec(PathSpec::Root)
    }

    /// Create a route matching `path` below its parent.
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_spec(PathSpec::Path(path.into()))
    }

    /// Create a pathless layout route identified by `id`.
    pub fn layout(id: impl Into<String>) -> Self {
        Self::with_spec(PathSpec::Layout(id.into()))
    }

    fn with_spec(path: PathSpec) -> Self {
        Self {
            path,
            loader: None,
            param_parser: None,
            search_validator: None,
            cache: CachePolicy::default(),
            children: Vec::new(),
        }
    }

    /// Set the loader.
    pub fn loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Set the param parser.
    pub fn parse_params(mut self, parser: impl ParamParser + 'static) -> Self {
        self.param_parser = Some(Arc::new(parser));
        self
    }

    /// Set the search validator.
    pub fn validate_search(mut self, validator: impl SearchValidator + 'static) -> Self {
        self.search_validator = Some(Arc::new(validator));
        self
    }

    /// Set the cache policy.
    pub fn cache(mut self, policy: CachePolicy) -> Self {
        self.cache = policy;
        self
    }

    /// Add a child route.
    pub fn child(mut self, child: Route) -> Self {
        self.children.push(child);
        self
    }

    /// Add several child routes, in declaration order.
    pub fn children(mut self, children: Vec<Route>) -> Self {
        self.children.extend(children);
        self
    }
}

/// A route inside a built tree.
pub struct RouteDefinition {
    id: String,
    path: RoutePath,
    parent: Option<usize>,
    children: Vec<usize>,
    depth: usize,
    loader: Option<Arc<dyn Loader>>,
    param_parser: Option<Arc<dyn ParamParser>>,
    search_validator: Option<Arc<dyn SearchValidator>>,
    cache: CachePolicy,
}

impl RouteDefinition {
    /// Unique id within the tree.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Path shape.
    pub fn path(&self) -> &RoutePath {
        &self.path
    }

    /// Distance from the root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Loader, if any.
    pub fn loader(&self) -> Option<&Arc<dyn Loader>> {
        self.loader.as_ref()
    }

    /// Param parser, if any.
    pub fn param_parser(&self) -> Option<&Arc<dyn ParamParser>> {
        self.param_parser.as_ref()
    }

    /// Search validator, if any.
    pub fn search_validator(&self) -> Option<&Arc<dyn SearchValidator>> {
        self.search_validator.as_ref()
    }

    /// Cache policy.
    pub fn cache_policy(&self) -> &CachePolicy {
        &self.cache
    }

    /// Check if this route is the root.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("depth", &self.depth)
            .field("has_loader", &self.loader.is_some())
            .field("cache", &self.cache)
            .finish()
    }
}

/// Static, immutable tree of route definitions.
///
/// The tree owns every node; nodes refer to each other by index.
#[derive(Debug)]
pub struct RouteTree {
    nodes: Vec<RouteDefinition>,
    by_id: HashMap<String, usize>,
}

impl RouteTree {
    /// Build a tree from a root builder.
    pub fn build(root: Route) -> Result<Self, TreeError> {
        let mut tree = Self {
            nodes: Vec::new(),
            by_id: HashMap::new(),
        };
        tree.insert(root, None)?;
        Ok(tree)
    }

    fn insert(&mut self, route: Route, parent: Option<usize>) -> Result<usize, TreeError> {
        let parent_id = parent.map(|p| self.nodes[p].id.clone());
        let (path, id) = match route.path {
            PathSpec::Root => (RoutePath::Root, ROOT_ROUTE_ID.to_string()),
            PathSpec::Layout(layout_id) => {
                let base = route_id_base(parent_id.as_deref());
                (
                    RoutePath::Layout,
                    format!("{}/{}", base, layout_id.trim_matches('/')),
                )
            }
            PathSpec::Path(path) => {
                let parsed = RoutePath::parse(&path)?;
                let base = route_id_base(parent_id.as_deref());
                let id = format!("{}{}", base, parsed.id_fragment());
                (parsed, id)
            }
        };

        if self.by_id.contains_key(&id) {
            return Err(TreeError::DuplicateRoute(id));
        }

        let index = self.nodes.len();
        let depth = parent.map(|p| self.nodes[p].depth + 1).unwrap_or(0);
        self.nodes.push(RouteDefinition {
            id: id.clone(),
            path,
            parent,
            children: Vec::new(),
            depth,
            loader: route.loader,
            param_parser: route.param_parser,
            search_validator: route.search_validator,
            cache: route.cache,
        });
        self.by_id.insert(id, index);

        for child in route.children {
            let child_index = self.insert(child, Some(index))?;
            self.nodes[index].children.push(child_index);
        }

        Ok(index)
    }

    /// The root route.
    pub fn root(&self) -> &RouteDefinition {
        &self.nodes[0]
    }

    /// Look up a route by id.
    pub fn get(&self, id: &str) -> Option<&RouteDefinition> {
        self.by_id.get(id).map(|&i| &self.nodes[i])
    }

    /// Parent of a route.
    pub fn parent(&self, id: &str) -> Option<&RouteDefinition> {
        self.get(id)
            .and_then(|route| route.parent)
            .map(|p| &self.nodes[p])
    }

    /// Children of a route in declaration order.
    pub fn children(&self, id: &str) -> Vec<&RouteDefinition> {
        self.get(id)
            .map(|route| route.children.iter().map(|&c| &self.nodes[c]).collect())
            .unwrap_or_default()
    }

    /// Check if `child` is a direct child of `parent`.
    pub fn is_child_of(&self, child: &str, parent: &str) -> bool {
        self.parent(child).map(|p| p.id == parent).unwrap_or(false)
    }

    /// Ancestors of a route from the root down to and including it.
    pub fn lineage(&self, id: &str) -> Vec<&RouteDefinition> {
        let mut chain = Vec::new();
        let mut current = self.by_id.get(id).copied();
        while let Some(index) = current {
            chain.push(&self.nodes[index]);
            current = self.nodes[index].parent;
        }
        chain.reverse();
        chain
    }

    /// All routes, depth-first in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &RouteDefinition> {
        self.nodes.iter()
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always has its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub(crate) fn node(&self, index: usize) -> &RouteDefinition {
        &self.nodes[index]
    }

    pub(crate) fn child_indices(&self, index: usize) -> &[usize] {
        &self.nodes[index].children
    }
}

fn route_id_base(parent_id: Option<&str>) -> String {
    match parent_id {
        None | Some(ROOT_ROUTE_ID) => String::new(),
        Some(id) => id.trim_end_matches('/').to_string(),
    }
}
