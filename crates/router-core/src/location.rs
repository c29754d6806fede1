//! Locations and the search-string codec.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parsed query mapping. Keys are unique; the last occurrence wins.
pub type SearchMap = Map<String, Value>;

/// Key distinguishing otherwise identical locations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationKey(pub String);

impl LocationKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self(format!("{:012x}", rand::random::<u64>() & 0xffff_ffff_ffff))
    }
}

impl std::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A location supplied by the history collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Slash-delimited path, always starting with `/`.
    pub pathname: String,
    /// Parsed search.
    pub search: SearchMap,
    /// Canonical search string including the leading `?`, or empty.
    pub search_str: String,
    /// Fragment without the leading `#`.
    pub hash: String,
    /// Unique per navigation.
    pub key: LocationKey,
}

impl Location {
    /// Create a location for a pathname with no search or hash.
    pub fn new(pathname: impl Into<String>) -> Self {
        let mut pathname = pathname.into();
        if !pathname.starts_with('/') {
            pathname.insert(0, '/');
        }
        Self {
            pathname,
            search: SearchMap::new(),
            search_str: String::new(),
            hash: String::new(),
            key: LocationKey::generate(),
        }
    }

    /// Parse an href such as `/posts/3?tab=1#top`.
    pub fn parse(href: &str) -> Self {
        let (rest, hash) = match href.split_once('#') {
            Some((rest, hash)) => (rest, hash.to_string()),
            None => (href, String::new()),
        };
        let (pathname, query) = match rest.split_once('?') {
            Some((path, query)) => (path, query),
            None => (rest, ""),
        };

        let pathname = if pathname.is_empty() { "/" } else { pathname };

        Self::new(pathname)
            .with_search(parse_search(query))
            .with_hash(hash)
    }

    /// Replace the search.
    pub fn with_search(mut self, search: SearchMap) -> Self {
        self.search_str = stringify_search(&search);
        self.search = search;
        self
    }

    /// Replace the hash.
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into().trim_start_matches('#').to_string();
        self
    }

    /// Rebuild the href.
    pub fn href(&self) -> String {
        let mut href = format!("{}{}", self.pathname, self.search_str);
        if !self.hash.is_empty() {
            href.push('#');
            href.push_str(&self.hash);
        }
        href
    }

    /// Check if two locations point at the same place, ignoring the key.
    pub fn same_target(&self, other: &Location) -> bool {
        self.pathname == other.pathname && self.search == other.search && self.hash == other.hash
    }
}

/// Parse a query string into a search mapping.
///
/// Values that are valid JSON (`2`, `true`, `{"a":1}`, `"quoted"`) are
/// decoded; everything else stays a string.
pub fn parse_search(query: &str) -> SearchMap {
    let query = query.trim_start_matches('?');
    let mut search = SearchMap::new();
    if query.is_empty() {
        return search;
    }

    for (key, raw) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = serde_json::from_str::<Value>(&raw)
            .unwrap_or_else(|_| Value::String(raw.into_owned()));
        search.insert(key.into_owned(), value);
    }

    search
}

/// Stringify a search mapping, the inverse of [`parse_search`].
pub fn stringify_search(search: &SearchMap) -> String {
    if search.is_empty() {
        return String::new();
    }

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in search {
        let encoded = match value {
            // Strings that would decode as something else must be quoted
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(_) => value.to_string(),
                Err(_) => s.clone(),
            },
            other => other.to_string(),
        };
        serializer.append_pair(key, &encoded);
    }

    format!("?{}", serializer.finish())
}
