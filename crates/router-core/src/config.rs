//! Router-wide configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How built hrefs treat a trailing slash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSlash {
    /// Keep whatever the target path had.
    #[default]
    Ignore,
    /// Always end pathnames with `/`.
    Always,
    /// Never end pathnames with `/` (except the root).
    Never,
}

impl TrailingSlash {
    /// Apply the policy to a pathname.
    pub fn apply(&self, pathname: &str) -> String {
        match self {
            Self::Ignore => pathname.to_string(),
            Self::Always if pathname.ends_with('/') => pathname.to_string(),
            Self::Always => format!("{}/", pathname),
            Self::Never if pathname.len() > 1 => pathname.trim_end_matches('/').to_string(),
            Self::Never => pathname.to_string(),
        }
    }
}

/// Configuration for a router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Freshness window for navigation-loaded data when a route sets none.
    #[serde(with = "router_cache::duration_ms")]
    pub default_max_age: Duration,
    /// Freshness window for preloaded data when a route sets none.
    #[serde(with = "router_cache::duration_ms")]
    pub default_preload_max_age: Duration,
    /// Whether literal segments compare case-sensitively.
    pub case_sensitive: bool,
    /// Prefix prepended to every built href and stripped before matching.
    pub base_path: String,
    /// Trailing slash policy for built hrefs.
    pub trailing_slash: TrailingSlash,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_max_age: Duration::ZERO,
            default_preload_max_age: Duration::from_millis(2000),
            case_sensitive: false,
            base_path: "/".to_string(),
            trailing_slash: TrailingSlash::Ignore,
        }
    }
}

impl RouterConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()
    }

    /// Parse a configuration from JSON.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if !self.base_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "base_path",
                reason: format!("must start with '/', got {:?}", self.base_path),
            });
        }
        Ok(self)
    }

    /// Set the default navigation freshness window.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.default_max_age = max_age;
        self
    }

    /// Set the default preload freshness window.
    pub fn with_preload_max_age(mut self, max_age: Duration) -> Self {
        self.default_preload_max_age = max_age;
        self
    }

    /// Enable or disable case-sensitive matching.
    pub fn with_case_sensitive(mut self, enabled: bool) -> Self {
        self.case_sensitive = enabled;
        self
    }

    /// Set the base path.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Set the trailing slash policy.
    pub fn with_trailing_slash(mut self, policy: TrailingSlash) -> Self {
        self.trailing_slash = policy;
        self
    }

    /// Strip the base path from a pathname, if it is under it.
    pub fn strip_base<'a>(&self, pathname: &'a str) -> Option<&'a str> {
        let base = self.base_path.trim_end_matches('/');
        if base.is_empty() {
            return Some(pathname);
        }
        let rest = pathname.strip_prefix(base)?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    /// Prefix a pathname with the base path.
    pub fn join_base(&self, pathname: &str) -> String {
        let base = self.base_path.trim_end_matches('/');
        format!("{}{}", base, pathname)
    }
}
