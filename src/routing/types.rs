//! Routing types and error definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameter bag attached to a route, typically `controller` and `action`.
pub type RouteParams = BTreeMap<String, String>;

/// Key naming the controller in a route's parameter bag.
pub const CONTROLLER_KEY: &str = "controller";

/// Key naming the action in a route's parameter bag.
pub const ACTION_KEY: &str = "action";

/// A declared association between a URL pattern and its parameter bag.
///
/// Patterns are `/`-delimited; a segment starting with `:` is a named,
/// single-segment placeholder (`/user/:id`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouteDefinition {
    /// URL pattern, e.g. `/user/:id`.
    pub pattern: String,

    /// Parameters returned on match.
    #[serde(default)]
    pub params: RouteParams,
}

impl RouteDefinition {
    /// Create a definition from a pattern and any iterable of string pairs.
    pub fn new<I, K, V>(pattern: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pattern: pattern.into(),
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Shorthand for the common controller + action bag.
    pub fn action(pattern: impl Into<String>, controller: &str, action: &str) -> Self {
        Self::new(pattern, [(CONTROLLER_KEY, controller), (ACTION_KEY, action)])
    }
}

/// Errors raised while compiling route definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The pattern cannot be turned into a usable matcher.
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl RouteError {
    pub(crate) fn invalid(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result of matching a path against the compiled table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Compiled pattern that matched.
    pub pattern: String,

    /// Route params merged with the captured variables.
    /// Captured variables win on key collision.
    pub params: RouteParams,

    /// Placeholder captures on their own.
    pub variables: BTreeMap<String, String>,
}

impl RouteMatch {
    /// Controller name, if the route carries one.
    pub fn controller(&self) -> Option<&str> {
        self.params.get(CONTROLLER_KEY).map(String::as_str)
    }

    /// Action name, if the route carries one.
    pub fn action(&self) -> Option<&str> {
        self.params.get(ACTION_KEY).map(String::as_str)
    }

    /// Look up a merged parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}
