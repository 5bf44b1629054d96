//! Pattern compilation and path matching.
//!
//! # Responsibilities
//! - Turn `/user/:id` style patterns into anchored regexes
//! - Escape literal segments so they only match themselves
//! - Extract named captures from a matching path
//!
//! # Design Decisions
//! - A placeholder matches exactly one segment (`[^/]+`)
//! - Leading slashes are stripped before splitting, one is re-added
//! - Placeholder names must be identifiers and unique per pattern

use std::collections::BTreeMap;

use regex::Regex;

use crate::routing::types::RouteError;

/// Expression substituted for every `:name` segment.
const PLACEHOLDER_EXPR: &str = "[^/]+";

/// A single compiled URL pattern.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    /// Compiled pattern source, e.g. `/user/(?P<id>[^/]+)`.
    pattern: String,
    /// Anchored form of `pattern`.
    regex: Regex,
    /// Placeholder names in declaration order.
    names: Vec<String>,
}

impl PathMatcher {
    /// Compile a URL pattern.
    pub fn compile(url: &str) -> Result<Self, RouteError> {
        let mut names: Vec<String> = Vec::new();
        let mut tokens = Vec::new();

        for token in url.trim_start_matches('/').split('/') {
            match token.strip_prefix(':') {
                Some(name) => {
                    validate_identifier(url, name)?;
                    if names.iter().any(|n| n == name) {
                        return Err(RouteError::invalid(
                            url,
                            format!("placeholder `:{name}` appears more than once"),
                        ));
                    }
                    tokens.push(format!("(?P<{name}>{PLACEHOLDER_EXPR})"));
                    names.push(name.to_string());
                }
                None => tokens.push(regex::escape(token)),
            }
        }

        let pattern = format!("/{}", tokens.join("/"));
        let regex = Regex::new(&format!("^{pattern}$"))
            .map_err(|e| RouteError::invalid(url, e.to_string()))?;

        Ok(Self {
            pattern,
            regex,
            names,
        })
    }

    /// The compiled (unanchored) pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Placeholder names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns true if the whole path matches.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match the path and return the captured placeholders.
    pub fn captures(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.names
                .iter()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

impl PartialEq for PathMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for PathMatcher {}

fn validate_identifier(url: &str, name: &str) -> Result<(), RouteError> {
    let mut chars = name.chars();
    match chars.next() {
        None => Err(RouteError::invalid(url, "placeholder has an empty name")),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => Err(RouteError::invalid(
            url,
            format!("placeholder `:{name}` must start with a letter or underscore"),
        )),
        Some(_) if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') => {
            Err(RouteError::invalid(
                url,
                format!("placeholder `:{name}` may only contain letters, digits and underscores"),
            ))
        }
        Some(_) => Ok(()),
    }
}
