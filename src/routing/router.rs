//! Route table compilation and lookup.
//!
//! # Responsibilities
//! - Compile the declared route table into ordered matchers
//! - Look up the first route matching a path
//! - Merge captured variables into the route's parameter bag
//!
//! # Design Decisions
//! - Immutable after construction (shared via Arc without locks)
//! - O(n) scan in declared order; first match wins
//! - Identical compiled patterns: the first definition is kept, later ones
//!   are dropped with a warning (they could never be reached)
//! - Explicit `None` rather than a silent default route

use std::borrow::Cow;

use crate::routing::matcher::PathMatcher;
use crate::routing::types::{RouteDefinition, RouteError, RouteMatch, RouteParams};

/// A compiled pattern paired with its parameter bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRoute {
    matcher: PathMatcher,
    params: RouteParams,
}

impl CompiledRoute {
    /// Compile a single definition.
    pub fn compile(definition: &RouteDefinition) -> Result<Self, RouteError> {
        Ok(Self {
            matcher: PathMatcher::compile(&definition.pattern)?,
            params: definition.params.clone(),
        })
    }

    /// Compiled pattern string.
    pub fn pattern(&self) -> &str {
        self.matcher.pattern()
    }

    /// Declared parameter bag.
    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    fn resolve(&self, path: &str) -> Option<RouteMatch> {
        let variables = self.matcher.captures(path)?;
        let mut params = self.params.clone();
        params.extend(variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        Some(RouteMatch {
            pattern: self.pattern().to_string(),
            params,
            variables,
        })
    }
}

/// Compile definitions into an ordered table.
///
/// Pure apart from the warning logged for dropped duplicates.
pub fn compile_routes(definitions: &[RouteDefinition]) -> Result<Vec<CompiledRoute>, RouteError> {
    let mut routes: Vec<CompiledRoute> = Vec::with_capacity(definitions.len());

    for definition in definitions {
        let route = CompiledRoute::compile(definition)?;
        if routes.iter().any(|r| r.pattern() == route.pattern()) {
            tracing::warn!(
                pattern = %definition.pattern,
                compiled = %route.pattern(),
                "Duplicate route pattern ignored; the first definition wins"
            );
            continue;
        }
        routes.push(route);
    }

    Ok(routes)
}

/// Immutable, ordered route table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Router {
    routes: Vec<CompiledRoute>,
}

impl Router {
    /// Compile the route table.
    pub fn new(definitions: &[RouteDefinition]) -> Result<Self, RouteError> {
        let routes = compile_routes(definitions)?;
        tracing::debug!(routes = routes.len(), "Routing table compiled");
        Ok(Self { routes })
    }

    /// Find the first route matching `path`.
    ///
    /// A path without a leading `/` is treated as if it had one.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        let path: Cow<'_, str> = if path.starts_with('/') {
            Cow::Borrowed(path)
        } else {
            Cow::Owned(format!("/{path}"))
        };

        self.routes.iter().find_map(|route| route.resolve(&path))
    }

    /// Compiled routes in match order.
    pub fn routes(&self) -> &[CompiledRoute] {
        &self.routes
    }

    /// Compiled pattern strings in match order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(CompiledRoute::pattern)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> RouteParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_match_merges_variables_into_params() {
        let router = Router::new(&[RouteDefinition::action("/user/:id", "user", "show")]).unwrap();

        let m = router.match_path("/user/42").unwrap();
        assert_eq!(
            m.params,
            params(&[("controller", "user"), ("action", "show"), ("id", "42")])
        );
        assert_eq!(m.variables, params(&[("id", "42")]));
        assert_eq!(m.controller(), Some("user"));
        assert_eq!(m.action(), Some("show"));
        assert_eq!(m.pattern, "/user/(?P<id>[^/]+)");
    }

    #[test]
    fn test_root_does_not_match_other_paths() {
        let router = Router::new(&[RouteDefinition::action("/", "index", "index")]).unwrap();
        assert!(router.match_path("/").is_some());
        assert!(router.match_path("/anything").is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let router = Router::new(&[
            RouteDefinition::new("/a", [("name", "P1")]),
            RouteDefinition::new("/:x", [("name", "P2")]),
        ])
        .unwrap();

        assert_eq!(router.match_path("/a").unwrap().get("name"), Some("P1"));
        let other = router.match_path("/b").unwrap();
        assert_eq!(other.get("name"), Some("P2"));
        assert_eq!(other.get("x"), Some("b"));
    }

    #[test]
    fn test_captured_variables_override_params() {
        let router = Router::new(&[RouteDefinition::new(
            "/:action",
            [("controller", "account"), ("action", "index")],
        )])
        .unwrap();

        let m = router.match_path("/signin").unwrap();
        assert_eq!(m.action(), Some("signin"));
    }

    #[test]
    fn test_path_without_leading_slash() {
        let router = Router::new(&[RouteDefinition::action("/user/:id", "user", "show")]).unwrap();
        assert_eq!(router.match_path("user/7").unwrap().get("id"), Some("7"));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let definitions = vec![
            RouteDefinition::action("/", "index", "index"),
            RouteDefinition::action("/user/:id", "user", "show"),
            RouteDefinition::action("/user/:id/edit", "user", "edit"),
        ];

        let first = Router::new(&definitions).unwrap();
        let second = Router::new(&definitions).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.patterns().collect::<Vec<_>>(),
            vec!["/", "/user/(?P<id>[^/]+)", "/user/(?P<id>[^/]+)/edit"]
        );
    }

    #[test]
    fn test_duplicate_patterns_keep_first() {
        let router = Router::new(&[
            RouteDefinition::action("/about", "page", "about"),
            RouteDefinition::action("about", "page", "other"),
        ])
        .unwrap();

        assert_eq!(router.len(), 1);
        assert_eq!(router.match_path("/about").unwrap().action(), Some("about"));
    }

    #[test]
    fn test_invalid_definition_rejects_whole_table() {
        let result = Router::new(&[
            RouteDefinition::action("/", "index", "index"),
            RouteDefinition::action("/user/:", "user", "show"),
        ]);
        assert!(matches!(result, Err(RouteError::InvalidPattern { .. })));
    }

    #[test]
    fn test_empty_router() {
        let router = Router::default();
        assert!(router.is_empty());
        assert!(router.match_path("/").is_none());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn definition() -> impl Strategy<Value = RouteDefinition> {
            let segment = prop_oneof![
                "[a-z.]{1,6}",
                "[a-z]{1,4}".prop_map(|name| format!(":{name}")),
            ];
            (
                prop::collection::vec(segment, 1..4),
                "[a-z]{1,6}",
                "[a-z]{1,6}",
            )
                .prop_map(|(segments, controller, action)| {
                    RouteDefinition::action(format!("/{}", segments.join("/")), &controller, &action)
                })
        }

        proptest! {
            #[test]
            fn compiling_twice_gives_equal_tables(
                definitions in prop::collection::vec(definition(), 0..8)
            ) {
                prop_assert_eq!(Router::new(&definitions), Router::new(&definitions));
            }

            #[test]
            fn earliest_matching_definition_wins(
                definitions in prop::collection::vec(definition(), 1..8),
                values in prop::collection::vec("[a-z0-9]{1,6}", 3),
            ) {
                let Ok(router) = Router::new(&definitions) else {
                    return Ok(());
                };

                // Fill each placeholder of the first route to get a path it matches.
                let mut values = values.iter();
                let path = definitions[0]
                    .pattern
                    .split('/')
                    .map(|seg| match seg.strip_prefix(':') {
                        Some(_) => values.next().map(String::as_str).unwrap_or("v"),
                        None => seg,
                    })
                    .collect::<Vec<_>>()
                    .join("/");

                let matched = router.match_path(&path).unwrap();
                prop_assert_eq!(matched.pattern.as_str(), router.routes()[0].pattern());
            }
        }
    }
}
