//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile every route pattern once to surface invalid placeholders
//! - Check each route names a controller and an action
//! - Detect duplicate routes (same compiled pattern)
//! - Validate value ranges (timeouts and session limits > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::routing::types::{ACTION_KEY, CONTROLLER_KEY};
use crate::routing::{PathMatcher, RouteError};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route #{index} has an empty pattern")]
    EmptyPattern { index: usize },

    #[error(transparent)]
    InvalidRoute(#[from] RouteError),

    #[error("route `{pattern}` is missing `{key}`")]
    MissingTarget { pattern: String, key: &'static str },

    #[error("route `{pattern}` duplicates an earlier route")]
    DuplicatePattern { pattern: String },

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("{field} must be greater than zero")]
    ZeroSessionLimit { field: &'static str },

    #[error("invalid {field} `{value}`")]
    InvalidAddress { field: &'static str, value: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, route) in config.routes.iter().enumerate() {
        if route.pattern.is_empty() {
            errors.push(ValidationError::EmptyPattern { index });
            continue;
        }

        match PathMatcher::compile(&route.pattern) {
            Ok(matcher) => {
                if !seen.insert(matcher.pattern().to_string()) {
                    errors.push(ValidationError::DuplicatePattern {
                        pattern: route.pattern.clone(),
                    });
                }
            }
            Err(e) => errors.push(e.into()),
        }

        for key in [CONTROLLER_KEY, ACTION_KEY] {
            // `:action` style placeholders may supply the target at match time.
            let placeholder = format!(":{key}");
            let supplied_by_path = route.pattern.split('/').any(|seg| seg == placeholder);
            if !route.params.contains_key(key) && !supplied_by_path {
                errors.push(ValidationError::MissingTarget {
                    pattern: route.pattern.clone(),
                    key,
                });
            }
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    for (field, value) in [
        ("sessions.idle_timeout_secs", config.sessions.idle_timeout_secs),
        ("sessions.max_sessions", config.sessions.max_sessions as u64),
        ("sessions.sweep_interval_secs", config.sessions.sweep_interval_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroSessionLimit { field });
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
