//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! application. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

use crate::routing::RouteDefinition;

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, server name).
    pub listener: ListenerConfig,

    /// Front-controller settings (views, layout, login action).
    pub app: ApplicationConfig,

    /// Route table, matched in declared order.
    pub routes: Vec<RouteDefinition>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Session store limits.
    pub sessions: SessionConfig,
}

impl AppConfig {
    /// Sections of `next` that differ from `self` and only take effect
    /// after a restart. Routes are the one section applied live.
    pub fn sections_needing_restart(&self, next: &AppConfig) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.listener != next.listener {
            changed.push("listener");
        }
        if self.app != next.app {
            changed.push("app");
        }
        if self.timeouts != next.timeouts {
            changed.push("timeouts");
        }
        if self.observability != next.observability {
            changed.push("observability");
        }
        if self.sessions != next.sessions {
            changed.push("sessions");
        }
        changed
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Host reported to actions when the request carries no Host header.
    pub server_name: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            server_name: "localhost".to_string(),
        }
    }
}

/// A controller + action pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActionRef {
    pub controller: String,
    pub action: String,
}

/// Front-controller settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Path of the front controller the app is mounted under
    /// (e.g. "/index.php"). Empty when mounted at the root.
    pub script_name: String,

    /// Directory holding `<controller>/<action>.html` views.
    pub view_dir: String,

    /// Layout wrapped around every rendered view. Empty disables it.
    pub layout: String,

    /// Show error details on 404/500 pages.
    pub debug: bool,

    /// Action run instead of an auth-gated action for anonymous sessions.
    pub login_action: Option<ActionRef>,
}

impl ApplicationConfig {
    /// The layout name, or `None` when disabled.
    pub fn layout(&self) -> Option<&str> {
        Some(self.layout.as_str()).filter(|l| !l.is_empty())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            script_name: String::new(),
            view_dir: "views".to_string(),
            layout: "layout".to_string(),
            debug: false,
            login_action: None,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Session store limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds a session may stay unused before it is dropped.
    pub idle_timeout_secs: u64,

    /// Most sessions kept at once.
    pub max_sessions: usize,

    /// Seconds between sweeps for expired sessions.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30 * 60,
            max_sessions: 10_000,
            sweep_interval_secs: 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, for development.
    #[default]
    Pretty,
    /// One JSON object per event, for production.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteDefinition;

    #[test]
    fn test_route_changes_apply_live() {
        let current = AppConfig::default();
        let mut next = current.clone();
        next.routes.push(RouteDefinition::action("/about", "page", "about"));
        assert!(current.sections_needing_restart(&next).is_empty());
    }

    #[test]
    fn test_other_sections_need_restart() {
        let current = AppConfig::default();
        let mut next = current.clone();
        next.app.debug = true;
        next.timeouts.request_secs = 5;
        next.sessions.max_sessions = 1;
        assert_eq!(
            current.sections_needing_restart(&next),
            vec!["app", "timeouts", "sessions"]
        );
    }
}
