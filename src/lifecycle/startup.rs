//! Startup orchestration.
//!
//! # Responsibilities
//! - Compile the configured route table
//! - Wire views and controllers into an `Application`
//! - Warn about routes that point at unregistered controllers or actions
//!
//! # Design Decisions
//! - Fail fast: any route compilation error is fatal
//! - Dangling route targets are warnings, not errors (they 404 at runtime)

use std::sync::Arc;

use thiserror::Error;

use crate::application::Application;
use crate::config::AppConfig;
use crate::controller::Controller;
use crate::routing::types::{ACTION_KEY, CONTROLLER_KEY};
use crate::routing::{RouteError, Router};
use crate::view::{TemplateView, ViewRenderer};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("route table rejected: {0}")]
    Routes(#[from] RouteError),
}

/// Build the application with the stock template view.
pub fn build_application(
    config: &AppConfig,
    controllers: Vec<Controller>,
) -> Result<Application, StartupError> {
    let view: Arc<dyn ViewRenderer> = Arc::new(TemplateView::new(&config.app.view_dir));
    build_application_with_view(config, controllers, view)
}

/// Build the application with a caller-supplied view renderer.
pub fn build_application_with_view(
    config: &AppConfig,
    controllers: Vec<Controller>,
    view: Arc<dyn ViewRenderer>,
) -> Result<Application, StartupError> {
    let router = Router::new(&config.routes)?;
    tracing::info!(routes = router.len(), "Routing table compiled");

    let app = controllers
        .into_iter()
        .fold(Application::new(router, view, config.app.clone()), Application::register);

    let router = app.router();
    for route in router.routes() {
        let params = route.params();
        let (Some(controller), Some(action)) = (params.get(CONTROLLER_KEY), params.get(ACTION_KEY)) else {
            continue;
        };
        match app.controller(controller) {
            None => tracing::warn!(
                pattern = %route.pattern(),
                controller = %controller,
                "Route targets an unregistered controller"
            ),
            Some(c) if !c.has_action(action) => tracing::warn!(
                pattern = %route.pattern(),
                controller = %controller,
                action = %action,
                "Route targets an unregistered action"
            ),
            Some(_) => {}
        }
    }

    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteDefinition;

    #[test]
    fn test_build_application() {
        let mut config = AppConfig::default();
        config.routes = vec![
            RouteDefinition::action("/", "index", "index"),
            RouteDefinition::action("/nowhere", "ghost", "index"),
        ];

        let app = build_application(
            &config,
            vec![Controller::builder("index")
                .action("index", |_, _| Ok("home".into()))
                .build()],
        )
        .unwrap();

        assert_eq!(app.router().len(), 2);
        assert!(app.controller("index").is_some());
        assert!(app.controller("ghost").is_none());
    }

    #[test]
    fn test_invalid_routes_abort() {
        let mut config = AppConfig::default();
        config.routes = vec![RouteDefinition::action("/:", "index", "index")];
        assert!(matches!(
            build_application(&config, Vec::new()),
            Err(StartupError::Routes(_))
        ));
    }
}
