//! Front controller.
//!
//! # Responsibilities
//! - Resolve the path info to a route
//! - Pick the controller and action named by the route params
//! - Turn dispatch errors into 404 pages, the login action, or 500s
//! - Swap in a recompiled route table on reload
//!
//! # Design Decisions
//! - The router sits behind `ArcSwap`: lookups are lock-free, reloads
//!   replace the whole table and never mutate a live one
//! - The controller registry is fixed before the application is shared
//! - Dispatch is synchronous; the HTTP layer owns all I/O

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::{ActionRef, ApplicationConfig};
use crate::controller::{ActionResult, Controller, DispatchEnv, DispatchError};
use crate::http::{RequestContext, ResponseBuilder};
use crate::routing::types::{ACTION_KEY, CONTROLLER_KEY};
use crate::routing::{RouteDefinition, RouteError, RouteParams, Router};
use crate::session::Session;
use crate::view::ViewRenderer;

/// Message shown on 404 pages outside debug mode.
const NOT_FOUND_MESSAGE: &str = "Page not found.";

/// The MVC application: routes, controllers and views.
pub struct Application {
    router: ArcSwap<Router>,
    controllers: HashMap<String, Controller>,
    view: Arc<dyn ViewRenderer>,
    settings: ApplicationConfig,
}

impl Application {
    pub fn new(router: Router, view: Arc<dyn ViewRenderer>, settings: ApplicationConfig) -> Self {
        Self {
            router: ArcSwap::from_pointee(router),
            controllers: HashMap::new(),
            view,
            settings,
        }
    }

    /// Register a controller under its name, replacing any previous one.
    pub fn register(mut self, controller: Controller) -> Self {
        tracing::debug!(controller = %controller.name(), "Controller registered");
        self.controllers
            .insert(controller.name().to_string(), controller);
        self
    }

    /// Snapshot of the current route table.
    pub fn router(&self) -> Arc<Router> {
        self.router.load_full()
    }

    pub fn controller(&self, name: &str) -> Option<&Controller> {
        self.controllers.get(name)
    }

    pub fn settings(&self) -> &ApplicationConfig {
        &self.settings
    }

    /// Compile `definitions` and swap the new table in.
    ///
    /// On error the current table stays in place.
    pub fn reload_routes(&self, definitions: &[RouteDefinition]) -> Result<(), RouteError> {
        let router = Router::new(definitions)?;
        tracing::info!(routes = router.len(), "Routing table reloaded");
        self.router.store(Arc::new(router));
        Ok(())
    }

    /// Handle one request.
    pub fn dispatch(&self, request: &RequestContext, session: &mut Session) -> ResponseBuilder {
        let mut response = ResponseBuilder::new();
        let path_info = request.path_info();

        let matched = self.router.load().match_path(&path_info);

        let outcome = match matched {
            Some(route) => {
                tracing::debug!(
                    request_id = %request.request_id(),
                    path = %path_info,
                    pattern = %route.pattern,
                    "Route matched"
                );
                match (route.controller(), route.action()) {
                    (Some(controller), Some(action)) => self.run_action(
                        controller,
                        action,
                        &route.params,
                        request,
                        &mut response,
                        session,
                    ),
                    _ => Err(DispatchError::NotFound(format!(
                        "Route `{}` names no controller/action",
                        route.pattern
                    ))),
                }
            }
            None => Err(DispatchError::NotFound(format!(
                "No route found for {path_info}"
            ))),
        };

        let outcome = match outcome {
            Err(DispatchError::Unauthorized { controller, action }) => {
                self.forward_to_login(&controller, &action, request, &mut response, session)
            }
            other => other,
        };

        match outcome {
            Ok(content) => response.set_content(content),
            Err(err) => self.render_error(err, request, &mut response),
        }

        response
    }

    fn run_action(
        &self,
        controller: &str,
        action: &str,
        params: &RouteParams,
        request: &RequestContext,
        response: &mut ResponseBuilder,
        session: &mut Session,
    ) -> ActionResult {
        let Some(handler) = self.controllers.get(controller) else {
            return Err(DispatchError::NotFound(format!(
                "{controller} controller is not found."
            )));
        };

        tracing::debug!(
            request_id = %request.request_id(),
            controller,
            action,
            "Dispatching"
        );
        handler.run(
            action,
            params,
            DispatchEnv {
                request,
                response,
                session,
                view: self.view.as_ref(),
                layout: self.settings.layout(),
            },
        )
    }

    fn forward_to_login(
        &self,
        controller: &str,
        action: &str,
        request: &RequestContext,
        response: &mut ResponseBuilder,
        session: &mut Session,
    ) -> ActionResult {
        let Some(ActionRef {
            controller: login_controller,
            action: login_action,
        }) = &self.settings.login_action
        else {
            return Err(DispatchError::Unauthorized {
                controller: controller.to_string(),
                action: action.to_string(),
            });
        };

        tracing::info!(
            request_id = %request.request_id(),
            controller,
            action,
            login = %format!("{login_controller}/{login_action}"),
            "Unauthenticated request forwarded to login action"
        );

        let params: RouteParams = [
            (CONTROLLER_KEY.to_string(), login_controller.clone()),
            (ACTION_KEY.to_string(), login_action.clone()),
        ]
        .into_iter()
        .collect();

        self.run_action(login_controller, login_action, &params, request, response, session)
    }

    fn render_error(&self, err: DispatchError, request: &RequestContext, response: &mut ResponseBuilder) {
        match err {
            DispatchError::NotFound(message) => {
                tracing::warn!(request_id = %request.request_id(), reason = %message, "Not found");
                let message = if self.settings.debug {
                    message
                } else {
                    NOT_FOUND_MESSAGE.to_string()
                };
                response.set_status_code(404, "Not Found");
                response.set_content(error_page("404", &message));
            }
            DispatchError::Unauthorized { controller, action } => {
                tracing::warn!(
                    request_id = %request.request_id(),
                    controller = %controller,
                    action = %action,
                    "Unauthorized and no login action configured"
                );
                response.set_status_code(401, "Unauthorized");
                response.set_content(error_page("401", "Authentication required."));
            }
            other => {
                tracing::error!(request_id = %request.request_id(), error = %other, "Action failed");
                let message = if self.settings.debug {
                    other.to_string()
                } else {
                    "Internal server error.".to_string()
                };
                response.set_status_code(500, "Internal Server Error");
                response.set_content(error_page("500", &message));
            }
        }
    }
}

fn error_page(title: &str, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\" />\n<title>{title}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(message)
    )
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
