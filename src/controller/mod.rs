//! Controllers and action dispatch.
//!
//! # Data Flow
//! ```text
//! Application (controller + action names, route params)
//!     → Controller::run
//!         → action table lookup   (unknown → NotFound)
//!         → auth policy check     (gated + anonymous → Unauthorized)
//!         → handler(ActionContext, params)
//!     → content string (response builder may carry status/headers)
//! ```
//!
//! # Design Decisions
//! - Actions are registered explicitly by name; no naming-convention lookup
//! - Action table and auth policy are fixed when the controller is built
//! - Handlers are synchronous closures; they receive everything through
//!   `ActionContext`, never through globals

pub mod action;
pub mod csrf;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::routing::RouteParams;
use crate::view::ViewError;

pub use action::{ActionContext, DispatchEnv};

/// Outcome of an action: response content or a dispatch error.
pub type ActionResult = Result<String, DispatchError>;

/// A registered action handler.
pub type ActionHandler = Arc<dyn Fn(&mut ActionContext<'_>, &RouteParams) -> ActionResult + Send + Sync>;

/// Errors raised while dispatching to an action.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No route, controller, or action; rendered as the 404 page.
    #[error("{0}")]
    NotFound(String),

    /// The action requires an authenticated session.
    #[error("action `{controller}/{action}` requires authentication")]
    Unauthorized { controller: String, action: String },

    /// The view could not be rendered.
    #[error(transparent)]
    View(#[from] ViewError),

    /// The action itself failed.
    #[error("action failed: {0}")]
    Handler(String),
}

/// Which actions require an authenticated session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthActions {
    /// No action is gated.
    #[default]
    None,
    /// Every action is gated.
    All,
    /// Only the listed actions are gated.
    Only(HashSet<String>),
}

impl AuthActions {
    pub fn requires(&self, action: &str) -> bool {
        match self {
            AuthActions::None => false,
            AuthActions::All => true,
            AuthActions::Only(actions) => actions.contains(action),
        }
    }
}

/// A named set of actions.
#[derive(Clone)]
pub struct Controller {
    name: String,
    actions: HashMap<String, ActionHandler>,
    auth: AuthActions,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<&String> = self.actions.keys().collect();
        actions.sort();
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("actions", &actions)
            .field("auth", &self.auth)
            .finish()
    }
}

impl Controller {
    /// Start building a controller. The name is lowercased.
    pub fn builder(name: impl Into<String>) -> ControllerBuilder {
        ControllerBuilder {
            name: name.into().to_lowercase(),
            actions: HashMap::new(),
            auth: AuthActions::None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_action(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    pub fn needs_authentication(&self, action: &str) -> bool {
        self.auth.requires(action)
    }

    /// Run `action` with the route params.
    pub fn run(&self, action: &str, params: &RouteParams, env: DispatchEnv<'_>) -> ActionResult {
        let Some(handler) = self.actions.get(action) else {
            return Err(DispatchError::NotFound(format!(
                "Forwarded 404 page from {}/{}",
                self.name, action
            )));
        };

        if self.needs_authentication(action) && !env.session.is_authenticated() {
            tracing::debug!(controller = %self.name, action, "Unauthenticated access to gated action");
            return Err(DispatchError::Unauthorized {
                controller: self.name.clone(),
                action: action.to_string(),
            });
        }

        let mut ctx = ActionContext::new(&self.name, action, env);
        handler(&mut ctx, params)
    }
}

/// Builder collecting a controller's action table and auth policy.
pub struct ControllerBuilder {
    name: String,
    actions: HashMap<String, ActionHandler>,
    auth: AuthActions,
}

impl ControllerBuilder {
    /// Register `handler` under `name`; a later registration replaces it.
    pub fn action<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut ActionContext<'_>, &RouteParams) -> ActionResult + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(handler));
        self
    }

    /// Gate the listed actions behind authentication.
    pub fn require_auth<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let listed = actions.into_iter().map(Into::into);
        self.auth = match self.auth {
            AuthActions::All => AuthActions::All,
            AuthActions::Only(mut existing) => {
                existing.extend(listed);
                AuthActions::Only(existing)
            }
            AuthActions::None => AuthActions::Only(listed.collect()),
        };
        self
    }

    /// Gate every action behind authentication.
    pub fn require_auth_all(mut self) -> Self {
        self.auth = AuthActions::All;
        self
    }

    pub fn build(self) -> Controller {
        Controller {
            name: self.name,
            actions: self.actions,
            auth: self.auth,
        }
    }
}
