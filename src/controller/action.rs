//! Per-call context handed to action handlers.

use serde_json::Value;

use crate::controller::csrf;
use crate::controller::DispatchError;
use crate::http::{RequestContext, ResponseBuilder};
use crate::session::Session;
use crate::view::{ViewRenderer, ViewVariables};

/// Collaborators a controller needs to run one action.
pub struct DispatchEnv<'a> {
    pub request: &'a RequestContext,
    pub response: &'a mut ResponseBuilder,
    pub session: &'a mut Session,
    pub view: &'a dyn ViewRenderer,
    /// Layout wrapped around rendered views, if any.
    pub layout: Option<&'a str>,
}

/// What an action sees while it runs.
pub struct ActionContext<'a> {
    controller: &'a str,
    action: &'a str,
    env: DispatchEnv<'a>,
}

impl<'a> ActionContext<'a> {
    pub(crate) fn new(controller: &'a str, action: &'a str, env: DispatchEnv<'a>) -> Self {
        Self {
            controller,
            action,
            env,
        }
    }

    pub fn controller_name(&self) -> &str {
        self.controller
    }

    pub fn action_name(&self) -> &str {
        self.action
    }

    pub fn request(&self) -> &RequestContext {
        self.env.request
    }

    pub fn response(&mut self) -> &mut ResponseBuilder {
        &mut *self.env.response
    }

    pub fn session(&mut self) -> &mut Session {
        &mut *self.env.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.env.session.is_authenticated()
    }

    /// Render `<controller>/<action>` inside the default layout.
    pub fn render(&self, variables: ViewVariables) -> Result<String, DispatchError> {
        self.render_template(variables, self.action, self.env.layout)
    }

    /// Render `<controller>/<template>` inside `layout`.
    ///
    /// `base_url`, `request_uri` and `authenticated` are provided to every
    /// view; explicit variables take precedence.
    pub fn render_template(
        &self,
        variables: ViewVariables,
        template: &str,
        layout: Option<&str>,
    ) -> Result<String, DispatchError> {
        let mut merged = ViewVariables::new();
        merged.insert("base_url".into(), Value::from(self.env.request.base_url()));
        merged.insert(
            "request_uri".into(),
            Value::from(self.env.request.request_uri()),
        );
        merged.insert(
            "authenticated".into(),
            Value::from(self.env.session.is_authenticated()),
        );
        merged.extend(variables);

        let path = format!("{}/{}", self.controller, template);
        Ok(self.env.view.render(&path, &merged, layout)?)
    }

    /// Answer with `302 Found` to `url`.
    ///
    /// Relative URLs are resolved against scheme, host and base URL of the
    /// current request. Returns empty content for the action to hand back.
    pub fn redirect(&mut self, url: &str) -> Result<String, DispatchError> {
        let location = if is_absolute_http_url(url) {
            url.to_string()
        } else {
            let request = self.env.request;
            let scheme = if request.is_ssl() { "https" } else { "http" };
            format!("{scheme}://{}{}{url}", request.host(), request.base_url())
        };

        tracing::debug!(
            controller = self.controller,
            action = self.action,
            location = %location,
            "Redirecting"
        );
        self.env.response.set_status_code(302, "Found");
        self.env.response.set_http_header("Location", location);
        Ok(String::new())
    }

    /// Error that turns into the 404 page.
    pub fn forward_404(&self) -> DispatchError {
        DispatchError::NotFound(format!(
            "Forwarded 404 page from {}/{}",
            self.controller, self.action
        ))
    }

    /// See [`csrf::generate_token`].
    pub fn generate_csrf_token(&mut self, form_name: &str) -> String {
        csrf::generate_token(&mut *self.env.session, form_name)
    }

    /// See [`csrf::check_token`].
    pub fn check_csrf_token(&mut self, form_name: &str, token: &str) -> bool {
        csrf::check_token(&mut *self.env.session, form_name, token)
    }
}

fn is_absolute_http_url(url: &str) -> bool {
    url::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}
