//! View rendering.
//!
//! Actions render through the [`ViewRenderer`] trait; the engine behind it
//! is pluggable. [`TemplateView`] is the stock adapter over minijinja.
//!
//! # Layouts
//! When a layout is requested the action's template is rendered first and
//! the result is handed to the layout as `_content` (marked safe, so it is
//! not escaped twice).

use std::path::PathBuf;

use minijinja::{context, Environment, ErrorKind, Value};
use serde_json::Map;
use thiserror::Error;

/// Variables passed to a view.
pub type ViewVariables = Map<String, serde_json::Value>;

/// Extension appended to view paths.
pub const TEMPLATE_EXTENSION: &str = "html";

/// Errors raised while rendering a view.
#[derive(Debug, Error)]
pub enum ViewError {
    /// No template exists for the requested path.
    #[error("view `{0}` not found")]
    NotFound(String),

    /// The template engine failed.
    #[error("template error: {0}")]
    Template(String),
}

/// Renders `controller/template` paths into HTML.
pub trait ViewRenderer: Send + Sync {
    fn render(
        &self,
        path: &str,
        variables: &ViewVariables,
        layout: Option<&str>,
    ) -> Result<String, ViewError>;
}

/// minijinja-backed view renderer.
pub struct TemplateView {
    env: Environment<'static>,
}

impl TemplateView {
    /// Load templates lazily from `view_dir`.
    pub fn new(view_dir: impl Into<PathBuf>) -> Self {
        let view_dir = view_dir.into();
        tracing::debug!(view_dir = %view_dir.display(), "Template view directory registered");
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(view_dir));
        Self { env }
    }

    /// Build from in-memory `(path, source)` pairs; paths omit the extension.
    pub fn from_sources<I, K, V>(sources: I) -> Result<Self, ViewError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut env = Environment::new();
        for (path, source) in sources {
            let name = template_name(&path.into());
            env.add_template_owned(name, source.into())
                .map_err(|e| ViewError::Template(e.to_string()))?;
        }
        Ok(Self { env })
    }

    fn render_one(&self, path: &str, ctx: Value) -> Result<String, ViewError> {
        let template = self.env.get_template(&template_name(path)).map_err(|e| {
            if e.kind() == ErrorKind::TemplateNotFound {
                ViewError::NotFound(path.to_string())
            } else {
                ViewError::Template(e.to_string())
            }
        })?;
        template
            .render(ctx)
            .map_err(|e| ViewError::Template(e.to_string()))
    }
}

impl ViewRenderer for TemplateView {
    fn render(
        &self,
        path: &str,
        variables: &ViewVariables,
        layout: Option<&str>,
    ) -> Result<String, ViewError> {
        let vars = Value::from_serialize(variables);
        let content = self.render_one(path, vars.clone())?;

        match layout {
            Some(layout) => {
                let ctx = context! {
                    _content => Value::from_safe_string(content),
                    ..vars
                };
                self.render_one(layout, ctx)
            }
            None => Ok(content),
        }
    }
}

fn template_name(path: &str) -> String {
    format!("{}.{TEMPLATE_EXTENSION}", path.trim_start_matches('/'))
}
