//! Minimal MVC web application skeleton.
//!
//! A front controller maps request paths to `controller/action` pairs via a
//! pattern router, runs the action with explicit request, response and
//! session contexts, and renders views through a pluggable engine.

pub mod application;
pub mod config;
pub mod controller;
pub mod demo;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod session;
pub mod view;

pub use application::Application;
pub use config::schema::AppConfig;
pub use controller::{ActionContext, Controller, DispatchError};
pub use http::{HttpServer, RequestContext, ResponseBuilder};
pub use lifecycle::Shutdown;
pub use routing::{RouteDefinition, RouteMatch, Router};
pub use session::{Session, SessionStore};
pub use view::{TemplateView, ViewRenderer};
