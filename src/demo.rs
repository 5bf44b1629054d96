//! Sample controllers served by the stock binary.
//!
//! `index` renders the home page, `user` shows a profile addressed by a
//! numeric `:id`, and `account` is auth-gated with a CSRF-protected
//! sign-in form.

use serde_json::json;

use crate::config::{ActionRef, AppConfig, ApplicationConfig};
use crate::controller::Controller;
use crate::routing::RouteDefinition;
use crate::view::ViewVariables;

/// Form name under which sign-in CSRF tokens are kept.
pub const SIGNIN_FORM: &str = "account/signin";

/// Field carrying the CSRF token in posted forms.
pub const TOKEN_FIELD: &str = "_token";

/// Routes matching [`controllers`], used when no config file is present.
pub fn routes() -> Vec<RouteDefinition> {
    vec![
        RouteDefinition::action("/", "index", "index"),
        RouteDefinition::action("/user/:id", "user", "show"),
        RouteDefinition::action("/account", "account", "index"),
        RouteDefinition::new("/account/:action", [("controller", "account")]),
    ]
}

/// Configuration used when no config file is present.
pub fn config() -> AppConfig {
    AppConfig {
        app: ApplicationConfig {
            login_action: Some(ActionRef {
                controller: "account".into(),
                action: "signin".into(),
            }),
            ..ApplicationConfig::default()
        },
        routes: routes(),
        ..AppConfig::default()
    }
}

pub fn controllers() -> Vec<Controller> {
    vec![index(), user(), account()]
}

fn vars(value: serde_json::Value) -> ViewVariables {
    match value {
        serde_json::Value::Object(map) => map,
        _ => ViewVariables::new(),
    }
}

fn index() -> Controller {
    Controller::builder("index")
        .action("index", |ctx, _| ctx.render(ViewVariables::new()))
        .build()
}

fn user() -> Controller {
    Controller::builder("user")
        .action("show", |ctx, params| {
            let Some(id) = params.get("id").and_then(|id| id.parse::<u64>().ok()) else {
                return Err(ctx.forward_404());
            };
            ctx.render(vars(json!({ "id": id })))
        })
        .build()
}

fn account() -> Controller {
    Controller::builder("account")
        .action("index", |ctx, _| ctx.render(ViewVariables::new()))
        .action("signin", |ctx, _| {
            if ctx.is_authenticated() {
                return ctx.redirect("/account");
            }

            let mut error = None;
            if ctx.request().is_post() {
                let token = ctx
                    .request()
                    .get_post(TOKEN_FIELD, Some(""))
                    .unwrap_or_default()
                    .to_string();
                if ctx.check_csrf_token(SIGNIN_FORM, &token) {
                    ctx.session().set_authenticated(true);
                    return ctx.redirect("/account");
                }
                tracing::warn!(
                    request_id = %ctx.request().request_id(),
                    "Sign-in rejected: invalid CSRF token"
                );
                error = Some("Invalid request. Please try again.");
            }

            let token = ctx.generate_csrf_token(SIGNIN_FORM);
            ctx.render(vars(json!({ "token": token, "error": error })))
        })
        .action("signout", |ctx, _| {
            ctx.session().clear();
            ctx.redirect("/account/signin")
        })
        .require_auth(["index", "signout"])
        .build()
}

