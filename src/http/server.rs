//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single front-controller handler
//! - Wire up middleware (request id, timeout, tracing)
//! - Decode form bodies and bind sessions to a cookie
//! - Sweep idle sessions in the background
//! - Hand each request to the application and send its response
//! - Apply route table updates from the config watcher
//! - Observability (metrics, correlation IDs)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::application::Application;
use crate::config::AppConfig;
use crate::http::request::{parse_urlencoded, RequestContext};
use crate::lifecycle::shutdown::wait_for_shutdown;
use crate::observability::metrics;
use crate::session::{SessionStore, SESSION_COOKIE};

/// Largest request body read for form decoding.
const MAX_FORM_BYTES: usize = 1024 * 1024;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// State injected into the front controller.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<Application>,
    pub sessions: SessionStore,
    pub server_name: Arc<str>,
    pub script_name: Arc<str>,
}

/// HTTP server for the application.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    app: Arc<Application>,
    sessions: SessionStore,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig, app: Application) -> Self {
        let app = Arc::new(app);
        let sessions = SessionStore::with_limits(
            Duration::from_secs(config.sessions.idle_timeout_secs),
            config.sessions.max_sessions,
        );
        let state = AppState {
            app: Arc::clone(&app),
            sessions: sessions.clone(),
            server_name: Arc::from(config.listener.server_name.as_str()),
            script_name: Arc::from(config.app.script_name.as_str()),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            app,
            sessions,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        Router::new()
            .fallback(front_controller)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, e.g. for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn application(&self) -> Arc<Application> {
        Arc::clone(&self.app)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn sessions(&self) -> SessionStore {
        self.sessions.clone()
    }

    /// Serve until `shutdown` fires or Ctrl+C is received.
    ///
    /// Configurations arriving on `config_updates` replace the route table.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.app.router().len(),
            "HTTP server starting"
        );

        let sweeper = self.sessions.spawn_sweeper(
            Duration::from_secs(self.config.sessions.sweep_interval_secs),
            shutdown.resubscribe(),
        );

        let app = Arc::clone(&self.app);
        let running = self.config.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                let ignored = running.sections_needing_restart(&config);
                if !ignored.is_empty() {
                    tracing::warn!(
                        sections = %ignored.join(", "),
                        "Config changes outside [[routes]] need a restart; ignoring them"
                    );
                }
                match app.reload_routes(&config.routes) {
                    Ok(()) => metrics::record_route_reload(true),
                    Err(e) => {
                        tracing::error!(error = %e, "Route reload rejected; keeping current table");
                        metrics::record_route_reload(false);
                    }
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        reloader.abort();
        sweeper.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Front controller: every request goes through here.
async fn front_controller(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();

    let form = if is_form(&parts.headers) {
        match axum::body::to_bytes(body, MAX_FORM_BYTES).await {
            Ok(bytes) => parse_urlencoded(&bytes),
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting unreadable form body");
                metrics::record_request(&method, 413, start);
                return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
            }
        }
    } else {
        HashMap::new()
    };

    let request = RequestContext::from_parts(&parts, form, &state.server_name, &state.script_name);
    let cookie = session_cookie(&parts.headers);
    let (response, issued) = state
        .sessions
        .with_session(cookie.as_deref(), |session| state.app.dispatch(&request, session));

    tracing::info!(
        request_id = %request.request_id(),
        method = %method,
        path = %request.path_info(),
        status = response.status_code(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request handled"
    );
    metrics::record_request(&method, response.status_code(), start);

    let mut response = response.into_response();
    if let Some(session_id) = issued {
        let cookie = format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax");
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "Invalid session cookie"),
        }
    }
    response
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with(FORM_CONTENT_TYPE))
        .unwrap_or(false)
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}
