//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use mvc_skeleton::config::AppConfig;
use mvc_skeleton::lifecycle::build_application;
use mvc_skeleton::{demo, HttpServer, Shutdown};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    #[allow(dead_code)]
    pub config_updates: mpsc::UnboundedSender<AppConfig>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// The demo configuration pointed at the bundled views.
pub fn demo_config() -> AppConfig {
    let mut config = demo::config();
    config.app.view_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/views").to_string();
    config
}

/// Start the demo application with `config`.
pub async fn spawn_server(config: AppConfig) -> TestServer {
    let app = build_application(&config, demo::controllers()).expect("application builds");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_updates, update_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(config, app);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, update_rx, server_shutdown).await;
    });

    // The listener is already bound; give the accept loop a moment.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        shutdown,
        config_updates,
    }
}

/// Client that keeps cookies and does not follow redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// Pull the CSRF token out of a rendered sign-in form.
#[allow(dead_code)]
pub fn extract_token(body: &str) -> String {
    let marker = "name=\"_token\" value=\"";
    let start = body.find(marker).expect("form carries a token") + marker.len();
    let end = body[start..].find('"').unwrap() + start;
    body[start..end].to_string()
}
