//! MVC skeleton server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ axum (request id, timeout, trace)
//!                       │
//!                       ▼
//!                 front controller ── session store (cookie)
//!                       │
//!                       ▼
//!                 Application ── Router (ArcSwap, hot reload)
//!                       │
//!                       ▼
//!                 Controller::run ── auth gate ── action
//!                       │
//!                       ▼
//!     ◀────────── ResponseBuilder ◀── ViewRenderer (minijinja)
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use mvc_skeleton::config::watcher::ConfigWatcher;
use mvc_skeleton::config::{load_config, AppConfig, ConfigError};
use mvc_skeleton::lifecycle::build_application;
use mvc_skeleton::observability::{logging, metrics};
use mvc_skeleton::routing::Router;
use mvc_skeleton::{demo, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "mvc-skeleton")]
#[command(about = "Minimal MVC web application skeleton", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config/app.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the application (default)
    Serve,
    /// Print the compiled route table
    Routes,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = read_config(&cli.config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&cli.config, config).await,
        Commands::Routes => print_routes(&config),
    }
}

/// Load the config file, falling back to the built-in demo routes when it
/// does not exist.
fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match load_config(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            eprintln!(
                "config file {} not found, using defaults",
                path.display()
            );
            Ok(demo::config())
        }
        Err(e) => Err(e),
    }
}

fn print_routes(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let router = Router::new(&config.routes)?;
    for route in router.routes() {
        let params = route
            .params()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("{:<40} {}", route.pattern(), params);
    }
    Ok(())
}

async fn serve(config_path: &Path, config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(&config.observability);

    tracing::info!("mvc-skeleton v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = build_application(&config, demo::controllers())?;

    // Hot reload; the watcher stops when dropped.
    let (watcher, config_updates) = ConfigWatcher::new(config_path);
    let _watcher = match watcher.run() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(error = %e, path = %config_path.display(), "Config hot reload disabled");
            None
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();

    let server = HttpServer::new(config, app);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
