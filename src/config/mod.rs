//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (route patterns, targets, ranges)
//!     → AppConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → sent to the server, which recompiles the route table
//! ```
//!
//! Only `[[routes]]` is applied live. Changes to any other section are
//! logged as needing a restart and otherwise ignored.
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Routes are an ordered array (`[[routes]]`) because order is precedence

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ActionRef, AppConfig, ApplicationConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    SessionConfig, TimeoutConfig,
};
