//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, timeout, tracing layers)
//!     → request.rs (RequestContext: host, base URL, path info, params)
//!     → [application dispatch: route → controller → action]
//!     → response.rs (ResponseBuilder → axum Response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, X_REQUEST_ID};
pub use response::ResponseBuilder;
pub use server::HttpServer;
