//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Compile routes → Build application → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C or coordinator trigger → Stop accepting → Drain → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: an invalid route table aborts startup
//! - Listener binds last (traffic only when ready)

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_application, StartupError};
