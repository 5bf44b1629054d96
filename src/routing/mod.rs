//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteDefinition[] (declared order)
//!     → matcher.rs (pattern → anchored regex, one per definition)
//!     → router.rs (ordered table, duplicates dropped)
//!     → Freeze as immutable Router
//!
//! Incoming Request (path info)
//!     → router.rs (scan in declared order)
//!     → matcher.rs (regex match, named captures)
//!     → Return: RouteMatch (params + variables) or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always compiles to the same table
//! - First match wins (declared order, no priorities)
//! - Invalid patterns fail at compile time, never at match time

pub mod matcher;
pub mod router;
pub mod types;

pub use matcher::PathMatcher;
pub use router::{CompiledRoute, Router};
pub use types::{RouteDefinition, RouteError, RouteMatch, RouteParams};
