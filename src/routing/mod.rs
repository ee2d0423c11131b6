//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path relative to the proxy mount)
//!     → router.rs (walk the table in configured order)
//!     → matcher.rs (segment-boundary prefix match)
//!     → Return: matched ProxyRoute or NoMatch
//!
//! Route Compilation (per build):
//!     endpoint map
//!     → target.rs (validate upstream URL)
//!     → rewrite.rs (compile path rewrite rules)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Tables are immutable once built; reloads swap whole tables
//! - Deterministic: same input always matches same route
//! - First match wins (configured order)

pub mod matcher;
pub mod rewrite;
pub mod router;
pub mod target;

pub use matcher::MountMatcher;
pub use router::RouteTable;
