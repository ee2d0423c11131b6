//! Proxy subsystem.
//!
//! # Data Flow
//! ```text
//! endpoint map (route → target | options)
//!     → builder.rs (one route per entry, skip-invalid policy)
//!         → route.rs (pure normalization: target, credentials, rewrite)
//!         → middleware.rs (allow-lists, filter, forwarding handler)
//!     → RouteTable
//!     → service.rs (ArcSwap of the live table, dispatch)
//!
//! On change notification:
//!     reload.rs → service.rs fingerprint check → rebuild → swap
//! ```
//!
//! # Design Decisions
//! - Construction errors are raised at build time, never per request
//! - The live table is replaced wholesale; in-flight requests keep theirs
//! - One upstream client is shared by every route

pub mod builder;
pub mod client;
pub mod error;
pub mod middleware;
pub mod reload;
pub mod route;
pub mod service;

pub use builder::{BuildOptions, RouteTableBuilder};
pub use error::{ProxyError, ProxyResult};
pub use middleware::{ForwardingOptions, ProxyRoute};
pub use service::{ProxyService, ReloadOutcome};
