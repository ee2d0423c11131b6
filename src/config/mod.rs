//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → endpoints.rs (preferred or deprecated endpoint location)
//!     → proxy route table build
//!
//! On change:
//!     watcher.rs / SIGHUP send a notification
//!     → reload task re-reads endpoints through an EndpointSource
//!     → unchanged fingerprint: nothing happens
//!     → changed: rebuild, then atomic swap of the route table
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Route entries stay untyped until their route is built, so one bad
//!   route cannot reject the whole file

pub mod discovery;
pub mod endpoints;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use endpoints::{read_endpoints, EndpointSource, FileEndpointSource};
pub use loader::{load_config, ConfigError};
pub use schema::{AppConfig, ProxySection, ServerConfig};
