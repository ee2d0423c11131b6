//! Configurable reverse proxy mounted under a discovered path prefix.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;
pub mod security;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{Application, Shutdown, StartupError};
pub use proxy::{ProxyError, ProxyService, RouteTableBuilder};
