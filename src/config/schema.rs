//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Root configuration for the proxy service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Backend settings used for service discovery.
    pub backend: BackendConfig,

    /// Credentials gate settings.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Proxy endpoints and build options.
    pub proxy: ProxySection,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:7007").
    pub bind_address: String,

    /// Time allowed for the upstream to start responding, in seconds.
    pub request_timeout_secs: u64,

    /// Parse JSON and form bodies before they reach the proxy.
    pub parse_json_bodies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7007".to_string(),
            request_timeout_secs: 30,
            parse_json_bodies: false,
        }
    }
}

/// Backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// External base URL of the backend; plugins live under `<base_url>/api/<plugin>`.
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7007".to_string(),
        }
    }
}

/// Credentials gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Reject requests without an `Authorization` header unless the route
    /// allows unauthenticated access.
    pub require_credentials: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// The `[proxy]` section.
///
/// Endpoints live under `endpoints`. Root-level keys starting with `/` are
/// the deprecated location and are kept in `legacy`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ProxySection {
    /// Omit invalid routes instead of failing the build.
    pub skip_invalid_proxies: bool,

    /// Replay request bodies consumed by the body parser.
    pub revive_consumed_request_bodies: bool,

    /// Route path → target URL or structured route options.
    pub endpoints: Option<Map<String, Value>>,

    #[serde(flatten)]
    pub legacy: Map<String, Value>,
}
