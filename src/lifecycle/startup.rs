//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Resolve the proxy mount and build the initial route table
//! - Start the config watcher, signal handler and reload task
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, including an invalid route in
//!   strict mode
//! - Listeners start last (traffic only when routes are ready)

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::discovery::{resolve_path_prefix, HostDiscovery};
use crate::config::endpoints::{read_endpoints, EndpointSource, FileEndpointSource};
use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::AppConfig;
use crate::config::watcher::ConfigWatcher;
use crate::http::server::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::observability::{logging, metrics};
use crate::proxy::builder::{BuildOptions, RouteTableBuilder};
use crate::proxy::client::build_client;
use crate::proxy::error::ProxyError;
use crate::proxy::middleware::ForwardingOptions;
use crate::proxy::reload::spawn_reload_task;
use crate::proxy::service::ProxyService;
use crate::security::auth_policy::AuthPolicies;

/// Plugin id the proxy mount is discovered under.
pub const PLUGIN_ID: &str = "proxy";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Proxy configuration error: {0}")]
    Proxy(#[from] ProxyError),

    #[error("TLS client error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("Config watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fully built proxy, ready to serve.
pub struct Application {
    config: AppConfig,
    proxy: Arc<ProxyService>,
    policies: Arc<AuthPolicies>,
    source: Arc<dyn EndpointSource>,
}

impl Application {
    /// Build the initial route table from `config`. Later reloads read
    /// endpoints from `source`; `additional_endpoints` are included in
    /// every build and lose to configured routes of the same name.
    pub fn build(
        config: AppConfig,
        source: Arc<dyn EndpointSource>,
        additional_endpoints: Map<String, Value>,
    ) -> Result<Self, StartupError> {
        let discovery = HostDiscovery::new(config.backend.base_url.clone());
        let path_prefix = resolve_path_prefix(&discovery, PLUGIN_ID)?;

        let options = BuildOptions {
            skip_invalid_proxies: config.proxy.skip_invalid_proxies,
            forwarding: ForwardingOptions {
                revive_consumed_request_bodies: config.proxy.revive_consumed_request_bodies,
            },
        };
        let policies = Arc::new(AuthPolicies::new());
        let builder = RouteTableBuilder::new(path_prefix, options, build_client()?);

        let proxy = ProxyService::new(
            builder,
            policies.clone(),
            additional_endpoints,
            read_endpoints(&config.proxy),
        )?;

        tracing::info!(
            path_prefix = %proxy.path_prefix(),
            routes = proxy.table().len(),
            skip_invalid_proxies = options.skip_invalid_proxies,
            "Proxy initialized"
        );

        Ok(Self {
            config,
            proxy: Arc::new(proxy),
            policies,
            source,
        })
    }

    pub fn proxy(&self) -> &Arc<ProxyService> {
        &self.proxy
    }

    /// Serve until `shutdown` fires, applying every notification received
    /// on `notifications` to the live route table.
    pub async fn serve(
        self,
        listener: TcpListener,
        notifications: mpsc::UnboundedReceiver<()>,
        shutdown: &Shutdown,
    ) -> Result<(), StartupError> {
        let reload = spawn_reload_task(
            self.proxy.clone(),
            self.source.clone(),
            notifications,
            shutdown.subscribe(),
        );

        let server = HttpServer::new(&self.config, self.proxy, self.policies);
        let served = server.run(listener, shutdown.subscribe()).await;

        // The server may also stop on its own; the reload task must follow.
        shutdown.trigger();
        if let Err(e) = reload.await {
            tracing::error!(error = %e, "Proxy reload task failed");
        }

        served.map_err(StartupError::from)
    }
}

/// Run the service described by the configuration file at `config_path`.
pub async fn run(config_path: &Path) -> Result<(), StartupError> {
    let config = load_config(config_path)?;
    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        bind_address = %config.server.bind_address,
        "portal-proxy starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let source = Arc::new(FileEndpointSource::new(config_path));
    let app = Application::build(config.clone(), source, Map::new())?;

    let (notifier, notifications) = mpsc::unbounded_channel();
    let _watcher = ConfigWatcher::new(config_path, notifier.clone()).run()?;

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_handler(shutdown.clone(), notifier);

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    app.serve(listener, notifications, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;
    use serde_json::json;

    fn source(path: &Path) -> Arc<dyn EndpointSource> {
        Arc::new(FileEndpointSource::new(path))
    }

    #[test]
    fn test_mount_follows_backend_base_url() {
        let config = parse_config(
            r#"
            [backend]
            base_url = "https://portal.example.com/internal"

            [proxy.endpoints]
            "/a" = "http://a"
            "#,
        )
        .unwrap();

        let app = Application::build(config, source(Path::new("unused.toml")), Map::new()).unwrap();
        assert_eq!(app.proxy().path_prefix(), "/internal/api/proxy");
        assert_eq!(app.proxy().table().len(), 1);
    }

    #[test]
    fn test_strict_startup_fails_on_invalid_route() {
        let config = parse_config(
            r#"
            [proxy.endpoints]
            "/bad" = { target = "not a url" }
            "#,
        )
        .unwrap();

        let result = Application::build(config, source(Path::new("unused.toml")), Map::new());
        assert!(matches!(result, Err(StartupError::Proxy(_))));
    }

    #[test]
    fn test_additional_endpoints_are_built() {
        let additional = json!({ "/extra": "http://extra" }).as_object().unwrap().clone();
        let app = Application::build(
            AppConfig::default(),
            source(Path::new("unused.toml")),
            additional,
        )
        .unwrap();
        assert_eq!(app.proxy().table().routes().collect::<Vec<_>>(), vec!["/extra"]);
    }
}
