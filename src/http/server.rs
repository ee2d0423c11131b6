//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Mount the proxy dispatcher as the application's fallback
//! - Wire up middleware (tracing, request ID, timeout, credentials, bodies)
//! - Bind to a listener and stop on the shutdown broadcast
//!
//! # Layer order (outermost first)
//! ```text
//! TraceLayer → SetRequestIdLayer → PropagateRequestIdLayer → TimeoutLayer → credentials_gate
//!     → parse_request_body (optional) → ProxyService::dispatch
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::schema::AppConfig;
use crate::http::body::parse_request_body;
use crate::http::middleware::{credentials_gate, CredentialsGateState};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::proxy::service::ProxyService;
use crate::routing::matcher::MountMatcher;
use crate::security::auth_policy::AuthPolicies;

/// HTTP server for the proxy mount.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &AppConfig, proxy: Arc<ProxyService>, policies: Arc<AuthPolicies>) -> Self {
        let gate = CredentialsGateState {
            policies,
            mount: MountMatcher::new(proxy.path_prefix()),
            enabled: config.auth.require_credentials,
        };

        let router = Self::build_router(config, proxy.into_router(), gate);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, proxy: Router, gate: CredentialsGateState) -> Router {
        let mut router = proxy;
        if config.server.parse_json_bodies {
            router = router.layer(middleware::from_fn(parse_request_body));
        }

        router
            .layer(middleware::from_fn_with_state(gate, credentials_gate))
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown broadcast fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
