//! The live proxy: current route table, rebuilds, and request dispatch.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::{Map, Value};

use crate::observability::metrics;
use crate::proxy::builder::RouteTableBuilder;
use crate::proxy::error::ProxyResult;
use crate::routing::matcher::MountMatcher;
use crate::routing::router::RouteTable;
use crate::security::auth_policy::AuthPolicies;

/// Result of applying a configuration notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The endpoint map has the same fingerprint as the live table.
    Unchanged,
    /// A new table was built and swapped in.
    Applied { routes: usize },
}

/// Deterministic serialization of an endpoint map, in configured order.
pub fn fingerprint(endpoints: &Map<String, Value>) -> String {
    // Serializing a `Map<String, Value>` cannot fail.
    serde_json::to_string(endpoints).unwrap_or_default()
}

/// Merge programmatic endpoints with configured ones; configured entries win.
pub fn merge_endpoints(
    additional: &Map<String, Value>,
    configured: Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = additional.clone();
    merged.extend(configured);
    merged
}

/// Proxy mounted at `path_prefix`, serving whichever table is current.
pub struct ProxyService {
    builder: RouteTableBuilder,
    mount: MountMatcher,
    additional_endpoints: Map<String, Value>,
    table: ArcSwap<RouteTable>,
    /// Exemptions of the live table, consulted by the credentials gate.
    auth_policies: Arc<AuthPolicies>,
    /// Fingerprint of the endpoint map behind `table`. Also serializes rebuilds.
    applied: Mutex<String>,
}

impl ProxyService {
    /// Build the initial table and install its exemptions into
    /// `auth_policies`. Fails under the same policy as a reload.
    pub fn new(
        builder: RouteTableBuilder,
        auth_policies: Arc<AuthPolicies>,
        additional_endpoints: Map<String, Value>,
        configured: Map<String, Value>,
    ) -> ProxyResult<Self> {
        let endpoints = merge_endpoints(&additional_endpoints, configured);
        let table = builder.build(&endpoints)?;
        auth_policies.replace(table.auth_policies());
        metrics::record_route_count(table.len());

        Ok(Self {
            mount: MountMatcher::new(builder.path_prefix()),
            builder,
            additional_endpoints,
            table: ArcSwap::from_pointee(table),
            auth_policies,
            applied: Mutex::new(fingerprint(&endpoints)),
        })
    }

    /// Snapshot of the current table.
    pub fn table(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    pub fn path_prefix(&self) -> &str {
        self.builder.path_prefix()
    }

    /// Rebuild from a freshly read endpoint map if it changed.
    ///
    /// On error the current table and its exemptions stay installed and the
    /// fingerprint is not advanced, so the same content is retried on the
    /// next notification.
    pub fn reload(&self, configured: Map<String, Value>) -> ProxyResult<ReloadOutcome> {
        let endpoints = merge_endpoints(&self.additional_endpoints, configured);
        let key = fingerprint(&endpoints);

        let mut applied = self.applied.lock().expect("proxy fingerprint mutex poisoned");
        if *applied == key {
            tracing::debug!("Proxy configuration unchanged, skipping rebuild");
            return Ok(ReloadOutcome::Unchanged);
        }

        let table = self.builder.build(&endpoints)?;
        let routes = table.len();
        self.auth_policies.replace(table.auth_policies());
        self.table.store(Arc::new(table));
        *applied = key;
        metrics::record_route_count(routes);

        tracing::info!(routes, "Proxy configuration reloaded");
        Ok(ReloadOutcome::Applied { routes })
    }

    /// Route a request through the current table.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let table = self.table.load_full();
        let (mut parts, body) = request.into_parts();
        let path = parts.uri.path().to_string();

        let Some(relative) = self.mount.strip(&path) else {
            tracing::debug!(path = %path, "Request outside proxy mount");
            return (StatusCode::NOT_FOUND, "Not found").into_response();
        };
        let relative = if relative.is_empty() { "/" } else { relative };

        match table.match_request(relative, &mut parts) {
            Some(route) => route.forward(parts, body).await,
            None => {
                tracing::debug!(path = %path, method = %parts.method, "No proxy route matched");
                (StatusCode::NOT_FOUND, "No matching proxy route").into_response()
            }
        }
    }

    /// Mountable handler serving every path through [`ProxyService::dispatch`].
    pub fn into_router(self: Arc<Self>) -> Router {
        Router::new().fallback(dispatch_handler).with_state(self)
    }
}

async fn dispatch_handler(State(service): State<Arc<ProxyService>>, request: Request<Body>) -> Response {
    service.dispatch(request).await
}
