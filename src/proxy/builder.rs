//! Route table construction.
//!
//! # Responsibilities
//! - Build one [`ProxyRoute`] per configured endpoint, in configured order
//! - Apply the skip-invalid policy to per-route failures
//! - Collect the authentication exemptions declared by the built routes
//!
//! # Design Decisions
//! - A build produces a new [`RouteTable`]; installed tables are never touched
//! - Strict mode aborts on the first failure so nothing is partially applied
//! - Exemptions travel with the table and take effect only when it is installed

use serde_json::{Map, Value};

use crate::proxy::client::UpstreamClient;
use crate::proxy::error::ProxyResult;
use crate::proxy::middleware::{ForwardingOptions, ProxyRoute};
use crate::proxy::route::RouteConfig;
use crate::routing::router::RouteTable;
use crate::security::auth_policy::{AuthPolicyBatch, AuthPolicyRegistry};

/// Settings read once at startup that shape every build.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Omit invalid routes with a warning instead of failing the build.
    pub skip_invalid_proxies: bool,
    pub forwarding: ForwardingOptions,
}

/// Builds route tables for one proxy mount.
#[derive(Clone)]
pub struct RouteTableBuilder {
    path_prefix: String,
    options: BuildOptions,
    client: UpstreamClient,
}

impl RouteTableBuilder {
    pub fn new(path_prefix: impl Into<String>, options: BuildOptions, client: UpstreamClient) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            options,
            client,
        }
    }

    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    /// Build a single route, registering its exemptions with `auth_policies`.
    pub fn build_route(
        &self,
        route: &str,
        value: &Value,
        auth_policies: &dyn AuthPolicyRegistry,
    ) -> ProxyResult<ProxyRoute> {
        let config = RouteConfig::from_value(route, value)?;
        ProxyRoute::build(
            &self.path_prefix,
            route,
            &config,
            self.options.forwarding,
            self.client.clone(),
            auth_policies,
        )
    }

    /// Build a table from the endpoint map.
    pub fn build(&self, endpoints: &Map<String, Value>) -> ProxyResult<RouteTable> {
        let mut table = RouteTable::new();
        let batch = AuthPolicyBatch::new();

        for (route, value) in endpoints {
            match self.build_route(route, value, &batch) {
                Ok(built) => table.push(built),
                Err(e) if self.options.skip_invalid_proxies => {
                    tracing::warn!(route = %route, "skipped configuring {} due to {}", route, e);
                }
                Err(e) => return Err(e),
            }
        }
        table.set_auth_policies(batch.into_policies());

        tracing::info!(
            path_prefix = %self.path_prefix,
            routes = table.len(),
            unauthenticated = table.auth_policies().len(),
            "Proxy route table built"
        );
        Ok(table)
    }
}
