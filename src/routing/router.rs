//! Route table and dispatch.
//!
//! # Responsibilities
//! - Store the routes of one build in configured order
//! - Find the route that handles a request
//!
//! # Design Decisions
//! - Immutable after construction; a rebuild produces a new table
//! - First match wins: mount path matches and the route filter accepts
//! - A route whose filter rejects the request falls through to later routes

use std::sync::Arc;

use axum::http::request;

use crate::proxy::middleware::ProxyRoute;
use crate::routing::matcher::MountMatcher;
use crate::security::auth_policy::AuthPolicy;

/// One installed route.
#[derive(Debug)]
pub struct RouteEntry {
    matcher: MountMatcher,
    route: Arc<ProxyRoute>,
}

/// A complete, immutable generation of installed routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    /// Exemptions registered by the routes of this generation.
    auth_policies: Vec<AuthPolicy>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route; it is consulted after every route added before it.
    pub fn push(&mut self, route: ProxyRoute) {
        self.entries.push(RouteEntry {
            matcher: MountMatcher::new(route.route()),
            route: Arc::new(route),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Route paths in dispatch order.
    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.route.route())
    }

    pub fn set_auth_policies(&mut self, policies: Vec<AuthPolicy>) {
        self.auth_policies = policies;
    }

    pub fn auth_policies(&self) -> &[AuthPolicy] {
        &self.auth_policies
    }

    /// Find the route handling a request whose path below the proxy mount is
    /// `path`. Each consulted route's filter runs on `parts`.
    pub fn match_request(&self, path: &str, parts: &mut request::Parts) -> Option<Arc<ProxyRoute>> {
        for entry in &self.entries {
            if !entry.matcher.matches(path) {
                continue;
            }
            if entry.route.filter().apply(parts) {
                return Some(entry.route.clone());
            }
            tracing::debug!(
                filter = %entry.route.filter().name(),
                method = %parts.method,
                "Route filter rejected request"
            );
        }
        None
    }
}
