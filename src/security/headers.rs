//! Header allow-listing at the proxy boundary.
//!
//! # Responsibilities
//! - Compute the request-bound and response-bound header allow-lists for a route
//! - Strip every header that is not on the list for its direction
//!
//! # Design Decisions
//! - Names are compared lower-cased; `http::HeaderName` is already lower-case
//! - Lists are computed once per route build and never mutated afterwards
//! - Route `headers` are outbound additions, so they only widen the request list

use std::collections::BTreeSet;

use axum::http::HeaderMap;

use crate::security::credentials::CredentialsPolicy;

/// Headers that are always allowed to cross the proxy in both directions.
pub const SAFE_FORWARD_HEADERS: &[&str] = &[
    // CORS-safelisted request headers
    "cache-control",
    "content-language",
    "content-length",
    "content-type",
    "expires",
    "last-modified",
    "pragma",
    // Rewritten when `changeOrigin` is on; forwarded as-is when it is off.
    "host",
    "accept",
    "accept-language",
    "user-agent",
];

/// Direction a header travels through the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client → upstream target.
    Request,
    /// Upstream target → client.
    Response,
}

/// Compute the lower-cased set of header names allowed in `direction`.
pub fn compute_allow_list<'a>(
    direction: Direction,
    safe_defaults: &[&str],
    route_headers: impl IntoIterator<Item = &'a str>,
    allowed_headers: impl IntoIterator<Item = &'a str>,
    credentials: CredentialsPolicy,
) -> BTreeSet<String> {
    let mut allowed: BTreeSet<String> = safe_defaults
        .iter()
        .map(|h| h.to_ascii_lowercase())
        .collect();

    if direction == Direction::Request {
        allowed.extend(route_headers.into_iter().map(str::to_ascii_lowercase));
        if credentials == CredentialsPolicy::Forward {
            allowed.insert("authorization".to_string());
        }
    }

    allowed.extend(allowed_headers.into_iter().map(str::to_ascii_lowercase));
    allowed
}

/// Pair of allow-lists derived from one normalized route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderAllowList {
    request: BTreeSet<String>,
    response: BTreeSet<String>,
}

impl HeaderAllowList {
    pub fn new<'a>(
        route_headers: impl IntoIterator<Item = &'a str> + Clone,
        allowed_headers: impl IntoIterator<Item = &'a str> + Clone,
        credentials: CredentialsPolicy,
    ) -> Self {
        Self {
            request: compute_allow_list(
                Direction::Request,
                SAFE_FORWARD_HEADERS,
                route_headers.clone(),
                allowed_headers.clone(),
                credentials,
            ),
            response: compute_allow_list(
                Direction::Response,
                SAFE_FORWARD_HEADERS,
                route_headers,
                allowed_headers,
                credentials,
            ),
        }
    }

    pub fn request(&self) -> &BTreeSet<String> {
        &self.request
    }

    pub fn response(&self) -> &BTreeSet<String> {
        &self.response
    }

    pub fn allows(&self, direction: Direction, name: &str) -> bool {
        let list = match direction {
            Direction::Request => &self.request,
            Direction::Response => &self.response,
        };
        list.contains(&name.to_ascii_lowercase())
    }

    /// Remove every header not allowed in `direction`.
    pub fn strip(&self, direction: Direction, headers: &mut HeaderMap) {
        let rejected: Vec<_> = headers
            .keys()
            .filter(|name| !self.allows(direction, name.as_str()))
            .cloned()
            .collect();

        for name in rejected {
            headers.remove(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn allow_list(credentials: CredentialsPolicy) -> HeaderAllowList {
        HeaderAllowList::new(["X-Api-Key"], ["X-Custom"], credentials)
    }

    #[test]
    fn test_authorization_only_forwarded_with_forward_policy() {
        let forward = allow_list(CredentialsPolicy::Forward);
        assert!(forward.request().contains("authorization"));
        assert!(!forward.response().contains("authorization"));

        for policy in [CredentialsPolicy::Require, CredentialsPolicy::AllowUnauthenticated] {
            assert!(!allow_list(policy).request().contains("authorization"));
        }
    }

    #[test]
    fn test_route_headers_are_request_only() {
        let list = allow_list(CredentialsPolicy::Require);
        assert!(list.request().contains("x-api-key"));
        assert!(!list.response().contains("x-api-key"));
        assert!(list.request().contains("x-custom"));
        assert!(list.response().contains("x-custom"));
    }

    #[test]
    fn test_computation_is_deterministic() {
        assert_eq!(
            allow_list(CredentialsPolicy::Forward),
            allow_list(CredentialsPolicy::Forward)
        );
    }

    #[test]
    fn test_strip_response_headers() {
        let list = HeaderAllowList::new([], [], CredentialsPolicy::Require);
        let mut headers = HeaderMap::new();
        headers.insert("set-cookie", HeaderValue::from_static("x"));
        headers.insert("content-type", HeaderValue::from_static("text/plain"));

        list.strip(Direction::Response, &mut headers);

        assert!(headers.get("set-cookie").is_none());
        assert_eq!(headers.get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn test_allows_is_case_insensitive() {
        let list = allow_list(CredentialsPolicy::Require);
        assert!(list.allows(Direction::Request, "Content-Type"));
        assert!(list.allows(Direction::Response, "X-CUSTOM"));
    }
}
