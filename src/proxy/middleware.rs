//! Per-route proxy handler.
//!
//! # Request Flow
//! ```text
//! matched request
//!     → RouteFilter (strip disallowed headers, check allowed methods)
//!     → rewrite path onto target, set Host, add route headers
//!     → replay consumed body (optional)
//!     → upstream client
//!     → strip disallowed response headers
//!     → stream body back, ending it cleanly if the upstream closes
//! ```

use std::convert::Infallible;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    http::{header, request, HeaderValue, Method, Request, Response, StatusCode, Uri},
    response::IntoResponse,
};
use futures_util::{future, StreamExt};
use hyper::body::Incoming;
use tracing::Instrument;

use crate::http::body::ConsumedBody;
use crate::observability::metrics;
use crate::proxy::client::UpstreamClient;
use crate::proxy::error::{ProxyError, ProxyResult};
use crate::proxy::route::{NormalizedRoute, RouteConfig};
use crate::routing::rewrite::join_target_path;
use crate::security::auth_policy::{AuthPolicy, AuthPolicyAllow, AuthPolicyRegistry};
use crate::security::credentials::CredentialsPolicy;
use crate::security::headers::{Direction, HeaderAllowList};

/// Decides whether a route handles a request, named after the route so log
/// lines can say which filter rejected what.
#[derive(Debug, Clone)]
pub struct RouteFilter {
    name: String,
    allow_list: HeaderAllowList,
    allowed_methods: Option<Vec<Method>>,
}

impl RouteFilter {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Strip headers that may not be forwarded, then report whether the
    /// request's method is handled. Headers are stripped either way.
    pub fn apply(&self, parts: &mut request::Parts) -> bool {
        self.allow_list.strip(Direction::Request, &mut parts.headers);
        self.allowed_methods
            .as_ref()
            .map_or(true, |methods| methods.contains(&parts.method))
    }
}

/// Options shared by every route of one build.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardingOptions {
    /// Replay bodies that an earlier layer already consumed.
    pub revive_consumed_request_bodies: bool,
}

/// Installed handler for one proxy route.
#[derive(Debug)]
pub struct ProxyRoute {
    config: NormalizedRoute,
    allow_list: HeaderAllowList,
    filter: RouteFilter,
    forwarding: ForwardingOptions,
    client: UpstreamClient,
    upstream_authority: HeaderValue,
    upstream_base: String,
    span: tracing::Span,
}

impl ProxyRoute {
    /// Build the handler for `route`. Every validation error is raised here,
    /// never at request time.
    pub fn build(
        path_prefix: &str,
        route: &str,
        config: &RouteConfig,
        forwarding: ForwardingOptions,
        client: UpstreamClient,
        auth_policies: &dyn AuthPolicyRegistry,
    ) -> ProxyResult<Self> {
        let config = NormalizedRoute::normalize(path_prefix, route, config)?;

        let route_headers: Vec<&str> = config.headers.keys().map(|name| name.as_str()).collect();
        let allow_list = HeaderAllowList::new(
            route_headers.iter().copied(),
            config.allowed_headers.iter().map(String::as_str),
            config.credentials,
        );

        let authority = match config.target.port() {
            Some(port) => format!("{}:{}", config.target.host_str().unwrap_or_default(), port),
            None => config.target.host_str().unwrap_or_default().to_string(),
        };
        let upstream_authority = HeaderValue::from_str(&authority).map_err(|_| {
            ProxyError::invalid(
                route,
                format!("Proxy target for route \"{}\" has an invalid host: {}", route, authority),
            )
        })?;
        let upstream_base = format!("{}://{}", config.target.scheme(), authority);

        let filter = RouteFilter {
            name: route.to_string(),
            allow_list: allow_list.clone(),
            allowed_methods: config.allowed_methods.clone(),
        };

        let span = tracing::info_span!("proxy_route", route = %route, target = %config.target);

        match config.credentials {
            CredentialsPolicy::AllowUnauthenticated => {
                auth_policies.add_auth_policy(AuthPolicy {
                    path: route.to_string(),
                    allow: AuthPolicyAllow::Unauthenticated,
                });
            }
            CredentialsPolicy::Require | CredentialsPolicy::Forward => {}
        }

        Ok(Self {
            config,
            allow_list,
            filter,
            forwarding,
            client,
            upstream_authority,
            upstream_base,
            span,
        })
    }

    pub fn route(&self) -> &str {
        &self.config.route
    }

    pub fn config(&self) -> &NormalizedRoute {
        &self.config
    }

    pub fn allow_list(&self) -> &HeaderAllowList {
        &self.allow_list
    }

    pub fn filter(&self) -> &RouteFilter {
        &self.filter
    }

    /// Forward an already filtered request to the target.
    pub async fn forward(&self, parts: request::Parts, body: Body) -> Response<Body> {
        self.forward_inner(parts, body)
            .instrument(self.span.clone())
            .await
    }

    async fn forward_inner(&self, mut parts: request::Parts, body: Body) -> Response<Body> {
        let start = Instant::now();
        let method = parts.method.clone();
        let original = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .to_string();

        let rewritten = self.config.path_rewrite.apply(&original);
        let upstream_path = join_target_path(&self.config.target, &rewritten);
        let uri: Uri = match format!("{}{}", self.upstream_base, upstream_path).parse() {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(path = %upstream_path, error = %e, "Rewritten upstream URI is invalid");
                metrics::record_request(method.as_str(), 500, self.route(), start);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Invalid upstream path").into_response();
            }
        };

        let mut headers = std::mem::take(&mut parts.headers);
        if self.config.change_origin {
            headers.insert(header::HOST, self.upstream_authority.clone());
        }
        for (name, value) in self.config.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let body = match parts.extensions.get::<ConsumedBody>() {
            Some(consumed) if self.forwarding.revive_consumed_request_bodies => {
                let bytes = consumed.to_bytes();
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
                Body::from(bytes)
            }
            Some(_) => {
                // Nothing left to send; a stale length would stall the upstream.
                headers.remove(header::CONTENT_LENGTH);
                Body::empty()
            }
            None => body,
        };

        let mut request = Request::new(body);
        *request.method_mut() = method.clone();
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;

        tracing::debug!(
            method = %method,
            from = %original,
            to = %upstream_path,
            filter = %self.filter.name(),
            "Proxying request"
        );

        match self.client.request(request).await {
            Ok(response) => {
                let (mut parts, incoming) = response.into_parts();
                self.allow_list.strip(Direction::Response, &mut parts.headers);
                metrics::record_request(method.as_str(), parts.status.as_u16(), self.route(), start);
                Response::from_parts(parts, self.stream_body(incoming))
            }
            Err(source) => {
                let status = if source.is_connect() {
                    StatusCode::GATEWAY_TIMEOUT
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                let err = ProxyError::UpstreamForwardingFailure {
                    route: self.route().to_string(),
                    target: self.config.target.to_string(),
                    source,
                };
                tracing::error!(error = %err, status = %status, "Upstream request failed");
                metrics::record_request(method.as_str(), status.as_u16(), self.route(), start);
                (status, "Error occurred while trying to proxy request").into_response()
            }
        }
    }

    /// Stream the upstream body to the client. An upstream that closes the
    /// connection mid-stream ends the outgoing response instead of leaving it
    /// open.
    fn stream_body(&self, incoming: Incoming) -> Body {
        let route = self.config.route.clone();
        let stream = Body::new(incoming).into_data_stream().scan((), move |_, chunk| {
            let next = match chunk {
                Ok(bytes) => Some(Ok::<Bytes, Infallible>(bytes)),
                Err(e) => {
                    tracing::debug!(route = %route, error = %e, "Upstream closed stream, ending response");
                    None
                }
            };
            future::ready(next)
        });
        Body::from_stream(stream)
    }
}
