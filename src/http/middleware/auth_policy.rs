//! Credentials gate.
//! Rejects requests without credentials unless their route allows
//! unauthenticated access. Verifying the credentials is left to upstream
//! targets and to whatever sits in front of this service.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::routing::matcher::MountMatcher;
use crate::security::auth_policy::AuthPolicies;

/// State required for the credentials gate.
#[derive(Clone)]
pub struct CredentialsGateState {
    pub policies: Arc<AuthPolicies>,
    /// Proxy mount; registered policy paths are relative to it.
    pub mount: MountMatcher,
    pub enabled: bool,
}

pub async fn credentials_gate(
    State(state): State<CredentialsGateState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !state.enabled || req.headers().contains_key(header::AUTHORIZATION) {
        return next.run(req).await;
    }

    let path = req.uri().path();
    let relative = state.mount.strip(path).unwrap_or(path);
    if state.policies.allows_unauthenticated(relative) {
        return next.run(req).await;
    }

    tracing::debug!(path = %path, "Rejected request without credentials");
    (StatusCode::UNAUTHORIZED, "Missing credentials").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::auth_policy::{AuthPolicy, AuthPolicyAllow};
    use axum::{middleware, Router};
    use tower::ServiceExt;

    fn app(enabled: bool) -> Router {
        let policies = Arc::new(AuthPolicies::new());
        policies.replace(&[AuthPolicy {
            path: "/open".into(),
            allow: AuthPolicyAllow::Unauthenticated,
        }]);
        let state = CredentialsGateState {
            policies,
            mount: MountMatcher::new("/api/proxy"),
            enabled,
        };
        Router::new()
            .fallback(|| async { "ok" })
            .layer(middleware::from_fn_with_state(state, credentials_gate))
    }

    async fn status(app: Router, uri: &str, authorization: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_gate_disabled_passes_everything() {
        assert_eq!(status(app(false), "/api/proxy/closed", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_gate_enforces_registered_policies() {
        assert_eq!(status(app(true), "/api/proxy/closed", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status(app(true), "/api/proxy/open/x", None).await, StatusCode::OK);
        assert_eq!(
            status(app(true), "/api/proxy/closed", Some("Bearer t")).await,
            StatusCode::OK
        );
    }
}
