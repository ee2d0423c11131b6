//! Per-route configuration and its normalized form.
//!
//! Normalization is a pure function of the raw configuration: it validates and
//! defaults every field and returns a new [`NormalizedRoute`]. The caller's
//! configuration value is never modified.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::proxy::error::{ProxyError, ProxyResult};
use crate::routing::rewrite::PathRewrite;
use crate::routing::target::resolve_target;
use crate::security::credentials::CredentialsPolicy;

/// Structured form of a route entry. Field names follow the configuration
/// file (`pathRewrite`, `changeOrigin`, ...).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOptions {
    /// Kept untyped so a non-string target can be reported by its type.
    #[serde(default)]
    pub target: Option<Value>,
    #[serde(default)]
    pub credentials: Option<String>,
    #[serde(default)]
    pub path_rewrite: Option<Map<String, Value>>,
    #[serde(default)]
    pub change_origin: Option<bool>,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub allowed_headers: Option<Vec<String>>,
    #[serde(default)]
    pub allowed_methods: Option<Vec<String>>,
}

/// One entry of the endpoint map: a bare target URL or structured options.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteConfig {
    Target(String),
    Options(RouteOptions),
}

impl RouteConfig {
    /// Interpret a raw endpoint value.
    pub fn from_value(route: &str, value: &Value) -> ProxyResult<Self> {
        match value {
            Value::String(target) => Ok(RouteConfig::Target(target.clone())),
            Value::Object(_) => serde_json::from_value(value.clone())
                .map(RouteConfig::Options)
                .map_err(|e| {
                    ProxyError::invalid(
                        route,
                        format!("Invalid proxy configuration for route '{}': {}", route, e),
                    )
                }),
            other => Ok(RouteConfig::Options(RouteOptions {
                target: Some(other.clone()),
                ..RouteOptions::default()
            })),
        }
    }
}

/// A fully validated route, ready to be turned into a handler.
#[derive(Debug, Clone)]
pub struct NormalizedRoute {
    pub route: String,
    pub target: Url,
    pub credentials: CredentialsPolicy,
    pub path_rewrite: PathRewrite,
    pub change_origin: bool,
    /// Headers added to every outgoing request.
    pub headers: HeaderMap,
    pub allowed_headers: Vec<String>,
    /// `None` means every method is handled.
    pub allowed_methods: Option<Vec<Method>>,
}

impl NormalizedRoute {
    /// Validate and default a raw route configuration.
    pub fn normalize(path_prefix: &str, route: &str, config: &RouteConfig) -> ProxyResult<Self> {
        let options = match config {
            RouteConfig::Target(target) => RouteOptions {
                target: Some(Value::String(target.clone())),
                ..RouteOptions::default()
            },
            RouteConfig::Options(options) => options.clone(),
        };

        let credentials = match options.credentials.as_deref() {
            None => CredentialsPolicy::default(),
            Some(raw) => raw.parse().map_err(|_| {
                ProxyError::invalid(
                    route,
                    format!(
                        "Unknown credentials policy '{}' for proxy route '{}'; expected one of {}",
                        raw,
                        route,
                        CredentialsPolicy::expected_values()
                    ),
                )
            })?,
        };

        let target = resolve_target(route, options.target.as_ref())?;

        let path_rewrite = match &options.path_rewrite {
            Some(rules) => PathRewrite::configured(route, rules)?,
            None => PathRewrite::derived(route, path_prefix)?,
        };

        let headers = parse_headers(route, options.headers.as_ref())?;
        let allowed_methods = options
            .allowed_methods
            .as_ref()
            .map(|methods| parse_methods(route, methods))
            .transpose()?;

        Ok(Self {
            route: route.to_string(),
            target,
            credentials,
            path_rewrite,
            change_origin: options.change_origin.unwrap_or(true),
            headers,
            allowed_headers: options.allowed_headers.unwrap_or_default(),
            allowed_methods,
        })
    }
}

fn parse_headers(route: &str, headers: Option<&BTreeMap<String, String>>) -> ProxyResult<HeaderMap> {
    let mut parsed = HeaderMap::new();
    for (name, value) in headers.into_iter().flatten() {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ProxyError::invalid(
                route,
                format!("Invalid header name '{}' for proxy route '{}'", name, route),
            )
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            ProxyError::invalid(
                route,
                format!("Invalid value for header '{}' on proxy route '{}'", name, route),
            )
        })?;
        parsed.insert(header_name, header_value);
    }
    Ok(parsed)
}

fn parse_methods(route: &str, methods: &[String]) -> ProxyResult<Vec<Method>> {
    methods
        .iter()
        .map(|m| {
            Method::from_bytes(m.to_ascii_uppercase().as_bytes()).map_err(|_| {
                ProxyError::invalid(
                    route,
                    format!("Invalid HTTP method '{}' for proxy route '{}'", m, route),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: Value) -> ProxyResult<NormalizedRoute> {
        let config = RouteConfig::from_value("/sample", &value)?;
        NormalizedRoute::normalize("/api/proxy", "/sample", &config)
    }

    #[test]
    fn test_bare_target_gets_defaults() {
        let route = normalize(json!("http://upstream:3000")).unwrap();
        assert_eq!(route.credentials, CredentialsPolicy::Require);
        assert!(route.change_origin);
        assert!(route.allowed_methods.is_none());
        assert_eq!(route.path_rewrite.rules().len(), 1);
        assert_eq!(route.path_rewrite.apply("/api/proxy/sample/x"), "/x");
    }

    #[test]
    fn test_structured_options() {
        let route = normalize(json!({
            "target": "http://upstream:3000",
            "credentials": "forward",
            "changeOrigin": false,
            "pathRewrite": { "^/api/proxy/sample": "/v2" },
            "headers": { "X-Api-Key": "secret" },
            "allowedHeaders": ["X-Trace"],
            "allowedMethods": ["get", "POST"]
        }))
        .unwrap();

        assert_eq!(route.credentials, CredentialsPolicy::Forward);
        assert!(!route.change_origin);
        assert_eq!(route.path_rewrite.apply("/api/proxy/sample/x"), "/v2/x");
        assert_eq!(route.headers.get("x-api-key").unwrap(), "secret");
        assert_eq!(route.allowed_headers, vec!["X-Trace".to_string()]);
        assert_eq!(route.allowed_methods, Some(vec![Method::GET, Method::POST]));
    }

    #[test]
    fn test_unknown_credentials_policy_lists_valid_values() {
        let err = normalize(json!({ "target": "http://upstream", "credentials": "maybe" })).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'maybe'"));
        assert!(message.contains("'/sample'"));
        assert!(message.contains("'require', 'forward', 'dangerously-allow-unauthenticated'"));
    }

    #[test]
    fn test_target_errors() {
        assert!(normalize(json!({ "target": 7 }))
            .unwrap_err()
            .to_string()
            .contains("of type number"));
        assert!(normalize(json!({}))
            .unwrap_err()
            .to_string()
            .contains("of type undefined"));
        assert!(normalize(json!("not-a-url"))
            .unwrap_err()
            .to_string()
            .contains("not-a-url"));
    }

    #[test]
    fn test_normalize_does_not_touch_input() {
        let config = RouteConfig::from_value("/sample", &json!({ "target": "http://upstream" })).unwrap();
        let before = config.clone();
        NormalizedRoute::normalize("/api/proxy", "/sample", &config).unwrap();
        assert_eq!(config, before);
    }
}
