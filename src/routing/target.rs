//! Upstream target validation.

use serde_json::Value;
use url::Url;

use crate::proxy::error::{ProxyError, ProxyResult};

/// Name of a JSON value's type as reported in configuration errors.
pub fn json_type_name(value: Option<&Value>) -> &'static str {
    match value {
        None | Some(Value::Null) => "undefined",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) | Some(Value::Object(_)) => "object",
    }
}

/// Validate that `target` is a string holding an absolute URL.
pub fn resolve_target(route: &str, target: Option<&Value>) -> ProxyResult<Url> {
    let Some(Value::String(raw)) = target else {
        return Err(ProxyError::invalid(
            route,
            format!(
                "Proxy target for route \"{}\" must be a string, but is of type {}",
                route,
                json_type_name(target)
            ),
        ));
    };

    let url = Url::parse(raw).map_err(|_| {
        ProxyError::invalid(
            route,
            format!("Proxy target for route \"{}\" is not a valid URL: {}", route, raw),
        )
    })?;

    if url.cannot_be_a_base() || !url.has_host() {
        return Err(ProxyError::invalid(
            route,
            format!("Proxy target for route \"{}\" is not a valid URL: {}", route, raw),
        ));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_target() {
        let url = resolve_target("/sample", Some(&json!("https://example.com/base"))).unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.path(), "/base");
    }

    #[test]
    fn test_non_string_target_names_type() {
        let err = resolve_target("/sample", Some(&json!(42))).unwrap_err();
        assert!(err.to_string().contains("must be a string, but is of type number"));

        let err = resolve_target("/sample", None).unwrap_err();
        assert!(err.to_string().contains("of type undefined"));
    }

    #[test]
    fn test_invalid_url_echoes_value() {
        let err = resolve_target("/sample", Some(&json!("not-a-url"))).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("not a valid URL: not-a-url"));
        assert_eq!(err.route(), "/sample");
    }

    #[test]
    fn test_url_without_host_is_rejected() {
        assert!(resolve_target("/m", Some(&json!("mailto:someone@example.com"))).is_err());
    }
}
