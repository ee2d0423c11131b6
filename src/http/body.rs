//! Request bodies consumed before the proxy sees them.
//!
//! [`parse_request_body`] buffers JSON and form bodies, stores the parsed value
//! as [`ConsumedBody`] in the request extensions and leaves an empty body
//! behind. Proxy routes with body revival enabled re-serialize it upstream.

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// Largest body the parser will buffer.
pub const MAX_PARSED_BODY_BYTES: usize = 2 * 1024 * 1024;

/// A request body that was read and parsed by an earlier layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumedBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

impl ConsumedBody {
    /// Serialize the body back to the wire format it arrived in.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            ConsumedBody::Json(value) => Bytes::from(value.to_string()),
            ConsumedBody::Form(pairs) => Bytes::from(
                url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs)
                    .finish(),
            ),
        }
    }
}

/// Parse JSON and urlencoded bodies into [`ConsumedBody`].
pub async fn parse_request_body(req: Request<Body>, next: Next) -> Response {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase())
        .unwrap_or_default();

    let is_json = content_type.starts_with("application/json");
    let is_form = content_type.starts_with("application/x-www-form-urlencoded");
    if !is_json && !is_form {
        return next.run(req).await;
    }

    let (mut parts, body) = req.into_parts();
    let bytes = match to_bytes(body, MAX_PARSED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    if bytes.is_empty() {
        return next.run(Request::from_parts(parts, Body::empty())).await;
    }

    let consumed = if is_json {
        match serde_json::from_slice(&bytes) {
            Ok(value) => ConsumedBody::Json(value),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected malformed JSON body");
                return (StatusCode::BAD_REQUEST, "Malformed JSON body").into_response();
            }
        }
    } else {
        ConsumedBody::Form(url::form_urlencoded::parse(&bytes).into_owned().collect())
    };

    parts.extensions.insert(consumed);
    next.run(Request::from_parts(parts, Body::empty())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_round_trip_bytes() {
        let body = ConsumedBody::Json(json!({ "name": "proxy" }));
        assert_eq!(body.to_bytes(), Bytes::from_static(br#"{"name":"proxy"}"#));
    }

    #[test]
    fn test_form_encoding() {
        let body = ConsumedBody::Form(vec![
            ("a".to_string(), "1 2".to_string()),
            ("b".to_string(), "&".to_string()),
        ]);
        assert_eq!(body.to_bytes(), Bytes::from_static(b"a=1+2&b=%26"));
    }
}
