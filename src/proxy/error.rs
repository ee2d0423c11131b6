//! Proxy error definitions.

use thiserror::Error;

/// Errors raised while building or serving proxy routes.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// A route's configuration cannot be turned into a working proxy.
    /// Always raised at build time, never per request.
    #[error("{reason}")]
    InvalidConfiguration { route: String, reason: String },

    /// Forwarding a single request upstream failed.
    #[error("failed to proxy request for route '{route}' to {target}: {source}")]
    UpstreamForwardingFailure {
        route: String,
        target: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },
}

impl ProxyError {
    pub fn invalid(route: impl Into<String>, reason: impl Into<String>) -> Self {
        ProxyError::InvalidConfiguration {
            route: route.into(),
            reason: reason.into(),
        }
    }

    /// The route this error concerns.
    pub fn route(&self) -> &str {
        match self {
            ProxyError::InvalidConfiguration { route, .. } => route,
            ProxyError::UpstreamForwardingFailure { route, .. } => route,
        }
    }
}

/// Result type for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration_display() {
        let err = ProxyError::invalid("/sample", "Proxy target is not a valid URL: nope");
        assert_eq!(err.to_string(), "Proxy target is not a valid URL: nope");
        assert_eq!(err.route(), "/sample");
    }
}
