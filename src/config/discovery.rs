//! Service discovery for the proxy's own external URL.

use url::Url;

use crate::config::loader::ConfigError;

/// Resolves where a plugin is reachable from outside the backend.
pub trait Discovery: Send + Sync {
    fn external_base_url(&self, plugin_id: &str) -> Result<String, ConfigError>;
}

/// Discovery for a single-host deployment: every plugin lives under
/// `<base_url>/api/<plugin_id>`.
#[derive(Debug, Clone)]
pub struct HostDiscovery {
    base_url: String,
}

impl HostDiscovery {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Discovery for HostDiscovery {
    fn external_base_url(&self, plugin_id: &str) -> Result<String, ConfigError> {
        Ok(format!(
            "{}/api/{}",
            self.base_url.trim_end_matches('/'),
            plugin_id
        ))
    }
}

/// Path component of the plugin's external base URL, e.g. `/api/proxy`.
pub fn resolve_path_prefix(discovery: &dyn Discovery, plugin_id: &str) -> Result<String, ConfigError> {
    let external = discovery.external_base_url(plugin_id)?;
    let url = Url::parse(&external)
        .map_err(|e| ConfigError::Discovery(format!("invalid external URL '{}': {}", external, e)))?;
    Ok(url.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_prefix_from_base_url() {
        let discovery = HostDiscovery::new("http://localhost:7007/");
        assert_eq!(
            discovery.external_base_url("proxy").unwrap(),
            "http://localhost:7007/api/proxy"
        );
        assert_eq!(resolve_path_prefix(&discovery, "proxy").unwrap(), "/api/proxy");
    }

    #[test]
    fn test_base_url_with_path() {
        let discovery = HostDiscovery::new("https://portal.example.com/backend");
        assert_eq!(resolve_path_prefix(&discovery, "proxy").unwrap(), "/backend/api/proxy");
    }

    #[test]
    fn test_invalid_base_url() {
        let discovery = HostDiscovery::new("not a url");
        assert!(matches!(
            resolve_path_prefix(&discovery, "proxy"),
            Err(ConfigError::Discovery(_))
        ));
    }
}
