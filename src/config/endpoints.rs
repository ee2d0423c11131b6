//! Reading the proxy endpoint map out of configuration.
//!
//! Two locations are supported. `proxy.endpoints` is preferred; when it is
//! present the root-level `proxy."/route"` keys are ignored entirely. The two
//! are never merged.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::ProxySection;

/// Extract the endpoint map from the `[proxy]` section.
pub fn read_endpoints(proxy: &ProxySection) -> Map<String, Value> {
    if let Some(endpoints) = &proxy.endpoints {
        return endpoints.clone();
    }

    let legacy: Map<String, Value> = proxy
        .legacy
        .iter()
        .filter(|(key, _)| key.starts_with('/'))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if !legacy.is_empty() {
        tracing::warn!(
            "Configuring proxy endpoints in the root 'proxy' configuration is deprecated. \
             Move this configuration to 'proxy.endpoints' instead."
        );
    }

    legacy
}

/// Where the proxy re-reads its endpoints from on each change notification.
pub trait EndpointSource: Send + Sync {
    fn read_endpoints(&self) -> Result<Map<String, Value>, ConfigError>;
}

/// Reads endpoints from the service's configuration file.
#[derive(Debug, Clone)]
pub struct FileEndpointSource {
    path: PathBuf,
}

impl FileEndpointSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl EndpointSource for FileEndpointSource {
    fn read_endpoints(&self) -> Result<Map<String, Value>, ConfigError> {
        let config = load_config(&self.path)?;
        Ok(read_endpoints(&config.proxy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn section(value: Value) -> ProxySection {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_preferred_location_wins_without_merge() {
        let proxy = section(json!({
            "endpoints": { "/new": "http://new" },
            "/old": "http://old"
        }));
        let endpoints = read_endpoints(&proxy);
        assert_eq!(endpoints.keys().collect::<Vec<_>>(), vec!["/new"]);
    }

    #[test]
    fn test_deprecated_location_only_takes_route_keys() {
        let proxy = section(json!({
            "skipInvalidProxies": true,
            "/old": "http://old",
            "notARoute": "http://ignored"
        }));
        let endpoints = read_endpoints(&proxy);
        assert_eq!(endpoints.keys().collect::<Vec<_>>(), vec!["/old"]);
    }

    #[test]
    fn test_empty_preferred_location_still_wins() {
        let proxy = section(json!({ "endpoints": {}, "/old": "http://old" }));
        assert!(read_endpoints(&proxy).is_empty());
    }

    #[test]
    fn test_file_source_reads_endpoints() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "[proxy.endpoints]\n\"/a\" = \"http://a.example.com\"\n",
        )
        .unwrap();

        let endpoints = FileEndpointSource::new(file.path()).read_endpoints().unwrap();
        assert_eq!(endpoints["/a"], json!("http://a.example.com"));
    }
}
