//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Discovery error: {0}")]
    Discovery(String),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            [server]
            bind_address = "127.0.0.1:7007"

            [backend]
            base_url = "http://localhost:7007"

            [proxy]
            skipInvalidProxies = true
            reviveConsumedRequestBodies = true

            [proxy.endpoints]
            "/simple" = "http://simple.example.com"

            [proxy.endpoints."/detailed"]
            target = "https://detailed.example.com"
            credentials = "forward"
            allowedMethods = ["GET"]
            headers = { "X-Api-Key" = "secret" }
            "#,
        )
        .unwrap();

        assert!(config.proxy.skip_invalid_proxies);
        assert!(config.proxy.revive_consumed_request_bodies);
        let endpoints = config.proxy.endpoints.unwrap();
        assert_eq!(endpoints.keys().collect::<Vec<_>>(), vec!["/simple", "/detailed"]);
        assert_eq!(endpoints["/simple"], json!("http://simple.example.com"));
        assert_eq!(endpoints["/detailed"]["credentials"], json!("forward"));
    }

    #[test]
    fn test_legacy_keys_are_collected() {
        let config = parse_config(
            r#"
            [proxy]
            "/legacy" = "http://legacy.example.com"
            "#,
        )
        .unwrap();

        assert!(config.proxy.endpoints.is_none());
        assert_eq!(config.proxy.legacy["/legacy"], json!("http://legacy.example.com"));
    }

    #[test]
    fn test_invalid_config_reports_validation() {
        let err = parse_config("[server]\nbind_address = \"nope\"").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("server.bind_address"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
