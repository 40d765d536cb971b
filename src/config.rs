//! Resolver configuration.
//!
//! Drivers are described in a JSON file of the form
//!
//! ```json
//! {
//!   "drivers": [
//!     {
//!       "pattern": "^(did:example:.+)$",
//!       "url": "http://driver-example:8080/1.0/identifiers/",
//!       "propertiesEndpoint": "true",
//!       "testIdentifiers": ["did:example:123"],
//!       "traits": { "updatable": false }
//!     }
//!   ]
//! }
//! ```
//!
//! Every entry becomes an [`HttpDriver`], in file order.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::driver::{Driver, HttpDriver};
use crate::error::ConfigError;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "DID_RESOLVER_CONFIG";
/// Configuration file used when [`CONFIG_ENV_VAR`] is unset
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub drivers: Vec<DriverConfig>,
}

/// One remote driver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverConfig {
    /// Regular expression selecting the DIDs this driver handles
    #[serde(default)]
    pub pattern: String,

    /// Resolution endpoint; `$1` is replaced by the identifier
    #[serde(default)]
    pub url: String,

    /// Whether the driver serves its properties at `<url>properties`
    #[serde(default, deserialize_with = "bool_or_string")]
    pub properties_endpoint: bool,

    #[serde(default)]
    pub test_identifiers: Vec<String>,

    #[serde(default)]
    pub traits: Map<String, Value>,
}

impl ResolverConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading resolver configuration");

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json_str(&content)
    }

    /// Loads the file named by `DID_RESOLVER_CONFIG`, or `config.json`
    pub fn from_env() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_file(path)
    }

    /// Builds the configured drivers, in order
    pub fn build_drivers(&self) -> Result<Vec<Arc<dyn Driver>>, ConfigError> {
        self.drivers
            .iter()
            .enumerate()
            .map(|(index, config)| {
                let driver: Arc<dyn Driver> = Arc::new(config.build(index)?);
                Ok(driver)
            })
            .collect()
    }
}

impl DriverConfig {
    fn build(&self, index: usize) -> Result<HttpDriver, ConfigError> {
        if self.pattern.is_empty() {
            return Err(ConfigError::MissingField { index, field: "pattern" });
        }
        if self.url.is_empty() {
            return Err(ConfigError::MissingField { index, field: "url" });
        }

        let mut driver = HttpDriver::new(Regex::new(&self.pattern)?, &self.url)
            .with_test_identifiers(self.test_identifiers.clone())
            .with_traits(self.traits.clone());

        if self.properties_endpoint {
            driver = driver.with_properties_uri(self.properties_uri());
        }

        debug!(pattern = %self.pattern, url = %self.url, "Configured HTTP driver");
        Ok(driver)
    }

    fn properties_uri(&self) -> String {
        if self.url.ends_with('/') {
            format!("{}properties", self.url)
        } else {
            format!("{}/properties", self.url)
        }
    }
}

fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        String(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::String(s) => s.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("expected `true` or `false`, got `{s}`"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "drivers": [
            {
                "pattern": "^(did:example:.+)$",
                "url": "http://driver-example:8080/1.0/identifiers/",
                "propertiesEndpoint": "true",
                "testIdentifiers": ["did:example:123"],
                "traits": {"updatable": false},
                "image": "example/driver"
            },
            {
                "pattern": "^(did:web:.+)$",
                "url": "http://driver-web:8080/resolve?did=$1",
                "propertiesEndpoint": false
            }
        ]
    }"#;

    #[test]
    fn test_parse_config() {
        let config = ResolverConfig::from_json_str(CONFIG).unwrap();
        assert_eq!(config.drivers.len(), 2);

        let first = &config.drivers[0];
        assert!(first.properties_endpoint);
        assert_eq!(first.test_identifiers, vec!["did:example:123"]);
        assert_eq!(first.traits["updatable"], false);
        assert_eq!(first.properties_uri(), "http://driver-example:8080/1.0/identifiers/properties");

        let second = &config.drivers[1];
        assert!(!second.properties_endpoint);
        assert!(second.test_identifiers.is_empty());
    }

    #[test]
    fn test_build_drivers() {
        let drivers = ResolverConfig::from_json_str(CONFIG)
            .unwrap()
            .build_drivers()
            .unwrap();

        assert_eq!(drivers.len(), 2);
        assert_eq!(drivers[0].pattern().unwrap().as_str(), "^(did:example:.+)$");
        assert_eq!(drivers[1].resolve_uri(), Some("http://driver-web:8080/resolve?did=$1"));
    }

    #[test]
    fn test_invalid_pattern() {
        let config = ResolverConfig::from_json_str(
            r#"{"drivers": [{"pattern": "^(did:example", "url": "http://localhost/"}]}"#,
        )
        .unwrap();
        assert!(matches!(config.build_drivers(), Err(ConfigError::Pattern(_))));
    }

    #[test]
    fn test_missing_url() {
        let config =
            ResolverConfig::from_json_str(r#"{"drivers": [{"pattern": "^did:example:.+$"}]}"#)
                .unwrap();
        assert!(matches!(
            config.build_drivers(),
            Err(ConfigError::MissingField { index: 0, field: "url" })
        ));
    }

    #[test]
    fn test_invalid_properties_endpoint_flag() {
        let result = ResolverConfig::from_json_str(
            r#"{"drivers": [{"pattern": "x", "url": "y", "propertiesEndpoint": "yes"}]}"#,
        );
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ResolverConfig::from_file("/nonexistent/config.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
