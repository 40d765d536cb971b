//! Driver that forwards resolution to a remote driver service over HTTP.

use std::any::Any;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

use crate::did::Did;
use crate::error::{DriverError, ERROR_INTERNAL, ERROR_NOT_FOUND};
use crate::types::{self, ResolutionOptions, ResolveResult};

use super::Driver;

/// Media types requested from the remote driver unless the caller asks for one
pub const DEFAULT_ACCEPT: &str =
    "application/ld+json;profile=\"https://w3id.org/did-resolution\", application/did+ld+json";

const DID_RESOLUTION_PROFILE: &str = "https://w3id.org/did-resolution";

/// Driver for a remote resolution service, selected by a DID pattern
#[derive(Debug, Clone)]
pub struct HttpDriver {
    client: Client,
    pattern: Regex,
    resolve_uri: String,
    properties_uri: Option<String>,
    test_identifiers: Vec<String>,
    traits: Map<String, Value>,
}

impl HttpDriver {
    /// Creates a driver for DIDs matching `pattern`, resolved at `resolve_uri`
    ///
    /// `$1` in `resolve_uri` is replaced by the identifier; without it the
    /// identifier is appended.
    pub fn new(pattern: Regex, resolve_uri: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            pattern,
            resolve_uri: resolve_uri.into(),
            properties_uri: None,
            test_identifiers: Vec::new(),
            traits: Map::new(),
        }
    }

    /// Uses `client` for every request, e.g. one with timeouts or a proxy
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Fetches remote properties from `properties_uri` and merges them over
    /// the driver's own
    pub fn with_properties_uri(mut self, properties_uri: impl Into<String>) -> Self {
        self.properties_uri = Some(properties_uri.into());
        self
    }

    /// Example DIDs reported by [`Driver::test_identifiers`]
    pub fn with_test_identifiers(mut self, test_identifiers: Vec<String>) -> Self {
        self.test_identifiers = test_identifiers;
        self
    }

    /// Traits reported by [`Driver::traits`]
    pub fn with_traits(mut self, traits: Map<String, Value>) -> Self {
        self.traits = traits;
        self
    }

    pub fn properties_uri(&self) -> Option<&str> {
        self.properties_uri.as_deref()
    }

    fn resolve_url(&self, identifier: &str) -> Result<Url, DriverError> {
        let uri = if self.resolve_uri.contains("$1") {
            self.resolve_uri.replace("$1", identifier)
        } else {
            format!("{}{}", self.resolve_uri, identifier)
        };

        Url::parse(&uri).map_err(DriverError::from)
    }
}

#[async_trait]
impl Driver for HttpDriver {
    async fn resolve(
        &self,
        did: &Did,
        options: &ResolutionOptions,
    ) -> Result<Option<ResolveResult>, DriverError> {
        let Some(captures) = self.pattern.captures(did.as_str()) else {
            debug!(did = %did, pattern = %self.pattern, "Pattern does not match");
            return Ok(None);
        };

        // First capture group, if any, is what the remote driver expects
        let identifier = captures.get(1).map_or(did.as_str(), |m| m.as_str());
        let url = self.resolve_url(identifier)?;
        debug!(did = %did, url = %url, "Requesting remote driver");

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, options.accept().unwrap_or(DEFAULT_ACCEPT))
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if !status.is_success() {
            return Err(backend_error(status, &body, &url));
        }

        let value: Value = serde_json::from_str(&body)?;
        let is_resolve_result = value.get("didDocument").is_some()
            || content_type
                .as_deref()
                .is_some_and(|ct| ct.contains(DID_RESOLUTION_PROFILE));

        let mut result = if is_resolve_result {
            serde_json::from_value::<ResolveResult>(value)?
        } else {
            ResolveResult::with_document(value)
        };

        if let Some(code) = metadata_error(&result.did_resolution_metadata) {
            return Err(DriverError::Backend {
                message: metadata_error_message(&result.did_resolution_metadata)
                    .unwrap_or_else(|| format!("Driver reported {code} for {did}")),
                code,
            });
        }

        if let Some(content_type) = content_type.filter(|_| !is_resolve_result) {
            result
                .did_resolution_metadata
                .entry(types::CONTENT_TYPE)
                .or_insert(Value::String(content_type));
        }

        Ok(Some(result))
    }

    async fn properties(&self) -> Result<Option<Map<String, Value>>, DriverError> {
        let mut http = Map::new();
        http.insert("resolveUri".into(), json!(self.resolve_uri));
        http.insert("propertiesUri".into(), json!(self.properties_uri));
        http.insert("pattern".into(), json!(self.pattern.as_str()));
        http.insert("testIdentifiers".into(), json!(self.test_identifiers));

        let mut properties = Map::new();
        properties.insert("http".into(), Value::Object(http));

        if let Some(properties_uri) = &self.properties_uri {
            debug!(url = %properties_uri, "Fetching remote driver properties");
            let remote: Value = self
                .client
                .get(properties_uri)
                .header(ACCEPT, "application/json")
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            if let Value::Object(remote) = remote {
                properties.extend(remote);
            }
        }

        Ok(Some(properties))
    }

    async fn traits(&self) -> Result<Option<Map<String, Value>>, DriverError> {
        Ok(Some(self.traits.clone()))
    }

    async fn test_identifiers(&self) -> Result<Option<Vec<String>>, DriverError> {
        Ok(Some(self.test_identifiers.clone()))
    }

    fn pattern(&self) -> Option<&Regex> {
        Some(&self.pattern)
    }

    fn resolve_uri(&self) -> Option<&str> {
        Some(&self.resolve_uri)
    }

    fn name(&self) -> &str {
        "HttpDriver"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn metadata_error(metadata: &Map<String, Value>) -> Option<String> {
    metadata
        .get(types::ERROR)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn metadata_error_message(metadata: &Map<String, Value>) -> Option<String> {
    metadata
        .get("errorMessage")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn backend_error(status: StatusCode, body: &str, url: &Url) -> DriverError {
    let metadata = serde_json::from_str::<ResolveResult>(body)
        .map(|r| r.did_resolution_metadata)
        .unwrap_or_default();

    let code = metadata_error(&metadata).unwrap_or_else(|| {
        if status == StatusCode::NOT_FOUND {
            ERROR_NOT_FOUND.to_string()
        } else {
            ERROR_INTERNAL.to_string()
        }
    });
    let message = metadata_error_message(&metadata)
        .unwrap_or_else(|| format!("HTTP {status} from {url}"));

    DriverError::Backend { code, message }
}
