//! Core types for DID resolution.
//!
//! This module provides the resolve result assembled by a resolution call and
//! the resolution options passed to drivers and extensions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resolution metadata key: total time spent in the call, in milliseconds
pub const DURATION: &str = "duration";
/// Resolution metadata key: time spent in driver dispatch, in milliseconds
pub const DRIVER_DURATION: &str = "driverDuration";
/// Resolution metadata key: pattern of the driver that resolved the DID
pub const PATTERN: &str = "pattern";
/// Resolution metadata key: backend address of the driver that resolved the DID
pub const DRIVER_URL: &str = "driverUrl";
/// Resolution metadata key: breakdown of the resolved DID
pub const DID: &str = "did";
/// Resolution metadata key: breakdown of the resolved DID URL
pub const DID_URL: &str = "didUrl";
/// Resolution metadata key: when the result was assembled
pub const RETRIEVED: &str = "retrieved";
/// Resolution metadata key: media type of the document
pub const CONTENT_TYPE: &str = "contentType";
/// Resolution metadata key: error code reported by a backend
pub const ERROR: &str = "error";

/// The result of a resolution call: a document plus resolution and document metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResult {
    /// The resolved DID document, opaque to the resolver
    #[serde(default)]
    pub did_document: Option<Value>,

    /// Facts about the resolution process
    #[serde(default)]
    pub did_resolution_metadata: Map<String, Value>,

    /// Facts about the document content
    #[serde(default)]
    pub did_document_metadata: Map<String, Value>,
}

impl ResolveResult {
    /// Creates an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a result carrying only a document
    pub fn with_document(document: Value) -> Self {
        Self {
            did_document: Some(document),
            ..Self::default()
        }
    }

    /// Default completeness rule: a document is present and not `null`
    pub fn is_complete(&self) -> bool {
        matches!(&self.did_document, Some(doc) if !doc.is_null())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.did_resolution_metadata
            .get(CONTENT_TYPE)
            .and_then(Value::as_str)
    }

    /// Merges another result into this one; the document is replaced and metadata
    /// entries of `other` take precedence
    pub fn merge(&mut self, other: ResolveResult) {
        self.did_document = other.did_document;
        self.did_resolution_metadata.extend(other.did_resolution_metadata);
        self.did_document_metadata.extend(other.did_document_metadata);
    }
}

/// Options for DID resolution, passed unchanged to drivers and extensions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionOptions(Map<String, Value>);

impl ResolutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns these options with `name` set to `value`
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// The requested media type, if any
    pub fn accept(&self) -> Option<&str> {
        self.get("accept").and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for ResolutionOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completeness() {
        assert!(!ResolveResult::new().is_complete());
        assert!(!ResolveResult::with_document(Value::Null).is_complete());
        assert!(ResolveResult::with_document(json!({"id": "did:example:123"})).is_complete());
    }

    #[test]
    fn test_merge_replaces_document_and_extends_metadata() {
        let mut result = ResolveResult::with_document(json!({"id": "old"}));
        result.did_resolution_metadata.insert(DRIVER_DURATION.into(), json!(3));
        result.did_resolution_metadata.insert(CONTENT_TYPE.into(), json!("application/did+json"));

        let mut other = ResolveResult::with_document(json!({"id": "new"}));
        other.did_resolution_metadata.insert(CONTENT_TYPE.into(), json!("application/did+ld+json"));
        other.did_document_metadata.insert("versionId".into(), json!("2"));

        result.merge(other);
        assert_eq!(result.did_document, Some(json!({"id": "new"})));
        assert_eq!(result.did_resolution_metadata[DRIVER_DURATION], 3);
        assert_eq!(result.content_type(), Some("application/did+ld+json"));
        assert_eq!(result.did_document_metadata["versionId"], "2");
    }

    #[test]
    fn test_serialized_shape() {
        let result = ResolveResult::with_document(json!({"id": "did:example:123"}));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["didDocument"]["id"], "did:example:123");
        assert!(value["didResolutionMetadata"].is_object());
        assert!(value["didDocumentMetadata"].is_object());
    }

    #[test]
    fn test_options() {
        let options = ResolutionOptions::new().with("accept", "application/did+json");
        assert_eq!(options.accept(), Some("application/did+json"));
        assert!(ResolutionOptions::new().is_empty());
    }
}
