//! DID and DID URL parsing.
//!
//! This module handles the parsing and validation of DIDs according to the
//! DID Core syntax, and the breakdown of DID URLs into their path, query and
//! fragment components.

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Map, Value};

use crate::error::ResolutionError;

const DID_SCHEME: &str = "did";

/// A parsed decentralized identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Did {
    method: String,
    method_specific_id: String,
    did_string: String,
}

impl Did {
    /// Parses and validates a DID string
    pub fn parse(did: &str) -> Result<Self, ResolutionError> {
        let rest = did
            .strip_prefix("did:")
            .ok_or_else(|| invalid(did, "missing `did:` scheme"))?;

        let (method, method_specific_id) = rest
            .split_once(':')
            .ok_or_else(|| invalid(did, "missing method-specific identifier"))?;

        if method.is_empty()
            || !method
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            return Err(invalid(did, "method name must be lowercase letters and digits"));
        }

        validate_method_specific_id(method_specific_id).map_err(|reason| invalid(did, reason))?;

        Ok(Self {
            method: method.to_string(),
            method_specific_id: method_specific_id.to_string(),
            did_string: did.to_string(),
        })
    }

    /// Always `did`
    pub fn scheme(&self) -> &str {
        DID_SCHEME
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn method_specific_id(&self) -> &str {
        &self.method_specific_id
    }

    /// The normalized string form
    pub fn as_str(&self) -> &str {
        &self.did_string
    }

    /// JSON breakdown of this DID, as attached to resolution metadata
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("didString".into(), json!(self.did_string));
        map.insert("methodName".into(), json!(self.method));
        map.insert("methodSpecificId".into(), json!(self.method_specific_id));
        map
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.did_string)
    }
}

impl FromStr for Did {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A DID plus optional path, query and fragment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DidUrl {
    did: Did,
    path: Option<String>,
    query: Option<String>,
    fragment: Option<String>,
}

impl DidUrl {
    /// Parses a DID URL string into its DID and path, query and fragment parts
    pub fn parse(did_url: &str) -> Result<Self, ResolutionError> {
        let (rest, fragment) = match did_url.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (did_url, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query.to_string())),
            None => (rest, None),
        };
        let (did, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], Some(rest[idx..].to_string())),
            None => (rest, None),
        };

        Ok(Self {
            did: Did::parse(did)?,
            path,
            query,
            fragment,
        })
    }

    pub fn did(&self) -> &Did {
        &self.did
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Query parameters as key/value pairs, in order of appearance
    pub fn parameters(&self) -> Vec<(String, String)> {
        let Some(query) = &self.query else {
            return Vec::new();
        };
        url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// JSON breakdown of this DID URL, as attached to resolution metadata
    pub fn to_map(&self) -> Map<String, Value> {
        let parameters: Map<String, Value> = self
            .parameters()
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();

        let mut map = Map::new();
        map.insert("didUrlString".into(), json!(self.to_string()));
        map.insert("did".into(), Value::Object(self.did.to_map()));
        map.insert("parameters".into(), Value::Object(parameters));
        map.insert("path".into(), json!(self.path));
        map.insert("query".into(), json!(self.query));
        map.insert("fragment".into(), json!(self.fragment));
        map
    }
}

impl From<Did> for DidUrl {
    fn from(did: Did) -> Self {
        Self {
            did,
            path: None,
            query: None,
            fragment: None,
        }
    }
}

impl fmt::Display for DidUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.did.as_str())?;
        if let Some(path) = &self.path {
            f.write_str(path)?;
        }
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

fn invalid(did: &str, reason: &str) -> ResolutionError {
    ResolutionError::InvalidDid(format!("{did}: {reason}"))
}

// method-specific-id = *( *idchar ":" ) 1*idchar
fn validate_method_specific_id(id: &str) -> Result<(), &'static str> {
    if id.is_empty() || id.ends_with(':') {
        return Err("method-specific identifier must not be empty or end with `:`");
    }

    let bytes = id.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3).ok_or("truncated percent-encoding")?;
                if !hex.iter().all(u8::is_ascii_hexdigit) {
                    return Err("invalid percent-encoding");
                }
                i += 3;
            }
            b if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b':') => i += 1,
            _ => return Err("invalid character in method-specific identifier"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_did_parsing() {
        let test_cases = vec![
            ("did:example:123", ("example", "123")),
            ("did:web:example.com%3A8080", ("web", "example.com%3A8080")),
            ("did:ion:test:EiClkZMDxPKqC9c-umQfTkR8", ("ion", "test:EiClkZMDxPKqC9c-umQfTkR8")),
            (
                "did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK",
                ("key", "z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK"),
            ),
        ];

        for (input, expected) in test_cases {
            let parsed = Did::parse(input).unwrap();
            assert_eq!(parsed.scheme(), "did");
            assert_eq!(parsed.method(), expected.0);
            assert_eq!(parsed.method_specific_id(), expected.1);
            assert_eq!(parsed.as_str(), input);
        }
    }

    #[test]
    fn test_invalid_did_format() {
        let invalid_dids = vec![
            "not-an-identifier",
            "did:",
            "did:example",
            "did:example:",
            "did:example:123:",
            "did:Example:123",
            "did::123",
            "did:example:12 3",
            "did:example:%zz",
            "did:example:abc%2",
            "urn:example:123",
        ];

        for did in invalid_dids {
            assert!(
                matches!(Did::parse(did), Err(ResolutionError::InvalidDid(_))),
                "{did} should be rejected"
            );
        }
    }

    #[test]
    fn test_did_equality_by_string_form() {
        assert_eq!(
            Did::parse("did:example:123").unwrap(),
            "did:example:123".parse::<Did>().unwrap()
        );
        assert_ne!(Did::parse("did:example:123").unwrap(), Did::parse("did:example:124").unwrap());
    }

    #[test]
    fn test_did_url_parsing() {
        let url = DidUrl::parse("did:example:123/path/to?service=files&versionId=2#key-1").unwrap();
        assert_eq!(url.did().as_str(), "did:example:123");
        assert_eq!(url.path(), Some("/path/to"));
        assert_eq!(url.query(), Some("service=files&versionId=2"));
        assert_eq!(url.fragment(), Some("key-1"));
        assert_eq!(
            url.parameters(),
            vec![
                ("service".to_string(), "files".to_string()),
                ("versionId".to_string(), "2".to_string())
            ]
        );
        assert_eq!(url.to_string(), "did:example:123/path/to?service=files&versionId=2#key-1");
    }

    #[test]
    fn test_did_url_from_did() {
        let did = Did::parse("did:example:123").unwrap();
        let url = DidUrl::from(did.clone());
        assert_eq!(url.did(), &did);
        assert_eq!(url.path(), None);
        assert_eq!(url.to_string(), "did:example:123");

        let map = url.to_map();
        assert_eq!(map["didUrlString"], "did:example:123");
        assert_eq!(map["did"]["methodName"], "example");
        assert!(map["fragment"].is_null());
    }
}
