//! Resolution drivers.
//!
//! A driver is a pluggable backend that resolves DIDs of one or more methods.
//! Drivers declare applicability themselves: [`Driver::resolve`] returns
//! `Ok(None)` for DIDs the driver does not handle, which is distinct from a
//! hard failure (`Err`).

mod http;

pub use http::HttpDriver;

use std::any::Any;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};

use crate::did::Did;
use crate::error::DriverError;
use crate::types::{ResolutionOptions, ResolveResult};

/// A pluggable resolution backend
#[async_trait]
pub trait Driver: Send + Sync {
    /// Resolves a DID
    ///
    /// Returns `Ok(Some(_))` on success, `Ok(None)` when this driver does not
    /// handle the DID, and `Err(_)` when it does but resolution failed.
    async fn resolve(
        &self,
        did: &Did,
        options: &ResolutionOptions,
    ) -> Result<Option<ResolveResult>, DriverError>;

    /// Self-reported driver properties
    async fn properties(&self) -> Result<Option<Map<String, Value>>, DriverError> {
        Ok(None)
    }

    /// Self-reported driver traits
    async fn traits(&self) -> Result<Option<Map<String, Value>>, DriverError> {
        Ok(None)
    }

    /// Example DIDs this driver can resolve
    async fn test_identifiers(&self) -> Result<Option<Vec<String>>, DriverError> {
        Ok(None)
    }

    /// Pattern the driver matches DIDs against, if it declares one
    fn pattern(&self) -> Option<&Regex> {
        None
    }

    /// Address of the backend the driver talks to, if any
    fn resolve_uri(&self) -> Option<&str> {
        None
    }

    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// The driver as [`Any`], for downcasting to its concrete type
    fn as_any(&self) -> &dyn Any;
}
