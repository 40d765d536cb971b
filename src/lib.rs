//! A local DID resolver.
//!
//! [`LocalResolver`] turns a DID string into a [`ResolveResult`] by dispatching
//! to the first registered [`Driver`] that handles the DID's method, with
//! before- and after-resolve [`Extension`]s run around the dispatch. Drivers
//! and extensions are pluggable; an [`HttpDriver`] for remote driver services
//! and a JSON configuration format for wiring them are included.

pub mod config;
mod did;
pub mod driver;
mod error;
pub mod extension;
pub mod logging;
mod resolver;
pub mod types;

pub use config::{DriverConfig, ResolverConfig};
pub use did::{Did, DidUrl};
pub use driver::{Driver, HttpDriver};
pub use error::{ConfigError, DriverError, ExtensionError, ResolutionError};
pub use extension::{ExecutionState, Extension, ExtensionStage, ExtensionStatus, ResolverExtension};
pub use resolver::{CompletenessCheck, LocalResolver};
pub use types::{ResolutionOptions, ResolveResult};

/// Resolves a DID with drivers from the configuration file named by
/// `DID_RESOLVER_CONFIG` (default `config.json`)
///
/// # Example
/// ```no_run
/// use did_resolver_local::{resolve, ResolutionOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///     let result = resolve("did:example:123", &ResolutionOptions::new()).await?;
///
///     println!("Resolved DID Document: {:?}", result.did_document);
///     Ok(())
/// }
/// ```
pub async fn resolve(
    did: &str,
    options: &ResolutionOptions,
) -> Result<ResolveResult, Box<dyn std::error::Error + Send + Sync>> {
    let resolver = LocalResolver::from_config(&ResolverConfig::from_env()?)?;
    Ok(resolver.resolve(did, options).await?)
}
