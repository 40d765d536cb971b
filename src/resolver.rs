//! Core DID resolution functionality.
//!
//! This module provides [`LocalResolver`], which parses a DID, runs the
//! before-resolve extensions, dispatches to the first applicable driver, checks
//! that the result is complete, runs the after-resolve extensions and attaches
//! the final resolution metadata. Any failure aborts the call with a
//! [`ResolutionError`]; nothing accumulated up to that point is returned.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use indexmap::{IndexMap, IndexSet};
use serde_json::{json, Map, Value};
use tracing::{debug, info, info_span, warn, Instrument, Level};

use crate::config::ResolverConfig;
use crate::did::{Did, DidUrl};
use crate::driver::Driver;
use crate::error::{ConfigError, DriverError, ResolutionError};
use crate::extension::{
    ExecutionState, Extension, ExtensionStage, ExtensionStatus, ResolverExtension,
};
use crate::types::{
    ResolutionOptions, ResolveResult, DID, DID_URL, DRIVER_DURATION, DRIVER_URL, DURATION,
    PATTERN, RETRIEVED,
};

/// Predicate deciding whether a resolve result is a valid terminal success
pub type CompletenessCheck = Arc<dyn Fn(&ResolveResult) -> bool + Send + Sync>;

/// Progress of a resolution call, reported on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Parsed,
    BeforeResolve,
    Dispatched,
    DispatchSkipped,
    CompletenessChecked,
    AfterResolve,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsed => "parsed",
            Self::BeforeResolve => "beforeResolve",
            Self::Dispatched => "dispatched",
            Self::DispatchSkipped => "dispatchSkipped",
            Self::CompletenessChecked => "completenessChecked",
            Self::AfterResolve => "afterResolve",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Resolver that dispatches to locally registered drivers
///
/// Drivers are tried in registration order and the first one returning a
/// result wins. Configuration changes need `&mut self`, so they cannot
/// interleave with calls in flight.
pub struct LocalResolver {
    drivers: Vec<Arc<dyn Driver>>,
    extensions: Vec<ResolverExtension>,
    completeness_check: CompletenessCheck,
}

impl LocalResolver {
    /// Creates a resolver with the given drivers and no extensions
    pub fn new(drivers: Vec<Arc<dyn Driver>>) -> Self {
        Self {
            drivers,
            extensions: Vec::new(),
            completeness_check: Arc::new(ResolveResult::is_complete),
        }
    }

    /// Creates a resolver with the drivers described by `config`
    pub fn from_config(config: &ResolverConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.build_drivers()?))
    }

    /// Creates a resolver from a JSON configuration file
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_config(&ResolverConfig::from_file(path)?)
    }

    /// Appends an extension; extensions of a stage run in the order added
    pub fn with_extension(mut self, extension: ResolverExtension) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Replaces the completeness predicate, which by default requires a non-null document
    pub fn with_completeness_check(
        mut self,
        check: impl Fn(&ResolveResult) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.completeness_check = Arc::new(check);
        self
    }

    pub fn drivers(&self) -> &[Arc<dyn Driver>] {
        &self.drivers
    }

    pub fn set_drivers(&mut self, drivers: Vec<Arc<dyn Driver>>) {
        self.drivers = drivers;
    }

    /// Appends a driver, tried after every driver already registered
    pub fn add_driver(&mut self, driver: Arc<dyn Driver>) {
        self.drivers.push(driver);
    }

    /// First registered driver of concrete type `T`
    pub fn driver<T: Driver + 'static>(&self) -> Option<&T> {
        self.drivers
            .iter()
            .find_map(|driver| driver.as_any().downcast_ref::<T>())
    }

    pub fn extensions(&self) -> &[ResolverExtension] {
        &self.extensions
    }

    pub fn set_extensions(&mut self, extensions: Vec<ResolverExtension>) {
        self.extensions = extensions;
    }

    pub fn add_extension(&mut self, extension: ResolverExtension) {
        self.extensions.push(extension);
    }

    /// Resolves a DID
    ///
    /// # Example
    /// ```no_run
    /// use did_resolver_local::{LocalResolver, ResolutionOptions};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let resolver = LocalResolver::from_config_file("config.json")?;
    ///     let result = resolver
    ///         .resolve("did:example:123", &ResolutionOptions::new())
    ///         .await?;
    ///     println!("Resolved DID Document: {:?}", result.did_document);
    ///     Ok(())
    /// }
    /// ```
    pub async fn resolve(
        &self,
        did: &str,
        options: &ResolutionOptions,
    ) -> Result<ResolveResult, ResolutionError> {
        self.resolve_with_state(did, options, None).await
    }

    /// Resolves a DID, seeding the call's execution state with `initial_state`
    pub async fn resolve_with_state(
        &self,
        did: &str,
        options: &ResolutionOptions,
        initial_state: Option<ExecutionState>,
    ) -> Result<ResolveResult, ResolutionError> {
        let span = info_span!("resolve", did = %did);
        self.run(did, options, initial_state).instrument(span).await
    }

    async fn run(
        &self,
        did_string: &str,
        options: &ResolutionOptions,
        initial_state: Option<ExecutionState>,
    ) -> Result<ResolveResult, ResolutionError> {
        debug!(?options, "Resolving with options");
        self.ensure_drivers()?;

        let start = Instant::now();

        let mut state = ExecutionState::new();
        if let Some(initial_state) = initial_state {
            state.extend(initial_state);
        }
        let mut options = options.clone();
        let mut result = ResolveResult::new();
        let mut status = ExtensionStatus::DEFAULT;

        // parse

        let did = Did::parse(did_string).inspect_err(|e| warn!(error = %e, "Invalid DID"))?;
        let did_url = DidUrl::from(did.clone());
        debug!(stage = %Stage::Parsed, method = did.method(), "DID is valid");

        // [before resolve]

        self.execute_extensions(
            ExtensionStage::BeforeResolve,
            &did,
            &mut status,
            &mut options,
            &mut result,
            &mut state,
        )
        .await?;
        debug!(stage = %Stage::BeforeResolve, ?status, "Before-resolve extensions done");

        // [resolve] with drivers

        if status.skip_resolve() {
            debug!(stage = %Stage::DispatchSkipped, "Driver dispatch skipped by extension");
        } else {
            info!("Resolving DID with drivers");

            let driver_start = Instant::now();
            let driver_result = self.resolve_with_drivers(&did, &options).await?;
            result
                .did_resolution_metadata
                .insert(DRIVER_DURATION.into(), json!(elapsed_millis(driver_start)));

            let Some(driver_result) = driver_result else {
                info!(method = did.method(), "Method not supported");
                return Err(ResolutionError::MethodNotSupported(did.method().to_string()));
            };

            result.merge(driver_result);
            debug!(stage = %Stage::Dispatched, "Driver dispatch done");
        }

        // incomplete result?

        if !(self.completeness_check)(&result) {
            info!(stage = %Stage::CompletenessChecked, "Resolve result is incomplete");
            return Err(ResolutionError::NotFound(did.to_string()));
        }
        debug!(stage = %Stage::CompletenessChecked, "Resolve result is complete");

        // [after resolve]

        self.execute_extensions(
            ExtensionStage::AfterResolve,
            &did,
            &mut status,
            &mut options,
            &mut result,
            &mut state,
        )
        .await?;
        debug!(stage = %Stage::AfterResolve, ?status, "After-resolve extensions done");

        // additional metadata

        let metadata = &mut result.did_resolution_metadata;
        metadata.insert(DURATION.into(), json!(elapsed_millis(start)));
        metadata.insert(DID.into(), Value::Object(did.to_map()));
        metadata.insert(DID_URL.into(), Value::Object(did_url.to_map()));
        metadata.insert(
            RETRIEVED.into(),
            json!(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        info!(stage = %Stage::Done, duration_ms = elapsed_millis(start), "Resolved DID");
        Ok(result)
    }

    /// Tries each driver in registration order and returns the first result
    ///
    /// `Ok(None)` means no driver handles the DID. The winning result is
    /// enriched with the driver's pattern and backend address unless the driver
    /// already set those entries.
    pub async fn resolve_with_drivers(
        &self,
        did: &Did,
        options: &ResolutionOptions,
    ) -> Result<Option<ResolveResult>, ResolutionError> {
        for driver in &self.drivers {
            debug!(driver = driver.name(), "Attempting to resolve with driver");

            let driver_result = driver
                .resolve(did, options)
                .await
                .inspect_err(|e| warn!(driver = driver.name(), error = %e, "Driver failed"))?;

            let Some(mut driver_result) = driver_result else {
                continue;
            };

            let metadata = &mut driver_result.did_resolution_metadata;
            if let Some(pattern) = driver.pattern() {
                metadata
                    .entry(PATTERN)
                    .or_insert_with(|| json!(pattern.as_str()));
            }
            if let Some(resolve_uri) = driver.resolve_uri() {
                metadata
                    .entry(DRIVER_URL)
                    .or_insert_with(|| json!(resolve_uri));
            }

            debug!(driver = driver.name(), "Resolved with driver");
            return Ok(Some(driver_result));
        }

        Ok(None)
    }

    async fn execute_extensions(
        &self,
        stage: ExtensionStage,
        did: &Did,
        status: &mut ExtensionStatus,
        options: &mut ResolutionOptions,
        result: &mut ResolveResult,
        state: &mut ExecutionState,
    ) -> Result<(), ResolutionError> {
        let extensions: Vec<&Arc<dyn Extension>> = self
            .extensions
            .iter()
            .filter_map(|e| e.for_stage(stage))
            .collect();
        if extensions.is_empty() {
            return Ok(());
        }

        let mut executed = Vec::new();
        let mut skipped = Vec::new();
        let mut inapplicable = Vec::new();

        for extension in extensions {
            let name = extension.name();
            if status.skip(stage) {
                skipped.push(name);
                continue;
            }

            let snapshot = tracing::enabled!(Level::DEBUG)
                .then(|| (options.clone(), result.clone(), state.clone()));

            let returned = extension
                .apply(did, options, result, state, self)
                .await
                .map_err(|source| ResolutionError::Extension {
                    extension: name.to_string(),
                    stage,
                    source,
                })
                .inspect_err(|e| warn!(error = %e, "Extension failed"))?;

            let Some(returned) = returned else {
                inapplicable.push(name);
                continue;
            };
            *status |= returned;

            if let Some((before_options, before_result, before_state)) = snapshot {
                debug!(
                    %stage,
                    extension = name,
                    options_changed = before_options != *options,
                    result_changed = before_result != *result,
                    state_changed = before_state != *state,
                    "Executed extension"
                );
            }

            state.record_extension_stage(stage, name);
            executed.push(name);
        }

        debug!(%stage, ?executed, ?skipped, ?inapplicable, "Extensions finished");
        Ok(())
    }

    /// Properties of every driver, keyed by driver pattern or `driver-<index>`
    ///
    /// A driver that fails to report its properties gets an empty entry.
    pub async fn properties(
        &self,
    ) -> Result<IndexMap<String, Map<String, Value>>, ResolutionError> {
        self.ensure_drivers()?;

        let mut properties = IndexMap::new();
        for (index, driver) in self.drivers.iter().enumerate() {
            debug!(driver = driver.name(), "Loading properties for driver");
            let driver_properties =
                loaded_or_default(driver.as_ref(), "properties", driver.properties().await);
            properties.insert(driver_key(driver.as_ref(), index), driver_properties);
        }

        debug!(?properties, "Loaded properties");
        Ok(properties)
    }

    /// Traits of every driver, keyed like [`LocalResolver::properties`]
    pub async fn traits(&self) -> Result<IndexMap<String, Map<String, Value>>, ResolutionError> {
        self.ensure_drivers()?;

        let mut traits = IndexMap::new();
        for (index, driver) in self.drivers.iter().enumerate() {
            debug!(driver = driver.name(), "Loading traits for driver");
            let driver_traits =
                loaded_or_default(driver.as_ref(), "traits", driver.traits().await);
            traits.insert(driver_key(driver.as_ref(), index), driver_traits);
        }

        debug!(?traits, "Loaded traits");
        Ok(traits)
    }

    /// Methods the drivers can resolve, inferred from their test identifiers
    pub async fn methods(&self) -> Result<IndexSet<String>, ResolutionError> {
        let methods: IndexSet<String> = self.test_identifiers().await?.into_keys().collect();

        debug!(?methods, "Loaded methods");
        Ok(methods)
    }

    /// Test identifiers of every driver, grouped by DID method
    pub async fn test_identifiers(
        &self,
    ) -> Result<IndexMap<String, Vec<String>>, ResolutionError> {
        self.ensure_drivers()?;

        let mut test_identifiers: IndexMap<String, Vec<String>> = IndexMap::new();
        for driver in &self.drivers {
            debug!(driver = driver.name(), "Loading test identifiers for driver");

            let identifiers = loaded_or_default(
                driver.as_ref(),
                "test identifiers",
                driver.test_identifiers().await,
            );
            for identifier in identifiers {
                match DidUrl::parse(&identifier) {
                    Ok(url) => test_identifiers
                        .entry(url.did().method().to_string())
                        .or_default()
                        .push(identifier),
                    Err(e) => warn!(
                        driver = driver.name(),
                        %identifier,
                        error = %e,
                        "Skipping unparsable test identifier"
                    ),
                }
            }
        }

        debug!(?test_identifiers, "Loaded test identifiers");
        Ok(test_identifiers)
    }

    fn ensure_drivers(&self) -> Result<(), ResolutionError> {
        if self.drivers.is_empty() {
            return Err(ResolutionError::Misconfigured);
        }
        Ok(())
    }
}

impl Default for LocalResolver {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for LocalResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let drivers: Vec<&str> = self.drivers.iter().map(|d| d.name()).collect();
        f.debug_struct("LocalResolver")
            .field("drivers", &drivers)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

fn driver_key(driver: &dyn Driver, index: usize) -> String {
    driver
        .pattern()
        .map_or_else(|| format!("driver-{index}"), |p| p.as_str().to_string())
}

// Aggregations never fail on a single driver
fn loaded_or_default<T: Default>(
    driver: &dyn Driver,
    what: &str,
    loaded: Result<Option<T>, DriverError>,
) -> T {
    match loaded {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            warn!(driver = driver.name(), error = %e, "Cannot load driver {what}");
            T::default()
        }
    }
}

fn elapsed_millis(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
