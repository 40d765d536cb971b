//! Resolver extensions.
//!
//! Extensions are hooks run before and after driver dispatch. Each one is
//! registered for exactly one [`ExtensionStage`] by wrapping it in the matching
//! [`ResolverExtension`] variant. Within a stage, extensions run in registration
//! order and may read or change the resolution options, the in-flight
//! [`ResolveResult`] and the call's [`ExecutionState`]. The [`ExtensionStatus`]
//! they return tells the resolver which remaining work to skip.

mod state;
mod status;

pub use state::ExecutionState;
pub use status::ExtensionStatus;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::did::Did;
use crate::error::ExtensionError;
use crate::resolver::LocalResolver;
use crate::types::{ResolutionOptions, ResolveResult};

/// Point in a resolution call at which an extension runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionStage {
    BeforeResolve,
    AfterResolve,
}

impl ExtensionStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeResolve => "beforeResolve",
            Self::AfterResolve => "afterResolve",
        }
    }
}

impl fmt::Display for ExtensionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolution hook
#[async_trait]
pub trait Extension: Send + Sync {
    /// Runs the hook
    ///
    /// `options` is the call's own copy of the resolution options; changes are
    /// seen by dispatch and by later extensions of the same call. Returns
    /// `Ok(None)` when the extension does not apply to this request.
    async fn apply(
        &self,
        did: &Did,
        options: &mut ResolutionOptions,
        result: &mut ResolveResult,
        state: &mut ExecutionState,
        resolver: &LocalResolver,
    ) -> Result<Option<ExtensionStatus>, ExtensionError>;

    /// Name used in logs and in the execution state audit trail
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// An extension tagged with the stage it runs at
#[derive(Clone)]
pub enum ResolverExtension {
    BeforeResolve(Arc<dyn Extension>),
    AfterResolve(Arc<dyn Extension>),
}

impl ResolverExtension {
    pub fn before_resolve(extension: impl Extension + 'static) -> Self {
        Self::BeforeResolve(Arc::new(extension))
    }

    pub fn after_resolve(extension: impl Extension + 'static) -> Self {
        Self::AfterResolve(Arc::new(extension))
    }

    pub fn stage(&self) -> ExtensionStage {
        match self {
            Self::BeforeResolve(_) => ExtensionStage::BeforeResolve,
            Self::AfterResolve(_) => ExtensionStage::AfterResolve,
        }
    }

    pub fn extension(&self) -> &Arc<dyn Extension> {
        match self {
            Self::BeforeResolve(e) | Self::AfterResolve(e) => e,
        }
    }

    /// The extension, if it is registered for `stage`
    pub fn for_stage(&self, stage: ExtensionStage) -> Option<&Arc<dyn Extension>> {
        (self.stage() == stage).then(|| self.extension())
    }
}

impl fmt::Debug for ResolverExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverExtension")
            .field("stage", &self.stage())
            .field("name", &self.extension().name())
            .finish()
    }
}
