//! Error types for DID resolution operations.
//!
//! Every failure of a resolution call surfaces as a single [`ResolutionError`]
//! carrying a machine-readable code (see [`ResolutionError::code`]). Drivers
//! report their own failures through [`DriverError`], and configuration loading
//! through [`ConfigError`]. All of them use the `thiserror` crate.

use thiserror::Error;

use crate::extension::ExtensionStage;

/// Boxed error returned by extensions.
pub type ExtensionError = Box<dyn std::error::Error + Send + Sync>;

/// Error code for malformed DIDs
pub const ERROR_INVALID_DID: &str = "invalidDid";
/// Error code for DIDs no driver claims
pub const ERROR_METHOD_NOT_SUPPORTED: &str = "methodNotSupported";
/// Error code for incomplete resolve results
pub const ERROR_NOT_FOUND: &str = "notFound";
/// Error code for driver failures that do not carry their own code
pub const ERROR_INTERNAL: &str = "internalError";
/// Error code for failing extensions
pub const ERROR_EXTENSION: &str = "extensionError";
/// Error code for a resolver without drivers
pub const ERROR_MISCONFIGURED: &str = "misconfigured";

/// Errors that can occur during a resolution call
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// The DID string failed structural parsing
    #[error("Invalid DID: {0}")]
    InvalidDid(String),

    /// The DID is well-formed but no registered driver claims it
    #[error("Method not supported: {0}")]
    MethodNotSupported(String),

    /// Resolution produced a result that failed the completeness check
    #[error("No resolve result for {0}")]
    NotFound(String),

    /// A driver that claimed the DID failed
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// An extension failed during a hook invocation
    #[error("Extension {extension} failed ({stage}): {source}")]
    Extension {
        extension: String,
        stage: ExtensionStage,
        #[source]
        source: ExtensionError,
    },

    /// No drivers are registered
    #[error("No drivers configured.")]
    Misconfigured,
}

impl ResolutionError {
    /// Machine-readable error code
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidDid(_) => ERROR_INVALID_DID,
            Self::MethodNotSupported(_) => ERROR_METHOD_NOT_SUPPORTED,
            Self::NotFound(_) => ERROR_NOT_FOUND,
            Self::Driver(e) => e.code(),
            Self::Extension { .. } => ERROR_EXTENSION,
            Self::Misconfigured => ERROR_MISCONFIGURED,
        }
    }
}

/// Failures reported by a driver that claimed a DID
#[derive(Error, Debug)]
pub enum DriverError {
    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered with a resolution error
    #[error("{message}")]
    Backend { code: String, message: String },

    /// Any other driver failure
    #[error("{0}")]
    Other(String),
}

impl DriverError {
    /// Machine-readable error code, `internalError` unless the backend supplied one
    pub fn code(&self) -> &str {
        match self {
            Self::Backend { code, .. } => code,
            _ => ERROR_INTERNAL,
        }
    }
}

/// Errors that can occur while loading a resolver configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading the configuration file failed
    #[error("Cannot read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON for the expected shape
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A driver pattern is not a valid regular expression
    #[error("Invalid driver pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A driver entry is missing a required field
    #[error("Driver {index} is missing `{field}`")]
    MissingField { index: usize, field: &'static str },
}
