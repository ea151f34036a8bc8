// xats-common/src/error.rs
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of machine-actionable failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    RegistryNotFound,
    PackageNotFound,
    VersionNotFound,
    FileNotFound,
    IntegrityMismatch,
    Timeout,
    NetworkError,
    AuthenticationFailed,
    RateLimited,
    CircularDependency,
    PathTraversalViolation,
    SizeLimitExceeded,
    DepthLimitExceeded,
    ExtensionNotAllowed,
    Other,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegistryNotFound => "registry-not-found",
            Self::PackageNotFound => "package-not-found",
            Self::VersionNotFound => "version-not-found",
            Self::FileNotFound => "file-not-found",
            Self::IntegrityMismatch => "integrity-mismatch",
            Self::Timeout => "timeout",
            Self::NetworkError => "network-error",
            Self::AuthenticationFailed => "authentication-failed",
            Self::RateLimited => "rate-limited",
            Self::CircularDependency => "circular-dependency",
            Self::PathTraversalViolation => "path-traversal-violation",
            Self::SizeLimitExceeded => "size-limit-exceeded",
            Self::DepthLimitExceeded => "depth-limit-exceeded",
            Self::ExtensionNotAllowed => "extension-not-allowed",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone)]
pub enum XatsError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Parsing Error in {0}: {1}")]
    ParseError(&'static str, String),

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error("Registry '{0}' not found")]
    RegistryNotFound(String),

    #[error("Package '{package}' not found in registry '{registry}'")]
    PackageNotFound { registry: String, package: String },

    #[error("Version '{version}' of package '{package}' not found")]
    VersionNotFound { package: String, version: String },

    #[error("File '{path}' not found in {package}@{version}")]
    FileNotFound {
        package: String,
        version: String,
        path: String,
    },

    #[error("Fragment file '{0}' not found")]
    FragmentNotFound(String),

    #[error("Integrity mismatch for {0}: {1}")]
    IntegrityMismatch(String, String),

    #[error("Timed out fetching '{0}'")]
    Timeout(String),

    #[error("Network error fetching '{0}': {1}")]
    Network(String, String),

    #[error("Authentication failed for '{0}'")]
    AuthenticationFailed(String),

    #[error("Rate limited by '{0}'")]
    RateLimited(String),

    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),

    #[error("Path traversal violation: {0}")]
    PathTraversal(String),

    #[error("Size limit exceeded for '{path}': {size} bytes > {limit} bytes")]
    SizeLimitExceeded { path: String, size: u64, limit: u64 },

    #[error("Composition exceeds the limit of {limit} fragment files")]
    FileCountExceeded { limit: usize },

    #[error("Depth limit of {limit} exceeded at '{at}'")]
    DepthLimitExceeded { at: String, limit: usize },

    #[error("Extension not allowed for '{0}'")]
    ExtensionNotAllowed(String),

    #[error("Fragment '{0}' failed the schema check")]
    SchemaRejected(String),

    #[error("Resolution cancelled")]
    Cancelled,

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl XatsError {
    /// The taxonomy code this failure was constructed with.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RegistryNotFound(_) => ErrorCode::RegistryNotFound,
            Self::PackageNotFound { .. } => ErrorCode::PackageNotFound,
            Self::VersionNotFound { .. } => ErrorCode::VersionNotFound,
            Self::FileNotFound { .. } | Self::FragmentNotFound(_) => ErrorCode::FileNotFound,
            Self::IntegrityMismatch(..) => ErrorCode::IntegrityMismatch,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::Network(..) => ErrorCode::NetworkError,
            Self::AuthenticationFailed(_) => ErrorCode::AuthenticationFailed,
            Self::RateLimited(_) => ErrorCode::RateLimited,
            Self::CircularDependency(_) => ErrorCode::CircularDependency,
            Self::PathTraversal(_) => ErrorCode::PathTraversalViolation,
            Self::SizeLimitExceeded { .. } | Self::FileCountExceeded { .. } => {
                ErrorCode::SizeLimitExceeded
            }
            Self::DepthLimitExceeded { .. } => ErrorCode::DepthLimitExceeded,
            Self::ExtensionNotAllowed(_) => ErrorCode::ExtensionNotAllowed,
            Self::Io(_)
            | Self::Json(_)
            | Self::Config(_)
            | Self::ParseError(..)
            | Self::ValidationError(_)
            | Self::SchemaRejected(_)
            | Self::Cancelled
            | Self::Generic(_) => ErrorCode::Other,
        }
    }
}

impl From<std::io::Error> for XatsError {
    fn from(err: std::io::Error) -> Self {
        XatsError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for XatsError {
    fn from(err: serde_json::Error) -> Self {
        XatsError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, XatsError>;

/// A failure reported inside a batch or tree walk: the subject it concerns,
/// a readable message and its code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedError {
    pub reference: String,
    pub error: String,
    pub code: ErrorCode,
}

impl ReportedError {
    pub fn new(reference: impl Into<String>, err: &XatsError) -> Self {
        Self {
            reference: reference.into(),
            error: err.to_string(),
            code: err.code(),
        }
    }
}
