//! Error types for converge
//!
//! Two layers of errors:
//! - [`EngineError`] / [`LookupError`]: closed kinds every environment engine
//!   must convert its native failures into
//! - [`ReconcileError`]: what a reconciliation run reports to its caller

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Failure reported by an environment engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Path holds no valid, initialized project environment
    #[error("not a project environment: {}", .0.display())]
    NotAnEnvironment(PathBuf),

    /// Storage not accessible with current permissions
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Environment exists but its contents cannot be trusted
    #[error("corrupted environment: {0}")]
    Corrupted(String),

    /// Engine rejected an option value
    #[error("invalid value for [{section}] {option}: {reason}")]
    InvalidValue {
        /// Section of the rejected entry
        section: String,
        /// Option of the rejected entry
        option: String,
        /// Why the engine refused it
        reason: String,
    },

    /// Backend could not be reached
    #[error("engine unreachable: {0}")]
    Unreachable(String),

    /// Any other storage failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Check if this is the "no environment here" signal
    #[inline]
    #[must_use]
    pub fn is_not_an_environment(&self) -> bool {
        matches!(self, Self::NotAnEnvironment(_))
    }
}

/// Failure of a single configuration value lookup
///
/// `KeyAbsent` and `BackingStoreMissing` must stay distinct: the first means
/// the value differs, the second means the installation is broken.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// Section or option not present in the store
    #[error("[{section}] {option} not set")]
    KeyAbsent {
        /// Requested section
        section: String,
        /// Requested option
        option: String,
    },

    /// The configuration resource itself does not exist
    #[error("configuration store missing: {}", .0.display())]
    BackingStoreMissing(PathBuf),

    /// Lookup failed for any other reason
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Machine-checkable failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller input incomplete or malformed, nothing touched
    PreconditionFailed,
    /// Existing environment without a configuration store
    ConfigKeyMissing,
    /// Engine failed while probing, creating, reading or writing
    EngineFailure,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PreconditionFailed => "precondition_failed",
            Self::ConfigKeyMissing => "config_key_missing",
            Self::EngineFailure => "engine_failure",
        };
        f.write_str(s)
    }
}

/// Engine interaction that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Opening the environment to check it exists
    Probe,
    /// Reading a current value
    Lookup,
    /// Creating a new environment
    Create,
    /// Writing to an existing environment
    Update,
    /// Releasing a handle
    Shutdown,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Probe => "probe",
            Self::Lookup => "lookup",
            Self::Create => "create",
            Self::Update => "update",
            Self::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// Main reconciliation error type
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Required parameter missing or malformed
    #[error("{0}")]
    PreconditionFailed(String),

    /// Existing environment has no configuration store
    #[error("project configuration not found at {}", path.display())]
    ConfigKeyMissing {
        /// Location of the missing store
        path: PathBuf,
    },

    /// Engine failure, no retry
    #[error("{stage} failed: {source}")]
    EngineFailure {
        /// Engine interaction that failed
        stage: Stage,
        /// Engine's own error
        #[source]
        source: EngineError,
    },
}

impl ReconcileError {
    /// Create precondition failure
    #[inline]
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }

    /// Missing required caller parameter
    #[inline]
    #[must_use]
    pub fn missing_parameter(name: &str) -> Self {
        Self::PreconditionFailed(format!("missing required parameter: {name}"))
    }

    /// Wrap an engine failure
    #[inline]
    #[must_use]
    pub fn engine(stage: Stage, source: EngineError) -> Self {
        Self::EngineFailure { stage, source }
    }

    /// Failure classification
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Self::ConfigKeyMissing { .. } => ErrorKind::ConfigKeyMissing,
            Self::EngineFailure { .. } => ErrorKind::EngineFailure,
        }
    }
}

/// Result alias used throughout the core
pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;
