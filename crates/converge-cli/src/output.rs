//! JSON documents printed on stdout

use converge_core::{ConfigEntry, ErrorKind, Plan, ReconcileError};
use serde::Serialize;
use std::path::PathBuf;

/// Result of `check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// An `apply` with the same input would change something
    pub changed: bool,
    pub exists: bool,
    pub delta: Vec<ConfigEntry>,
}

impl From<Plan> for CheckReport {
    fn from(plan: Plan) -> Self {
        Self {
            changed: plan.would_change(),
            exists: plan.exists,
            delta: plan.delta,
        }
    }
}

/// Result of `show`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShowReport {
    pub path: PathBuf,
    pub section: String,
    pub option: String,
    /// `None` when the key is not set
    pub value: Option<String>,
}

/// Any failure, in the host-tool convention
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub failed: bool,
    pub kind: ErrorKind,
    pub msg: String,
}

impl Failure {
    /// Classify an error from any layer
    ///
    /// Errors that did not come from the core are input problems (bad flags,
    /// unreadable manifest) and count as failed preconditions.
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        let kind = err
            .downcast_ref::<ReconcileError>()
            .map_or(ErrorKind::PreconditionFailed, ReconcileError::kind);
        Self {
            failed: true,
            kind,
            msg: format!("{err:#}"),
        }
    }
}
