//! State Prober
//!
//! Answers two questions about the on-disk project before anything is written:
//! does an environment exist, and what does its store currently hold.

use crate::engine::EnvironmentEngine;
use crate::error::{LookupError, ReconcileError, Result, Stage};
use std::path::Path;

/// Current value of one configuration key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentValue {
    /// Key is set
    Present(String),
    /// Section or option is not in the store
    Absent,
}

impl CurrentValue {
    /// Check whether `desired` matches this value
    #[inline]
    #[must_use]
    pub fn matches(&self, desired: &str) -> bool {
        matches!(self, Self::Present(current) if current == desired)
    }
}

/// Read-only view of an environment through its engine
#[derive(Debug)]
pub struct StateProber<'e, E: EnvironmentEngine> {
    engine: &'e E,
}

impl<'e, E: EnvironmentEngine> StateProber<'e, E> {
    /// Create prober over `engine`
    #[inline]
    #[must_use]
    pub fn new(engine: &'e E) -> Self {
        Self { engine }
    }

    /// Whether an initialized environment exists at `path`
    ///
    /// The probe handle is released immediately.
    ///
    /// # Errors
    /// `EngineFailure` for anything other than the engine's "not an
    /// environment" signal
    pub fn exists(&self, path: &Path) -> Result<bool> {
        match self.engine.open(path) {
            Ok(handle) => {
                self.engine
                    .shutdown(handle)
                    .map_err(|e| ReconcileError::engine(Stage::Shutdown, e))?;
                Ok(true)
            }
            Err(e) if e.is_not_an_environment() => Ok(false),
            Err(e) => Err(ReconcileError::engine(Stage::Probe, e)),
        }
    }

    /// Current value of `[section] option` at `path`
    ///
    /// # Errors
    /// `ConfigKeyMissing` when the store itself is gone, `EngineFailure` for
    /// other lookup failures. An unset key is not an error.
    pub fn current_value(&self, path: &Path, section: &str, option: &str) -> Result<CurrentValue> {
        match self.engine.config_value(path, section, option) {
            Ok(value) => Ok(CurrentValue::Present(value)),
            Err(LookupError::KeyAbsent { .. }) => Ok(CurrentValue::Absent),
            Err(LookupError::BackingStoreMissing(store)) => {
                Err(ReconcileError::ConfigKeyMissing { path: store })
            }
            Err(LookupError::Engine(e)) => Err(ReconcileError::engine(Stage::Lookup, e)),
        }
    }
}
