//! Environment engine capability
//!
//! The reconciler never touches storage itself. Everything it needs from the
//! engine that owns project environments is expressed by [`EnvironmentEngine`].

use crate::error::{EngineError, LookupError};
use crate::types::ConfigEntry;
use std::path::Path;

/// Abstract project-environment engine
///
/// Implementations convert every native failure into [`EngineError`] or
/// [`LookupError`] before returning. Calls are blocking and made from a single
/// thread in a fixed order.
#[cfg_attr(test, mockall::automock(type Handle = u32;))]
pub trait EnvironmentEngine {
    /// Open environment handle
    type Handle;

    /// Open an existing environment
    ///
    /// # Errors
    /// [`EngineError::NotAnEnvironment`] if nothing initialized lives at `path`
    fn open(&self, path: &Path) -> Result<Self::Handle, EngineError>;

    /// Create a new environment with its initial option set, applied in order
    fn create(&self, path: &Path, options: &[ConfigEntry]) -> Result<Self::Handle, EngineError>;

    /// Current persisted value of `[section] option`
    fn config_value(&self, path: &Path, section: &str, option: &str)
        -> Result<String, LookupError>;

    /// Stage one write against an open handle
    fn set_config_value(
        &self,
        handle: &mut Self::Handle,
        entry: &ConfigEntry,
    ) -> Result<(), EngineError>;

    /// Persist staged writes
    fn save(&self, handle: &mut Self::Handle) -> Result<(), EngineError>;

    /// Release the handle
    fn shutdown(&self, handle: Self::Handle) -> Result<(), EngineError>;
}

impl<E: EnvironmentEngine + ?Sized> EnvironmentEngine for &E {
    type Handle = E::Handle;

    fn open(&self, path: &Path) -> Result<Self::Handle, EngineError> {
        (**self).open(path)
    }

    fn create(&self, path: &Path, options: &[ConfigEntry]) -> Result<Self::Handle, EngineError> {
        (**self).create(path, options)
    }

    fn config_value(
        &self,
        path: &Path,
        section: &str,
        option: &str,
    ) -> Result<String, LookupError> {
        (**self).config_value(path, section, option)
    }

    fn set_config_value(
        &self,
        handle: &mut Self::Handle,
        entry: &ConfigEntry,
    ) -> Result<(), EngineError> {
        (**self).set_config_value(handle, entry)
    }

    fn save(&self, handle: &mut Self::Handle) -> Result<(), EngineError> {
        (**self).save(handle)
    }

    fn shutdown(&self, handle: Self::Handle) -> Result<(), EngineError> {
        (**self).shutdown(handle)
    }
}
