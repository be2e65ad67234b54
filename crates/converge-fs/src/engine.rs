//! Filesystem environment engine

use crate::layout::{check_marker, marker_contents, Layout};
use crate::store::ConfigStore;
use converge_core::{ConfigEntry, EngineError, EnvironmentEngine, LookupError};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Open environment with its staged configuration
#[derive(Debug)]
pub struct FsHandle {
    layout: Layout,
    store: ConfigStore,
    dirty: bool,
}

impl FsHandle {
    #[inline]
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Staged configuration, including unsaved writes
    #[inline]
    #[must_use]
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }
}

/// Engine keeping each project environment in its own directory
#[derive(Debug, Clone, Copy, Default)]
pub struct FsEngine;

impl FsEngine {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Map an I/O failure on `path` onto the closed engine error kinds
pub(crate) fn io_error(err: &io::Error, path: &Path) -> EngineError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => EngineError::PermissionDenied(path.display().to_string()),
        io::ErrorKind::InvalidData => {
            EngineError::Corrupted(format!("{}: {err}", path.display()))
        }
        _ => EngineError::Storage(format!("{}: {err}", path.display())),
    }
}

/// Write `contents` next to `target`, then rename over it
fn write_atomic(target: &Path, contents: &str) -> Result<(), EngineError> {
    let tmp = target.with_extension("toml.tmp");
    let result = fs::File::create(&tmp)
        .and_then(|mut f| {
            f.write_all(contents.as_bytes())?;
            f.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, target));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(io_error(&e, target));
    }
    Ok(())
}

fn save_store(layout: &Layout, store: &ConfigStore) -> Result<(), EngineError> {
    let conf = layout.conf_dir();
    fs::create_dir_all(&conf).map_err(|e| io_error(&e, &conf))?;
    write_atomic(&layout.config_file(), &store.to_toml())
}

impl EnvironmentEngine for FsEngine {
    type Handle = FsHandle;

    fn open(&self, path: &Path) -> Result<FsHandle, EngineError> {
        let layout = Layout::new(path);
        let marker = layout.marker();

        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(EngineError::NotAnEnvironment(path.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(EngineError::NotAnEnvironment(path.to_path_buf()));
            }
            Err(e) => return Err(io_error(&e, path)),
        }

        let contents = match fs::read_to_string(&marker) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(EngineError::NotAnEnvironment(path.to_path_buf()));
            }
            Err(e) => return Err(io_error(&e, &marker)),
        };
        check_marker(&contents, &marker)?;

        let config_file = layout.config_file();
        let store = match ConfigStore::read(&config_file) {
            Ok(parsed) => parsed?,
            // reported by config_value; a handle can still rebuild the store
            Err(e) if e.kind() == io::ErrorKind::NotFound => ConfigStore::new(),
            Err(e) => return Err(io_error(&e, &config_file)),
        };

        tracing::debug!(path = %path.display(), entries = store.len(), "opened environment");
        Ok(FsHandle {
            layout,
            store,
            dirty: false,
        })
    }

    fn create(&self, path: &Path, options: &[ConfigEntry]) -> Result<FsHandle, EngineError> {
        let layout = Layout::new(path);
        let marker = layout.marker();

        if marker.exists() {
            return Err(EngineError::Corrupted(format!(
                "environment already exists at {}",
                path.display()
            )));
        }
        match fs::read_dir(path) {
            Ok(mut entries) => {
                if entries.next().is_some() {
                    return Err(EngineError::Storage(format!(
                        "directory not empty: {}",
                        path.display()
                    )));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&e, path)),
        }

        let mut store = ConfigStore::new();
        for option in options {
            store.set(option)?;
        }

        for dir in layout.directories() {
            fs::create_dir_all(&dir).map_err(|e| io_error(&e, &dir))?;
        }
        save_store(&layout, &store)?;
        // marker last, so a failed creation never looks like an environment
        fs::write(&marker, marker_contents()).map_err(|e| io_error(&e, &marker))?;

        tracing::info!(path = %path.display(), options = options.len(), "created environment");
        Ok(FsHandle {
            layout,
            store,
            dirty: false,
        })
    }

    fn config_value(&self, path: &Path, section: &str, option: &str) -> Result<String, LookupError> {
        let config_file = Layout::new(path).config_file();
        let store = match ConfigStore::read(&config_file) {
            Ok(parsed) => parsed?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LookupError::BackingStoreMissing(config_file));
            }
            Err(e) => return Err(io_error(&e, &config_file).into()),
        };
        store
            .get(section, option)
            .ok_or_else(|| LookupError::KeyAbsent {
                section: section.to_string(),
                option: option.to_string(),
            })
    }

    fn set_config_value(&self, handle: &mut FsHandle, entry: &ConfigEntry) -> Result<(), EngineError> {
        handle.store.set(entry)?;
        handle.dirty = true;
        Ok(())
    }

    fn save(&self, handle: &mut FsHandle) -> Result<(), EngineError> {
        save_store(&handle.layout, &handle.store)?;
        handle.dirty = false;
        tracing::debug!(path = %handle.layout.root().display(), "saved configuration");
        Ok(())
    }

    fn shutdown(&self, handle: FsHandle) -> Result<(), EngineError> {
        if handle.dirty {
            tracing::warn!(
                path = %handle.layout.root().display(),
                "environment closed with unsaved changes"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_closed_kinds() {
        let path = Path::new("/srv/p");
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(io_error(&denied, path), EngineError::PermissionDenied(_)));
        let other = io::Error::from(io::ErrorKind::Other);
        assert!(matches!(io_error(&other, path), EngineError::Storage(_)));
    }
}
