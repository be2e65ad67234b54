//! Testing utilities for converge workspace
//!
//! Shared in-memory engine, fixtures, and assertions.

#![allow(missing_docs)]

use converge_core::{ConfigEntry, DesiredParams, EngineError, EnvironmentEngine, LookupError};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Engine operation, as recorded by [`MemoryEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Open,
    Create,
    ConfigValue,
    SetConfigValue,
    Save,
    Shutdown,
}

type Store = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Default)]
struct Environment {
    /// `None` once the configuration store has been removed
    store: Option<Store>,
}

#[derive(Debug, Default)]
struct Inner {
    environments: HashMap<PathBuf, Environment>,
    calls: Vec<Call>,
    failures: HashMap<Call, EngineError>,
    next_handle: u64,
}

/// Handle onto a [`MemoryEngine`] environment with staged writes
#[derive(Debug)]
pub struct MemoryHandle {
    pub id: u64,
    path: PathBuf,
    staged: Store,
}

/// In-memory environment engine
///
/// Clones share state, so a test can keep one clone for inspection while a
/// reconciler owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing environment at `path` holding `entries`
    pub fn with_environment(self, path: impl Into<PathBuf>, entries: &[ConfigEntry]) -> Self {
        let mut store = Store::new();
        for e in entries {
            insert(&mut store, e);
        }
        self.inner.lock().environments.insert(
            path.into(),
            Environment { store: Some(store) },
        );
        self
    }

    /// Make every future `call` fail with `error`
    pub fn fail_on(self, call: Call, error: EngineError) -> Self {
        self.inner.lock().failures.insert(call, error);
        self
    }

    /// Delete the configuration store of an existing environment
    pub fn remove_store(&self, path: &Path) {
        if let Some(env) = self.inner.lock().environments.get_mut(path) {
            env.store = None;
        }
    }

    /// Persisted value, bypassing the call log
    pub fn value(&self, path: &Path, section: &str, option: &str) -> Option<String> {
        self.inner
            .lock()
            .environments
            .get(path)?
            .store
            .as_ref()?
            .get(section)?
            .get(option)
            .cloned()
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.inner.lock().environments.contains_key(path)
    }

    /// Every engine call made so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().calls.clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.inner.lock().calls.iter().filter(|c| **c == call).count()
    }

    pub fn total_calls(&self) -> usize {
        self.inner.lock().calls.len()
    }

    /// Number of writes that reached the engine, connection entry included
    pub fn writes(&self) -> usize {
        self.count(Call::SetConfigValue)
    }

    pub fn reset_calls(&self) {
        self.inner.lock().calls.clear();
    }

    fn record(&self, call: Call) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        inner.calls.push(call);
        match inner.failures.get(&call) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn handle(&self, path: &Path, staged: Store) -> MemoryHandle {
        let mut inner = self.inner.lock();
        inner.next_handle += 1;
        MemoryHandle {
            id: inner.next_handle,
            path: path.to_path_buf(),
            staged,
        }
    }
}

fn insert(store: &mut Store, entry: &ConfigEntry) {
    store
        .entry(entry.section.clone())
        .or_default()
        .insert(entry.option.clone(), entry.value.clone());
}

impl EnvironmentEngine for MemoryEngine {
    type Handle = MemoryHandle;

    fn open(&self, path: &Path) -> Result<MemoryHandle, EngineError> {
        self.record(Call::Open)?;
        let staged = {
            let inner = self.inner.lock();
            let env = inner
                .environments
                .get(path)
                .ok_or_else(|| EngineError::NotAnEnvironment(path.to_path_buf()))?;
            env.store.clone().unwrap_or_default()
        };
        Ok(self.handle(path, staged))
    }

    fn create(&self, path: &Path, options: &[ConfigEntry]) -> Result<MemoryHandle, EngineError> {
        self.record(Call::Create)?;
        let mut store = Store::new();
        for option in options {
            insert(&mut store, option);
        }
        {
            let mut inner = self.inner.lock();
            if inner.environments.contains_key(path) {
                return Err(EngineError::Corrupted(format!(
                    "environment already exists at {}",
                    path.display()
                )));
            }
            inner.environments.insert(
                path.to_path_buf(),
                Environment {
                    store: Some(store.clone()),
                },
            );
        }
        Ok(self.handle(path, store))
    }

    fn config_value(&self, path: &Path, section: &str, option: &str) -> Result<String, LookupError> {
        self.record(Call::ConfigValue)?;
        let inner = self.inner.lock();
        let env = inner
            .environments
            .get(path)
            .ok_or_else(|| EngineError::NotAnEnvironment(path.to_path_buf()))?;
        let store = env
            .store
            .as_ref()
            .ok_or_else(|| LookupError::BackingStoreMissing(path.join("conf/project.toml")))?;
        store
            .get(section)
            .and_then(|s| s.get(option))
            .cloned()
            .ok_or_else(|| LookupError::KeyAbsent {
                section: section.to_string(),
                option: option.to_string(),
            })
    }

    fn set_config_value(&self, handle: &mut MemoryHandle, entry: &ConfigEntry) -> Result<(), EngineError> {
        self.record(Call::SetConfigValue)?;
        insert(&mut handle.staged, entry);
        Ok(())
    }

    fn save(&self, handle: &mut MemoryHandle) -> Result<(), EngineError> {
        self.record(Call::Save)?;
        let mut inner = self.inner.lock();
        let env = inner
            .environments
            .get_mut(&handle.path)
            .ok_or_else(|| EngineError::NotAnEnvironment(handle.path.clone()))?;
        env.store = Some(handle.staged.clone());
        Ok(())
    }

    fn shutdown(&self, _handle: MemoryHandle) -> Result<(), EngineError> {
        self.record(Call::Shutdown)
    }
}

pub fn entry(section: &str, option: &str, value: &str) -> ConfigEntry {
    ConfigEntry::new(section, option, value).unwrap()
}

/// Embedded-backend parameters for `name` under `/srv`
pub fn embedded_params(name: &str) -> DesiredParams {
    DesiredParams::new(name, format!("/srv/{name}"))
}

pub fn params_with(name: &str, entries: &[ConfigEntry]) -> DesiredParams {
    entries
        .iter()
        .cloned()
        .fold(embedded_params(name), DesiredParams::with_entry)
}

/// In-memory sink for formatted log output
///
/// ```rust,ignore
/// let logs = LogCapture::new();
/// tracing::subscriber::with_default(logs.subscriber(), || run());
/// assert!(!logs.contents().contains("secret"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscriber writing every event, down to `TRACE`, into this capture
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let sink = self.clone();
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
