//! Core types for converge
//!
//! Defines the data model of a reconciliation run:
//! - Backend selection and connection parameters
//! - Configuration entries
//! - Raw caller parameters and the validated desired state
//! - Reconciliation result

use crate::error::{ReconcileError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default database host for networked backends
pub const DEFAULT_HOST: &str = "localhost";

/// Storage technology backing the project's primary data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Embedded local database file
    #[default]
    Sqlite,
    /// Networked MySQL server
    #[serde(rename = "mysql")]
    MySql,
    /// Networked PostgreSQL server
    #[serde(rename = "postgresql")]
    PostgreSql,
}

impl Backend {
    /// All supported backends
    pub const ALL: [Backend; 3] = [Backend::Sqlite, Backend::MySql, Backend::PostgreSql];

    /// Connection-string scheme
    #[inline]
    #[must_use]
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
            Self::PostgreSql => "postgresql",
        }
    }

    /// Whether the backend lives inside the project directory
    #[inline]
    #[must_use]
    pub fn is_embedded(self) -> bool {
        matches!(self, Self::Sqlite)
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.scheme())
    }
}

impl FromStr for Backend {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.scheme() == s)
            .ok_or_else(|| {
                ReconcileError::precondition(format!(
                    "unknown backend '{s}' (expected one of: sqlite, mysql, postgresql)"
                ))
            })
    }
}

/// Credentials and location of a networked database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Database server host
    pub host: String,
    /// Database login
    pub user: String,
    /// Database password
    pub password: String,
    /// Database to connect to
    pub database_name: String,
}

impl ConnectionParams {
    /// Create connection parameters
    #[inline]
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database_name: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            database_name: database_name.into(),
        }
    }
}

/// One `(section, option, value)` configuration assignment
///
/// Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawEntry")]
pub struct ConfigEntry {
    /// Section name, never blank
    pub section: String,
    /// Option name within the section, never blank
    pub option: String,
    /// Value, may be empty
    pub value: String,
}

#[derive(Deserialize)]
struct RawEntry {
    section: String,
    option: String,
    value: String,
}

impl TryFrom<RawEntry> for ConfigEntry {
    type Error = ReconcileError;

    fn try_from(raw: RawEntry) -> Result<Self> {
        ConfigEntry::new(raw.section, raw.option, raw.value)
    }
}

impl ConfigEntry {
    /// Create entry, validating its shape
    ///
    /// # Errors
    /// `PreconditionFailed` if section or option is blank
    pub fn new(
        section: impl Into<String>,
        option: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self> {
        let section = section.into();
        let option = option.into();
        if section.trim().is_empty() {
            return Err(ReconcileError::precondition("config entry has an empty section"));
        }
        if option.trim().is_empty() {
            return Err(ReconcileError::precondition(format!(
                "config entry in section '{section}' has an empty option"
            )));
        }
        Ok(Self {
            section,
            option,
            value: value.into(),
        })
    }

    /// `(section, option)` pair identifying the entry in a store
    #[inline]
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.section, &self.option)
    }
}

impl std::fmt::Display for ConfigEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} = {}", self.section, self.option, self.value)
    }
}

/// Parses `section.option=value`
impl FromStr for ConfigEntry {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        let (key, value) = s.split_once('=').ok_or_else(|| {
            ReconcileError::precondition(format!("expected section.option=value, got '{s}'"))
        })?;
        let (section, option) = key.split_once('.').ok_or_else(|| {
            ReconcileError::precondition(format!("expected section.option before '=', got '{key}'"))
        })?;
        Self::new(section.trim(), option.trim(), value)
    }
}

/// Identity of the managed project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectIdentity {
    /// Project name
    pub name: String,
    /// Absolute environment directory
    pub path: PathBuf,
}

/// Raw caller-facing parameters
///
/// Everything except `name` and `path` is optional; [`DesiredParams::resolve`]
/// applies defaults and checks preconditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DesiredParams {
    /// Project name
    pub name: String,
    /// Absolute environment directory
    pub path: PathBuf,
    /// Database backend, embedded by default
    pub backend: Backend,
    /// Defaults to `localhost`
    pub host: Option<String>,
    /// Defaults to the project name
    pub user: Option<String>,
    /// Required for networked backends
    pub password: Option<String>,
    /// Defaults to the project name
    pub database_name: Option<String>,
    /// Entries to converge, in order
    pub config: Vec<ConfigEntry>,
}

impl DesiredParams {
    /// Create parameters for an embedded project
    #[inline]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// With backend
    #[inline]
    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// With database host
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// With database user
    #[inline]
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// With database password
    #[inline]
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// With database name
    #[inline]
    #[must_use]
    pub fn with_database_name(mut self, database_name: impl Into<String>) -> Self {
        self.database_name = Some(database_name.into());
        self
    }

    /// Append a desired configuration entry
    #[inline]
    #[must_use]
    pub fn with_entry(mut self, entry: ConfigEntry) -> Self {
        self.config.push(entry);
        self
    }

    /// Apply defaults and validate into a [`DesiredState`]
    ///
    /// # Errors
    /// `PreconditionFailed` when the name is blank, the path is relative, or a
    /// networked backend has no password
    pub fn resolve(self) -> Result<DesiredState> {
        if self.name.trim().is_empty() {
            return Err(ReconcileError::missing_parameter("name"));
        }
        if self.path.as_os_str().is_empty() {
            return Err(ReconcileError::missing_parameter("path"));
        }
        if !self.path.is_absolute() {
            return Err(ReconcileError::precondition(format!(
                "path must be absolute: {}",
                self.path.display()
            )));
        }

        let connection = if self.backend.is_embedded() {
            None
        } else {
            let password = self
                .password
                .ok_or_else(|| ReconcileError::missing_parameter("password"))?;
            Some(ConnectionParams {
                host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                user: self.user.unwrap_or_else(|| self.name.clone()),
                password,
                database_name: self.database_name.unwrap_or_else(|| self.name.clone()),
            })
        };

        Ok(DesiredState {
            identity: ProjectIdentity {
                name: self.name,
                path: self.path,
            },
            backend: self.backend,
            connection,
            config: self.config,
        })
    }
}

/// Validated target of one reconciliation run
///
/// Only constructed through [`DesiredParams::resolve`], so a networked backend
/// always carries complete connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredState {
    identity: ProjectIdentity,
    backend: Backend,
    connection: Option<ConnectionParams>,
    config: Vec<ConfigEntry>,
}

impl DesiredState {
    /// Project name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Project path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.identity.path
    }

    /// Name and path
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &ProjectIdentity {
        &self.identity
    }

    /// Selected backend
    #[inline]
    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Connection parameters, present only for networked backends
    #[inline]
    #[must_use]
    pub fn connection(&self) -> Option<&ConnectionParams> {
        self.connection.as_ref()
    }

    /// Desired configuration entries in input order
    #[inline]
    #[must_use]
    pub fn config(&self) -> &[ConfigEntry] {
        &self.config
    }
}

/// Outcome of a reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Environment was created or at least one entry differed
    pub changed: bool,
    /// Project name and path
    pub identity: ProjectIdentity,
    /// Environment did not exist before this run
    pub created: bool,
    /// Desired entries that were written
    pub applied: Vec<ConfigEntry>,
}
