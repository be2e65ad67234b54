//! On-disk layout of a project environment
//!
//! ```text
//! <root>/
//!   VERSION            marker, header line + format version
//!   conf/project.toml  configuration store
//!   db/                embedded database files
//!   log/
//! ```

use converge_core::EngineError;
use std::path::{Path, PathBuf};

/// Marker file name
pub const MARKER_FILE: &str = "VERSION";

/// First line of the marker file
pub const MARKER_HEADER: &str = "converge project environment";

/// Layout version written by this engine
pub const FORMAT_VERSION: u32 = 1;

/// Paths of one environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    #[inline]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    #[must_use]
    pub fn marker(&self) -> PathBuf {
        self.root.join(MARKER_FILE)
    }

    #[inline]
    #[must_use]
    pub fn conf_dir(&self) -> PathBuf {
        self.root.join("conf")
    }

    /// Configuration store file
    #[inline]
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.conf_dir().join("project.toml")
    }

    #[inline]
    #[must_use]
    pub fn db_dir(&self) -> PathBuf {
        self.root.join("db")
    }

    #[inline]
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.root.join("log")
    }

    /// Directories created with a new environment
    #[must_use]
    pub fn directories(&self) -> [PathBuf; 3] {
        [self.conf_dir(), self.db_dir(), self.log_dir()]
    }
}

/// Contents of a fresh marker file
#[must_use]
pub fn marker_contents() -> String {
    format!("{MARKER_HEADER}\n{FORMAT_VERSION}\n")
}

/// Check marker file contents
///
/// # Errors
/// `Corrupted` if the header or version is wrong
pub fn check_marker(contents: &str, marker: &Path) -> Result<(), EngineError> {
    let mut lines = contents.lines();
    if lines.next().map(str::trim) != Some(MARKER_HEADER) {
        return Err(EngineError::Corrupted(format!(
            "unrecognized marker file {}",
            marker.display()
        )));
    }
    match lines.next().map(|l| l.trim().parse::<u32>()) {
        Some(Ok(FORMAT_VERSION)) => Ok(()),
        Some(Ok(other)) => Err(EngineError::Corrupted(format!(
            "unsupported environment format {other} (expected {FORMAT_VERSION})"
        ))),
        _ => Err(EngineError::Corrupted(format!(
            "missing format version in {}",
            marker.display()
        ))),
    }
}
