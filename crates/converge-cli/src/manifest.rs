//! Desired-state manifests
//!
//! A manifest holds the same fields as the command-line flags. The format is
//! picked from the file extension: `.toml`, `.yaml`/`.yml`, or `.json`.

use anyhow::{bail, Context, Result};
use converge_core::DesiredParams;
use std::path::Path;

/// Supported manifest encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Yaml,
    Json,
}

impl Format {
    /// Detect format from the file extension
    ///
    /// # Errors
    /// Unknown or missing extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("toml") => Ok(Self::Toml),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => bail!(
                "cannot tell manifest format of {} (use .toml, .yaml or .json)",
                path.display()
            ),
        }
    }
}

/// Parse manifest text
///
/// # Errors
/// Malformed text, unknown fields, or invalid config entries
pub fn parse(text: &str, format: Format) -> Result<DesiredParams> {
    let params = match format {
        Format::Toml => toml::from_str(text)?,
        Format::Yaml => serde_yaml::from_str(text)?,
        Format::Json => serde_json::from_str(text)?,
    };
    Ok(params)
}

/// Load a manifest file
///
/// # Errors
/// Unreadable file or any [`parse`] failure
pub fn load(path: &Path) -> Result<DesiredParams> {
    let format = Format::from_path(path)?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading manifest {}", path.display()))?;
    parse(&text, format).with_context(|| format!("parsing manifest {}", path.display()))
}
