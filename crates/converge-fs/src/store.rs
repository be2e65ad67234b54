//! TOML configuration store
//!
//! One table per section, one key per option. The parsed document is kept
//! whole, so comments, layout, and keys that are never written survive a save
//! untouched. Values are written as strings; other scalar types found in a
//! hand-edited file read back as their TOML text.

use converge_core::{ConfigEntry, EngineError};
use std::io;
use std::path::Path;
use toml_edit::{DocumentMut, Item, Table, Value};

/// Parsed configuration store
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    doc: DocumentMut,
}

impl ConfigStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse store text
    ///
    /// # Errors
    /// `Corrupted` if the text is not TOML or a top-level key is not a table
    pub fn parse(text: &str, origin: &Path) -> Result<Self, EngineError> {
        let doc: DocumentMut = text.parse().map_err(|e: toml_edit::TomlError| {
            EngineError::Corrupted(format!("{}: {}", origin.display(), e.message()))
        })?;

        if let Some((section, _)) = doc.iter().find(|(_, item)| !item.is_table_like()) {
            return Err(EngineError::Corrupted(format!(
                "{}: '{section}' is not a section",
                origin.display()
            )));
        }
        Ok(Self { doc })
    }

    /// Read store from `file`
    ///
    /// # Errors
    /// The outer result carries I/O failures untouched, so callers can tell a
    /// missing file apart; the inner one carries parse failures.
    pub fn read(file: &Path) -> io::Result<Result<Self, EngineError>> {
        let text = std::fs::read_to_string(file)?;
        Ok(Self::parse(&text, file))
    }

    /// Value of `[section] option` as text
    ///
    /// Nested tables under a section are not options and read as unset.
    #[must_use]
    pub fn get(&self, section: &str, option: &str) -> Option<String> {
        let value = self.doc.get(section)?.as_table_like()?.get(option)?.as_value()?;
        Some(match value.as_str() {
            Some(s) => s.to_string(),
            None => {
                let mut bare = value.clone();
                bare.decor_mut().clear();
                bare.to_string()
            }
        })
    }

    /// Set one entry, replacing any previous value
    ///
    /// A replaced value keeps its surrounding whitespace and trailing comment.
    ///
    /// # Errors
    /// `InvalidValue` if any part contains a NUL character
    pub fn set(&mut self, entry: &ConfigEntry) -> Result<(), EngineError> {
        validate(entry)?;
        let section = self
            .doc
            .entry(&entry.section)
            .or_insert(Item::Table(Table::new()))
            .as_table_like_mut()
            .ok_or_else(|| invalid(entry, "section is not a table"))?;

        let mut value = Value::from(entry.value.as_str());
        match section.get_mut(&entry.option) {
            Some(Item::Value(existing)) => {
                *value.decor_mut() = existing.decor().clone();
                *existing = value;
            }
            Some(_) => return Err(invalid(entry, "option is a table")),
            None => {
                section.insert(&entry.option, Item::Value(value));
            }
        }
        Ok(())
    }

    /// Number of options across all sections
    #[must_use]
    pub fn len(&self) -> usize {
        self.doc
            .iter()
            .filter_map(|(_, item)| item.as_table_like())
            .map(|table| table.iter().filter(|(_, item)| item.is_value()).count())
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render as TOML text
    #[must_use]
    pub fn to_toml(&self) -> String {
        self.doc.to_string()
    }
}

fn invalid(entry: &ConfigEntry, reason: &str) -> EngineError {
    EngineError::InvalidValue {
        section: entry.section.clone(),
        option: entry.option.clone(),
        reason: reason.to_string(),
    }
}

fn validate(entry: &ConfigEntry) -> Result<(), EngineError> {
    let bad = [&entry.section, &entry.option, &entry.value]
        .into_iter()
        .any(|part| part.contains('\0'));
    if bad {
        return Err(invalid(entry, "contains a NUL character"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(s: &str, o: &str, v: &str) -> ConfigEntry {
        ConfigEntry::new(s, o, v).unwrap()
    }

    fn parse(text: &str) -> ConfigStore {
        ConfigStore::parse(text, Path::new("project.toml")).unwrap()
    }

    #[test]
    fn written_store_parses_back() {
        let mut store = ConfigStore::new();
        store.set(&entry("connection", "url", "sqlite:db/project.db")).unwrap();
        store.set(&entry("logging", "log level", "DEBUG")).unwrap();
        store.set(&entry("project", "descr", "")).unwrap();

        let parsed = parse(&store.to_toml());
        assert_eq!(parsed.get("connection", "url").as_deref(), Some("sqlite:db/project.db"));
        assert_eq!(parsed.get("logging", "log level").as_deref(), Some("DEBUG"));
        assert_eq!(parsed.get("project", "descr").as_deref(), Some(""));
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn hand_written_scalars_read_as_text() {
        let store = parse("[limits]\nmax = 10   # upper bound\nenabled = true\n");
        assert_eq!(store.get("limits", "max").as_deref(), Some("10"));
        assert_eq!(store.get("limits", "enabled").as_deref(), Some("true"));
        assert_eq!(store.get("limits", "missing"), None);
        assert_eq!(store.get("nosection", "max"), None);
    }

    #[test]
    fn untouched_keys_and_comments_survive_a_write() {
        let text = "# managed by hand\n[limits]\nmax = 10 # upper bound\n\n[a]\nb = \"old\" # note\n";
        let mut store = parse(text);

        store.set(&entry("a", "b", "new")).unwrap();
        store.set(&entry("logging", "level", "info")).unwrap();
        let rendered = store.to_toml();

        assert!(rendered.starts_with("# managed by hand\n[limits]\nmax = 10 # upper bound\n"));
        assert!(rendered.contains("b = \"new\" # note"));
        assert!(rendered.contains("[logging]\nlevel = \"info\""));
        assert_eq!(parse(&rendered).get("limits", "max").as_deref(), Some("10"));
    }

    #[test]
    fn top_level_scalar_is_corrupted() {
        let err = ConfigStore::parse("x = 1\n", Path::new("project.toml")).unwrap_err();
        assert!(matches!(err, EngineError::Corrupted(_)));
        let err = ConfigStore::parse("[unterminated\n", Path::new("project.toml")).unwrap_err();
        assert!(matches!(err, EngineError::Corrupted(_)));
    }

    #[test]
    fn last_set_wins() {
        let mut store = ConfigStore::new();
        store.set(&entry("s", "o", "1")).unwrap();
        store.set(&entry("s", "o", "2")).unwrap();
        assert_eq!(store.get("s", "o").as_deref(), Some("2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn nul_is_rejected() {
        let mut store = ConfigStore::new();
        let err = store.set(&entry("s", "o", "a\0b")).unwrap_err();
        assert!(matches!(err, EngineError::InvalidValue { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn nested_table_is_not_an_option() {
        let mut store = parse("[s]\n[s.sub]\nk = \"v\"\n");
        assert_eq!(store.get("s", "sub"), None);
        assert_eq!(store.len(), 0);
        assert!(matches!(
            store.set(&entry("s", "sub", "x")),
            Err(EngineError::InvalidValue { .. })
        ));
    }
}
