//! Configuration delta computation
//!
//! Decides which desired entries must actually be written.

use crate::error::Result;
use crate::prober::CurrentValue;
use crate::types::ConfigEntry;
use std::collections::HashMap;

/// Compute the ordered entries to write
///
/// When the environment does not exist every desired entry is new and the
/// input is returned as is. Otherwise each entry is kept only if it differs
/// from the value the store will hold at that point of the run: the persisted
/// value, overridden by earlier desired entries for the same key. Input order
/// is preserved and duplicates are not collapsed.
///
/// `lookup` is asked at most once per distinct key, and only for existing
/// environments. The first lookup error aborts the computation.
///
/// # Errors
/// Whatever `lookup` returns, typically `ConfigKeyMissing` or `EngineFailure`
pub fn compute_delta<F>(desired: &[ConfigEntry], exists: bool, mut lookup: F) -> Result<Vec<ConfigEntry>>
where
    F: FnMut(&str, &str) -> Result<CurrentValue>,
{
    if !exists {
        return Ok(desired.to_vec());
    }

    let mut effective: HashMap<(&str, &str), CurrentValue> = HashMap::new();
    let mut delta = Vec::new();

    for entry in desired {
        let key = entry.key();
        let current = match effective.get(&key) {
            Some(value) => value.clone(),
            None => lookup(key.0, key.1)?,
        };

        let differs = !current.matches(&entry.value);
        tracing::debug!(
            section = %entry.section,
            option = %entry.option,
            differs,
            "compared desired entry"
        );
        if differs {
            delta.push(entry.clone());
        }
        effective.insert(key, CurrentValue::Present(entry.value.clone()));
    }

    Ok(delta)
}
