use crate::core::{HistoryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix appended to a primary collection name to form its history
/// target.
pub const HISTORY_SUFFIX: &str = "_history";

/// The per-entity-type storage location for audit records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryTarget {
    name: String,
}

impl HistoryTarget {
    /// Resolve the history target for a primary collection, honoring an
    /// optional custom name that overrides the default `<name>_history`.
    pub fn resolve(primary_collection: &str, custom_name: Option<&str>) -> Result<Self> {
        let name = match custom_name {
            Some(custom) => custom.trim().to_string(),
            None => {
                let primary = primary_collection.trim();
                if primary.is_empty() {
                    String::new()
                } else {
                    format!("{primary}{HISTORY_SUFFIX}")
                }
            }
        };
        if name.is_empty() {
            return Err(HistoryError::Config(
                "history target name must not be empty".to_string(),
            ));
        }
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for HistoryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
