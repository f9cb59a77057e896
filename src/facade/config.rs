use crate::attribution::AmbientContext;
use crate::core::{HistoryError, Result};
use crate::diff::CustomDiff;
use crate::metadata::MetadataExtractor;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Default identifier field for tracked documents.
pub const DEFAULT_ID_FIELD: &str = "_id";

/// Attribution configuration: which ambient context to read and under
/// which key the acting principal is stored. Its presence enables
/// attribution tracking.
#[derive(Clone)]
pub struct ModifiedBy {
    pub context: Arc<dyn AmbientContext>,
    pub context_key: String,
}

impl ModifiedBy {
    pub fn new(context: Arc<dyn AmbientContext>, context_key: impl Into<String>) -> Self {
        Self {
            context,
            context_key: context_key.into(),
        }
    }
}

impl fmt::Debug for ModifiedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifiedBy")
            .field("context_key", &self.context_key)
            .finish_non_exhaustive()
    }
}

/// Tracking configuration for one collection.
#[derive(Debug, Default)]
pub struct HistoryConfig {
    /// Override the default `<collection>_history` target name wholesale.
    pub custom_collection_name: Option<String>,

    /// Per-field diff override (suppression, forced replacement).
    pub custom_diff: Option<CustomDiff>,

    /// When on, updates of existing documents record a structural diff
    /// instead of a full snapshot.
    pub diff_only: bool,

    /// Extra fields resolved onto every record.
    pub metadata: Vec<MetadataExtractor>,

    /// Attribution source; `None` disables attribution entirely.
    pub modified_by: Option<ModifiedBy>,

    /// Identifier field of tracked documents. Empty means the default
    /// `_id`.
    pub id_field: String,

    /// Fields stripped from record payloads (internal version counters
    /// and similar store bookkeeping).
    pub exclude_fields: Vec<String>,
}

impl HistoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diff_only(mut self, diff_only: bool) -> Self {
        self.diff_only = diff_only;
        self
    }

    pub fn with_custom_diff(mut self, custom_diff: CustomDiff) -> Self {
        self.custom_diff = Some(custom_diff);
        self
    }

    pub fn with_custom_collection_name(mut self, name: impl Into<String>) -> Self {
        self.custom_collection_name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, extractor: MetadataExtractor) -> Self {
        self.metadata.push(extractor);
        self
    }

    pub fn with_modified_by(
        mut self,
        context: Arc<dyn AmbientContext>,
        context_key: impl Into<String>,
    ) -> Self {
        self.modified_by = Some(ModifiedBy::new(context, context_key));
        self
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn with_exclude_field(mut self, field: impl Into<String>) -> Self {
        self.exclude_fields.push(field.into());
        self
    }

    /// Effective identifier field, applying the default.
    pub fn id_field(&self) -> &str {
        if self.id_field.is_empty() {
            DEFAULT_ID_FIELD
        } else {
            &self.id_field
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for extractor in &self.metadata {
            if !seen.insert(extractor.key()) {
                return Err(HistoryError::Config(format!(
                    "duplicate metadata key '{}'",
                    extractor.key()
                )));
            }
        }
        if let Some(modified_by) = &self.modified_by {
            if modified_by.context_key.trim().is_empty() {
                return Err(HistoryError::Config(
                    "modifiedBy context key must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
