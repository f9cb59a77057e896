use super::config::HistoryConfig;
use crate::attribution::AttributionResolver;
use crate::core::Result;
use crate::metadata::resolve_metadata;
use crate::record::policy::{self, PayloadPlan};
use crate::record::{Operation, Payload, builder};
use crate::storage::{HistoryStore, HistoryTarget};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Full field-by-field copy of a document captured at load time.
///
/// Held only while diff mode is on and an update is in flight; consumed by
/// [`HistoryTracker::record_save`] and discarded once the history record
/// is built.
#[derive(Debug, Clone)]
pub struct OriginalSnapshot {
    value: Value,
}

impl OriginalSnapshot {
    pub(crate) fn capture(doc: &Value) -> Self {
        Self { value: doc.clone() }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Configured history capture for one tracked collection.
///
/// One tracker per collection; each lifecycle entry point builds and
/// persists exactly one [`HistoryRecord`] or fails without writing
/// anything. The tracker never retries and never serializes events for a
/// document; ordering beyond the per-event pipeline is the caller's.
///
/// [`HistoryRecord`]: crate::record::HistoryRecord
pub struct HistoryTracker<S: HistoryStore> {
    collection: String,
    target: HistoryTarget,
    config: HistoryConfig,
    store: Arc<S>,
    attribution: Option<AttributionResolver>,
}

impl<S: HistoryStore> HistoryTracker<S> {
    pub fn new(collection: impl Into<String>, store: Arc<S>, config: HistoryConfig) -> Result<Self> {
        let collection = collection.into();
        config.validate()?;
        let target = HistoryTarget::resolve(&collection, config.custom_collection_name.as_deref())?;
        let attribution = config
            .modified_by
            .as_ref()
            .map(|mb| AttributionResolver::new(mb.context.clone(), mb.context_key.clone()));

        Ok(Self {
            collection,
            target,
            config,
            store,
            attribution,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Storage location of this collection's audit records, for ad hoc
    /// operator inspection through the store.
    pub fn history_target(&self) -> &HistoryTarget {
        &self.target
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// After-load hook. Captures the original snapshot when diff mode is
    /// on and primes the attribution cache: the load is the context-bearing
    /// read preceding any later save.
    pub fn on_loaded(&self, doc: &Value) -> Result<Option<OriginalSnapshot>> {
        if let Some(attribution) = &self.attribution {
            attribution.prime()?;
        }
        Ok(self.config.diff_only.then(|| OriginalSnapshot::capture(doc)))
    }

    /// Before-save hook for inserts and full-document updates.
    ///
    /// `original` is the snapshot captured by [`Self::on_loaded`] for this
    /// update cycle; it is consumed here and never reused. In diff mode an
    /// update without a captured original falls back to a full snapshot
    /// rather than failing.
    pub async fn record_save(
        &self,
        original: Option<OriginalSnapshot>,
        doc: &Value,
        is_new: bool,
    ) -> Result<()> {
        let operation = if is_new { Operation::Insert } else { Operation::Update };
        let plan = policy::select(operation, self.config.diff_only, is_new);

        let payload = match plan {
            PayloadPlan::Diff => match &original {
                Some(snapshot) => builder::diff_payload(
                    snapshot.value(),
                    doc,
                    self.config.id_field(),
                    &self.config.exclude_fields,
                    self.config.custom_diff.as_ref(),
                )?,
                None => {
                    warn!(
                        collection = %self.collection,
                        "diff-mode update without a captured original, recording full snapshot"
                    );
                    builder::snapshot_payload(doc, &self.config.exclude_fields)?
                }
            },
            PayloadPlan::Snapshot => builder::snapshot_payload(doc, &self.config.exclude_fields)?,
        };

        let before = original.as_ref().map(OriginalSnapshot::value);
        self.finalize(operation, payload, before, Some(doc)).await
    }

    /// Before-update-by-expression hook. Only a partial field set is known
    /// on this path, so it is snapshotted directly; diffing is impossible
    /// without a full before-capture.
    pub async fn record_update_expression(&self, set_fields: &Value) -> Result<()> {
        let payload = builder::snapshot_payload(set_fields, &self.config.exclude_fields)?;
        self.finalize(Operation::Update, payload, None, Some(set_fields)).await
    }

    /// Before-remove hook: records the full pre-removal state. That state
    /// also serves as the after view for metadata extractors, so static
    /// extractors keep resolving on removals.
    pub async fn record_remove(&self, doc: &Value) -> Result<()> {
        let payload = builder::snapshot_payload(doc, &self.config.exclude_fields)?;
        self.finalize(Operation::Remove, payload, Some(doc), Some(doc)).await
    }

    /// Delete every audit record for this collection's history target.
    pub async fn clear_history(&self) -> Result<u64> {
        self.store.clear(&self.target).await
    }

    /// Fixed per-event pipeline tail: metadata, then attribution, then
    /// assembly, then the single persist call. Any failure aborts the
    /// record and surfaces to the lifecycle caller.
    async fn finalize(
        &self,
        operation: Operation,
        payload: Payload,
        before: Option<&Value>,
        after: Option<&Value>,
    ) -> Result<()> {
        let metadata = resolve_metadata(&self.config.metadata, before, after).await?;
        let modified_by = match &self.attribution {
            Some(resolver) => resolver.resolve()?,
            None => None,
        };

        let record = builder::build(operation, payload, modified_by, metadata);
        debug!(
            history_target = %self.target,
            operation = %operation,
            record_id = %record.id,
            "persisting history record"
        );
        self.store.persist(&self.target, record).await
    }
}
