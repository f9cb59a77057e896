use super::naming::HistoryTarget;
use crate::core::Result;
use crate::record::HistoryRecord;
use async_trait::async_trait;

/// Pluggable persistence boundary for history records.
///
/// The capture pipeline performs exactly one `persist` call per lifecycle
/// event and never retries; a rejection propagates verbatim to the
/// triggering caller as a persist-stage error. Implementations decide the
/// physical layout behind each [`HistoryTarget`].
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one record to the target. Must not deduplicate or reorder.
    async fn persist(&self, target: &HistoryTarget, record: HistoryRecord) -> Result<()>;

    /// Delete every record for the target; returns how many were removed.
    async fn clear(&self, target: &HistoryTarget) -> Result<u64>;

    /// Number of records currently held for the target.
    async fn count(&self, target: &HistoryTarget) -> Result<usize>;

    /// All records for the target in persist order, for operator
    /// inspection.
    async fn records(&self, target: &HistoryTarget) -> Result<Vec<HistoryRecord>>;
}
