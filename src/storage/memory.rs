use super::adapter::HistoryStore;
use super::naming::HistoryTarget;
use crate::core::Result;
use crate::record::HistoryRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory history store with per-target locks.
///
/// Targets are created lazily on first persist. Reads on one target do not
/// contend with writes on another; only target creation takes the outer
/// map lock for writing.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    targets: RwLock<HashMap<String, Arc<RwLock<Vec<HistoryRecord>>>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn target_handle(&self, target: &HistoryTarget) -> Arc<RwLock<Vec<HistoryRecord>>> {
        {
            let targets = self.targets.read().await;
            if let Some(handle) = targets.get(target.name()) {
                return handle.clone();
            }
        }
        let mut targets = self.targets.write().await;
        targets
            .entry(target.name().to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Vec::new())))
            .clone()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn persist(&self, target: &HistoryTarget, record: HistoryRecord) -> Result<()> {
        let handle = self.target_handle(target).await;
        let mut records = handle.write().await;
        records.push(record);
        Ok(())
    }

    async fn clear(&self, target: &HistoryTarget) -> Result<u64> {
        let targets = self.targets.read().await;
        let Some(handle) = targets.get(target.name()) else {
            return Ok(0);
        };
        let mut records = handle.write().await;
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }

    async fn count(&self, target: &HistoryTarget) -> Result<usize> {
        let targets = self.targets.read().await;
        match targets.get(target.name()) {
            Some(handle) => Ok(handle.read().await.len()),
            None => Ok(0),
        }
    }

    async fn records(&self, target: &HistoryTarget) -> Result<Vec<HistoryRecord>> {
        let targets = self.targets.read().await;
        match targets.get(target.name()) {
            Some(handle) => Ok(handle.read().await.clone()),
            None => Ok(Vec::new()),
        }
    }
}
