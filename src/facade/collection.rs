use super::config::HistoryConfig;
use super::tracker::{HistoryTracker, OriginalSnapshot};
use crate::core::{HistoryError, Result};
use crate::storage::HistoryStore;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory document collection with history capture wired into every
/// mutation.
///
/// Shows the intended hook integration: `find` captures original snapshots
/// and primes attribution, mutations write their history record before the
/// primary write and abort it when the record fails. A store integration
/// embedding [`HistoryTracker`] directly follows the same sequence.
///
/// # Examples
///
/// ```
/// use dochist::{HistoryConfig, HistoryStore, InMemoryHistoryStore, TrackedCollection};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # async fn demo() -> dochist::Result<()> {
/// let store = Arc::new(InMemoryHistoryStore::new());
/// let accounts = TrackedCollection::new(
///     "accounts",
///     store.clone(),
///     HistoryConfig::new().with_diff_only(true),
/// )?;
///
/// let id = accounts.insert(json!({"name": "Checking", "balance": 100})).await?;
/// let mut doc = accounts.find(&id).await?.expect("just inserted");
/// doc["balance"] = json!(150);
/// accounts.save(doc).await?;
///
/// // Two records: the insert snapshot and the balance diff.
/// let target = accounts.history().history_target();
/// assert_eq!(store.count(target).await?, 2);
/// # Ok(())
/// # }
/// ```
pub struct TrackedCollection<S: HistoryStore> {
    documents: RwLock<HashMap<String, Value>>,
    /// Original snapshots for update cycles in flight, keyed by document
    /// id. Entries live from load to the next save of that document.
    originals: RwLock<HashMap<String, OriginalSnapshot>>,
    tracker: HistoryTracker<S>,
}

impl<S: HistoryStore> TrackedCollection<S> {
    pub fn new(name: impl Into<String>, store: Arc<S>, config: HistoryConfig) -> Result<Self> {
        Ok(Self {
            documents: RwLock::new(HashMap::new()),
            originals: RwLock::new(HashMap::new()),
            tracker: HistoryTracker::new(name, store, config)?,
        })
    }

    pub fn name(&self) -> &str {
        self.tracker.collection()
    }

    /// The underlying tracker, for target/store access.
    pub fn history(&self) -> &HistoryTracker<S> {
        &self.tracker
    }

    /// Insert a new document, assigning a generated id when the id field
    /// is absent. Returns the document id.
    pub async fn insert(&self, mut doc: Value) -> Result<String> {
        let id_field = self.tracker.config().id_field().to_string();
        let fields = doc.as_object_mut().ok_or_else(|| {
            HistoryError::Unsupported("tracked documents must be JSON objects".to_string())
        })?;

        let id = match fields.get(&id_field) {
            Some(value) => id_to_string(value),
            None => {
                let generated = Uuid::new_v4().to_string();
                fields.insert(id_field, json!(generated));
                generated
            }
        };

        self.tracker.record_save(None, &doc, true).await?;
        self.documents.write().await.insert(id.clone(), doc);
        Ok(id)
    }

    /// Load a document by id. Captures the original snapshot for a
    /// following update in diff mode and primes the attribution cache.
    pub async fn find(&self, id: &str) -> Result<Option<Value>> {
        let doc = {
            let documents = self.documents.read().await;
            documents.get(id).cloned()
        };
        let Some(doc) = doc else {
            return Ok(None);
        };

        if let Some(snapshot) = self.tracker.on_loaded(&doc)? {
            self.originals.write().await.insert(id.to_string(), snapshot);
        }
        Ok(Some(doc))
    }

    /// Save a full replacement of a document. An unknown id is treated as
    /// an insert; a known id consumes the original snapshot captured at
    /// load time for the diff.
    pub async fn save(&self, doc: Value) -> Result<String> {
        let id_field = self.tracker.config().id_field();
        let id = doc
            .get(id_field)
            .map(id_to_string)
            .ok_or_else(|| {
                HistoryError::Unsupported(format!("document is missing its '{id_field}' field"))
            })?;

        let is_new = !self.documents.read().await.contains_key(&id);
        let original = self.originals.write().await.remove(&id);

        self.tracker.record_save(original, &doc, is_new).await?;
        self.documents.write().await.insert(id.clone(), doc);
        Ok(id)
    }

    /// Apply a partial field set to every document, as an update
    /// expression would. One history record is written for the expression
    /// itself, not one per matched document. Returns how many documents
    /// were touched.
    pub async fn update_many(&self, set_fields: &Value) -> Result<u64> {
        let fields = set_fields.as_object().ok_or_else(|| {
            HistoryError::Unsupported("update expression must be a JSON object".to_string())
        })?;

        self.tracker.record_update_expression(set_fields).await?;

        let mut documents = self.documents.write().await;
        let mut touched = 0u64;
        for doc in documents.values_mut() {
            if let Some(target) = doc.as_object_mut() {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
                touched += 1;
            }
        }
        Ok(touched)
    }

    /// Remove a document by id, recording its pre-removal state. Returns
    /// whether a document was removed.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let doc = {
            let documents = self.documents.read().await;
            documents.get(id).cloned()
        };
        let Some(doc) = doc else {
            return Ok(false);
        };

        self.tracker.record_remove(&doc).await?;
        self.documents.write().await.remove(id);
        self.originals.write().await.remove(id);
        Ok(true)
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Delete all audit records for this collection.
    pub async fn clear_history(&self) -> Result<u64> {
        self.tracker.clear_history().await
    }
}

fn id_to_string(value: &Value) -> String {
    match value {
        Value::String(id) => id.clone(),
        other => other.to_string(),
    }
}
