//! Metadata extractors: configured rules producing extra fields on a
//! history record.
//!
//! Each extractor pairs an output key with a source: a static field copied
//! from the after document, a synchronous function, or an asynchronous
//! function. All extractors for one event run logically concurrently and
//! the whole set fails fast: a single failing extractor fails the record
//! with no partial metadata persisted.

use crate::core::{HistoryError, Result};
use futures::future::{BoxFuture, try_join_all};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

type SyncExtractorFn = dyn Fn(Option<&Value>, Option<&Value>) -> Value + Send + Sync;
type AsyncExtractorFn =
    dyn Fn(Option<&Value>, Option<&Value>) -> BoxFuture<'static, Result<Value>> + Send + Sync;

enum ExtractorSource {
    /// Copy `after[field]`; `Null` when the after view lacks the field or
    /// is absent altogether.
    Field(String),
    /// Pure function of the before/after pair.
    Sync(Arc<SyncExtractorFn>),
    /// Asynchronous, fallible function of the before/after pair.
    Async(Arc<AsyncExtractorFn>),
}

/// One configured metadata rule, supplied at tracking-configuration time
/// and invoked per lifecycle event.
pub struct MetadataExtractor {
    key: String,
    source: ExtractorSource,
}

impl MetadataExtractor {
    /// Copy a field from the after document under `key`.
    pub fn field(key: impl Into<String>, source_field: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            source: ExtractorSource::Field(source_field.into()),
        }
    }

    /// Compute the value synchronously from the before/after pair.
    pub fn computed<F>(key: impl Into<String>, func: F) -> Self
    where
        F: Fn(Option<&Value>, Option<&Value>) -> Value + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            source: ExtractorSource::Sync(Arc::new(func)),
        }
    }

    /// Compute the value asynchronously; an `Err` fails the whole record.
    pub fn computed_async<F>(key: impl Into<String>, func: F) -> Self
    where
        F: Fn(Option<&Value>, Option<&Value>) -> BoxFuture<'static, Result<Value>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            key: key.into(),
            source: ExtractorSource::Async(Arc::new(func)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn resolve(&self, before: Option<&Value>, after: Option<&Value>) -> Result<Value> {
        match &self.source {
            ExtractorSource::Field(field) => Ok(after
                .and_then(|doc| doc.get(field))
                .cloned()
                .unwrap_or(Value::Null)),
            ExtractorSource::Sync(func) => Ok(func(before, after)),
            ExtractorSource::Async(func) => func(before, after).await,
        }
    }
}

impl fmt::Debug for MetadataExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.source {
            ExtractorSource::Field(field) => format!("field({field})"),
            ExtractorSource::Sync(_) => "sync fn".to_string(),
            ExtractorSource::Async(_) => "async fn".to_string(),
        };
        f.debug_struct("MetadataExtractor")
            .field("key", &self.key)
            .field("source", &kind)
            .finish()
    }
}

/// Resolve every configured extractor against one before/after pair.
///
/// Extractors run concurrently with no ordering dependency between them;
/// all must complete before the history record is finalized. Fails as a
/// whole on the first extractor error, naming the offending key.
pub async fn resolve_metadata(
    extractors: &[MetadataExtractor],
    before: Option<&Value>,
    after: Option<&Value>,
) -> Result<Map<String, Value>> {
    let pending = extractors.iter().map(|extractor| async move {
        let value = extractor
            .resolve(before, after)
            .await
            .map_err(|err| match err {
                already @ HistoryError::Metadata { .. } => already,
                other => HistoryError::Metadata {
                    key: extractor.key().to_string(),
                    message: other.to_string(),
                },
            })?;
        Ok::<_, HistoryError>((extractor.key().to_string(), value))
    });

    let mut resolved = Map::new();
    for (key, value) in try_join_all(pending).await? {
        resolved.insert(key, value);
    }
    Ok(resolved)
}
