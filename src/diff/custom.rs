use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Decision returned by a per-field diff override.
#[derive(Debug, Clone)]
pub enum FieldDiff {
    /// Drop the field from the delta entirely, whatever changed.
    Suppress,

    /// Record this value as the field's replacement.
    Replace(Value),

    /// Fall through to the default recursive comparison.
    Default,

    /// Abort the whole diff; surfaces as [`HistoryError::Diff`].
    ///
    /// [`HistoryError::Diff`]: crate::core::HistoryError::Diff
    Fail(String),
}

type CustomDiffFn = dyn Fn(&str, Option<&Value>, Option<&Value>) -> FieldDiff + Send + Sync;

/// Per-field override for the diff engine.
///
/// Consulted for every object key at every nesting level before the default
/// comparison runs. The classic use is keeping auto-maintained fields such
/// as `updatedAt` out of history:
///
/// ```
/// use dochist::diff::CustomDiff;
///
/// let custom = CustomDiff::suppress_keys(["updatedAt"]);
/// ```
#[derive(Clone)]
pub struct CustomDiff {
    inner: Arc<CustomDiffFn>,
}

impl CustomDiff {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&str, Option<&Value>, Option<&Value>) -> FieldDiff + Send + Sync + 'static,
    {
        Self { inner: Arc::new(func) }
    }

    /// Override that suppresses the given keys at any depth and delegates
    /// everything else to the default algorithm.
    pub fn suppress_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let suppressed: HashSet<String> = keys.into_iter().map(Into::into).collect();
        Self::new(move |key, _before, _after| {
            if suppressed.contains(key) {
                FieldDiff::Suppress
            } else {
                FieldDiff::Default
            }
        })
    }

    pub fn apply(&self, key: &str, before: Option<&Value>, after: Option<&Value>) -> FieldDiff {
        (self.inner)(key, before, after)
    }
}

impl fmt::Debug for CustomDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomDiff").finish_non_exhaustive()
    }
}
