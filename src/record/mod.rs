//! History record model: operation codes, payloads, and record assembly.

pub mod builder;
pub mod policy;

use crate::diff::DiffNode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Lifecycle operation that triggered a history record.
///
/// Serialized as the compact codes `i` / `u` / `r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    #[serde(rename = "i")]
    Insert,
    #[serde(rename = "u")]
    Update,
    #[serde(rename = "r")]
    Remove,
}

impl Operation {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Insert => "i",
            Self::Update => "u",
            Self::Remove => "r",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Content of a history record: a full field snapshot or a structural diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "data", rename_all = "snake_case")]
pub enum Payload {
    /// Complete post-change (or pre-removal) field mapping.
    Snapshot(Map<String, Value>),
    /// Structural delta against the prior state.
    Diff(DiffNode),
}

impl Payload {
    pub fn is_diff(&self) -> bool {
        matches!(self, Self::Diff(_))
    }

    /// Snapshot fields, when this payload is a snapshot.
    pub fn as_snapshot(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Snapshot(fields) => Some(fields),
            Self::Diff(_) => None,
        }
    }

    /// Delta tree, when this payload is a diff.
    pub fn as_diff(&self) -> Option<&DiffNode> {
        match self {
            Self::Diff(node) => Some(node),
            Self::Snapshot(_) => None,
        }
    }
}

/// One immutable audit entry, persisted exactly once per lifecycle event.
///
/// Field names on the wire match the compact audit format: `t` timestamp,
/// `o` operation code, `d` payload, `modifiedBy` attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,

    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "o")]
    pub operation: Operation,

    #[serde(rename = "d")]
    pub payload: Payload,

    #[serde(rename = "modifiedBy", skip_serializing_if = "Option::is_none", default)]
    pub modified_by: Option<String>,

    #[serde(rename = "meta", skip_serializing_if = "Map::is_empty", default)]
    pub metadata: Map<String, Value>,
}
