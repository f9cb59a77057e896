//! Structural deep-diff over JSON document trees.
//!
//! The engine compares two `serde_json::Value` trees and emits a minimal
//! [`DiffNode`] delta: additions and replacements carry the after value,
//! removals are marked with a sentinel, unchanged fields are omitted
//! entirely. A per-field [`CustomDiff`] override can suppress or rewrite
//! individual fields before the default comparison runs.

mod custom;
mod engine;
mod node;

pub use custom::{CustomDiff, FieldDiff};
pub use engine::{MAX_DIFF_DEPTH, diff};
pub use node::DiffNode;
