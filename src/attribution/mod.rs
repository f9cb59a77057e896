//! Attribution: who made the change.
//!
//! The resolver reads a principal identifier from an [`AmbientContext`]
//! collaborator under a configured key, caching the last successful lookup
//! as a fallback for lifecycle events that run without request context.

mod context;
mod resolver;

pub use context::{AmbientContext, MapContext};
pub use resolver::AttributionResolver;
