//! Backend request-template strategy
//!
//! The engine is backend-agnostic: query and mutation text for a concrete
//! dialect lives behind this trait, implemented per backend in
//! `phloem-backends`. Payloads are opaque to the engine; it only resolves
//! keys and executes the result.

use crate::chooser::Operation;
use crate::keyspace::KeySpace;
use crate::Result;

/// Builds fully-formed request payloads for one backend dialect.
///
/// Builders take `&mut self` because template bodies embed randomized
/// value text. Mutation builders may draw additional transaction-time keys
/// from the key space (e.g. to connect a new entity to existing ones).
pub trait Backend: Send {
    /// Dialect name, e.g. "neo4j"
    fn name(&self) -> &'static str;

    /// Substring marking an application-level error wrapped in an
    /// otherwise-successful transport response
    fn error_marker(&self) -> &'static str;

    /// Build a read query for `op` against the resolved `key`
    fn build_query(&mut self, op: &Operation, key: &str) -> String;

    /// Build an update/insert mutation for `op`. `key` is the target key
    /// (for updates) or the freshly allocated key (for inserts).
    fn build_mutation(&mut self, op: &Operation, key: &str, keys: &mut KeySpace)
        -> Result<String>;
}
