//! Domain-level error types.

use thiserror::Error;

/// Failure of the persistent store.
///
/// Fatal to the triggering operation only: callers log it, abort the
/// current operation before any fan-out, and never retry automatically.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {collection}: {source}")]
    Io {
        collection: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {collection}: {source}")]
    Decode {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
