//! Error types for collection store operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::Collection;

/// Errors that can occur while loading or saving a collection.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing service cannot be reached.
    #[error("{store} store is unavailable")]
    Unavailable {
        /// Store name.
        store: &'static str,
    },

    /// Reading a backup file failed.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// File involved.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// Writing a backup file failed.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        /// File involved.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// Stored content is not a JSON array or object of records.
    #[error("Failed to parse collection {collection}: {source}")]
    Decode {
        /// Collection involved.
        collection: Collection,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },

    /// Stored content has an unexpected shape.
    #[error("Collection {collection} is not a list or map of records")]
    Shape {
        /// Collection involved.
        collection: Collection,
    },

    /// Failed to serialize records.
    #[error("Failed to serialize collection {collection}: {source}")]
    Encode {
        /// Collection involved.
        collection: Collection,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },

    /// A shared lock was poisoned by a panicking writer.
    #[error("Store lock error")]
    LockError,
}
