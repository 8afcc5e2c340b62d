//! Backend trait: whole-collection load and persist.

use async_trait::async_trait;
use medrec_core::Collection;

use crate::error::StorageError;

/// A place the patient collection lives between operations.
///
/// Backends only move whole collections. They never apply partial writes,
/// and `persist` must be all-or-nothing: a concurrent `load` observes either
/// the previous or the new collection, never a mix.
#[async_trait]
pub trait CollectionBackend: Send + Sync {
    /// Loads the current collection. A backend that has never been written
    /// returns an empty collection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` when the store cannot be read and
    /// `StorageError::Serialization` when its contents cannot be decoded.
    async fn load(&self) -> Result<Collection, StorageError>;

    /// Replaces the stored collection with `collection`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` when the write fails; the previous
    /// collection is then left in place.
    async fn persist(&self, collection: &Collection) -> Result<(), StorageError>;

    /// Returns the name of this backend for logging.
    fn backend_name(&self) -> &'static str;
}
