//! # medrec-storage
//!
//! Storage layer for medrec.
//!
//! Backends implement [`CollectionBackend`], which only knows how to load and
//! persist a whole patient collection. [`PatientStore`] builds the record
//! store operations (get, list, create, update, delete, sorted listing) on
//! top of any backend and serializes mutations so concurrent writers do not
//! lose updates.
//!
//! ## Example
//!
//! ```ignore
//! use medrec_storage::PatientStore;
//! use medrec_db::MemoryBackend;
//!
//! let store = PatientStore::from_backend(MemoryBackend::new());
//! let created = store.create(patient).await?;
//! let loaded = store.get(&created.id).await?;
//! ```

mod error;
mod store;
mod traits;

pub use error::{ErrorCategory, StorageError};
pub use store::PatientStore;
pub use traits::CollectionBackend;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shareable backend trait object.
pub type DynBackend = std::sync::Arc<dyn CollectionBackend>;
