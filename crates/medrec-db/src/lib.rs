//! Collection backends for medrec.
//!
//! Two implementations of [`CollectionBackend`](medrec_storage::CollectionBackend):
//! [`JsonFileBackend`], which keeps the collection in a JSON file and replaces
//! it atomically on every write, and [`MemoryBackend`] for tests and
//! throwaway instances.
//!
//! # Example
//!
//! ```ignore
//! use medrec_db::JsonFileBackend;
//! use medrec_storage::PatientStore;
//!
//! let store = PatientStore::from_backend(JsonFileBackend::new("patients.json"));
//! let patients = store.list().await?;
//! ```

pub mod factory;
mod file;
mod memory;

pub use factory::{BackendConfig, BackendKind, create_backend};
pub use file::{FileOptions, JsonFileBackend};
pub use memory::MemoryBackend;

// Re-export the backend trait for convenience
pub use medrec_storage::{CollectionBackend, DynBackend, StorageError};
