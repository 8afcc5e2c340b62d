//! PatientStore - the record store behind every API operation.
//!
//! Each call loads the whole collection from the backend. Mutations then
//! apply one change and persist the whole collection back. A single mutex
//! is held across that load-modify-persist cycle, so two concurrent writers
//! cannot overwrite each other's changes. The persist step runs on its own
//! task that owns the lock guard, so a cancelled caller cannot release the
//! lock while its write is still in flight. Reads skip the lock and rely on
//! the backend's atomic persist.

use std::sync::Arc;

use medrec_core::{
    Collection, CoreError, Patient, PatientPatch, SortField, SortOrder, find_by_id, sort_by,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::traits::CollectionBackend;
use crate::{DynBackend, StorageResult};

pub struct PatientStore {
    backend: DynBackend,
    /// Serializes mutations across the load-modify-persist cycle.
    write_lock: Arc<Mutex<()>>,
}

impl PatientStore {
    pub fn new(backend: DynBackend) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn from_backend<B: CollectionBackend + 'static>(backend: B) -> Self {
        Self::new(Arc::new(backend))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Loads a fresh snapshot of the whole collection.
    pub async fn snapshot(&self) -> StorageResult<Collection> {
        let collection = self.backend.load().await?;
        debug!(
            backend = self.backend_name(),
            patients = collection.len(),
            "Collection loaded"
        );
        Ok(collection)
    }

    pub async fn get(&self, id: &str) -> StorageResult<Patient> {
        let collection = self.snapshot().await?;
        Ok(find_by_id(collection.iter(), id)?.clone())
    }

    /// All patients in backend order.
    pub async fn list(&self) -> StorageResult<Vec<Patient>> {
        Ok(self.snapshot().await?.into_patients())
    }

    pub async fn sorted(&self, field: SortField, order: SortOrder) -> StorageResult<Vec<Patient>> {
        let collection = self.snapshot().await?;
        Ok(sort_by(collection.iter(), field, order))
    }

    /// Inserts a validated patient. Nothing is written when the id is taken.
    pub async fn create(&self, patient: Patient) -> StorageResult<Patient> {
        let id = patient.id.clone();
        let created = self
            .mutate(|collection| {
                collection.insert(patient.clone())?;
                Ok(patient)
            })
            .await
            .inspect_err(|e| log_rejected("create", &id, e))?;
        info!(patient.id = %id, "Patient created");
        Ok(created)
    }

    /// Applies a partial update and returns the merged record.
    pub async fn update(&self, id: &str, patch: &PatientPatch) -> StorageResult<Patient> {
        let updated = self
            .mutate(|collection| collection.update(id, patch).cloned())
            .await
            .inspect_err(|e| log_rejected("update", id, e))?;
        info!(patient.id = %id, bmi = updated.bmi(), verdict = %updated.verdict(), "Patient updated");
        Ok(updated)
    }

    /// Removes a patient and returns the removed record.
    pub async fn delete(&self, id: &str) -> StorageResult<Patient> {
        let removed = self
            .mutate(|collection| collection.remove(id))
            .await
            .inspect_err(|e| log_rejected("delete", id, e))?;
        info!(patient.id = %id, "Patient deleted");
        Ok(removed)
    }

    async fn mutate<T, F>(&self, op: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Collection) -> Result<T, CoreError>,
    {
        let guard = self.write_lock.clone().lock_owned().await;
        let mut collection = self.backend.load().await?;
        let out = op(&mut collection)?;

        // Dropping this future must not free the lock before the write lands.
        let backend = self.backend.clone();
        let persisted = tokio::spawn(async move {
            let result = backend.persist(&collection).await;
            if result.is_ok() {
                debug!(
                    backend = backend.backend_name(),
                    patients = collection.len(),
                    "Collection persisted"
                );
            }
            drop(guard);
            result
        });
        persisted
            .await
            .map_err(|e| StorageError::internal(format!("persist task failed: {e}")))??;
        Ok(out)
    }
}

impl std::fmt::Debug for PatientStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatientStore")
            .field("backend", &self.backend_name())
            .finish()
    }
}

fn log_rejected(operation: &str, id: &str, err: &StorageError) {
    match err {
        StorageError::Io { .. } | StorageError::Serialization { .. } | StorageError::Internal { .. } => {
            tracing::error!(operation, patient.id = %id, error = %err, "Storage failure");
        }
        _ => {
            warn!(operation, patient.id = %id, category = %err.category(), error = %err, "Request rejected");
        }
    }
}
