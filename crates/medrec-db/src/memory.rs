use async_trait::async_trait;
use medrec_core::Collection;
use medrec_storage::{CollectionBackend, StorageError};
use tokio::sync::RwLock;

/// In-memory collection backend.
///
/// Holds one collection behind an `RwLock`; `load` hands out a clone and
/// `persist` swaps the whole value, so readers never see a partial write.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<Collection>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-seeded with `collection`.
    pub fn with_collection(collection: Collection) -> Self {
        Self {
            data: RwLock::new(collection),
        }
    }
}

#[async_trait]
impl CollectionBackend for MemoryBackend {
    async fn load(&self) -> Result<Collection, StorageError> {
        Ok(self.data.read().await.clone())
    }

    async fn persist(&self, collection: &Collection) -> Result<(), StorageError> {
        *self.data.write().await = collection.clone();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
