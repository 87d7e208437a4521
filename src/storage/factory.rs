//! Storage factory for creating document store instances

use std::sync::Arc;

use super::backends::{FileStore, MemoryStore};
use super::config::{BackendType, StorageConfig};
use super::error::{StorageError, StorageResult};
use super::traits::DocumentStore;

/// Factory for creating document stores
pub struct StorageFactory;

impl StorageFactory {
    /// Create a store from explicit configuration
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn DocumentStore>> {
        match config.backend {
            BackendType::Memory => Ok(Arc::new(MemoryStore::new())),
            BackendType::File => {
                let dir = config.resolved_base_dir().ok_or_else(|| {
                    StorageError::configuration("Could not determine storage directory")
                })?;
                Ok(Arc::new(FileStore::new(dir).await?))
            }
        }
    }
}
