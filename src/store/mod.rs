// Workflow and execution persistence
//
// Two backends behind one trait:
// - MemoryStore: process-local maps, for development and tests
// - RedisStore: durable key-value records with a 24-hour TTL
//
// The backend is chosen explicitly through configuration. Workflows are
// immutable once ready and executions have exactly one writer, so neither
// backend needs more than concurrent-read safety per key.

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, StorageBackend};
use crate::error::StoreError;
use crate::types::{Execution, Workflow};

/// Record retention on the durable backend: 24 hours from the last write.
pub const RECORD_TTL_SECONDS: u64 = 86400;

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Upsert a workflow under its id. Best-effort: the caller is not
    /// expected to recover from a failed write beyond logging it.
    async fn store_workflow(&self, workflow: &Workflow) -> Result<(), StoreError>;

    /// Fetch a workflow. Missing or expired records yield `Ok(None)`.
    async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>, StoreError>;

    async fn store_execution(&self, execution: &Execution) -> Result<(), StoreError>;

    async fn get_execution(&self, id: &str) -> Result<Option<Execution>, StoreError>;
}

/// Open the store selected by the configuration.
pub async fn open_store(config: &Config) -> Result<Arc<dyn WorkflowStore>, StoreError> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; records will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Redis => {
            // Config::validate guarantees the URL is present for this branch.
            let url = config.redis_url.as_deref().unwrap_or_default();
            let store = RedisStore::connect(url).await?;
            tracing::info!("using redis storage with {}s TTL", RECORD_TTL_SECONDS);
            Ok(Arc::new(store))
        }
    }
}
