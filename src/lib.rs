pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod store;
pub mod types;
pub mod validator;

// Re-export main types
pub use config::{Config, StorageBackend};
pub use error::{ExecuteError, SandboxError, StoreError};
pub use executor::WorkflowExecutor;
pub use store::{open_store, MemoryStore, RedisStore, WorkflowStore};
pub use types::*;
pub use validator::{validate_source, Validation};
