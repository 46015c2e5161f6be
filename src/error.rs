use thiserror::Error;

/// Store backend failures.
///
/// A missing or expired record is never an error; lookups return `Ok(None)`
/// for that case. These variants cover real backend I/O problems only.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Validation-class failures of `execute_workflow`: the request itself is
/// malformed or references something absent. Surfaced directly to the
/// caller; never converted into an `Execution` record.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("workflow {0} not found")]
    WorkflowNotFound(String),

    #[error("workflow {id} is not ready for execution (status: {status})")]
    WorkflowNotReady { id: String, status: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures inside the script host. These never escape `execute_workflow`;
/// the engine converts them into a terminal `failed` Execution.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("script compilation failed: {0}")]
    Compile(String),

    #[error("execute_workflow function not found in generated code")]
    EntryPointNotFound,

    #[error("script error: {0}")]
    Script(String),

    /// The entry point returned a promise that never settled. The host
    /// drains the job queue after the call, so a pending promise means the
    /// script awaits something no builtin will ever resolve.
    #[error("execute_workflow returned a promise that did not settle")]
    PromiseUnsettled,

    #[error("script host panicked or was aborted: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
