// Sandboxed execution engine
//
// Runs a stored workflow's generated script against user input:
// - credential injection over a private copy of the source
// - fresh engine context with the restricted namespace per run
// - hard wall-clock timeout around the whole run
// - per-execution stdout/stderr capture
// - every failure converted into a terminal Execution record

mod builtins;
mod host;
mod sandbox;

pub(crate) use sandbox::inject_credentials;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{ExecuteError, SandboxError};
use crate::store::WorkflowStore;
use crate::types::{Execution, WorkflowStatus};

/// Fixed message attached to executions that exceeded the budget.
pub const TIMEOUT_MESSAGE: &str = "Execution timeout";

const REDACTED: &str = "[redacted]";

pub struct WorkflowExecutor {
    config: Arc<Config>,
    store: Arc<dyn WorkflowStore>,
}

impl WorkflowExecutor {
    /// Build an engine over the given configuration and store. Independent
    /// instances can coexist, each with its own store.
    pub fn new(config: Arc<Config>, store: Arc<dyn WorkflowStore>) -> Self {
        Self { config, store }
    }

    pub fn store(&self) -> Arc<dyn WorkflowStore> {
        Arc::clone(&self.store)
    }

    /// Execute a stored workflow. Synchronous from the caller's point of
    /// view: suspends until the run finishes or the timeout fires, and
    /// always hands back a terminal `Execution`.
    ///
    /// Only validation-class problems (unknown workflow, workflow not
    /// ready, store I/O) surface as `Err`; everything that goes wrong inside
    /// the run is recorded on the returned `Execution` instead.
    pub async fn execute_workflow(
        &self,
        workflow_id: &str,
        user_input: &str,
        attached_file_ids: Option<Vec<i64>>,
    ) -> Result<Execution, ExecuteError> {
        let workflow = self
            .store
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| ExecuteError::WorkflowNotFound(workflow_id.to_string()))?;

        if workflow.status != WorkflowStatus::Ready {
            return Err(ExecuteError::WorkflowNotReady {
                id: workflow_id.to_string(),
                status: workflow.status.to_string(),
            });
        }

        let mut execution = Execution::new(workflow_id, user_input);
        // Stored immediately so concurrent readers can observe it mid-flight.
        self.store.store_execution(&execution).await?;

        tracing::info!(
            execution_id = %execution.id,
            workflow_id,
            "starting workflow execution"
        );

        let budget = Duration::from_secs(self.config.max_execution_time);
        let started = Instant::now();

        let outcome = tokio::time::timeout(
            budget,
            self.run(&workflow.generated_code, user_input, attached_file_ids),
        )
        .await;

        let elapsed = started.elapsed().as_secs_f64();
        match outcome {
            Ok(Ok(result)) => {
                tracing::info!(execution_id = %execution.id, elapsed, "execution completed");
                execution.mark_completed(self.scrub(result), elapsed);
            }
            Ok(Err(error)) => {
                tracing::warn!(execution_id = %execution.id, %error, "execution failed");
                execution.mark_failed(self.scrub(error.to_string()), elapsed);
            }
            Err(_) => {
                tracing::warn!(execution_id = %execution.id, elapsed, "execution timed out");
                execution.mark_timeout(TIMEOUT_MESSAGE.to_string(), elapsed);
            }
        }

        // The terminal record is what the caller gets either way; a failed
        // write here is logged, not surfaced.
        if let Err(error) = self.store.store_execution(&execution).await {
            tracing::warn!(execution_id = %execution.id, %error, "failed to store execution record");
        }

        Ok(execution)
    }

    async fn run(
        &self,
        generated_code: &str,
        user_input: &str,
        attached_file_ids: Option<Vec<i64>>,
    ) -> Result<String, SandboxError> {
        // Credential injection happens on a private copy; the stored
        // workflow source is never touched.
        let source = inject_credentials(generated_code, &self.config);
        let user_input = user_input.to_string();
        let deadline = Instant::now() + Duration::from_secs(self.config.max_execution_time);

        // The engine is synchronous; the deadline lets its builtins unwind
        // the blocking thread shortly after the outer timeout fires instead
        // of leaving it running detached.
        tokio::task::spawn_blocking(move || {
            sandbox::run_script(&source, &user_input, attached_file_ids.as_deref(), deadline)
        })
        .await
        .map_err(|e| SandboxError::Internal(e.to_string()))?
    }

    /// One-way hygiene for the credential injection: configured secret
    /// values never appear in user-visible result or error text.
    fn scrub(&self, text: String) -> String {
        let mut scrubbed = text;
        for secret in self.config.secrets() {
            if scrubbed.contains(secret) {
                scrubbed = scrubbed.replace(secret, REDACTED);
            }
        }
        scrubbed
    }
}
