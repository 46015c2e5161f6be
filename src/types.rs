use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Created,
    Generating,
    Ready,
    Failed,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkflowStatus::Created => "created",
            WorkflowStatus::Generating => "generating",
            WorkflowStatus::Ready => "ready",
            WorkflowStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A stored workflow: a natural-language description paired with generated
/// script source and a lifecycle status.
///
/// The generator collaborator creates these; the executor only reads them.
/// `generated_code` is immutable once the status reaches `Ready`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workflow {
    pub id: String,
    pub name: Option<String>,
    pub description: String,
    pub generated_code: String,
    pub status: WorkflowStatus,

    /// Opaque context bag passed through from generation; not consumed here.
    #[serde(default)]
    pub context: JsonValue,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Last error message, set only when status is `Failed`.
    pub error: Option<String>,
}

impl Workflow {
    /// Construct a workflow that is already ready for execution.
    ///
    /// Used by the CLI (registering a script file) and by tests; the normal
    /// path has the generator collaborator drive the status transitions.
    pub fn ready(name: Option<String>, description: &str, generated_code: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            description: description.to_string(),
            generated_code: generated_code.to_string(),
            status: WorkflowStatus::Ready,
            context: JsonValue::Null,
            created_at: now,
            updated_at: now,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Timeout,
}

/// One run of a workflow's entry point against a specific input.
///
/// Created in the `Running` state at the start of `execute_workflow`,
/// transitioned exactly once to a terminal state before that call returns,
/// and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Execution {
    pub id: String,
    pub workflow_id: String,
    pub user_input: String,
    pub status: ExecutionStatus,

    pub result: Option<String>,
    pub error: Option<String>,

    /// Elapsed wall-clock seconds, recorded for every terminal state.
    pub execution_time: Option<f64>,

    pub created_at: DateTime<Utc>,
}

impl Execution {
    pub fn new(workflow_id: &str, user_input: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.to_string(),
            user_input: user_input.to_string(),
            status: ExecutionStatus::Running,
            result: None,
            error: None,
            execution_time: None,
            created_at: Utc::now(),
        }
    }

    pub fn mark_completed(&mut self, result: String, execution_time: f64) {
        self.status = ExecutionStatus::Completed;
        self.result = Some(result);
        self.execution_time = Some(execution_time);
    }

    pub fn mark_failed(&mut self, error: String, execution_time: f64) {
        self.status = ExecutionStatus::Failed;
        self.error = Some(error);
        self.execution_time = Some(execution_time);
    }

    pub fn mark_timeout(&mut self, error: String, execution_time: f64) {
        self.status = ExecutionStatus::Timeout;
        self.error = Some(error);
        self.execution_time = Some(execution_time);
    }

    pub fn is_terminal(&self) -> bool {
        self.status != ExecutionStatus::Running
    }
}
