//! Per-step and per-run outcome reporting.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::GeneratedDocument;

/// Terminal state of one step within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// Condition evaluated falsy; the step never reached the adapter.
    Skipped,
    Succeeded,
    /// Failed on a step with `skip_on_error = true`; the run continued.
    FailedTolerated,
    /// Failed on a non-tolerant step; the run aborted here.
    FailedFatal,
}

impl std::fmt::Display for StepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skipped => write!(f, "skipped"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::FailedTolerated => write!(f, "failed_tolerated"),
            Self::FailedFatal => write!(f, "failed_fatal"),
        }
    }
}

/// What happened to one step, for diagnostics and CLI display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub sequence: i32,
    pub template_name: String,
    pub state: StepState,
    pub error: Option<String>,
    pub document_id: Option<Uuid>,
}

/// The successful result of one `execute` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// The run-scoped reference the generated documents were tagged with.
    pub reference: String,
    /// Documents that survived the run, in dispatch order, cross-linked.
    pub documents: Vec<GeneratedDocument>,
    pub steps: Vec<StepReport>,
}

/// Projected validity of one step's condition in preview mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewState {
    Valid,
    Error,
    Pending,
}

impl std::fmt::Display for PreviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Error => write!(f, "error"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

/// Per-step projected outcome of a side-effect-free preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepPreview {
    pub sequence: i32,
    pub template_name: String,
    pub condition: Option<String>,
    pub will_execute: bool,
    pub state: PreviewState,
    pub error_message: Option<String>,
}
