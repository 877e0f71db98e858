//! Domain errors for the Ledgerflow workflow engine.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::StepReport;

/// Join a batch of validation issues into one readable message.
fn format_issues(issues: &[String]) -> String {
    issues.join("\n")
}

/// Domain-level errors that can occur during workflow definition handling
/// and execution.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Preconditions violated before any step ran. Always reported as a
    /// batch, never one at a time.
    #[error("Validation failed:\n{}", format_issues(.0))]
    Validation(Vec<String>),

    /// A condition or overwrite expression failed to evaluate.
    #[error("Error evaluating expression `{expression}`: {cause}")]
    Expression { expression: String, cause: String },

    /// The expansion adapter failed while materializing one step.
    #[error("Error executing template {template} (sequence {sequence}): {cause}")]
    Step {
        template: String,
        sequence: i32,
        cause: String,
    },

    /// A step failed with `skip_on_error = false`; prior documents were
    /// reverted and deleted before this error propagated.
    #[error("Workflow aborted at template {template} (sequence {sequence}): {cause}")]
    AbortedRun {
        template: String,
        sequence: i32,
        cause: String,
        /// Whether every compensation action (revert + delete) succeeded.
        compensated: bool,
        /// Per-step reports up to and including the fatal step.
        steps: Vec<StepReport>,
    },

    /// The run completed but no document survived.
    #[error("No journal entries were created. Please check template conditions.")]
    EmptyResult,

    #[error("Workflow definition not found: {0}")]
    DefinitionNotFound(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(Uuid),

    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Template expansion failed: {0}")]
    ExpansionFailed(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}
