pub mod context;
pub mod document;
pub mod expansion;
pub mod report;
pub mod request;
pub mod workflow;

pub use context::ExecutionContext;
pub use document::{DocumentState, GeneratedDocument};
pub use expansion::{
    DraftHandle, DraftLine, DraftLines, ExpansionParams, LineKind, LineOverride, OverrideMap,
    TemplateDescriptor,
};
pub use report::{ExecutionOutcome, PreviewState, StepPreview, StepReport, StepState};
pub use request::{ExecutionRequest, Partner};
pub use workflow::{TemplateRef, TemplateStep, WorkflowDefinition};
