//! The workflow execution engine.
//!
//! Drives one definition's steps in sequence order against an evolving
//! execution context: evaluates per-step conditions, merges overwrites,
//! invokes the template-expansion adapter, folds each generated document
//! back into the context, and unwinds partial work on failure unless the
//! failing step is marked tolerant.
//!
//! Execution is single-threaded and synchronous per run: each step's
//! evaluation context depends on the outputs of all earlier steps, so there
//! is a hard data dependency chain, not just a convenience ordering.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ExecutionContext, ExecutionOutcome, ExecutionRequest, ExpansionParams, GeneratedDocument,
    LineKind, OverrideMap, PreviewState, StepPreview, StepReport, StepState, TemplateStep,
    WorkflowDefinition,
};
use crate::domain::ports::{DocumentStore, TemplateExpander};
use crate::services::expression::ExpressionEvaluator;
use crate::services::linker;

/// Orchestrates the step pipeline for one workflow definition.
pub struct ExecutionEngine<E: TemplateExpander, S: DocumentStore> {
    expander: Arc<E>,
    documents: Arc<S>,
    evaluator: ExpressionEvaluator,
}

impl<E: TemplateExpander, S: DocumentStore> ExecutionEngine<E, S> {
    pub fn new(expander: Arc<E>, documents: Arc<S>) -> Self {
        Self {
            expander,
            documents,
            evaluator: ExpressionEvaluator::new(),
        }
    }

    /// Execute the workflow: materialize every step whose condition holds,
    /// in sequence order, and cross-link the surviving documents.
    ///
    /// Fails with `Validation` before any side effect, `AbortedRun` when a
    /// non-tolerant step fails (prior documents reverted and deleted), and
    /// `EmptyResult` when no document survives.
    pub async fn execute(
        &self,
        definition: &WorkflowDefinition,
        request: &ExecutionRequest,
    ) -> DomainResult<ExecutionOutcome> {
        let issues = Self::validate_request(definition, request);
        if !issues.is_empty() {
            return Err(DomainError::Validation(issues));
        }

        let mut ctx = ExecutionContext::from_request(definition, request);
        let run_reference = Self::build_run_reference(definition, request);
        info!(
            workflow = %definition.name,
            reference = %run_reference,
            "executing workflow"
        );

        let mut generated: Vec<GeneratedDocument> = Vec::new();
        let mut reports: Vec<StepReport> = Vec::new();

        for step in definition.sorted_steps() {
            // Positions number generated documents consecutively: skipped
            // and failed steps do not consume one.
            let position = u32::try_from(generated.len()).unwrap_or(u32::MAX) + 1;

            let step_result: DomainResult<Option<GeneratedDocument>> = async {
                if let Some(condition) = step.effective_condition() {
                    if !self.evaluator.evaluate_condition(condition, &ctx)? {
                        return Ok(None);
                    }
                }
                let document = self
                    .dispatch_step(definition, step, &ctx, &run_reference, position)
                    .await
                    .map_err(|e| DomainError::Step {
                        template: step.template.name.clone(),
                        sequence: step.sequence,
                        cause: e.to_string(),
                    })?;
                Ok(Some(document))
            }
            .await;

            match step_result {
                Ok(None) => {
                    info!(
                        template = %step.template.name,
                        sequence = step.sequence,
                        "skipping step: condition not met"
                    );
                    reports.push(Self::report(step, StepState::Skipped, None, None));
                }
                Ok(Some(document)) => {
                    debug!(
                        template = %step.template.name,
                        document = %document.name,
                        position,
                        "step generated document"
                    );
                    reports.push(Self::report(
                        step,
                        StepState::Succeeded,
                        None,
                        Some(document.id),
                    ));
                    ctx.push_document(document.clone());
                    generated.push(document);
                }
                Err(err) if step.skip_on_error => {
                    warn!(
                        template = %step.template.name,
                        sequence = step.sequence,
                        error = %err,
                        "step failed, continuing (skip_on_error)"
                    );
                    reports.push(Self::report(
                        step,
                        StepState::FailedTolerated,
                        Some(err.to_string()),
                        None,
                    ));
                }
                Err(err) => {
                    error!(
                        template = %step.template.name,
                        sequence = step.sequence,
                        error = %err,
                        "step failed, aborting run"
                    );
                    // The step wrapper already names the template; unwrap it
                    // so the abort error states the cause once.
                    let cause = match err {
                        DomainError::Step { cause, .. } => cause,
                        other => other.to_string(),
                    };
                    reports.push(Self::report(
                        step,
                        StepState::FailedFatal,
                        Some(cause.clone()),
                        None,
                    ));
                    let compensated = self.compensate(&generated).await;
                    return Err(DomainError::AbortedRun {
                        template: step.template.name.clone(),
                        sequence: step.sequence,
                        cause,
                        compensated,
                        steps: reports,
                    });
                }
            }
        }

        if generated.is_empty() {
            return Err(DomainError::EmptyResult);
        }

        linker::link(self.documents.as_ref(), &mut generated).await?;

        Ok(ExecutionOutcome {
            reference: run_reference,
            documents: generated,
            steps: reports,
        })
    }

    /// Side-effect-free dry run: evaluate each step's condition and report
    /// the projected outcome. Never touches the expansion adapter. Call
    /// again whenever a request input changes.
    pub fn preview(
        &self,
        definition: &WorkflowDefinition,
        request: &ExecutionRequest,
    ) -> Vec<StepPreview> {
        let ctx = ExecutionContext::from_request(definition, request);
        definition
            .sorted_steps()
            .into_iter()
            .map(|step| {
                let (will_execute, state, error_message) = match step.effective_condition() {
                    None => (true, PreviewState::Valid, None),
                    Some(condition) => match self.evaluator.evaluate_condition(condition, &ctx) {
                        Ok(result) => (result, PreviewState::Valid, None),
                        Err(err) => (false, PreviewState::Error, Some(err.to_string())),
                    },
                };
                StepPreview {
                    sequence: step.sequence,
                    template_name: step.template.name.clone(),
                    condition: step.condition.clone(),
                    will_execute,
                    state,
                    error_message,
                }
            })
            .collect()
    }

    /// Preview rows for a definition before any run parameters are known:
    /// every step is pending and assumed to execute. `preview` replaces
    /// these states once a request is available.
    pub fn initial_preview(definition: &WorkflowDefinition) -> Vec<StepPreview> {
        definition
            .sorted_steps()
            .into_iter()
            .map(|step| StepPreview {
                sequence: step.sequence,
                template_name: step.template.name.clone(),
                condition: step.condition.clone(),
                will_execute: true,
                state: PreviewState::Pending,
                error_message: None,
            })
            .collect()
    }

    /// Preconditions checked before any step runs. All violations are
    /// collected and reported together.
    fn validate_request(definition: &WorkflowDefinition, request: &ExecutionRequest) -> Vec<String> {
        let mut issues = Vec::new();
        if !definition.active {
            issues.push(format!("Workflow {} is not active.", definition.name));
        }
        if request.company != definition.company {
            issues.push(format!(
                "Workflow {} belongs to company {}, not {}.",
                definition.name, definition.company, request.company
            ));
        }
        if definition.steps.is_empty() {
            issues.push("This workflow doesn't have any templates configured.".to_string());
        }
        if definition.partner_required && request.partner.is_none() {
            issues.push("Partner is required for this workflow.".to_string());
        }
        if definition.amount_min > 0.0 && request.amount < definition.amount_min {
            issues.push(format!(
                "Amount {} is below the workflow minimum {}.",
                request.amount, definition.amount_min
            ));
        }
        if definition.amount_max > 0.0 && request.amount > definition.amount_max {
            issues.push(format!(
                "Amount {} exceeds the workflow maximum {}.",
                request.amount, definition.amount_max
            ));
        }
        issues
    }

    /// Run-scoped reference used to tag generated documents. Advisory: not
    /// used for deduplication or idempotence.
    fn build_run_reference(definition: &WorkflowDefinition, request: &ExecutionRequest) -> String {
        let timestamp = Utc::now().format("%Y%m%d%H%M%S");
        let mut reference = format!("WORKFLOW/{}/{timestamp}", definition.reference_stub());
        if let Some(source) = request.source_name.as_deref() {
            if !source.is_empty() {
                reference = format!("{reference}/{source}");
            }
        }
        reference
    }

    /// Resolve one step's effective parameters and drive the adapter's
    /// expansion phases through to a finalized, workflow-tagged document.
    async fn dispatch_step(
        &self,
        definition: &WorkflowDefinition,
        step: &TemplateStep,
        ctx: &ExecutionContext,
        run_reference: &str,
        position: u32,
    ) -> DomainResult<GeneratedDocument> {
        let descriptor = self.expander.describe(step.template.id).await?;

        let params = ExpansionParams {
            template_id: step.template.id,
            // A template-defined date overrides the run's accounting date.
            date: descriptor.fixed_date.unwrap_or(ctx.date),
            company: step
                .target_company
                .clone()
                .unwrap_or_else(|| ctx.company.clone()),
            // Template journal first, then whatever the request supplied.
            journal: descriptor.journal.clone().or_else(|| ctx.journal.clone()),
            partner: ctx
                .partner
                .clone()
                .or_else(|| descriptor.default_partner.clone()),
            reference: format!("{run_reference}/{position}"),
            amount: ctx.amount,
            currency: ctx.currency.clone(),
        };

        let handle = self.expander.instantiate(params).await?;
        let lines = self.expander.load_lines(&handle).await?;

        // The run amount lands on the first input-type line; the step's
        // overwrite map wins field by field on top of that.
        let mut overrides = OverrideMap::default();
        if let Some(line) = lines.lines.iter().find(|l| l.kind == LineKind::Input) {
            overrides.set(line.label.clone(), "amount", serde_json::json!(ctx.amount));
        }
        if let Some(expression) = step.effective_overwrite() {
            overrides.merge(self.evaluator.evaluate_overwrite(expression, ctx)?);
        }
        if !overrides.is_empty() {
            self.expander.apply_overrides(&handle, &overrides).await?;
        }

        let mut document = self.expander.finalize(handle, &lines.context).await?;
        self.documents
            .tag_workflow(document.id, definition.id, position)
            .await?;
        document.workflow_id = Some(definition.id);
        document.workflow_position = Some(position);
        Ok(document)
    }

    /// Best-effort compensation on abort: revert each prior document to
    /// draft, then delete it, newest first. Compensation errors are logged
    /// and never allowed to mask the original failure. Returns whether
    /// every action succeeded.
    async fn compensate(&self, documents: &[GeneratedDocument]) -> bool {
        let mut clean = true;
        for document in documents.iter().rev() {
            if let Err(err) = self.documents.revert_to_draft(document.id).await {
                warn!(
                    document = %document.id,
                    error = %err,
                    "compensation: revert to draft failed"
                );
                clean = false;
                continue;
            }
            if let Err(err) = self.documents.delete(document.id).await {
                warn!(
                    document = %document.id,
                    error = %err,
                    "compensation: delete failed"
                );
                clean = false;
            }
        }
        clean
    }

    fn report(
        step: &TemplateStep,
        state: StepState,
        error: Option<String>,
        document_id: Option<uuid::Uuid>,
    ) -> StepReport {
        StepReport {
            sequence: step.sequence,
            template_name: step.template.name.clone(),
            state,
            error,
            document_id,
        }
    }
}
