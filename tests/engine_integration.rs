//! End-to-end engine tests against the in-memory expansion adapter.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use ledgerflow::adapters::expansion::{InMemoryDocumentStore, MockExpander, MockTemplate};
use ledgerflow::domain::models::{StepState, TemplateRef, TemplateStep};
use ledgerflow::{
    DomainError, ExecutionEngine, ExecutionRequest, Partner, WorkflowDefinition,
};

struct Harness {
    expander: Arc<MockExpander>,
    store: Arc<InMemoryDocumentStore>,
    engine: ExecutionEngine<MockExpander, InMemoryDocumentStore>,
}

impl Harness {
    fn new() -> Self {
        let expander = Arc::new(MockExpander::new());
        let store = expander.store();
        let engine = ExecutionEngine::new(Arc::clone(&expander), Arc::clone(&store));
        Self {
            expander,
            store,
            engine,
        }
    }
}

fn definition() -> WorkflowDefinition {
    WorkflowDefinition::new("Monthly close", "ACME", "EUR")
}

fn step(template_name: &str, sequence: i32) -> TemplateStep {
    let mut step = TemplateStep::new(TemplateRef::new(template_name));
    step.sequence = sequence;
    step
}

async fn register_success(harness: &Harness, step: &TemplateStep) {
    harness
        .expander
        .register(
            step.template.id,
            MockTemplate::success(step.template.name.clone()),
        )
        .await;
}

async fn register_failure(harness: &Harness, step: &TemplateStep, message: &str) {
    harness
        .expander
        .register(
            step.template.id,
            MockTemplate::failure(step.template.name.clone(), message),
        )
        .await;
}

fn request(amount: f64) -> ExecutionRequest {
    let mut request = ExecutionRequest::new("ACME", amount);
    request.date = NaiveDate::from_ymd_opt(2026, 3, 31);
    request
}

// ── Happy path ──────────────────────────────────────────────────────────

#[tokio::test]
async fn two_steps_execute_in_order_and_link() {
    let harness = Harness::new();
    let mut def = definition();
    let s1 = step("invoice", 10);
    let s2 = step("accrual", 20);
    register_success(&harness, &s1).await;
    register_success(&harness, &s2).await;
    def.add_step(s1);
    def.add_step(s2);

    let outcome = harness.engine.execute(&def, &request(250.0)).await.unwrap();

    assert_eq!(outcome.documents.len(), 2);
    assert_eq!(outcome.documents[0].template_name, "invoice");
    assert_eq!(outcome.documents[1].template_name, "accrual");
    assert_eq!(outcome.documents[0].workflow_position, Some(1));
    assert_eq!(outcome.documents[1].workflow_position, Some(2));

    // cross-linked both ways, excluding self
    let (a, b) = (&outcome.documents[0], &outcome.documents[1]);
    assert_eq!(a.related, vec![b.id]);
    assert_eq!(b.related, vec![a.id]);

    // stored copies carry the same links
    let stored_a = harness.store.get(a.id).await.unwrap();
    assert_eq!(stored_a.related, vec![b.id]);
    assert_eq!(stored_a.workflow_id, Some(def.id));
}

#[tokio::test]
async fn steps_run_by_sequence_not_definition_order() {
    let harness = Harness::new();
    let mut def = definition();
    let late = step("late", 30);
    let early = step("early", 10);
    register_success(&harness, &late).await;
    register_success(&harness, &early).await;
    def.add_step(late);
    def.add_step(early);

    let outcome = harness.engine.execute(&def, &request(100.0)).await.unwrap();
    let order: Vec<&str> = outcome
        .documents
        .iter()
        .map(|d| d.template_name.as_str())
        .collect();
    assert_eq!(order, vec!["early", "late"]);
}

#[tokio::test]
async fn run_amount_lands_on_input_line() {
    let harness = Harness::new();
    let mut def = definition();
    let s1 = step("invoice", 10);
    register_success(&harness, &s1).await;
    def.add_step(s1);

    let outcome = harness.engine.execute(&def, &request(321.5)).await.unwrap();
    assert_eq!(outcome.documents[0].amount, 321.5);

    let applied = harness.expander.applied_overrides().await;
    assert_eq!(applied.len(), 1);
    let l1 = applied[0].1.get("L1").unwrap();
    assert_eq!(l1["amount"], serde_json::json!(321.5));
}

#[tokio::test]
async fn template_journal_wins_over_request_journal() {
    let harness = Harness::new();
    let mut def = definition();
    let s1 = step("invoice", 10);
    let s2 = step("accrual", 20);
    let mut tpl = MockTemplate::success("invoice");
    tpl.journal = Some("SALES".to_string());
    harness.expander.register(s1.template.id, tpl).await;
    register_success(&harness, &s2).await;
    def.add_step(s1);
    def.add_step(s2);

    let mut req = request(100.0);
    req.journal = Some("MISC".to_string());
    let outcome = harness.engine.execute(&def, &req).await.unwrap();

    assert_eq!(outcome.documents[0].journal.as_deref(), Some("SALES"));
    // no template journal: the request's applies
    assert_eq!(outcome.documents[1].journal.as_deref(), Some("MISC"));
}

#[tokio::test]
async fn line_load_context_reaches_finalize() {
    let harness = Harness::new();
    let mut def = definition();
    let s1 = step("invoice", 10);
    let mut tpl = MockTemplate::success("invoice");
    tpl.line_context
        .insert("move_type".to_string(), serde_json::json!("entry"));
    harness.expander.register(s1.template.id, tpl).await;
    def.add_step(s1);

    harness.engine.execute(&def, &request(100.0)).await.unwrap();

    let contexts = harness.expander.finalize_contexts().await;
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0]["move_type"], serde_json::json!("entry"));
}

#[tokio::test]
async fn empty_condition_and_overwrite_mean_always_execute() {
    let harness = Harness::new();
    let mut def = definition();
    let mut s1 = step("invoice", 10);
    s1.condition = Some(String::new());
    s1.overwrite = Some("   ".to_string());
    register_success(&harness, &s1).await;
    def.add_step(s1);

    let outcome = harness.engine.execute(&def, &request(100.0)).await.unwrap();
    assert_eq!(outcome.documents.len(), 1);
    assert_eq!(outcome.steps[0].state, StepState::Succeeded);

    // only the implicit run-amount push reached the adapter
    let applied = harness.expander.applied_overrides().await;
    assert_eq!(applied.len(), 1);
    assert_eq!(
        applied[0].1.get("L1").unwrap()["amount"],
        serde_json::json!(100.0)
    );
}

// ── Condition gating and context propagation ────────────────────────────

#[tokio::test]
async fn false_condition_skips_step() {
    let harness = Harness::new();
    let mut def = definition();
    let s1 = step("invoice", 10);
    let mut s2 = step("accrual", 20);
    s2.condition = Some("amount > 1000.0".to_string());
    register_success(&harness, &s1).await;
    register_success(&harness, &s2).await;
    def.add_step(s1);
    def.add_step(s2);

    let outcome = harness.engine.execute(&def, &request(100.0)).await.unwrap();
    assert_eq!(outcome.documents.len(), 1);
    assert_eq!(outcome.steps[1].state, StepState::Skipped);
    // a skipped step does not consume a position
    assert_eq!(outcome.documents[0].workflow_position, Some(1));
}

#[tokio::test]
async fn later_condition_sees_earlier_documents() {
    let harness = Harness::new();
    let mut def = definition();
    let s1 = step("invoice", 10);
    let mut s2 = step("accrual", 20);
    s2.condition = Some("size(previous_documents) > 0 && previous_documents[0].template == 'invoice'".to_string());
    register_success(&harness, &s1).await;
    register_success(&harness, &s2).await;
    def.add_step(s1);
    def.add_step(s2);

    let outcome = harness.engine.execute(&def, &request(100.0)).await.unwrap();
    assert_eq!(outcome.documents.len(), 2);
}

#[tokio::test]
async fn all_conditions_false_is_empty_result() {
    let harness = Harness::new();
    let mut def = definition();
    let mut s1 = step("invoice", 10);
    s1.condition = Some("amount > 1000.0".to_string());
    register_success(&harness, &s1).await;
    def.add_step(s1);

    let err = harness
        .engine
        .execute(&def, &request(100.0))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::EmptyResult));
    assert_eq!(harness.store.count().await, 0);
}

#[tokio::test]
async fn condition_error_is_a_step_failure_not_a_skip() {
    let harness = Harness::new();
    let mut def = definition();
    let mut s1 = step("invoice", 10);
    s1.condition = Some("no_such_var > 1".to_string());
    s1.skip_on_error = true;
    let s2 = step("accrual", 20);
    register_success(&harness, &s1).await;
    register_success(&harness, &s2).await;
    def.add_step(s1);
    def.add_step(s2);

    let outcome = harness.engine.execute(&def, &request(100.0)).await.unwrap();
    assert_eq!(outcome.steps[0].state, StepState::FailedTolerated);
    assert!(outcome.steps[0].error.as_deref().unwrap().contains("no_such_var"));
    assert_eq!(outcome.documents.len(), 1);
}

// ── Failure handling ────────────────────────────────────────────────────

#[tokio::test]
async fn fatal_failure_aborts_and_compensates() {
    let harness = Harness::new();
    let mut def = definition();
    let s1 = step("invoice", 10);
    let s2 = step("broken", 20);
    register_success(&harness, &s1).await;
    register_failure(&harness, &s2, "unbalanced entry").await;
    def.add_step(s1);
    def.add_step(s2);

    let err = harness
        .engine
        .execute(&def, &request(100.0))
        .await
        .unwrap_err();

    match err {
        DomainError::AbortedRun {
            template,
            sequence,
            cause,
            compensated,
            steps,
        } => {
            assert_eq!(template, "broken");
            assert_eq!(sequence, 20);
            assert!(cause.contains("unbalanced entry"));
            assert!(compensated);
            // the report trail ends at the fatal step
            assert_eq!(steps.len(), 2);
            assert_eq!(steps[0].state, StepState::Succeeded);
            assert_eq!(steps[1].state, StepState::FailedFatal);
        }
        other => panic!("expected aborted run, got {other}"),
    }

    // step 1's document was reverted and deleted
    assert_eq!(harness.store.count().await, 0);
    assert_eq!(harness.store.deleted_ids().await.len(), 1);
}

#[tokio::test]
async fn tolerated_failure_keeps_prior_documents() {
    let harness = Harness::new();
    let mut def = definition();
    let s1 = step("invoice", 10);
    let mut s2 = step("flaky", 20);
    s2.skip_on_error = true;
    let s3 = step("transfer", 30);
    register_success(&harness, &s1).await;
    register_failure(&harness, &s2, "temporary outage").await;
    register_success(&harness, &s3).await;
    def.add_step(s1);
    def.add_step(s2);
    def.add_step(s3);

    let outcome = harness.engine.execute(&def, &request(100.0)).await.unwrap();

    assert_eq!(outcome.documents.len(), 2);
    assert_eq!(outcome.steps[1].state, StepState::FailedTolerated);
    // the failed step did not consume a position
    assert_eq!(outcome.documents[1].workflow_position, Some(2));
    assert_eq!(harness.store.count().await, 2);
    assert!(harness.store.deleted_ids().await.is_empty());
}

#[tokio::test]
async fn compensation_failure_never_masks_the_original_error() {
    let harness = Harness::new();
    let mut def = definition();
    let s1 = step("invoice", 10);
    let s2 = step("broken", 20);
    register_success(&harness, &s1).await;
    register_failure(&harness, &s2, "unbalanced entry").await;
    def.add_step(s1);
    def.add_step(s2);

    harness.store.poison_all_reverts().await;

    let err = harness
        .engine
        .execute(&def, &request(100.0))
        .await
        .unwrap_err();
    match err {
        DomainError::AbortedRun {
            cause, compensated, ..
        } => {
            assert!(cause.contains("unbalanced entry"));
            assert!(!compensated);
        }
        other => panic!("expected aborted run, got {other}"),
    }

    // step 1's document is stranded but still present
    assert_eq!(harness.store.count().await, 1);
    assert!(harness.store.deleted_ids().await.is_empty());
}

// ── Validation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn amount_below_minimum_is_rejected_before_any_side_effect() {
    let harness = Harness::new();
    let mut def = definition();
    def.amount_min = 500.0;
    let s1 = step("invoice", 10);
    register_success(&harness, &s1).await;
    def.add_step(s1);

    let err = harness
        .engine
        .execute(&def, &request(100.0))
        .await
        .unwrap_err();
    match err {
        DomainError::Validation(issues) => {
            assert_eq!(issues.len(), 1);
            assert!(issues[0].contains("below"));
        }
        other => panic!("expected validation failure, got {other}"),
    }
    assert_eq!(harness.store.count().await, 0);
}

#[tokio::test]
async fn inactive_definition_is_rejected() {
    let harness = Harness::new();
    let mut def = definition();
    def.active = false;
    let s1 = step("invoice", 10);
    register_success(&harness, &s1).await;
    def.add_step(s1);

    let err = harness
        .engine
        .execute(&def, &request(100.0))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn partner_requirement_enforced() {
    let harness = Harness::new();
    let mut def = definition();
    def.partner_required = true;
    let s1 = step("invoice", 10);
    register_success(&harness, &s1).await;
    def.add_step(s1);

    let err = harness
        .engine
        .execute(&def, &request(100.0))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let mut req = request(100.0);
    req.partner = Some(Partner::new("North Wind"));
    assert!(harness.engine.execute(&def, &req).await.is_ok());
}

// ── Overwrites ──────────────────────────────────────────────────────────

#[tokio::test]
async fn overwrite_expression_reaches_the_adapter() {
    let harness = Harness::new();
    let mut def = definition();
    let mut s1 = step("invoice", 10);
    s1.overwrite = Some("{'L1': {'amount': 50.0}}".to_string());
    register_success(&harness, &s1).await;
    def.add_step(s1);

    let outcome = harness.engine.execute(&def, &request(100.0)).await.unwrap();

    // the explicit overwrite wins over the implicit run-amount push
    assert_eq!(outcome.documents[0].amount, 50.0);
    let applied = harness.expander.applied_overrides().await;
    assert_eq!(applied[0].1.get("L1").unwrap()["amount"], serde_json::json!(50.0));
}

#[tokio::test]
async fn overwrite_merges_field_by_field_over_amount_push() {
    let harness = Harness::new();
    let mut def = definition();
    let mut s1 = step("invoice", 10);
    s1.overwrite = Some("{'L1': {'name': 'Custom label'}}".to_string());
    register_success(&harness, &s1).await;
    def.add_step(s1);

    let outcome = harness.engine.execute(&def, &request(100.0)).await.unwrap();

    // the implicit amount survives because the overwrite only set `name`
    assert_eq!(outcome.documents[0].amount, 100.0);
    let applied = harness.expander.applied_overrides().await;
    let l1 = applied[0].1.get("L1").unwrap();
    assert_eq!(l1["amount"], serde_json::json!(100.0));
    assert_eq!(l1["name"], serde_json::json!("Custom label"));
}

// ── Preview ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn preview_reports_without_side_effects() {
    let harness = Harness::new();
    let mut def = definition();
    let mut s1 = step("invoice", 10);
    s1.condition = Some(String::new());
    let mut s2 = step("accrual", 20);
    s2.condition = Some("amount > 1000.0".to_string());
    let mut s3 = step("transfer", 30);
    s3.condition = Some("not valid cel (".to_string());
    register_success(&harness, &s1).await;
    register_success(&harness, &s2).await;
    register_success(&harness, &s3).await;
    def.add_step(s1);
    def.add_step(s2);
    def.add_step(s3);

    let previews = harness.engine.preview(&def, &request(100.0));

    assert_eq!(previews.len(), 3);
    assert!(previews[0].will_execute);
    assert!(!previews[1].will_execute);
    assert!(!previews[2].will_execute);
    assert!(previews[2].error_message.is_some());
    assert_eq!(harness.store.count().await, 0);
}

// ── Missing template ────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_template_fails_the_step() {
    let harness = Harness::new();
    let mut def = definition();
    // nothing registered for this step's template
    def.add_step(step("ghost", 10));

    let err = harness
        .engine
        .execute(&def, &request(100.0))
        .await
        .unwrap_err();
    match err {
        DomainError::AbortedRun { template, .. } => assert_eq!(template, "ghost"),
        other => panic!("expected aborted run, got {other}"),
    }
}

// ── Reference shape ─────────────────────────────────────────────────────

#[tokio::test]
async fn documents_carry_positional_references() {
    let harness = Harness::new();
    let mut def = definition();
    def.code = Some("MCLOSE".to_string());
    let s1 = step("invoice", 10);
    let s2 = step("accrual", 20);
    register_success(&harness, &s1).await;
    register_success(&harness, &s2).await;
    def.add_step(s1);
    def.add_step(s2);

    let mut req = request(100.0);
    req.source_name = Some("SRC-42".to_string());
    let outcome = harness.engine.execute(&def, &req).await.unwrap();

    assert!(outcome.reference.starts_with("WORKFLOW/MCLOSE/"));
    assert!(outcome.reference.ends_with("/SRC-42"));
    assert_eq!(
        outcome.documents[0].reference,
        format!("{}/1", outcome.reference)
    );
    assert_eq!(
        outcome.documents[1].reference,
        format!("{}/2", outcome.reference)
    );
}

// ── Linking edge case ───────────────────────────────────────────────────

#[tokio::test]
async fn single_document_is_not_linked() {
    let harness = Harness::new();
    let mut def = definition();
    let s1 = step("invoice", 10);
    register_success(&harness, &s1).await;
    def.add_step(s1);

    let outcome = harness.engine.execute(&def, &request(100.0)).await.unwrap();
    assert_eq!(outcome.documents.len(), 1);
    assert!(outcome.documents[0].related.is_empty());
}

#[tokio::test]
async fn three_documents_link_symmetrically() {
    let harness = Harness::new();
    let mut def = definition();
    let steps: Vec<TemplateStep> = (1..=3).map(|i| step(&format!("t{i}"), i * 10)).collect();
    for s in &steps {
        register_success(&harness, s).await;
    }
    for s in steps {
        def.add_step(s);
    }

    let outcome = harness.engine.execute(&def, &request(100.0)).await.unwrap();
    assert_eq!(outcome.documents.len(), 3);

    let ids: Vec<Uuid> = outcome.documents.iter().map(|d| d.id).collect();
    for doc in &outcome.documents {
        assert_eq!(doc.related.len(), 2);
        assert!(!doc.related.contains(&doc.id));
        for other in &ids {
            if *other != doc.id {
                assert!(doc.related.contains(other));
            }
        }
    }
}
