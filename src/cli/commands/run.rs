//! Run commands: dry-run preview and execution against the demo adapter.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use comfy_table::{presets, Cell, Table};

use crate::adapters::expansion::{MockExpander, MockTemplate};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{
    ExecutionOutcome, ExecutionRequest, Partner, StepPreview, WorkflowDefinition,
};
use crate::domain::ports::DefinitionRepository;
use crate::infrastructure::Config;
use crate::services::ExecutionEngine;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(subcommand)]
    pub command: RunCommands,
}

#[derive(Args, Debug)]
pub struct RunParams {
    /// Workflow definition name
    #[arg(long)]
    pub workflow: String,

    /// Run amount
    #[arg(long)]
    pub amount: f64,

    /// Partner name
    #[arg(long)]
    pub partner: Option<String>,

    /// Currency code; defaults to the workflow's
    #[arg(long)]
    pub currency: Option<String>,

    /// Accounting date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Journal for steps whose template does not set one
    #[arg(long)]
    pub journal: Option<String>,

    /// Free-text reference
    #[arg(long)]
    pub reference: Option<String>,

    /// Name of the triggering document, for traceability
    #[arg(long)]
    pub source: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum RunCommands {
    /// Evaluate step conditions without creating anything
    Preview(RunParams),
    /// Execute the workflow against the in-memory demo adapter
    Execute(RunParams),
}

// ── Output structs ──────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct PreviewOutput {
    workflow: String,
    steps: Vec<StepPreview>,
}

impl CommandOutput for PreviewOutput {
    fn to_human(&self) -> String {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL);
        table.set_header(vec!["Seq", "Template", "Condition", "Will execute", "State"]);
        for step in &self.steps {
            let condition = step.condition.as_deref().unwrap_or("-");
            let note = step
                .error_message
                .as_deref()
                .map_or_else(|| step.state.to_string(), ToString::to_string);
            table.add_row(vec![
                Cell::new(step.sequence),
                Cell::new(&step.template_name),
                Cell::new(truncate(condition, 40)),
                Cell::new(if step.will_execute { "yes" } else { "no" }),
                Cell::new(truncate(&note, 40)),
            ]);
        }
        format!("Preview of {}:\n{table}", self.workflow)
    }
}

#[derive(Debug, serde::Serialize)]
struct ExecuteOutput {
    workflow: String,
    #[serde(flatten)]
    outcome: ExecutionOutcome,
}

impl CommandOutput for ExecuteOutput {
    fn to_human(&self) -> String {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL);
        table.set_header(vec!["#", "Document", "Template", "Amount", "Date", "Linked"]);
        for doc in &self.outcome.documents {
            table.add_row(vec![
                Cell::new(doc.workflow_position.unwrap_or_default()),
                Cell::new(&doc.name),
                Cell::new(&doc.template_name),
                Cell::new(format!("{:.2} {}", doc.amount, doc.currency)),
                Cell::new(doc.date),
                Cell::new(doc.related.len()),
            ]);
        }
        format!(
            "Executed {} as {} ({} document(s)):\n{table}",
            self.workflow,
            self.outcome.reference,
            self.outcome.documents.len()
        )
    }
}

// ── Command dispatch ────────────────────────────────────────────────────

pub async fn execute(args: RunArgs, json_mode: bool, config: &Config) -> Result<()> {
    let repo = super::open_repository(config).await?;

    match args.command {
        RunCommands::Preview(params) => {
            let definition = load_definition(&repo, &params.workflow).await?;
            let request = build_request(&definition, &params);
            let engine = demo_engine(&definition).await;

            let steps = engine.preview(&definition, &request);
            output(
                &PreviewOutput {
                    workflow: definition.name,
                    steps,
                },
                json_mode,
            );
        }
        RunCommands::Execute(params) => {
            let definition = load_definition(&repo, &params.workflow).await?;
            let request = build_request(&definition, &params);
            let engine = demo_engine(&definition).await;

            let outcome = engine.execute(&definition, &request).await?;
            output(
                &ExecuteOutput {
                    workflow: definition.name,
                    outcome,
                },
                json_mode,
            );
        }
    }
    Ok(())
}

async fn load_definition(
    repo: &impl DefinitionRepository,
    name: &str,
) -> Result<WorkflowDefinition> {
    repo.find_by_name(name)
        .await?
        .with_context(|| format!("no workflow definition named {name}"))
}

fn build_request(definition: &WorkflowDefinition, params: &RunParams) -> ExecutionRequest {
    let mut request = ExecutionRequest::new(definition.company.clone(), params.amount);
    request.partner = params.partner.clone().map(Partner::new);
    request.currency = params.currency.clone();
    request.date = params.date;
    request.journal = params.journal.clone();
    request.reference = params.reference.clone();
    request.source_name = params.source.clone();
    request
}

/// Wire an engine against the in-memory expander, with a two-leg template
/// registered for every step of the definition.
async fn demo_engine(
    definition: &WorkflowDefinition,
) -> ExecutionEngine<MockExpander, crate::adapters::expansion::InMemoryDocumentStore> {
    let expander = Arc::new(MockExpander::new());
    for step in &definition.steps {
        expander
            .register(
                step.template.id,
                MockTemplate::success(step.template.name.clone()),
            )
            .await;
    }
    let store = expander.store();
    ExecutionEngine::new(expander, store)
}
