//! Workflow definition CLI commands.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::WorkflowDefinition;
use crate::domain::ports::DefinitionRepository;
use crate::infrastructure::Config;
use crate::services::ExpressionEvaluator;

#[derive(Args, Debug)]
pub struct WorkflowArgs {
    #[command(subcommand)]
    pub command: WorkflowCommands,
}

#[derive(Subcommand, Debug)]
pub enum WorkflowCommands {
    /// List stored workflow definitions
    List,
    /// Show one definition with its steps
    Show {
        /// Workflow name
        name: String,
    },
    /// Check a definition's structure and expression syntax
    Validate {
        /// Workflow name
        name: String,
    },
    /// Import a definition from a YAML file
    Import {
        /// Path to the definition file
        file: PathBuf,
    },
    /// Delete a definition and its steps
    Delete {
        /// Workflow name
        name: String,
    },
}

// ── Output structs ──────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct WorkflowSummary {
    name: String,
    code: Option<String>,
    company: String,
    currency: String,
    step_count: usize,
    active: bool,
}

#[derive(Debug, serde::Serialize)]
struct WorkflowListOutput {
    workflows: Vec<WorkflowSummary>,
}

impl CommandOutput for WorkflowListOutput {
    fn to_human(&self) -> String {
        if self.workflows.is_empty() {
            return "No workflow definitions stored.".to_string();
        }
        let mut lines = vec!["Workflow definitions:".to_string()];
        for wf in &self.workflows {
            let inactive = if wf.active { "" } else { " (inactive)" };
            let code = wf.code.as_deref().unwrap_or("-");
            lines.push(format!(
                "  {} [{}] — {} {}, {} steps{}",
                wf.name, code, wf.company, wf.currency, wf.step_count, inactive
            ));
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
struct StepDetail {
    sequence: i32,
    template: String,
    condition: Option<String>,
    overwrite: Option<String>,
    skip_on_error: bool,
    target_company: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct WorkflowDetailOutput {
    name: String,
    code: Option<String>,
    company: String,
    currency: String,
    partner_required: bool,
    amount_min: f64,
    amount_max: f64,
    steps: Vec<StepDetail>,
}

impl CommandOutput for WorkflowDetailOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Workflow: {}", self.name),
            format!("Company: {} / Currency: {}", self.company, self.currency),
        ];
        if let Some(code) = &self.code {
            lines.push(format!("Code: {code}"));
        }
        if self.partner_required {
            lines.push("Partner required: yes".to_string());
        }
        if self.amount_min > 0.0 || self.amount_max > 0.0 {
            lines.push(format!(
                "Amount bounds: {} .. {}",
                self.amount_min, self.amount_max
            ));
        }
        lines.push(format!("Steps ({}):", self.steps.len()));
        for step in &self.steps {
            lines.push(format!("\n  {}. {}", step.sequence, step.template));
            if let Some(condition) = &step.condition {
                lines.push(format!("     Condition: {}", truncate(condition, 60)));
            }
            if let Some(overwrite) = &step.overwrite {
                lines.push(format!("     Overwrite: {}", truncate(overwrite, 60)));
            }
            if let Some(target) = &step.target_company {
                lines.push(format!("     Target company: {target}"));
            }
            if step.skip_on_error {
                lines.push("     Skip on error: yes".to_string());
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
struct ValidateOutput {
    name: String,
    valid: bool,
    issues: Vec<String>,
}

impl CommandOutput for ValidateOutput {
    fn to_human(&self) -> String {
        if self.valid {
            format!("{} — OK", self.name)
        } else {
            let mut lines = vec![format!("{} — {} issue(s):", self.name, self.issues.len())];
            for issue in &self.issues {
                lines.push(format!("  - {issue}"));
            }
            lines.join("\n")
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ImportOutput {
    name: String,
    id: String,
    step_count: usize,
}

impl CommandOutput for ImportOutput {
    fn to_human(&self) -> String {
        format!(
            "Imported workflow {} ({} steps) as {}",
            self.name, self.step_count, self.id
        )
    }
}

#[derive(Debug, serde::Serialize)]
struct DeleteOutput {
    name: String,
}

impl CommandOutput for DeleteOutput {
    fn to_human(&self) -> String {
        format!("Deleted workflow {}", self.name)
    }
}

// ── Command dispatch ────────────────────────────────────────────────────

pub async fn execute(args: WorkflowArgs, json_mode: bool, config: &Config) -> Result<()> {
    let repo = super::open_repository(config).await?;

    match args.command {
        WorkflowCommands::List => {
            let definitions = repo.list(None).await?;
            let out = WorkflowListOutput {
                workflows: definitions
                    .iter()
                    .map(|d| WorkflowSummary {
                        name: d.name.clone(),
                        code: d.code.clone(),
                        company: d.company.clone(),
                        currency: d.currency.clone(),
                        step_count: d.steps.len(),
                        active: d.active,
                    })
                    .collect(),
            };
            output(&out, json_mode);
        }
        WorkflowCommands::Show { name } => {
            let definition = find_definition(&repo, &name).await?;
            let out = WorkflowDetailOutput {
                name: definition.name.clone(),
                code: definition.code.clone(),
                company: definition.company.clone(),
                currency: definition.currency.clone(),
                partner_required: definition.partner_required,
                amount_min: definition.amount_min,
                amount_max: definition.amount_max,
                steps: definition
                    .sorted_steps()
                    .into_iter()
                    .map(|s| StepDetail {
                        sequence: s.sequence,
                        template: s.template.name.clone(),
                        condition: s.condition.clone(),
                        overwrite: s.overwrite.clone(),
                        skip_on_error: s.skip_on_error,
                        target_company: s.target_company.clone(),
                    })
                    .collect(),
            };
            output(&out, json_mode);
        }
        WorkflowCommands::Validate { name } => {
            let definition = find_definition(&repo, &name).await?;
            let issues = ExpressionEvaluator::validate_definition(&definition);
            let out = ValidateOutput {
                name: definition.name,
                valid: issues.is_empty(),
                issues,
            };
            output(&out, json_mode);
        }
        WorkflowCommands::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let definition: WorkflowDefinition =
                serde_yaml::from_str(&content).context("failed to parse definition file")?;

            let issues = ExpressionEvaluator::validate_definition(&definition);
            if !issues.is_empty() {
                bail!("definition rejected:\n  - {}", issues.join("\n  - "));
            }
            repo.save(&definition).await?;

            let out = ImportOutput {
                name: definition.name.clone(),
                id: definition.id.to_string(),
                step_count: definition.steps.len(),
            };
            output(&out, json_mode);
        }
        WorkflowCommands::Delete { name } => {
            let definition = find_definition(&repo, &name).await?;
            repo.delete(definition.id).await?;
            output(
                &DeleteOutput {
                    name: definition.name,
                },
                json_mode,
            );
        }
    }
    Ok(())
}

async fn find_definition(
    repo: &impl DefinitionRepository,
    name: &str,
) -> Result<WorkflowDefinition> {
    repo.find_by_name(name)
        .await?
        .with_context(|| format!("no workflow definition named {name}"))
}
