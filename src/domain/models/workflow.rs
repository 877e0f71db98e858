//! Workflow definition domain models.
//!
//! A `WorkflowDefinition` is an ordered list of `TemplateStep`s plus the
//! run-time constraints (partner requirement, amount bounds) checked before
//! execution. Definitions are long-lived and user-authored; execution order
//! is governed solely by each step's `sequence`, ties broken by definition
//! order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_true() -> bool {
    true
}

fn default_sequence() -> i32 {
    10
}

fn new_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Reference to an external journal-entry template the expansion adapter
/// knows how to expand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRef {
    #[serde(default = "new_uuid")]
    pub id: Uuid,
    pub name: String,
}

impl TemplateRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// One entry in a workflow definition: a template reference guarded by an
/// optional condition and an optional value-override expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateStep {
    #[serde(default = "new_uuid")]
    pub id: Uuid,
    /// The template this step expands.
    pub template: TemplateRef,
    /// If set, the generated document is recorded under this company
    /// instead of the definition's own.
    #[serde(default)]
    pub target_company: Option<String>,
    /// Execution order key. Lower runs first; ties keep definition order.
    #[serde(default = "default_sequence")]
    pub sequence: i32,
    /// Optional gating expression. Absent or empty means "always execute".
    #[serde(default)]
    pub condition: Option<String>,
    /// Optional expression yielding a map from line label to field
    /// overrides, e.g. `{'L1': {'amount': 50.0}}`.
    #[serde(default)]
    pub overwrite: Option<String>,
    /// If true, a failure in this step is recorded and the run continues.
    #[serde(default)]
    pub skip_on_error: bool,
}

impl TemplateStep {
    pub fn new(template: TemplateRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            template,
            target_company: None,
            sequence: 10,
            condition: None,
            overwrite: None,
            skip_on_error: false,
        }
    }

    /// The condition to evaluate, if any. An empty or whitespace-only
    /// string means the same as no condition at all: always execute.
    pub fn effective_condition(&self) -> Option<&str> {
        self.condition.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// The overwrite expression to evaluate, if any. Empty strings count
    /// as absent, like conditions.
    pub fn effective_overwrite(&self) -> Option<&str> {
        self.overwrite.as_deref().filter(|o| !o.trim().is_empty())
    }
}

/// A named, ordered template-step list plus run-time constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default = "new_uuid")]
    pub id: Uuid,
    /// Human-readable workflow name.
    pub name: String,
    /// Optional short code used to build generated-document references.
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Owning organizational unit.
    pub company: String,
    /// Default currency for runs of this workflow.
    pub currency: String,
    /// If true, a partner must be present on the execution request.
    #[serde(default)]
    pub partner_required: bool,
    /// Minimum run amount. 0 means no floor.
    #[serde(default)]
    pub amount_min: f64,
    /// Maximum run amount. 0 means unbounded.
    #[serde(default)]
    pub amount_max: f64,
    #[serde(default)]
    pub note: Option<String>,
    /// Steps in definition order. Deleting the definition deletes its steps.
    #[serde(default)]
    pub steps: Vec<TemplateStep>,
}

impl WorkflowDefinition {
    pub fn new(
        name: impl Into<String>,
        company: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            code: None,
            active: true,
            company: company.into(),
            currency: currency.into(),
            partner_required: false,
            amount_min: 0.0,
            amount_max: 0.0,
            note: None,
            steps: Vec::new(),
        }
    }

    pub fn add_step(&mut self, step: TemplateStep) {
        self.steps.push(step);
    }

    /// Steps in execution order: stable sort by `sequence` ascending, so
    /// equal sequences keep definition order.
    pub fn sorted_steps(&self) -> Vec<&TemplateStep> {
        let mut steps: Vec<&TemplateStep> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.sequence);
        steps
    }

    /// The stub used in run references: the short code when set, otherwise
    /// the first five characters of the display name. Cosmetic only.
    pub fn reference_stub(&self) -> String {
        match &self.code {
            Some(code) if !code.is_empty() => code.clone(),
            _ => self.name.chars().take(5).collect(),
        }
    }

    /// Structural data-quality issues: duplicate sequences within this
    /// definition. Expression syntax is checked separately by the evaluator.
    pub fn data_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen = std::collections::HashMap::new();
        for step in &self.steps {
            if let Some(prior) = seen.insert(step.sequence, &step.template.name) {
                issues.push(format!(
                    "Duplicate sequence {} (templates {} and {})",
                    step.sequence, prior, step.template.name
                ));
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_step(template_name: &str, sequence: i32) -> TemplateStep {
        let mut step = TemplateStep::new(TemplateRef::new(template_name));
        step.sequence = sequence;
        step
    }

    #[test]
    fn test_sorted_steps_orders_by_sequence() {
        let mut def = WorkflowDefinition::new("Monthly close", "ACME", "EUR");
        def.add_step(make_step("accrual", 20));
        def.add_step(make_step("invoice", 10));
        def.add_step(make_step("transfer", 30));

        let names: Vec<&str> = def
            .sorted_steps()
            .iter()
            .map(|s| s.template.name.as_str())
            .collect();
        assert_eq!(names, vec!["invoice", "accrual", "transfer"]);
    }

    #[test]
    fn test_sorted_steps_stable_on_ties() {
        let mut def = WorkflowDefinition::new("Tied", "ACME", "EUR");
        def.add_step(make_step("first", 10));
        def.add_step(make_step("second", 10));

        let names: Vec<&str> = def
            .sorted_steps()
            .iter()
            .map(|s| s.template.name.as_str())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_reference_stub_prefers_code() {
        let mut def = WorkflowDefinition::new("Monthly close", "ACME", "EUR");
        assert_eq!(def.reference_stub(), "Month");
        def.code = Some("MCLOSE".to_string());
        assert_eq!(def.reference_stub(), "MCLOSE");
    }

    #[test]
    fn test_reference_stub_short_name() {
        let def = WorkflowDefinition::new("VAT", "ACME", "EUR");
        assert_eq!(def.reference_stub(), "VAT");
    }

    #[test]
    fn test_empty_expressions_count_as_absent() {
        let mut step = make_step("invoice", 10);
        assert!(step.effective_condition().is_none());

        step.condition = Some(String::new());
        step.overwrite = Some("   ".to_string());
        assert!(step.effective_condition().is_none());
        assert!(step.effective_overwrite().is_none());

        step.condition = Some("amount > 0.0".to_string());
        assert_eq!(step.effective_condition(), Some("amount > 0.0"));
    }

    #[test]
    fn test_duplicate_sequences_reported() {
        let mut def = WorkflowDefinition::new("Dup", "ACME", "EUR");
        def.add_step(make_step("a", 10));
        def.add_step(make_step("b", 10));
        def.add_step(make_step("c", 20));

        let issues = def.data_issues();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("Duplicate sequence 10"));
    }

    #[test]
    fn test_yaml_round_trip_with_defaults() {
        let yaml = r"
name: Quarterly VAT
company: ACME
currency: EUR
steps:
  - template:
      name: vat-return
    sequence: 10
  - template:
      name: vat-payment
    condition: 'amount > 0.0'
";
        let def: WorkflowDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(def.active);
        assert_eq!(def.steps.len(), 2);
        assert!(!def.steps[0].skip_on_error);
        assert_eq!(def.steps[1].sequence, 10);
        assert!(def.steps[1].condition.is_some());
    }
}
