//! Execution request model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A business partner referenced by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub id: Uuid,
    pub name: String,
}

impl Partner {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// The input to one `execute` or `preview` call. Transient: created at the
/// start of the run and discarded at its end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Organizational unit the run executes under. Must match the
    /// definition's company.
    pub company: String,
    pub partner: Option<Partner>,
    pub amount: f64,
    /// Defaults to the definition's currency when absent.
    pub currency: Option<String>,
    /// Accounting date; defaults to today when absent.
    pub date: Option<NaiveDate>,
    /// Journal to post into when a step's template names none of its own.
    pub journal: Option<String>,
    /// Free-text reference supplied by the caller.
    pub reference: Option<String>,
    /// Name of whatever triggered the run (source journal entry), for
    /// traceability only.
    pub source_name: Option<String>,
}

impl ExecutionRequest {
    pub fn new(company: impl Into<String>, amount: f64) -> Self {
        Self {
            company: company.into(),
            partner: None,
            amount,
            currency: None,
            date: None,
            journal: None,
            reference: None,
            source_name: None,
        }
    }
}
