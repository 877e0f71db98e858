//! Generated-document domain model.
//!
//! A `GeneratedDocument` is the financial record produced by expanding one
//! template step. The documents themselves live in the collaborator's
//! document store; the engine holds copies for context propagation and
//! result linking.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Posting state of a generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    Draft,
    Posted,
}

impl std::fmt::Display for DocumentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Posted => write!(f, "posted"),
        }
    }
}

/// A financial document produced by one workflow step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub id: Uuid,
    /// Journal entry number assigned by the document store.
    pub name: String,
    pub template_id: Uuid,
    pub template_name: String,
    pub company: String,
    pub currency: String,
    pub amount: f64,
    pub date: NaiveDate,
    /// Journal the document was posted into, when one was resolved.
    pub journal: Option<String>,
    pub reference: String,
    pub state: DocumentState,
    /// The workflow definition that produced this document.
    pub workflow_id: Option<Uuid>,
    /// 1-based position within the run's generated documents.
    pub workflow_position: Option<u32>,
    /// Every other document produced in the same run, symmetric.
    pub related: Vec<Uuid>,
}
