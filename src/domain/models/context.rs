//! Execution context: the mutable variable set visible to every step's
//! condition and overwrite evaluation during one run.

use chrono::{NaiveDate, Utc};

use super::document::GeneratedDocument;
use super::request::{ExecutionRequest, Partner};
use super::workflow::WorkflowDefinition;

/// Snapshot of the request's scalar fields plus the accumulating list of
/// documents already generated in this run. `previous_documents` is the
/// only channel by which a later step sees an earlier step's output.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub partner: Option<Partner>,
    pub amount: f64,
    pub currency: String,
    pub date: NaiveDate,
    pub company: String,
    /// Fallback journal for steps whose template names none.
    pub journal: Option<String>,
    pub reference: Option<String>,
    pub source_name: Option<String>,
    /// Documents generated by strictly earlier, non-skipped steps, in
    /// dispatch order.
    pub previous_documents: Vec<GeneratedDocument>,
}

impl ExecutionContext {
    /// Build the initial context, resolving request defaults against the
    /// definition: currency falls back to the definition's, date to today,
    /// company to the definition's own unit.
    pub fn from_request(definition: &WorkflowDefinition, request: &ExecutionRequest) -> Self {
        Self {
            partner: request.partner.clone(),
            amount: request.amount,
            currency: request
                .currency
                .clone()
                .unwrap_or_else(|| definition.currency.clone()),
            date: request.date.unwrap_or_else(|| Utc::now().date_naive()),
            company: definition.company.clone(),
            journal: request.journal.clone(),
            reference: request.reference.clone(),
            source_name: request.source_name.clone(),
            previous_documents: Vec::new(),
        }
    }

    /// Fold a freshly generated document into the context so later steps
    /// can reference it.
    pub fn push_document(&mut self, document: GeneratedDocument) {
        self.previous_documents.push(document);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolved_from_definition() {
        let definition = WorkflowDefinition::new("Close", "ACME", "EUR");
        let request = ExecutionRequest::new("ACME", 100.0);

        let ctx = ExecutionContext::from_request(&definition, &request);
        assert_eq!(ctx.currency, "EUR");
        assert_eq!(ctx.company, "ACME");
        assert_eq!(ctx.date, Utc::now().date_naive());
        assert!(ctx.previous_documents.is_empty());
    }

    #[test]
    fn test_request_currency_wins() {
        let definition = WorkflowDefinition::new("Close", "ACME", "EUR");
        let mut request = ExecutionRequest::new("ACME", 100.0);
        request.currency = Some("USD".to_string());

        let ctx = ExecutionContext::from_request(&definition, &request);
        assert_eq!(ctx.currency, "USD");
    }
}
