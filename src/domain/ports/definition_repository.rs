//! Repository interface for workflow definition persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::WorkflowDefinition;

/// Contract for workflow definition data access. Read-only at execution
/// time; mutated only through the definition editor surface.
#[async_trait]
pub trait DefinitionRepository: Send + Sync {
    /// Insert or replace a definition together with its steps.
    ///
    /// Implementations reject definitions whose `data_issues()` is
    /// non-empty with `DomainError::Validation`.
    async fn save(&self, definition: &WorkflowDefinition) -> DomainResult<()>;

    /// Get a definition by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<WorkflowDefinition>>;

    /// Get a definition by ID, requiring it to be active and to belong to
    /// the given company.
    ///
    /// # Returns
    /// * `Err(DomainError::DefinitionNotFound)` when missing, inactive, or
    ///   owned by a different company
    async fn get_active(&self, id: Uuid, company: &str) -> DomainResult<WorkflowDefinition>;

    /// Look up a definition by its display name.
    async fn find_by_name(&self, name: &str) -> DomainResult<Option<WorkflowDefinition>>;

    /// List definitions, optionally filtered by company.
    async fn list(&self, company: Option<&str>) -> DomainResult<Vec<WorkflowDefinition>>;

    /// Delete a definition. Steps are owned by the definition and go with it.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;
}
