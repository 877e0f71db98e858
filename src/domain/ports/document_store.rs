//! The collaborator's document storage, as seen by the engine.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;

/// Operations the engine needs on already-finalized documents: workflow
/// tagging, sibling linking, and the compensation primitives used on abort.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Tag a document with the workflow that produced it and its 1-based
    /// position within the run.
    async fn tag_workflow(
        &self,
        document_id: Uuid,
        workflow_id: Uuid,
        position: u32,
    ) -> DomainResult<()>;

    /// Write one direction of the related-documents relation. The result
    /// linker writes both directions explicitly for every pair.
    async fn set_related(&self, document_id: Uuid, related: &[Uuid]) -> DomainResult<()>;

    /// Revert a document to a non-posted draft state so it can be deleted.
    async fn revert_to_draft(&self, document_id: Uuid) -> DomainResult<()>;

    /// Delete a document. Only valid for drafts.
    async fn delete(&self, document_id: Uuid) -> DomainResult<()>;
}
