//! Result linker: cross-references all documents generated within one run.
//!
//! The relation is symmetric by construction: the related set for each
//! document is computed from the single run set (everything minus self) and
//! both directions are written explicitly through the document store.

use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::GeneratedDocument;
use crate::domain::ports::DocumentStore;

/// For each document, its related set: all documents in the run minus
/// itself. Pure; order follows the input.
pub fn related_sets(documents: &[GeneratedDocument]) -> Vec<(Uuid, Vec<Uuid>)> {
    documents
        .iter()
        .map(|doc| {
            let related: Vec<Uuid> = documents
                .iter()
                .map(|other| other.id)
                .filter(|id| *id != doc.id)
                .collect();
            (doc.id, related)
        })
        .collect()
}

/// Write the symmetric relation through the store and mirror it onto the
/// in-memory copies. A single surviving document needs no links.
pub async fn link<S: DocumentStore + ?Sized>(
    store: &S,
    documents: &mut [GeneratedDocument],
) -> DomainResult<()> {
    if documents.len() < 2 {
        return Ok(());
    }

    let sets = related_sets(documents);
    for (document_id, related) in &sets {
        store.set_related(*document_id, related).await?;
    }
    for (doc, (_, related)) in documents.iter_mut().zip(sets) {
        doc.related = related;
    }
    Ok(())
}
