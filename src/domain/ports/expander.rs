//! The template-expansion boundary.

use std::collections::BTreeMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    DraftHandle, DraftLines, ExpansionParams, GeneratedDocument, OverrideMap, TemplateDescriptor,
};

/// The external service that turns one template plus a parameter set into a
/// draft financial document.
///
/// The engine drives the adapter through its multi-phase process:
/// `instantiate` -> `load_lines` -> optional `apply_overrides` ->
/// `finalize`. Each phase may fail; the engine maps failures onto the
/// per-step tolerance policy.
#[async_trait]
pub trait TemplateExpander: Send + Sync {
    /// Describe a template's optional capabilities (default partner, fixed
    /// date, journal).
    ///
    /// # Returns
    /// * `Err(DomainError::TemplateNotFound)` for unknown templates
    async fn describe(&self, template_id: Uuid) -> DomainResult<TemplateDescriptor>;

    /// Open a draft for one resolved step.
    async fn instantiate(&self, params: ExpansionParams) -> DomainResult<DraftHandle>;

    /// Populate the draft with concrete line items derived from the
    /// template's own line-generation logic.
    async fn load_lines(&self, handle: &DraftHandle) -> DomainResult<DraftLines>;

    /// Push per-line field overrides onto the draft.
    async fn apply_overrides(
        &self,
        handle: &DraftHandle,
        overrides: &OverrideMap,
    ) -> DomainResult<()>;

    /// Commit the draft into a real financial document. Consumes the
    /// handle. `context` is whatever `load_lines` returned alongside the
    /// lines; the engine passes it back untouched.
    async fn finalize(
        &self,
        handle: DraftHandle,
        context: &BTreeMap<String, serde_json::Value>,
    ) -> DomainResult<GeneratedDocument>;
}
