//! Mock template-expansion adapter for tests and the demo CLI path.
//!
//! Templates are registered with scripted line sets and failure behavior;
//! finalized documents land in an [`InMemoryDocumentStore`] that records
//! tagging, linking, reverts, and deletions for assertions.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    DocumentState, DraftHandle, DraftLine, DraftLines, ExpansionParams, GeneratedDocument,
    LineKind, OverrideMap, Partner, TemplateDescriptor,
};
use crate::domain::ports::{DocumentStore, TemplateExpander};

/// Scripted behavior for one registered template.
#[derive(Debug, Clone)]
pub struct MockTemplate {
    pub name: String,
    pub default_partner: Option<Partner>,
    pub fixed_date: Option<NaiveDate>,
    pub journal: Option<String>,
    pub lines: Vec<DraftLine>,
    /// Extra context `load_lines` hands back for `finalize`.
    pub line_context: BTreeMap<String, serde_json::Value>,
    /// Whether `finalize` should fail.
    pub fail: bool,
    pub error_message: Option<String>,
}

impl MockTemplate {
    /// A template with one input line (`L1`) and one computed counterpart
    /// (`L2`), the usual two-leg shape.
    pub fn success(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_partner: None,
            fixed_date: None,
            journal: None,
            lines: vec![
                DraftLine {
                    label: "L1".to_string(),
                    kind: LineKind::Input,
                    account: "400000".to_string(),
                    amount: 0.0,
                    description: None,
                },
                DraftLine {
                    label: "L2".to_string(),
                    kind: LineKind::Computed,
                    account: "700000".to_string(),
                    amount: 0.0,
                    description: None,
                },
            ],
            line_context: BTreeMap::new(),
            fail: false,
            error_message: None,
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            fail: true,
            error_message: Some(error.into()),
            ..Self::success(name)
        }
    }
}

struct PendingDraft {
    params: ExpansionParams,
    lines: Vec<DraftLine>,
}

/// Mock expansion adapter. Shares its document store with the engine.
pub struct MockExpander {
    templates: RwLock<HashMap<Uuid, MockTemplate>>,
    drafts: RwLock<HashMap<Uuid, PendingDraft>>,
    override_log: RwLock<Vec<(Uuid, OverrideMap)>>,
    finalize_contexts: RwLock<Vec<BTreeMap<String, serde_json::Value>>>,
    store: Arc<InMemoryDocumentStore>,
    name_counter: AtomicU64,
}

impl MockExpander {
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
            drafts: RwLock::new(HashMap::new()),
            override_log: RwLock::new(Vec::new()),
            finalize_contexts: RwLock::new(Vec::new()),
            store: Arc::new(InMemoryDocumentStore::new()),
            name_counter: AtomicU64::new(0),
        }
    }

    /// The document store finalized documents land in.
    pub fn store(&self) -> Arc<InMemoryDocumentStore> {
        Arc::clone(&self.store)
    }

    /// Register scripted behavior for a template ID.
    pub async fn register(&self, template_id: Uuid, template: MockTemplate) {
        let mut templates = self.templates.write().await;
        templates.insert(template_id, template);
    }

    /// Every override map applied, paired with its template, in call order.
    pub async fn applied_overrides(&self) -> Vec<(Uuid, OverrideMap)> {
        self.override_log.read().await.clone()
    }

    /// The line-load context each `finalize` call received, in call order.
    pub async fn finalize_contexts(&self) -> Vec<BTreeMap<String, serde_json::Value>> {
        self.finalize_contexts.read().await.clone()
    }

    async fn get_template(&self, template_id: Uuid) -> DomainResult<MockTemplate> {
        let templates = self.templates.read().await;
        templates
            .get(&template_id)
            .cloned()
            .ok_or(DomainError::TemplateNotFound(template_id))
    }
}

impl Default for MockExpander {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TemplateExpander for MockExpander {
    async fn describe(&self, template_id: Uuid) -> DomainResult<TemplateDescriptor> {
        let template = self.get_template(template_id).await?;
        Ok(TemplateDescriptor {
            id: template_id,
            name: template.name,
            default_partner: template.default_partner,
            fixed_date: template.fixed_date,
            journal: template.journal,
        })
    }

    async fn instantiate(&self, params: ExpansionParams) -> DomainResult<DraftHandle> {
        let template = self.get_template(params.template_id).await?;
        let handle = DraftHandle {
            id: Uuid::new_v4(),
            template_id: params.template_id,
        };
        let mut drafts = self.drafts.write().await;
        drafts.insert(
            handle.id,
            PendingDraft {
                params,
                lines: template.lines,
            },
        );
        Ok(handle)
    }

    async fn load_lines(&self, handle: &DraftHandle) -> DomainResult<DraftLines> {
        let template = self.get_template(handle.template_id).await?;
        let drafts = self.drafts.read().await;
        let draft = drafts
            .get(&handle.id)
            .ok_or_else(|| DomainError::ExpansionFailed(format!("unknown draft {}", handle.id)))?;
        Ok(DraftLines {
            lines: draft.lines.clone(),
            context: template.line_context,
        })
    }

    async fn apply_overrides(
        &self,
        handle: &DraftHandle,
        overrides: &OverrideMap,
    ) -> DomainResult<()> {
        let mut drafts = self.drafts.write().await;
        let draft = drafts
            .get_mut(&handle.id)
            .ok_or_else(|| DomainError::ExpansionFailed(format!("unknown draft {}", handle.id)))?;

        for line in &mut draft.lines {
            if let Some(fields) = overrides.get(&line.label) {
                if let Some(amount) = fields.get("amount").and_then(serde_json::Value::as_f64) {
                    line.amount = amount;
                }
                if let Some(name) = fields.get("name").and_then(serde_json::Value::as_str) {
                    line.description = Some(name.to_string());
                }
            }
        }

        let mut log = self.override_log.write().await;
        log.push((handle.template_id, overrides.clone()));
        Ok(())
    }

    async fn finalize(
        &self,
        handle: DraftHandle,
        context: &BTreeMap<String, serde_json::Value>,
    ) -> DomainResult<GeneratedDocument> {
        self.finalize_contexts.write().await.push(context.clone());
        let draft = {
            let mut drafts = self.drafts.write().await;
            drafts.remove(&handle.id).ok_or_else(|| {
                DomainError::ExpansionFailed(format!("unknown draft {}", handle.id))
            })?
        };
        let template = self.get_template(handle.template_id).await?;

        if template.fail {
            return Err(DomainError::ExpansionFailed(
                template
                    .error_message
                    .unwrap_or_else(|| "Mock expansion failure".to_string()),
            ));
        }

        let number = self.name_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let amount = draft
            .lines
            .iter()
            .find(|l| l.kind == LineKind::Input)
            .map_or(draft.params.amount, |l| l.amount);

        let document = GeneratedDocument {
            id: Uuid::new_v4(),
            name: format!("MISC/{number:04}"),
            template_id: handle.template_id,
            template_name: template.name,
            company: draft.params.company,
            currency: draft.params.currency,
            amount,
            date: draft.params.date,
            journal: draft.params.journal,
            reference: draft.params.reference,
            state: DocumentState::Posted,
            workflow_id: None,
            workflow_position: None,
            related: Vec::new(),
        };

        self.store.insert(document.clone()).await;
        Ok(document)
    }
}

/// In-memory document store recording every mutation for assertions.
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<Uuid, GeneratedDocument>>,
    deleted: RwLock<Vec<Uuid>>,
    poisoned_reverts: RwLock<HashSet<Uuid>>,
    all_reverts_poisoned: RwLock<bool>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            deleted: RwLock::new(Vec::new()),
            poisoned_reverts: RwLock::new(HashSet::new()),
            all_reverts_poisoned: RwLock::new(false),
        }
    }

    pub async fn insert(&self, document: GeneratedDocument) {
        let mut documents = self.documents.write().await;
        documents.insert(document.id, document);
    }

    pub async fn get(&self, id: Uuid) -> Option<GeneratedDocument> {
        self.documents.read().await.get(&id).cloned()
    }

    pub async fn all(&self) -> Vec<GeneratedDocument> {
        self.documents.read().await.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn deleted_ids(&self) -> Vec<Uuid> {
        self.deleted.read().await.clone()
    }

    /// Make `revert_to_draft` fail for this document, to exercise the
    /// engine's tolerance of partial compensation.
    pub async fn poison_revert(&self, id: Uuid) {
        self.poisoned_reverts.write().await.insert(id);
    }

    /// Make every `revert_to_draft` fail from now on.
    pub async fn poison_all_reverts(&self) {
        *self.all_reverts_poisoned.write().await = true;
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn tag_workflow(
        &self,
        document_id: Uuid,
        workflow_id: Uuid,
        position: u32,
    ) -> DomainResult<()> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(&document_id)
            .ok_or(DomainError::DocumentNotFound(document_id))?;
        document.workflow_id = Some(workflow_id);
        document.workflow_position = Some(position);
        Ok(())
    }

    async fn set_related(&self, document_id: Uuid, related: &[Uuid]) -> DomainResult<()> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(&document_id)
            .ok_or(DomainError::DocumentNotFound(document_id))?;
        document.related = related.to_vec();
        Ok(())
    }

    async fn revert_to_draft(&self, document_id: Uuid) -> DomainResult<()> {
        if *self.all_reverts_poisoned.read().await
            || self.poisoned_reverts.read().await.contains(&document_id)
        {
            return Err(DomainError::Database(format!(
                "revert rejected for document {document_id}"
            )));
        }
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(&document_id)
            .ok_or(DomainError::DocumentNotFound(document_id))?;
        document.state = DocumentState::Draft;
        Ok(())
    }

    async fn delete(&self, document_id: Uuid) -> DomainResult<()> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get(&document_id)
            .ok_or(DomainError::DocumentNotFound(document_id))?;
        if document.state != DocumentState::Draft {
            return Err(DomainError::Database(format!(
                "cannot delete posted document {document_id}"
            )));
        }
        documents.remove(&document_id);
        self.deleted.write().await.push(document_id);
        Ok(())
    }
}
