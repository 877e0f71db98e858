//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that adapters must implement:
//! - `TemplateExpander`: the external template-expansion service
//! - `DocumentStore`: the collaborator's document storage
//! - `DefinitionRepository`: persistence for workflow definitions
//!
//! These contracts keep the execution engine independent of any specific
//! accounting backend.

pub mod definition_repository;
pub mod document_store;
pub mod expander;

pub use definition_repository::DefinitionRepository;
pub use document_store::DocumentStore;
pub use expander::TemplateExpander;
