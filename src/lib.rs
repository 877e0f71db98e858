//! Ledgerflow - Accounting Workflow Engine
//!
//! Ledgerflow executes multi-step accounting workflows: ordered journal-entry
//! template steps gated by CEL conditions, with per-line overrides, tolerant
//! or fail-fast error handling, and cross-linking of the generated documents.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure models, ports, and the error taxonomy
//! - **Service Layer** (`services`): Expression evaluation, the execution
//!   engine, and result linking
//! - **Adapter Layer** (`adapters`): Template expansion and the SQLite
//!   definition store
//! - **Infrastructure Layer** (`infrastructure`): Configuration
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ledgerflow::adapters::expansion::MockExpander;
//! use ledgerflow::services::ExecutionEngine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let expander = Arc::new(MockExpander::new());
//!     let engine = ExecutionEngine::new(Arc::clone(&expander), expander.store());
//!     // engine.execute(&definition, &request).await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    ExecutionOutcome, ExecutionRequest, GeneratedDocument, OverrideMap, Partner, StepPreview,
    StepReport, StepState, TemplateRef, TemplateStep, WorkflowDefinition,
};
pub use domain::ports::{DefinitionRepository, DocumentStore, TemplateExpander};
pub use infrastructure::{Config, ConfigError};
pub use services::{ExecutionEngine, ExpressionEvaluator};
