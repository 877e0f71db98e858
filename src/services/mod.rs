//! Service layer: the execution engine and its collaborators.

pub mod engine;
pub mod expression;
pub mod linker;

pub use engine::ExecutionEngine;
pub use expression::ExpressionEvaluator;
