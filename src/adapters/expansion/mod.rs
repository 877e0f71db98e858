//! Expansion-side adapters.

pub mod mock;

pub use mock::{InMemoryDocumentStore, MockExpander, MockTemplate};
